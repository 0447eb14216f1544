//! Workflow order extraction
//!
//! The `workflow:order` block lists the ids the runner walks, in order.
//! Targets are section ids or `review_gate:<name>` pseudo-ids. Membership
//! must be duplicate-free; a repeated target is a hard parse failure
//! naming the offending line, because a runner cannot make sense of a
//! document that schedules the same target twice.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::ParseFailure;
use crate::marker::{tokenize, MarkerEvent, MarkerId};

/// Prefix distinguishing gate pseudo-ids from section ids
const GATE_PREFIX: &str = "review_gate:";

/// One entry in the workflow order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// An ordinary section to draft/integrate
    Section(MarkerId),
    /// A review gate pseudo-target
    ReviewGate(MarkerId),
}

impl Target {
    /// The underlying id, without the gate prefix
    #[inline]
    #[must_use]
    pub fn id(&self) -> &MarkerId {
        match self {
            Self::Section(id) | Self::ReviewGate(id) => id,
        }
    }

    /// True for gate pseudo-targets
    #[inline]
    #[must_use]
    pub fn is_gate(&self) -> bool {
        matches!(self, Self::ReviewGate(_))
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Section(id) => id.fmt(f),
            Self::ReviewGate(id) => write!(f, "{GATE_PREFIX}{id}"),
        }
    }
}

impl FromStr for Target {
    type Err = crate::error::MarkerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix(GATE_PREFIX) {
            Some(name) => Ok(Self::ReviewGate(name.parse()?)),
            None => Ok(Self::Section(s.parse()?)),
        }
    }
}

/// The ordered, duplicate-free target list of one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOrder {
    targets: Vec<Target>,
}

impl WorkflowOrder {
    /// Targets in declared order
    #[inline]
    #[must_use]
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Position of a target, if scheduled
    #[must_use]
    pub fn position(&self, target: &Target) -> Option<usize> {
        self.targets.iter().position(|t| t == target)
    }

    /// Section targets only, gates excluded, order preserved
    #[must_use]
    pub fn section_ids(&self) -> Vec<MarkerId> {
        self.targets
            .iter()
            .filter_map(|target| match target {
                Target::Section(id) => Some(id.clone()),
                Target::ReviewGate(_) => None,
            })
            .collect()
    }
}

/// Extract the workflow order block
///
/// # Errors
/// - [`ParseFailure::MissingWorkflowOrder`] when no block opens
/// - [`ParseFailure::UnterminatedWorkflowOrder`] when `-->` never follows
/// - [`ParseFailure::InvalidOrderTarget`] for an entry that is neither a
///   valid section id nor a gate pseudo-id
/// - [`ParseFailure::DuplicateOrderTarget`] when a target repeats,
///   naming the offending line
pub fn parse_workflow_order(lines: &[String]) -> Result<WorkflowOrder, ParseFailure> {
    let tokens = tokenize(lines);
    let start_line = tokens
        .iter()
        .find_map(|token| match token.event {
            MarkerEvent::WorkflowOrderStart => Some(token.line),
            _ => None,
        })
        .ok_or(ParseFailure::MissingWorkflowOrder)?;

    let end_line = tokens
        .iter()
        .find_map(|token| match token.event {
            MarkerEvent::BlockEnd if token.line > start_line => Some(token.line),
            _ => None,
        })
        .ok_or(ParseFailure::UnterminatedWorkflowOrder { start_line })?;

    let mut seen: IndexSet<Target> = IndexSet::new();
    for line_number in start_line + 1..end_line {
        let entry = lines[line_number].trim();
        if entry.is_empty() {
            continue;
        }
        let target: Target = entry.parse().map_err(|_| ParseFailure::InvalidOrderTarget {
            text: entry.to_string(),
            line_number,
        })?;
        if !seen.insert(target) {
            return Err(ParseFailure::DuplicateOrderTarget {
                target: entry.to_string(),
                line_number,
            });
        }
    }

    Ok(WorkflowOrder {
        targets: seen.into_iter().collect(),
    })
}
