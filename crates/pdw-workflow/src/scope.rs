//! Review scope resolution and patch validation
//!
//! A gate inspects a scope of sections. Scope policies are a closed enum;
//! resolution turns one into a concrete, ordered list of section ids.
//! Patches proposed by a review are structurally vetted before anything
//! may be merged, and application is gated by the [`AutoApply`] policy.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use pdw_completion::PatchSuggestion;
use pdw_document::{
    contains_marker_syntax, find_sections, section_span, MarkerId, Target, WorkflowOrder,
};
use pdw_validate::{body_end_boundary, replace_body};
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::policy::{AutoApply, ConfigurationError};

/// Which sections a review gate inspects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReviewScope {
    /// The nearest ordinary section preceding the gate in the order
    CurrentSection,
    /// Every section scheduled before the gate, other gates excluded
    AllPriorSections,
    /// Every section id in the document, document order
    EntireDocument,
    /// An explicit literal list, kept in its declared order
    Sections(Vec<String>),
}

impl Display for ReviewScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::CurrentSection => f.write_str("current_section"),
            Self::AllPriorSections => f.write_str("all_prior_sections"),
            Self::EntireDocument => f.write_str("entire_document"),
            Self::Sections(ids) => write!(f, "sections:{}", ids.join(",")),
        }
    }
}

impl FromStr for ReviewScope {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "current_section" => Ok(Self::CurrentSection),
            "all_prior_sections" => Ok(Self::AllPriorSections),
            "entire_document" => Ok(Self::EntireDocument),
            _ => match s.strip_prefix("sections:") {
                Some(list) => {
                    let ids: Vec<String> = list
                        .split(',')
                        .map(str::trim)
                        .filter(|entry| !entry.is_empty())
                        .map(str::to_string)
                        .collect();
                    Ok(Self::Sections(ids))
                }
                None => Err(ConfigurationError::InvalidScope(s.to_string())),
            },
        }
    }
}

impl TryFrom<String> for ReviewScope {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReviewScope> for String {
    fn from(scope: ReviewScope) -> Self {
        scope.to_string()
    }
}

/// Resolve a scope policy to a concrete, ordered section id list
#[must_use]
pub fn resolve_scope(
    lines: &[String],
    order: &WorkflowOrder,
    gate: &Target,
    scope: &ReviewScope,
) -> Vec<MarkerId> {
    let gate_position = order.position(gate).unwrap_or(order.targets().len());
    let prior_sections = || {
        order.targets()[..gate_position]
            .iter()
            .filter_map(|target| match target {
                Target::Section(id) => Some(id.clone()),
                Target::ReviewGate(_) => None,
            })
    };

    match scope {
        ReviewScope::CurrentSection => prior_sections().last().into_iter().collect(),
        ReviewScope::AllPriorSections => prior_sections().collect(),
        ReviewScope::EntireDocument => {
            find_sections(lines).into_iter().map(|span| span.id).collect()
        }
        ReviewScope::Sections(ids) => ids
            .iter()
            .filter_map(|entry| match entry.parse::<MarkerId>() {
                Ok(id) => Some(id),
                Err(err) => {
                    tracing::warn!(entry, %err, "scope entry skipped");
                    None
                }
            })
            .collect(),
    }
}

/// Verdict on one proposed patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchVerdict {
    pub patch: PatchSuggestion,
    pub accepted: bool,
    pub reason: Option<String>,
}

/// Structurally vet review patches
///
/// A patch is accepted only when its target section exists, the suggested
/// text is non-empty, and the text carries no marker syntax of its own; a
/// patch may not smuggle in new structure.
#[must_use]
pub fn vet_patches(lines: &[String], patches: &[PatchSuggestion]) -> Vec<PatchVerdict> {
    patches
        .iter()
        .map(|patch| {
            let reason = patch_rejection(lines, patch);
            if let Some(reason) = &reason {
                tracing::warn!(section = patch.section, reason, "patch rejected");
            }
            PatchVerdict {
                patch: patch.clone(),
                accepted: reason.is_none(),
                reason,
            }
        })
        .collect()
}

fn patch_rejection(lines: &[String], patch: &PatchSuggestion) -> Option<String> {
    let Ok(id) = patch.section.parse::<MarkerId>() else {
        return Some(format!("invalid section id '{}'", patch.section));
    };
    if section_span(lines, &id).is_none() {
        return Some(format!("section '{id}' does not exist"));
    }
    if patch.suggestion.trim().is_empty() {
        return Some("empty suggestion".to_string());
    }
    if contains_marker_syntax(&patch.suggestion) {
        return Some("suggestion contains marker syntax".to_string());
    }
    None
}

/// Apply vetted patches under the gate's auto-apply policy
///
/// `Never` leaves everything for human review. `Always` applies each
/// accepted patch. `IfValidationPasses` applies the batch only when every
/// patch in it was accepted; partial application is disallowed.
///
/// # Errors
/// Propagates [`WorkflowError::Edit`] when a replacement is rejected by
/// the structural boundary.
pub fn apply_patches(
    lines: &[String],
    verdicts: &[PatchVerdict],
    auto_apply: AutoApply,
) -> Result<(Vec<String>, usize), WorkflowError> {
    let apply_batch = match auto_apply {
        AutoApply::Never => false,
        AutoApply::Always => true,
        AutoApply::IfValidationPasses => verdicts.iter().all(|v| v.accepted),
    };
    if !apply_batch {
        return Ok((lines.to_vec(), 0));
    }

    let mut current = lines.to_vec();
    let mut applied = 0;
    for verdict in verdicts.iter().filter(|v| v.accepted) {
        let Ok(id) = verdict.patch.section.parse::<MarkerId>() else {
            continue;
        };
        let Some(span) = section_span(&current, &id) else {
            continue;
        };
        let boundary = body_end_boundary(&current, &span);
        current = replace_body(
            &current,
            span.start,
            boundary,
            id.as_str(),
            &verdict.patch.suggestion,
            &[],
        )?;
        applied += 1;
    }

    Ok((current, applied))
}
