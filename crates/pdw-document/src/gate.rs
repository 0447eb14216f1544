//! Review gate result markers
//!
//! A gate writes at most one authoritative result: when several
//! `review_gate_result` markers exist for the same gate id, the last one
//! in the document replaces the earlier ones.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::marker::{tokenize, MarkerEvent, MarkerId};

/// Outcome of a review gate run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Passed,
    Failed,
}

impl GateStatus {
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

/// The authoritative persisted result for one gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResult {
    pub gate: MarkerId,
    pub status: GateStatus,
    pub issues: u32,
    pub warnings: u32,
    /// Line of the authoritative (last) occurrence
    pub line: usize,
}

/// Collect authoritative gate results, last occurrence per gate winning
#[must_use]
pub fn gate_results(lines: &[String]) -> IndexMap<MarkerId, GateResult> {
    let mut results = IndexMap::new();
    for token in tokenize(lines) {
        if let MarkerEvent::ReviewGateResult {
            gate,
            status,
            issues,
            warnings,
        } = token.event
        {
            results.insert(
                gate.clone(),
                GateResult {
                    gate,
                    status,
                    issues,
                    warnings,
                    line: token.line,
                },
            );
        }
    }
    results
}

/// Render a gate result marker line
#[must_use]
pub fn render_gate_result_marker(
    gate: &MarkerId,
    status: GateStatus,
    issues: u32,
    warnings: u32,
) -> String {
    format!(
        "<!-- review_gate_result:{gate} status={} issues={issues} warnings={warnings} -->",
        status.as_str()
    )
}
