//! Gate result persistence
//!
//! Writing a gate outcome keeps the at-most-one-authoritative-instance
//! rule: an existing result marker for the gate is rewritten in place,
//! otherwise a fresh marker is appended at the document tail.

use pdw_document::{gate_results, render_gate_result_marker, GateStatus, MarkerId};

/// Persist a gate outcome, replacing the authoritative marker if present
#[must_use]
pub fn persist_gate_result(
    lines: &[String],
    gate: &MarkerId,
    status: GateStatus,
    issues: u32,
    warnings: u32,
) -> Vec<String> {
    let rendered = render_gate_result_marker(gate, status, issues, warnings);
    let mut new_lines = lines.to_vec();

    match gate_results(lines).get(gate) {
        Some(existing) => {
            new_lines[existing.line] = rendered;
        }
        None => {
            new_lines.push(rendered);
        }
    }

    tracing::info!(gate = %gate, status = status.as_str(), issues, warnings, "gate result persisted");
    new_lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn appends_then_rewrites_in_place() {
        let gate: MarkerId = "design_review".parse().unwrap();
        let lines = vec!["<!-- section:goals -->".to_string(), "Body.".to_string()];

        let first = persist_gate_result(&lines, &gate, GateStatus::Failed, 2, 1);
        assert_eq!(first.len(), 3);

        let second = persist_gate_result(&first, &gate, GateStatus::Passed, 0, 0);
        assert_eq!(second.len(), 3);

        let results = gate_results(&second);
        assert_eq!(results.len(), 1);
        assert_eq!(results[&gate].status, GateStatus::Passed);
    }
}
