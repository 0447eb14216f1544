//! User-facing rendering of validation outcomes
//!
//! One line per error with the offending id/line number; a single
//! affirmative line for a fully valid document; repairs rendered as an
//! itemized healed-notice distinct from error output.

use crate::validator::ValidationOutcome;

/// Render a validation outcome for display
#[must_use]
pub fn render_report(outcome: &ValidationOutcome) -> String {
    let mut out = String::new();

    if outcome.errors.is_empty() {
        out.push_str("document structure is valid\n");
    } else {
        for error in &outcome.errors {
            out.push_str(&format!("error: {error}\n"));
        }
    }

    if !outcome.repairs.is_empty() {
        out.push_str("repaired:\n");
        for repair in &outcome.repairs {
            out.push_str(&format!("  - {repair}\n"));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::validate_all;
    use pretty_assertions::assert_eq;

    #[test]
    fn valid_document_renders_one_affirmative_line() {
        let lines = vec!["<!-- section:goals -->".to_string(), "Body.".to_string()];
        let report = render_report(&validate_all(&lines, None));
        assert_eq!(report, "document structure is valid\n");
    }

    #[test]
    fn errors_render_one_line_each() {
        let lines = vec![
            "<!-- section:goals -->".to_string(),
            "<!-- section:goals -->".to_string(),
            "<!-- section_lock:ghost lock=true -->".to_string(),
        ];
        let report = render_report(&validate_all(&lines, None));
        let error_lines: Vec<&str> = report.lines().collect();
        assert_eq!(error_lines.len(), 2);
        assert!(error_lines.iter().all(|l| l.starts_with("error: ")));
    }

    #[test]
    fn repairs_render_as_an_itemized_notice() {
        let lines = vec!["<!-- section:risks_open_issues -->".to_string()];
        let report = render_report(&validate_all(&lines, None));
        assert!(report.starts_with("document structure is valid\n"));
        assert!(report.contains("repaired:\n  - risks_open_issues:"));
    }
}
