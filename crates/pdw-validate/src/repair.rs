//! Anchor-scoped auto-repair
//!
//! Repair exists for forgotten boilerplate, not for inventing structure a
//! document never asked for. Exactly one case is covered: the
//! `risks_open_issues` section is known to require an `open_questions`
//! subsection and its canonical ledger table. When the section exists but
//! the subsection or table (or both) are missing, the missing markers and
//! an empty, correctly-headed table are spliced in just before the
//! section's lock marker (or at its end), and a [`Repair`] description is
//! recorded instead of an error. When the anchor section itself is absent,
//! nothing happens: the ledger is optional without its anchor.

use std::fmt::{self, Display, Formatter};

use pdw_document::{
    find_subsections_within, lock_states, section_span, tokenize, MarkerEvent, MarkerId,
};
use pdw_ledger::{canonical_header, canonical_separator, LedgerSchema, LEGACY_TABLE_ID};

/// Section id whose ledger boilerplate is auto-healed
pub const ANCHOR_SECTION: &str = "risks_open_issues";

/// Subsection id the anchor section must carry
pub const ANCHOR_SUBSECTION: &str = "open_questions";

/// One human-readable description of a performed repair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    pub description: String,
}

impl Display for Repair {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Heal the anchor section's missing ledger boilerplate
///
/// Returns the (possibly unchanged) lines and the repairs performed.
#[must_use]
pub fn repair_missing_ledger(lines: &[String]) -> (Vec<String>, Vec<Repair>) {
    let anchor = MarkerId::new(ANCHOR_SECTION).expect("static id");
    let Some(span) = section_span(lines, &anchor) else {
        return (lines.to_vec(), Vec::new());
    };

    let has_subsection = find_subsections_within(lines, &span)
        .iter()
        .any(|sub| sub.id == ANCHOR_SUBSECTION);
    let has_table = tokenize(lines)
        .into_iter()
        .filter(|token| span.contains(token.line))
        .any(|token| matches!(token.event, MarkerEvent::Table { id } if id == LEGACY_TABLE_ID));

    if has_subsection && has_table {
        return (lines.to_vec(), Vec::new());
    }

    // Splice just before the section's own lock marker when it sits inside
    // the span, otherwise at the section's end.
    let splice_at = lock_states(lines)
        .get(&anchor)
        .filter(|state| span.contains(state.line))
        .map_or(span.end, |state| state.line);

    let mut insert: Vec<String> = Vec::new();
    let mut healed: Vec<&str> = Vec::new();
    if !has_subsection {
        insert.push(format!("<!-- subsection:{ANCHOR_SUBSECTION} -->"));
        insert.push(String::new());
        healed.push("subsection");
    }
    if !has_table {
        insert.push(format!("<!-- table:{LEGACY_TABLE_ID} -->"));
        insert.push(canonical_header(LedgerSchema::Legacy));
        insert.push(canonical_separator(LedgerSchema::Legacy));
        insert.push(String::new());
        healed.push("table");
    }

    let mut new_lines = lines.to_vec();
    new_lines.splice(splice_at..splice_at, insert);

    let repair = Repair {
        description: format!(
            "{ANCHOR_SECTION}: added missing open-questions {} with canonical header",
            healed.join(" and ")
        ),
    };
    tracing::info!(section = ANCHOR_SECTION, healed = ?healed, "ledger boilerplate repaired");

    (new_lines, vec![repair])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::validate_all;
    use pretty_assertions::assert_eq;

    fn doc(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn missing_subsection_and_table_are_both_synthesized() {
        let lines = doc(&[
            "<!-- section:risks_open_issues -->",
            "## Risks & Open Issues",
            "Risk prose.",
            "<!-- section_lock:risks_open_issues lock=false -->",
        ]);

        let outcome = validate_all(&lines, None);
        assert!(outcome.is_valid());
        assert_eq!(outcome.repairs.len(), 1);

        let text = outcome.lines.join("\n");
        assert!(text.contains("<!-- subsection:open_questions -->"));
        assert!(text.contains("<!-- table:open_questions -->"));
        assert!(text.contains(
            "| Question ID | Question | Date | Answer | Section Target | Resolution Status |"
        ));

        // Spliced before the lock marker.
        let lock_at = outcome
            .lines
            .iter()
            .position(|l| l.contains("section_lock"))
            .unwrap();
        let table_at = outcome
            .lines
            .iter()
            .position(|l| l.contains("table:open_questions"))
            .unwrap();
        assert!(table_at < lock_at);
    }

    #[test]
    fn repair_is_idempotent() {
        let lines = doc(&[
            "<!-- section:risks_open_issues -->",
            "Risk prose.",
        ]);

        let first = validate_all(&lines, None);
        assert_eq!(first.repairs.len(), 1);
        let second = validate_all(&first.lines, None);
        assert!(second.repairs.is_empty());
        assert_eq!(first.lines, second.lines);
    }

    #[test]
    fn only_the_table_is_added_when_the_subsection_exists() {
        let lines = doc(&[
            "<!-- section:risks_open_issues -->",
            "<!-- subsection:open_questions -->",
        ]);

        let (repaired, repairs) = repair_missing_ledger(&lines);
        assert_eq!(repairs.len(), 1);
        assert!(repairs[0].description.contains("table"));
        assert!(!repairs[0].description.contains("subsection and"));
        assert_eq!(
            repaired
                .iter()
                .filter(|l| l.contains("subsection:open_questions"))
                .count(),
            1
        );
    }

    #[test]
    fn absent_anchor_section_repairs_nothing_and_flags_nothing() {
        let lines = doc(&["<!-- section:goals -->", "Body."]);
        let outcome = validate_all(&lines, None);
        assert!(outcome.is_valid());
        assert!(outcome.repairs.is_empty());
        assert_eq!(outcome.lines, lines);
    }
}
