//! Marker-preserving body replacement
//!
//! [`replace_body`] is the only sanctioned way to change a region's
//! content. It retains the structural furniture of the block (opening
//! marker, first heading, last lock, trailing divider), sanitizes the
//! incoming body, and validates the document both before and after, so a
//! rewrite can never delete or duplicate a marker.

use pdw_document::{
    contains_placeholder, find_subsections_within, tokenize, MarkerEvent, SectionSpan,
    StructuralError, PLACEHOLDER,
};
use pdw_ledger::LEDGER_SUBSECTIONS;
use serde::{Deserialize, Serialize};

use crate::validator::ensure_valid;

/// How many lines after the opening marker are searched for a heading
const HEADING_SCAN: usize = 5;

/// Data-driven content filters attached to a section's policy
///
/// Filters are configuration, not code branches keyed on section identity:
/// a policy lists the filters its section wants and the sanitizer applies
/// them in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFilter {
    /// Drop bullet lines whose normalized text repeats an earlier bullet
    DedupeBullets,
}

/// Errors from the editing primitive
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// Bounds are inverted or out of range
    #[error("invalid span for '{region}': {start}..{end}")]
    InvalidSpan {
        region: String,
        start: usize,
        end: usize,
    },

    /// The document was already corrupt on entry
    #[error("refusing to edit structurally invalid document: {0}")]
    InvalidBeforeEdit(StructuralError),

    /// Applying the edit would corrupt the document
    #[error("edit rejected, result would be invalid: {0}")]
    EditRejected(StructuralError),
}

/// Replace the free-text body of `lines[start..end]`, preserving markers
///
/// Retained from the original block, in order: line 0 (the opening
/// marker), the first `##`/`###` heading among the next few lines, the
/// last lock marker anywhere in the block, and a trailing `---` divider
/// when one sits in the final three lines. The sanitized new body is
/// spliced between them; if sanitization leaves nothing, the placeholder
/// sentinel is substituted so the region stays machine-recognizably blank.
///
/// # Errors
/// - [`EditError::InvalidSpan`] on bad bounds
/// - [`EditError::InvalidBeforeEdit`] when the document fails validation
///   on entry
/// - [`EditError::EditRejected`] when the edited document would fail
///   validation
pub fn replace_body(
    lines: &[String],
    start: usize,
    end: usize,
    region_id: &str,
    new_body: &str,
    filters: &[ContentFilter],
) -> Result<Vec<String>, EditError> {
    if start >= end || end > lines.len() {
        return Err(EditError::InvalidSpan {
            region: region_id.to_string(),
            start,
            end,
        });
    }
    ensure_valid(lines).map_err(EditError::InvalidBeforeEdit)?;

    let block = &lines[start..end];
    let opening = block[0].clone();

    let heading = block
        .iter()
        .skip(1)
        .take(HEADING_SCAN)
        .find(|line| {
            let t = line.trim_start();
            t.starts_with("## ") || t.starts_with("### ")
        })
        .cloned();

    let lock = tokenize(block)
        .into_iter()
        .filter(|token| matches!(token.event, MarkerEvent::SectionLock { .. }))
        .next_back()
        .map(|token| block[token.line].clone());

    let divider = block
        .iter()
        .rev()
        .take(3)
        .any(|line| line.trim() == "---")
        .then(|| "---".to_string());

    let mut body = sanitize_body(new_body, filters);
    if body.is_empty() {
        body.push(PLACEHOLDER.to_string());
    }

    let mut new_block = Vec::with_capacity(body.len() + 5);
    new_block.push(opening);
    if let Some(heading) = heading {
        new_block.push(heading);
    }
    new_block.push(String::new());
    new_block.extend(body);
    if lock.is_some() || divider.is_some() {
        new_block.push(String::new());
    }
    if let Some(lock) = lock {
        new_block.push(lock);
    }
    if let Some(divider) = divider {
        new_block.push(divider);
    }

    let mut new_lines = Vec::with_capacity(lines.len() - (end - start) + new_block.len());
    new_lines.extend_from_slice(&lines[..start]);
    new_lines.append(&mut new_block);
    new_lines.extend_from_slice(&lines[end..]);

    ensure_valid(&new_lines).map_err(EditError::EditRejected)?;
    tracing::debug!(region = region_id, start, end, "body replaced");
    Ok(new_lines)
}

/// Sanitize a generated body before splicing
///
/// Strips marker, heading, and divider lines a content generator may have
/// echoed back, collapses runs of blank lines, trims blank edges, and
/// applies the section's content filters.
#[must_use]
pub fn sanitize_body(new_body: &str, filters: &[ContentFilter]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut seen_bullets: Vec<String> = Vec::new();
    let dedupe_bullets = filters.contains(&ContentFilter::DedupeBullets);

    for raw in new_body.lines() {
        let trimmed = raw.trim();
        if is_structural_echo(trimmed) {
            continue;
        }
        if trimmed.is_empty() {
            if out.last().is_some_and(|prev| prev.is_empty()) {
                continue;
            }
            out.push(String::new());
            continue;
        }
        if dedupe_bullets && (trimmed.starts_with("- ") || trimmed.starts_with("* ")) {
            let normalized = trimmed[2..].split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
            if seen_bullets.contains(&normalized) {
                continue;
            }
            seen_bullets.push(normalized);
        }
        out.push(raw.trim_end().to_string());
    }

    while out.last().is_some_and(|line| line.is_empty()) {
        out.pop();
    }
    while out.first().is_some_and(|line| line.is_empty()) {
        out.remove(0);
    }
    out
}

fn is_structural_echo(trimmed: &str) -> bool {
    if trimmed == "---" || trimmed == "-->" {
        return true;
    }
    if trimmed.starts_with('#') {
        return true;
    }
    if contains_placeholder(trimmed) {
        return true;
    }
    if trimmed.starts_with("<!--") {
        // One echoed marker line is enough to reject the whole line; the
        // tokenizer decides whether it is marker syntax.
        let single = [trimmed.to_string()];
        return !tokenize(&single).is_empty();
    }
    false
}

/// Compute the replacement end boundary for a section
///
/// When the section carries a nested `questions_issues`/`open_questions`
/// subsection, the body ends where that subsection starts; replacement may
/// never overwrite the ledger. Both the drafting and the integration call
/// paths go through this function.
#[must_use]
pub fn body_end_boundary(lines: &[String], span: &SectionSpan) -> usize {
    find_subsections_within(lines, span)
        .into_iter()
        .find(|sub| LEDGER_SUBSECTIONS.iter().any(|name| sub.id == *name))
        .map_or(span.end, |sub| sub.start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdw_document::{find_sections, section_span};
    use pretty_assertions::assert_eq;

    fn doc(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> Vec<String> {
        doc(&[
            "<!-- section:goals -->",
            "## Goals",
            "",
            "<!-- PLACEHOLDER -->",
            "",
            "<!-- section_lock:goals lock=false -->",
            "---",
            "<!-- section:scope -->",
            "Scope body.",
        ])
    }

    fn marker_lines(lines: &[String]) -> Vec<String> {
        lines
            .iter()
            .filter(|l| !pdw_document::tokenize(&[l.to_string()]).is_empty())
            .cloned()
            .collect()
    }

    #[test]
    fn replaces_body_and_keeps_all_furniture() {
        let lines = sample();
        let out = replace_body(&lines, 0, 7, "goals", "The system does X.\n\nAnd Y.", &[]).unwrap();

        assert_eq!(out[0], "<!-- section:goals -->");
        assert!(out.contains(&"## Goals".to_string()));
        assert!(out.contains(&"The system does X.".to_string()));
        assert!(out.contains(&"<!-- section_lock:goals lock=false -->".to_string()));
        assert!(out.contains(&"---".to_string()));
        // Siblings untouched
        assert!(out.contains(&"<!-- section:scope -->".to_string()));
        assert!(out.contains(&"Scope body.".to_string()));
    }

    #[test]
    fn marker_set_is_preserved_across_replacement() {
        let lines = sample();
        let before = marker_lines(&lines);
        let out = replace_body(&lines, 0, 7, "goals", "New prose body.", &[]).unwrap();
        let after = marker_lines(&out);
        assert_eq!(before, after);
    }

    #[test]
    fn repeated_replacement_does_not_drift() {
        let lines = sample();
        let pass1 = replace_body(&lines, 0, 7, "goals", "First pass.", &[]).unwrap();
        let span = section_span(&pass1, &"goals".parse().unwrap()).unwrap();
        let pass2 = replace_body(&pass1, span.start, span.end, "goals", "Second pass.", &[]).unwrap();

        assert_eq!(marker_lines(&lines), marker_lines(&pass2));
        assert_eq!(find_sections(&pass2).len(), 2);
        assert!(pass2.contains(&"Second pass.".to_string()));
        assert!(!pass2.iter().any(|l| l.contains("First pass.")));
    }

    #[test]
    fn echoed_markers_and_headings_are_stripped() {
        let lines = sample();
        let body = "<!-- section:goals -->\n## Goals\nReal content.\n---\n<!-- PLACEHOLDER -->";
        let out = replace_body(&lines, 0, 7, "goals", body, &[]).unwrap();

        let goals_span = section_span(&out, &"goals".parse().unwrap()).unwrap();
        let section = &out[goals_span.start..goals_span.end];
        assert_eq!(
            section.iter().filter(|l| l.trim() == "<!-- section:goals -->").count(),
            1
        );
        assert!(section.iter().any(|l| l == "Real content."));
    }

    #[test]
    fn empty_sanitized_body_becomes_placeholder() {
        let lines = sample();
        let out = replace_body(&lines, 0, 7, "goals", "## Heading only\n---\n", &[]).unwrap();
        let span = section_span(&out, &"goals".parse().unwrap()).unwrap();
        assert!(out[span.start..span.end].iter().any(|l| l.trim() == PLACEHOLDER));
    }

    #[test]
    fn bullet_dedupe_filter_is_applied() {
        let body = "- keep one\n- Keep   ONE\n- and two";
        let sanitized = sanitize_body(body, &[ContentFilter::DedupeBullets]);
        assert_eq!(sanitized, vec!["- keep one".to_string(), "- and two".to_string()]);
    }

    #[test]
    fn bad_bounds_are_span_errors() {
        let lines = sample();
        assert!(matches!(
            replace_body(&lines, 5, 5, "goals", "x", &[]),
            Err(EditError::InvalidSpan { .. })
        ));
        assert!(matches!(
            replace_body(&lines, 0, 99, "goals", "x", &[]),
            Err(EditError::InvalidSpan { .. })
        ));
    }

    #[test]
    fn corrupt_documents_are_refused_on_entry() {
        let mut lines = sample();
        lines.push("<!-- section_lock:ghost lock=true -->".to_string());
        assert!(matches!(
            replace_body(&lines, 0, 7, "goals", "x", &[]),
            Err(EditError::InvalidBeforeEdit(_))
        ));
    }

    #[test]
    fn ledger_subsection_caps_the_replacement_boundary() {
        let lines = doc(&[
            "<!-- section:goals -->",
            "Body.",
            "<!-- subsection:questions_issues -->",
            "<!-- table:questions_issues -->",
            "| Question ID | Question | Date | Answer | Status |",
            "|---|---|---|---|---|",
            "<!-- section:scope -->",
        ]);
        let span = section_span(&lines, &"goals".parse().unwrap()).unwrap();
        assert_eq!(span.end, 6);
        assert_eq!(body_end_boundary(&lines, &span), 2);

        let plain = doc(&["<!-- section:solo -->", "Body."]);
        let solo = section_span(&plain, &"solo".parse().unwrap()).unwrap();
        assert_eq!(body_end_boundary(&plain, &solo), solo.end);
    }
}
