//! Batch structural validation
//!
//! Checks are independent and cumulative: one pass collects every
//! violation instead of stopping at the first. Auto-repair runs before
//! the checks, so forgotten ledger boilerplate heals instead of failing
//! (see [`crate::repair`]).

use indexmap::IndexMap;
use pdw_document::{
    find_sections, table_block_from, tokenize, MarkerEvent, StructuralError,
};
use pdw_ledger::{split_cells, LedgerSchema, LEDGER_SUBSECTIONS, LEGACY_TABLE_ID};

use crate::repair::{repair_missing_ledger, Repair};

/// Result of a batch validation: possibly-repaired lines, every error
/// found, and descriptions of any repairs that were made
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub lines: Vec<String>,
    pub errors: Vec<StructuralError>,
    pub repairs: Vec<Repair>,
}

impl ValidationOutcome {
    /// True when no errors were found (repairs do not count as errors)
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a document, repairing the one known-missing-boilerplate case
///
/// With `template` given, every section/subsection/table marker present in
/// the template but absent from the subject is additionally reported.
#[must_use]
pub fn validate_all(lines: &[String], template: Option<&[String]>) -> ValidationOutcome {
    let (lines, repairs) = repair_missing_ledger(lines);

    let mut errors = collect_errors(&lines);
    if let Some(template) = template {
        errors.extend(template_diff(&lines, template));
    }

    if errors.is_empty() {
        tracing::debug!(repairs = repairs.len(), "document structure is valid");
    } else {
        tracing::warn!(errors = errors.len(), "structural validation failed");
    }

    ValidationOutcome {
        lines,
        errors,
        repairs,
    }
}

/// Fail-fast validation for call paths that cannot proceed on a corrupt
/// document (the editor, patch application)
///
/// Runs the same checks as [`validate_all`] but performs no repair and
/// returns the first violation.
///
/// # Errors
/// The first [`StructuralError`] found, if any.
pub fn ensure_valid(lines: &[String]) -> Result<(), StructuralError> {
    match collect_errors(lines).into_iter().next() {
        None => Ok(()),
        Some(error) => Err(error),
    }
}

fn collect_errors(lines: &[String]) -> Vec<StructuralError> {
    let mut errors = Vec::new();
    errors.extend(duplicate_sections(lines));
    errors.extend(malformed_markers(lines));
    errors.extend(orphaned_locks(lines));
    errors.extend(ledger_table_schemas(lines));
    errors
}

/// Every id with more than one `section:` marker, with all its lines
fn duplicate_sections(lines: &[String]) -> Vec<StructuralError> {
    group_section_lines(lines)
        .into_iter()
        .filter(|(_, line_numbers)| line_numbers.len() > 1)
        .map(|(id, line_numbers)| StructuralError::DuplicateSection { id, line_numbers })
        .collect()
}

fn malformed_markers(lines: &[String]) -> Vec<StructuralError> {
    tokenize(lines)
        .into_iter()
        .filter_map(|token| match token.event {
            MarkerEvent::Malformed { text } => Some(StructuralError::MalformedMarker {
                line_number: token.line,
                text,
            }),
            _ => None,
        })
        .collect()
}

fn orphaned_locks(lines: &[String]) -> Vec<StructuralError> {
    let section_ids: Vec<String> = find_sections(lines)
        .into_iter()
        .map(|span| span.id.to_string())
        .collect();

    tokenize(lines)
        .into_iter()
        .filter_map(|token| match token.event {
            MarkerEvent::SectionLock { id, .. } if !section_ids.contains(&id.to_string()) => {
                Some(StructuralError::OrphanedLock {
                    id: id.to_string(),
                    line_number: token.line,
                })
            }
            _ => None,
        })
        .collect()
}

/// Schema checks for the fixed-schema ledger tables
///
/// Applies to every `open_questions`/`questions_issues` table marker: the
/// header must be one of the two canonical column sets, the separator row
/// must follow, and every data row must carry the header's pipe count.
/// One error per offending row or column mismatch.
fn ledger_table_schemas(lines: &[String]) -> Vec<StructuralError> {
    let mut errors = Vec::new();

    for token in tokenize(lines) {
        let MarkerEvent::Table { id } = &token.event else {
            continue;
        };
        if *id != LEGACY_TABLE_ID && !LEDGER_SUBSECTIONS.iter().any(|name| id == name) {
            continue;
        }

        let Some((start, end)) = table_block_from(lines, token.line) else {
            errors.push(StructuralError::TableSchema {
                table_id: id.to_string(),
                line_number: token.line,
                detail: "no table rows follow the marker".to_string(),
            });
            continue;
        };

        let header_cells = split_cells(&lines[start]);
        let Some(schema) = LedgerSchema::detect(&header_cells) else {
            errors.push(StructuralError::TableSchema {
                table_id: id.to_string(),
                line_number: start,
                detail: format!("unexpected columns: {header_cells:?}"),
            });
            continue;
        };

        if end - start < 2 || !is_separator_row(&split_cells(&lines[start + 1])) {
            errors.push(StructuralError::TableSchema {
                table_id: id.to_string(),
                line_number: start + 1,
                detail: "missing separator row".to_string(),
            });
        }

        let expected = schema.columns().len();
        for line_number in start + 2..end {
            let found = split_cells(&lines[line_number]).len();
            if found != expected {
                errors.push(StructuralError::TableSchema {
                    table_id: id.to_string(),
                    line_number,
                    detail: format!("expected {expected} cells, found {found}"),
                });
            }
        }
    }

    errors
}

fn is_separator_row(cells: &[String]) -> bool {
    !cells.is_empty()
        && cells
            .iter()
            .all(|cell| !cell.is_empty() && cell.chars().all(|c| c == '-' || c == ':'))
}

/// Markers the template has that the subject lacks, one error each
fn template_diff(lines: &[String], template: &[String]) -> Vec<StructuralError> {
    let subject = marker_inventory(lines);
    let wanted = marker_inventory(template);

    wanted
        .into_iter()
        .filter(|entry| !subject.contains(entry))
        .map(|(kind, id)| StructuralError::MissingFromTemplate { kind, id })
        .collect()
}

fn marker_inventory(lines: &[String]) -> Vec<(String, String)> {
    let mut inventory = Vec::new();
    for token in tokenize(lines) {
        let entry = match token.event {
            MarkerEvent::Section { id } => ("section".to_string(), id.to_string()),
            MarkerEvent::Subsection { id } => ("subsection".to_string(), id.to_string()),
            MarkerEvent::Table { id } => ("table".to_string(), id.to_string()),
            _ => continue,
        };
        if !inventory.contains(&entry) {
            inventory.push(entry);
        }
    }
    inventory
}

fn group_section_lines(lines: &[String]) -> IndexMap<String, Vec<usize>> {
    let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    for token in tokenize(lines) {
        if let MarkerEvent::Section { id } = token.event {
            groups.entry(id.to_string()).or_default().push(token.line);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn duplicate_sections_report_every_line() {
        let lines = doc(&[
            "# Doc",
            "prose",
            "prose",
            "prose",
            "prose",
            "prose",
            "<!-- section:problem_statement -->",
            "a",
            "b",
            "c",
            "<!-- section:problem_statement -->",
        ]);

        let outcome = validate_all(&lines, None);
        assert_eq!(
            outcome.errors,
            vec![StructuralError::DuplicateSection {
                id: "problem_statement".to_string(),
                line_numbers: vec![6, 10],
            }]
        );
    }

    #[test]
    fn orphaned_lock_and_malformed_marker_are_both_collected() {
        let lines = doc(&[
            "<!-- section:goals -->",
            "<!-- section_lock:scope lock=true -->",
            "<!-- section:Bad -->",
        ]);

        let outcome = validate_all(&lines, None);
        assert_eq!(outcome.errors.len(), 2);
        assert!(outcome
            .errors
            .iter()
            .any(|e| matches!(e, StructuralError::MalformedMarker { line_number: 2, .. })));
        assert!(outcome
            .errors
            .iter()
            .any(|e| matches!(e, StructuralError::OrphanedLock { line_number: 1, .. })));
    }

    #[test]
    fn ledger_schema_errors_are_per_row() {
        let lines = doc(&[
            "<!-- table:open_questions -->",
            "| Question ID | Question | Date | Answer | Section Target | Resolution Status |",
            "|---|---|---|---|---|---|",
            "| Q-001 | ok | 2026-01-01 |  | - | Open |",
            "| Q-002 | short row |",
            "| Q-003 | also | short |",
        ]);

        let outcome = validate_all(&lines, None);
        let rows: Vec<usize> = outcome.errors.iter().filter_map(StructuralError::line_number).collect();
        assert_eq!(rows, vec![4, 5]);
    }

    #[test]
    fn wrong_header_is_a_single_schema_error() {
        let lines = doc(&[
            "<!-- table:open_questions -->",
            "| ID | Text |",
            "|---|---|",
            "| Q-001 | x |",
        ]);

        let outcome = validate_all(&lines, None);
        assert_eq!(outcome.errors.len(), 1);
        assert!(matches!(
            outcome.errors[0],
            StructuralError::TableSchema { line_number: 1, .. }
        ));
    }

    #[test]
    fn template_diff_reports_each_missing_marker() {
        let subject = doc(&["<!-- section:goals -->", "body"]);
        let template = doc(&[
            "<!-- section:goals -->",
            "<!-- section:scope -->",
            "<!-- subsection:questions_issues -->",
            "<!-- table:questions_issues -->",
        ]);

        let outcome = validate_all(&subject, Some(&template));
        assert_eq!(outcome.errors.len(), 3);
        assert!(outcome.errors.iter().all(|e| matches!(
            e,
            StructuralError::MissingFromTemplate { .. }
        )));
    }

    #[test]
    fn a_clean_document_revalidates_clean() {
        let lines = doc(&[
            "<!-- meta:document_type value=\"planning_spec\" -->",
            "<!-- section:goals -->",
            "Body text.",
            "<!-- section_lock:goals lock=false -->",
        ]);

        let first = validate_all(&lines, None);
        assert!(first.is_valid());
        let second = validate_all(&first.lines, None);
        assert!(second.is_valid());
        assert_eq!(first.lines, second.lines);
    }
}
