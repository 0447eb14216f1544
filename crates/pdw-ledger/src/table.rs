//! Ledger table schemas and parsing
//!
//! Two canonical shapes exist:
//! - per-section (5 columns): `Question ID | Question | Date | Answer | Status`
//! - legacy whole-document (6 columns): adds `Section Target` and names the
//!   status column `Resolution Status`
//!
//! A ledger operation cannot proceed against a missing or malformed table,
//! so everything here fails fast with a typed [`ParseFailure`] rather than
//! collecting errors.

use pdw_document::{find_table_block, MarkerId, ParseFailure};

use crate::question::{OpenQuestion, QuestionStatus};

/// Canonical per-section column set
pub const PER_SECTION_COLUMNS: [&str; 5] = ["Question ID", "Question", "Date", "Answer", "Status"];

/// Canonical legacy column set
pub const LEGACY_COLUMNS: [&str; 6] = [
    "Question ID",
    "Question",
    "Date",
    "Answer",
    "Section Target",
    "Resolution Status",
];

/// Table id of the legacy whole-document ledger
pub const LEGACY_TABLE_ID: &str = "open_questions";

/// Which canonical shape a ledger table follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerSchema {
    PerSection,
    Legacy,
}

impl LedgerSchema {
    /// Canonical column titles
    #[inline]
    #[must_use]
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::PerSection => &PER_SECTION_COLUMNS,
            Self::Legacy => &LEGACY_COLUMNS,
        }
    }

    /// Detect the schema from header cells; exact titles required
    #[must_use]
    pub fn detect(header_cells: &[String]) -> Option<Self> {
        if cells_match(header_cells, &PER_SECTION_COLUMNS) {
            Some(Self::PerSection)
        } else if cells_match(header_cells, &LEGACY_COLUMNS) {
            Some(Self::Legacy)
        } else {
            None
        }
    }
}

/// Canonical header row for a schema
#[must_use]
pub fn canonical_header(schema: LedgerSchema) -> String {
    format!("| {} |", schema.columns().join(" | "))
}

/// Canonical separator row for a schema
#[must_use]
pub fn canonical_separator(schema: LedgerSchema) -> String {
    let dashes: Vec<&str> = schema.columns().iter().map(|_| "---").collect();
    format!("|{}|", dashes.join("|"))
}

/// Split a pipe row into trimmed cells
#[must_use]
pub fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

fn cells_match(cells: &[String], columns: &[&str]) -> bool {
    cells.len() == columns.len() && cells.iter().zip(columns).all(|(cell, title)| cell == title)
}

fn is_separator_row(cells: &[String]) -> bool {
    !cells.is_empty()
        && cells
            .iter()
            .all(|cell| !cell.is_empty() && cell.chars().all(|c| c == '-' || c == ':'))
}

/// A parsed ledger table and where it lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionTable {
    pub table_id: MarkerId,
    pub schema: LedgerSchema,
    /// First line of the pipe block (the header row)
    pub start: usize,
    /// One past the last pipe row
    pub end: usize,
    pub questions: Vec<OpenQuestion>,
}

impl QuestionTable {
    /// Line number of the data row at `index`
    #[inline]
    #[must_use]
    pub fn row_line(&self, index: usize) -> usize {
        self.start + 2 + index
    }

    /// Find a question by id
    #[must_use]
    pub fn question(&self, id: &str) -> Option<(usize, &OpenQuestion)> {
        self.questions.iter().enumerate().find(|(_, q)| q.id == id)
    }
}

/// Parse the ledger table bound to `table_id`
///
/// # Errors
/// - [`ParseFailure::MissingQuestionTable`] when the marker or its pipe
///   block is absent
/// - [`ParseFailure::MalformedQuestionTable`] for a header outside both
///   canonical schemas, a missing separator, a row with the wrong cell
///   count, an unknown status, or an invalid target id
pub fn parse_question_table(
    lines: &[String],
    table_id: &MarkerId,
) -> Result<QuestionTable, ParseFailure> {
    let (start, end) = find_table_block(lines, table_id).ok_or_else(|| {
        ParseFailure::MissingQuestionTable {
            table_id: table_id.to_string(),
        }
    })?;

    let header_cells = split_cells(&lines[start]);
    let schema = LedgerSchema::detect(&header_cells).ok_or_else(|| {
        ParseFailure::malformed_table(
            table_id.to_string(),
            start,
            format!("unexpected columns: {header_cells:?}"),
        )
    })?;

    if end - start < 2 || !is_separator_row(&split_cells(&lines[start + 1])) {
        return Err(ParseFailure::malformed_table(
            table_id.to_string(),
            start + 1,
            "missing separator row",
        ));
    }

    let mut questions = Vec::new();
    for line_number in start + 2..end {
        let cells = split_cells(&lines[line_number]);
        if cells.len() != schema.columns().len() {
            return Err(ParseFailure::malformed_table(
                table_id.to_string(),
                line_number,
                format!("expected {} cells, found {}", schema.columns().len(), cells.len()),
            ));
        }
        questions.push(parse_row(table_id, schema, line_number, &cells)?);
    }

    Ok(QuestionTable {
        table_id: table_id.clone(),
        schema,
        start,
        end,
        questions,
    })
}

fn parse_row(
    table_id: &MarkerId,
    schema: LedgerSchema,
    line_number: usize,
    cells: &[String],
) -> Result<OpenQuestion, ParseFailure> {
    let (target, status_cell) = match schema {
        LedgerSchema::PerSection => (None, &cells[4]),
        LedgerSchema::Legacy => {
            let raw = cells[4].trim();
            let target = if raw.is_empty() || raw == "-" {
                None
            } else {
                Some(raw.parse::<MarkerId>().map_err(|e| {
                    ParseFailure::malformed_table(table_id.to_string(), line_number, e.to_string())
                })?)
            };
            (target, &cells[5])
        }
    };

    let status = QuestionStatus::from_cell(status_cell).ok_or_else(|| {
        ParseFailure::malformed_table(
            table_id.to_string(),
            line_number,
            format!("unknown status '{status_cell}'"),
        )
    })?;

    Ok(OpenQuestion {
        id: cells[0].clone(),
        question: cells[1].clone(),
        date: cells[2].clone(),
        answer: cells[3].clone(),
        target,
        status,
    })
}

/// Render a question as a table row in the given schema
#[must_use]
pub fn render_row(question: &OpenQuestion, schema: LedgerSchema) -> String {
    let target = question
        .target
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    let cells: Vec<String> = match schema {
        LedgerSchema::PerSection => vec![
            question.id.clone(),
            question.question.clone(),
            question.date.clone(),
            question.answer.clone(),
            question.status.to_string(),
        ],
        LedgerSchema::Legacy => vec![
            question.id.clone(),
            question.question.clone(),
            question.date.clone(),
            question.answer.clone(),
            target,
            question.status.to_string(),
        ],
    };
    format!("| {} |", cells.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    fn id(s: &str) -> MarkerId {
        s.parse().unwrap()
    }

    #[test]
    fn parses_a_per_section_table() {
        let lines = doc(&[
            "<!-- table:questions_issues -->",
            "| Question ID | Question | Date | Answer | Status |",
            "|---|---|---|---|---|",
            "| goals-Q1 | What latency target? | 2026-03-01 | Under 100ms | Open |",
            "| goals-Q2 | Which regions? | 2026-03-02 |  | Deferred |",
        ]);

        let table = parse_question_table(&lines, &id("questions_issues")).unwrap();
        assert_eq!(table.schema, LedgerSchema::PerSection);
        assert_eq!(table.questions.len(), 2);
        assert!(table.questions[0].is_answered());
        assert!(table.questions[1].is_open_unanswered());
        assert_eq!(table.row_line(1), 4);
    }

    #[test]
    fn parses_the_legacy_table_with_targets() {
        let lines = doc(&[
            "<!-- table:open_questions -->",
            "| Question ID | Question | Date | Answer | Section Target | Resolution Status |",
            "|---|---|---|---|---|---|",
            "| Q-001 | Who owns rollout? | 2026-02-10 | Ops team | deployment | Resolved |",
            "| Q-002 | Budget ceiling? | 2026-02-11 |  | - | Open |",
        ]);

        let table = parse_question_table(&lines, &id("open_questions")).unwrap();
        assert_eq!(table.schema, LedgerSchema::Legacy);
        assert_eq!(table.questions[0].target, Some(id("deployment")));
        assert_eq!(table.questions[1].target, None);
    }

    #[test]
    fn missing_table_is_a_typed_failure() {
        let lines = doc(&["no tables here"]);
        assert_eq!(
            parse_question_table(&lines, &id("open_questions")).unwrap_err(),
            ParseFailure::MissingQuestionTable {
                table_id: "open_questions".to_string()
            }
        );
    }

    #[test]
    fn wrong_cell_count_and_unknown_status_are_malformed() {
        let short_row = doc(&[
            "<!-- table:questions_issues -->",
            "| Question ID | Question | Date | Answer | Status |",
            "|---|---|---|---|---|",
            "| goals-Q1 | truncated |",
        ]);
        assert!(matches!(
            parse_question_table(&short_row, &id("questions_issues")).unwrap_err(),
            ParseFailure::MalformedQuestionTable { line_number: 3, .. }
        ));

        let bad_status = doc(&[
            "<!-- table:questions_issues -->",
            "| Question ID | Question | Date | Answer | Status |",
            "|---|---|---|---|---|",
            "| goals-Q1 | q | 2026-01-01 |  | Pending |",
        ]);
        assert!(matches!(
            parse_question_table(&bad_status, &id("questions_issues")).unwrap_err(),
            ParseFailure::MalformedQuestionTable { line_number: 3, .. }
        ));
    }

    #[test]
    fn render_round_trips_through_parse() {
        let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let question = OpenQuestion::new("goals-Q3", "What about caching?", None, date);
        let lines = vec![
            "<!-- table:questions_issues -->".to_string(),
            canonical_header(LedgerSchema::PerSection),
            canonical_separator(LedgerSchema::PerSection),
            render_row(&question, LedgerSchema::PerSection),
        ];

        let table = parse_question_table(&lines, &id("questions_issues")).unwrap();
        assert_eq!(table.questions, vec![question]);
    }
}
