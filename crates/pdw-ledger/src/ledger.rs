//! Ledger operations
//!
//! All operations are pure: they take a line slice and return a new line
//! array, leaving the caller's copy untouched on failure.
//!
//! Id allocation is `max existing numeric suffix for the scope + 1`; ids
//! are never reused, even after resolution. Insertion suppresses
//! duplicates by normalized question text and returns the existing id
//! instead of adding a row. Resolution is idempotent.

use chrono::NaiveDate;
use indexmap::IndexSet;
use pdw_document::{
    find_subsections_within, section_span, tokenize, MarkerEvent, MarkerId, ParseFailure,
    SectionSpan, SubsectionSpan,
};

use crate::question::{normalize_question_text, OpenQuestion, QuestionStatus};
use crate::table::{parse_question_table, render_row, LedgerSchema, LEGACY_TABLE_ID};

/// Subsection ids recognized as a section's question ledger
pub const LEDGER_SUBSECTIONS: [&str; 2] = ["questions_issues", "open_questions"];

/// Scope a question id is allocated in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdScope {
    /// Per-section ids: `<section_id>-Q<n>`
    Section(MarkerId),
    /// Legacy whole-document ids: `Q-<NNN>`
    Legacy,
}

impl IdScope {
    /// Allocate the next id for this scope given the existing rows
    #[must_use]
    pub fn next_id(&self, questions: &[OpenQuestion]) -> String {
        let max = questions
            .iter()
            .filter(|q| self.owns(&q.id))
            .filter_map(OpenQuestion::id_number)
            .max()
            .unwrap_or(0);
        match self {
            Self::Section(section) => format!("{section}-Q{}", max + 1),
            Self::Legacy => format!("Q-{:03}", max + 1),
        }
    }

    fn owns(&self, id: &str) -> bool {
        match self {
            Self::Section(section) => id.starts_with(&format!("{section}-Q")),
            Self::Legacy => id.starts_with("Q-"),
        }
    }
}

/// Result of a single insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Id of the inserted row, or of the existing duplicate
    pub id: String,
    /// False when duplicate suppression matched an existing row
    pub inserted: bool,
    pub lines: Vec<String>,
}

/// Result of a single resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOutcome {
    /// False when the id was already resolved (or unknown)
    pub changed: bool,
    pub lines: Vec<String>,
}

/// Result of a batch insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertBatchOutcome {
    /// One id per input entry, existing ids included
    pub ids: Vec<String>,
    pub newly_inserted: usize,
    pub lines: Vec<String>,
}

/// Result of a batch resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveBatchOutcome {
    pub newly_resolved: usize,
    pub lines: Vec<String>,
}

/// Insert a question into the ledger table bound to `table_id`
///
/// Duplicate suppression compares normalized text within the same scope:
/// for the legacy schema only rows with the same target compete, for the
/// per-section schema every row does.
///
/// # Errors
/// Propagates [`ParseFailure`] when the table is absent or malformed.
pub fn insert_question(
    lines: &[String],
    table_id: &MarkerId,
    scope: &IdScope,
    question_text: &str,
    target: Option<MarkerId>,
    date: NaiveDate,
) -> Result<InsertOutcome, ParseFailure> {
    let table = parse_question_table(lines, table_id)?;

    let normalized = normalize_question_text(question_text);
    let duplicate = table.questions.iter().find(|existing| {
        let same_scope = match table.schema {
            LedgerSchema::PerSection => true,
            LedgerSchema::Legacy => existing.target == target,
        };
        same_scope && normalize_question_text(&existing.question) == normalized
    });
    if let Some(existing) = duplicate {
        tracing::debug!(id = %existing.id, "duplicate question suppressed");
        return Ok(InsertOutcome {
            id: existing.id.clone(),
            inserted: false,
            lines: lines.to_vec(),
        });
    }

    let id = scope.next_id(&table.questions);
    let row_target = match table.schema {
        LedgerSchema::PerSection => None,
        LedgerSchema::Legacy => target,
    };
    let question = OpenQuestion::new(id.clone(), question_text, row_target, date);

    let mut new_lines = lines.to_vec();
    new_lines.insert(table.end, render_row(&question, table.schema));
    tracing::info!(id = %id, table = %table_id, "question recorded");

    Ok(InsertOutcome {
        id,
        inserted: true,
        lines: new_lines,
    })
}

/// Insert a batch of (question text, target) entries under the same rules
///
/// # Errors
/// Propagates [`ParseFailure`]; the input lines are untouched on failure.
pub fn insert_questions(
    lines: &[String],
    table_id: &MarkerId,
    scope: &IdScope,
    entries: &[(String, Option<MarkerId>)],
    date: NaiveDate,
) -> Result<InsertBatchOutcome, ParseFailure> {
    let mut current = lines.to_vec();
    let mut ids = Vec::with_capacity(entries.len());
    let mut newly_inserted = 0;

    for (text, target) in entries {
        let outcome = insert_question(&current, table_id, scope, text, target.clone(), date)?;
        if outcome.inserted {
            newly_inserted += 1;
        }
        ids.push(outcome.id);
        current = outcome.lines;
    }

    Ok(InsertBatchOutcome {
        ids,
        newly_inserted,
        lines: current,
    })
}

/// Flip a question's status to `Resolved`, idempotently
///
/// Resolving an already-resolved id is a no-op, not an error. An id with
/// no row is also a no-op; it is logged, because integration paths only
/// resolve ids they just read back from the same table.
///
/// # Errors
/// Propagates [`ParseFailure`] when the table is absent or malformed.
pub fn resolve_question(
    lines: &[String],
    table_id: &MarkerId,
    question_id: &str,
) -> Result<ResolveOutcome, ParseFailure> {
    let table = parse_question_table(lines, table_id)?;

    let Some((index, question)) = table.question(question_id) else {
        tracing::warn!(id = question_id, table = %table_id, "resolve target not found");
        return Ok(ResolveOutcome {
            changed: false,
            lines: lines.to_vec(),
        });
    };
    if question.status == QuestionStatus::Resolved {
        return Ok(ResolveOutcome {
            changed: false,
            lines: lines.to_vec(),
        });
    }

    let mut resolved = question.clone();
    resolved.status = QuestionStatus::Resolved;

    let mut new_lines = lines.to_vec();
    new_lines[table.row_line(index)] = render_row(&resolved, table.schema);
    tracing::info!(id = question_id, table = %table_id, "question resolved");

    Ok(ResolveOutcome {
        changed: true,
        lines: new_lines,
    })
}

/// Resolve a batch of ids under the same rules
///
/// # Errors
/// Propagates [`ParseFailure`]; the input lines are untouched on failure.
pub fn resolve_questions(
    lines: &[String],
    table_id: &MarkerId,
    question_ids: &[String],
) -> Result<ResolveBatchOutcome, ParseFailure> {
    let mut current = lines.to_vec();
    let mut newly_resolved = 0;

    for id in question_ids {
        let outcome = resolve_question(&current, table_id, id)?;
        if outcome.changed {
            newly_resolved += 1;
        }
        current = outcome.lines;
    }

    Ok(ResolveBatchOutcome {
        newly_resolved,
        lines: current,
    })
}

/// Find the ledger table of one section: the first `table:` marker inside
/// its `questions_issues`/`open_questions` subsection
#[must_use]
pub fn section_ledger_table(
    lines: &[String],
    parent: &SectionSpan,
) -> Option<(MarkerId, SubsectionSpan)> {
    let ledger_sub = find_subsections_within(lines, parent)
        .into_iter()
        .find(|sub| LEDGER_SUBSECTIONS.iter().any(|name| sub.id == *name))?;

    let table_id = tokenize(lines)
        .into_iter()
        .filter(|token| token.line > ledger_sub.start && token.line < ledger_sub.end)
        .find_map(|token| match token.event {
            MarkerEvent::Table { id } => Some(id),
            _ => None,
        })?;

    Some((table_id, ledger_sub))
}

/// Gather every question targeted at `section_id` or one of its
/// subsections, from the section's own ledger and the legacy table
///
/// An absent table is simply no questions; a malformed one is an error.
///
/// # Errors
/// Propagates [`ParseFailure::MalformedQuestionTable`].
pub fn questions_for_section(
    lines: &[String],
    section_id: &MarkerId,
) -> Result<Vec<OpenQuestion>, ParseFailure> {
    let Some(span) = section_span(lines, section_id) else {
        return Ok(Vec::new());
    };

    let mut scoped_ids: IndexSet<MarkerId> = IndexSet::new();
    scoped_ids.insert(section_id.clone());
    for sub in find_subsections_within(lines, &span) {
        scoped_ids.insert(sub.id);
    }

    let mut questions = Vec::new();
    let mut own_table_start = None;

    if let Some((table_id, _)) = section_ledger_table(lines, &span) {
        let table = parse_question_table(lines, &table_id)?;
        own_table_start = Some(table.start);
        for question in table.questions {
            let targeted = match &question.target {
                None => true,
                Some(target) => scoped_ids.contains(target),
            };
            if targeted {
                questions.push(question);
            }
        }
    }

    // The legacy ledger can live anywhere; skip it when it is the same
    // block already collected above.
    let legacy_id = MarkerId::new(LEGACY_TABLE_ID).expect("static id");
    match parse_question_table(lines, &legacy_id) {
        Ok(table) => {
            if own_table_start != Some(table.start) {
                for question in table.questions {
                    if question
                        .target
                        .as_ref()
                        .is_some_and(|target| scoped_ids.contains(target))
                    {
                        questions.push(question);
                    }
                }
            }
        }
        Err(ParseFailure::MissingQuestionTable { .. }) => {}
        Err(other) => return Err(other),
    }

    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn id(s: &str) -> MarkerId {
        s.parse().unwrap()
    }

    fn per_section_ledger() -> Vec<String> {
        vec![
            "<!-- section:goals -->".to_string(),
            "Body.".to_string(),
            "<!-- subsection:questions_issues -->".to_string(),
            "<!-- table:questions_issues -->".to_string(),
            "| Question ID | Question | Date | Answer | Status |".to_string(),
            "|---|---|---|---|---|".to_string(),
            "| goals-Q1 | What latency target? | 2026-02-01 | Under 100ms | Open |".to_string(),
        ]
    }

    #[test]
    fn allocation_is_max_suffix_plus_one_never_reused() {
        let questions = vec![
            OpenQuestion::new("goals-Q1", "a", None, date()),
            OpenQuestion::new("goals-Q7", "b", None, date()),
        ];
        let scope = IdScope::Section(id("goals"));
        assert_eq!(scope.next_id(&questions), "goals-Q8");

        assert_eq!(IdScope::Legacy.next_id(&[]), "Q-001");
        let legacy = vec![OpenQuestion::new("Q-041", "c", None, date())];
        assert_eq!(IdScope::Legacy.next_id(&legacy), "Q-042");
    }

    #[test]
    fn duplicate_insert_returns_existing_id_and_leaves_lines_unchanged() {
        let lines = per_section_ledger();
        let outcome = insert_question(
            &lines,
            &id("questions_issues"),
            &IdScope::Section(id("goals")),
            "  what LATENCY   target? ",
            None,
            date(),
        )
        .unwrap();

        assert_eq!(outcome.id, "goals-Q1");
        assert!(!outcome.inserted);
        assert_eq!(outcome.lines, lines);
    }

    #[test]
    fn fresh_insert_appends_a_row_with_the_next_id() {
        let lines = per_section_ledger();
        let outcome = insert_question(
            &lines,
            &id("questions_issues"),
            &IdScope::Section(id("goals")),
            "Which regions launch first?",
            None,
            date(),
        )
        .unwrap();

        assert_eq!(outcome.id, "goals-Q2");
        assert!(outcome.inserted);
        assert_eq!(outcome.lines.len(), lines.len() + 1);
        assert!(outcome.lines[7].contains("goals-Q2"));
        assert!(outcome.lines[7].contains("| Open |"));
    }

    #[test]
    fn resolve_is_idempotent() {
        let lines = per_section_ledger();
        let first = resolve_question(&lines, &id("questions_issues"), "goals-Q1").unwrap();
        assert!(first.changed);
        assert!(first.lines[6].contains("| Resolved |"));

        let second = resolve_question(&first.lines, &id("questions_issues"), "goals-Q1").unwrap();
        assert!(!second.changed);
        assert_eq!(second.lines, first.lines);
    }

    #[test]
    fn batch_insert_counts_only_new_rows() {
        let lines = per_section_ledger();
        let entries = vec![
            ("What latency target?".to_string(), None),
            ("Which regions launch first?".to_string(), None),
        ];
        let outcome = insert_questions(
            &lines,
            &id("questions_issues"),
            &IdScope::Section(id("goals")),
            &entries,
            date(),
        )
        .unwrap();

        assert_eq!(outcome.ids, vec!["goals-Q1".to_string(), "goals-Q2".to_string()]);
        assert_eq!(outcome.newly_inserted, 1);
    }

    #[test]
    fn questions_for_section_merges_own_and_legacy_targeted_rows() {
        let mut lines = per_section_ledger();
        lines.extend([
            "<!-- section:risks_open_issues -->".to_string(),
            "<!-- subsection:open_questions -->".to_string(),
            "<!-- table:open_questions -->".to_string(),
            "| Question ID | Question | Date | Answer | Section Target | Resolution Status |"
                .to_string(),
            "|---|---|---|---|---|---|".to_string(),
            "| Q-001 | Budget ceiling? | 2026-02-02 |  | goals | Open |".to_string(),
            "| Q-002 | Rollout owner? | 2026-02-03 |  | deployment | Open |".to_string(),
        ]);

        let questions = questions_for_section(&lines, &id("goals")).unwrap();
        let ids: Vec<&str> = questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["goals-Q1", "Q-001"]);

        // The hosting section sees targetless legacy rows only once.
        let risk_questions = questions_for_section(&lines, &id("risks_open_issues")).unwrap();
        assert!(risk_questions.is_empty());
    }
}
