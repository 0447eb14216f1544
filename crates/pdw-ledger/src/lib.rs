//! Question ledgers
//!
//! Every section can carry a 5-column Q&A table in its `questions_issues`
//! (or `open_questions`) subsection, and the document as a whole can carry
//! the legacy 6-column ledger with an explicit target column. This crate
//! owns:
//! - the row model and both canonical schemas
//! - table parsing (absent/malformed tables are typed failures)
//! - id allocation, duplicate-suppressed insertion, idempotent resolution
//!
//! Question ids are never reused, even after resolution.

#![allow(missing_docs)]

pub mod ledger;
pub mod question;
pub mod table;

pub use ledger::{
    insert_question, insert_questions, questions_for_section, resolve_question, resolve_questions,
    section_ledger_table, IdScope, InsertBatchOutcome, InsertOutcome, ResolveBatchOutcome,
    ResolveOutcome, LEDGER_SUBSECTIONS,
};
pub use question::{normalize_question_text, OpenQuestion, QuestionStatus};
pub use table::{
    canonical_header, canonical_separator, parse_question_table, render_row, split_cells,
    LedgerSchema, QuestionTable, LEGACY_COLUMNS, LEGACY_TABLE_ID, PER_SECTION_COLUMNS,
};
