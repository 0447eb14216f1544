//! Error types for the plan document model
//!
//! Two families, with different propagation rules:
//! - [`StructuralError`]: collected exhaustively by the validator; any
//!   single variant can also be raised by fail-fast call paths.
//! - [`ParseFailure`]: raised immediately, because downstream logic cannot
//!   proceed without the structure that failed to parse.

/// A marker id that does not satisfy `[a-z0-9_]+`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid marker id: '{0}'")]
pub struct MarkerIdError(pub String);

/// Structural violations detected in a plan document
///
/// Each variant is independent: the validator collects all of them in one
/// pass rather than stopping at the first.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// Same section id opened more than once
    #[error("duplicate section id '{id}' at lines {line_numbers:?}")]
    DuplicateSection {
        id: String,
        line_numbers: Vec<usize>,
    },

    /// Line looks like a marker but does not satisfy the grammar
    #[error("malformed marker at line {line_number}: {text}")]
    MalformedMarker { line_number: usize, text: String },

    /// Region bounds are out of range or inverted
    #[error("invalid span for '{region}': {start}..{end}")]
    InvalidSpan {
        region: String,
        start: usize,
        end: usize,
    },

    /// Fixed-schema table deviates from its canonical shape
    #[error("table '{table_id}' schema violation at line {line_number}: {detail}")]
    TableSchema {
        table_id: String,
        line_number: usize,
        detail: String,
    },

    /// Lock marker references a section id with no matching section marker
    #[error("lock marker references unknown section '{id}' at line {line_number}")]
    OrphanedLock { id: String, line_number: usize },

    /// Marker present in the template document but absent from the subject
    #[error("{kind} '{id}' required by template is missing")]
    MissingFromTemplate { kind: String, id: String },
}

impl StructuralError {
    /// Line number this error points at, when it has a single one
    #[inline]
    #[must_use]
    pub fn line_number(&self) -> Option<usize> {
        match self {
            Self::MalformedMarker { line_number, .. }
            | Self::TableSchema { line_number, .. }
            | Self::OrphanedLock { line_number, .. } => Some(*line_number),
            Self::DuplicateSection { .. }
            | Self::InvalidSpan { .. }
            | Self::MissingFromTemplate { .. } => None,
        }
    }
}

/// Hard parse failures
///
/// Unlike [`StructuralError`], these are not collected: the caller cannot
/// do anything useful with a document whose workflow order or question
/// table is missing, so the failure surfaces at once.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    /// No `workflow:order` block in the document
    #[error("workflow order block not found")]
    MissingWorkflowOrder,

    /// Block opened but never closed with `-->`
    #[error("workflow order block starting at line {start_line} is unterminated")]
    UnterminatedWorkflowOrder { start_line: usize },

    /// A target id appears twice inside the order block
    #[error("duplicate workflow target '{target}' at line {line_number}")]
    DuplicateOrderTarget { target: String, line_number: usize },

    /// An order entry that is neither a section id nor a gate pseudo-id
    #[error("invalid workflow target '{text}' at line {line_number}")]
    InvalidOrderTarget { text: String, line_number: usize },

    /// Expected question table marker is absent
    #[error("question table '{table_id}' not found")]
    MissingQuestionTable { table_id: String },

    /// Question table exists but cannot be understood
    #[error("question table '{table_id}' malformed at line {line_number}: {detail}")]
    MalformedQuestionTable {
        table_id: String,
        line_number: usize,
        detail: String,
    },
}

impl ParseFailure {
    /// Create a malformed-table failure
    pub fn malformed_table(
        table_id: impl Into<String>,
        line_number: usize,
        detail: impl Into<String>,
    ) -> Self {
        Self::MalformedQuestionTable {
            table_id: table_id.into(),
            line_number,
            detail: detail.into(),
        }
    }
}
