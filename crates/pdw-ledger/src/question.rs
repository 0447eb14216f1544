//! Question row model

use std::fmt::{self, Display, Formatter};

use chrono::NaiveDate;
use pdw_document::MarkerId;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a ledger question
///
/// A question is created `Open` with an empty answer, gains an answer while
/// still `Open` (or `Deferred`), and becomes `Resolved` exactly once, when
/// an editor folds the answer into prose. Rows are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionStatus {
    Open,
    Resolved,
    Deferred,
}

impl QuestionStatus {
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Resolved => "Resolved",
            Self::Deferred => "Deferred",
        }
    }

    /// Parse a status cell, tolerating surrounding whitespace
    #[must_use]
    pub fn from_cell(cell: &str) -> Option<Self> {
        match cell.trim() {
            "Open" => Some(Self::Open),
            "Resolved" => Some(Self::Resolved),
            "Deferred" => Some(Self::Deferred),
            _ => None,
        }
    }
}

impl Display for QuestionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenQuestion {
    /// `<section_id>-Q<n>` for per-section ledgers, `Q-<NNN>` for the
    /// legacy whole-document ledger
    pub id: String,
    pub question: String,
    /// Stored as written; new rows render ISO `YYYY-MM-DD`
    pub date: String,
    pub answer: String,
    /// Section or subsection the question is about; `None` when the row
    /// lives in a per-section ledger and the target is implicit
    pub target: Option<MarkerId>,
    pub status: QuestionStatus,
}

impl OpenQuestion {
    /// Create a fresh question: status `Open`, empty answer
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        target: Option<MarkerId>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            date: date.format("%Y-%m-%d").to_string(),
            answer: String::new(),
            target,
            status: QuestionStatus::Open,
        }
    }

    /// Answered but not yet folded into prose
    #[inline]
    #[must_use]
    pub fn is_answered(&self) -> bool {
        !self.answer.trim().is_empty() && self.status != QuestionStatus::Resolved
    }

    /// Still waiting on an external answer
    #[inline]
    #[must_use]
    pub fn is_open_unanswered(&self) -> bool {
        self.answer.trim().is_empty() && self.status != QuestionStatus::Resolved
    }

    /// Numeric suffix of the id, when it has one
    #[must_use]
    pub fn id_number(&self) -> Option<u32> {
        self.id.rsplit(['Q', '-']).next().and_then(|n| n.parse().ok())
    }
}

/// Normalize question text for duplicate suppression: collapse internal
/// whitespace and case-fold
#[must_use]
pub fn normalize_question_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lifecycle_predicates() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut q = OpenQuestion::new("goals-Q1", "What latency target?", None, date);
        assert!(q.is_open_unanswered());
        assert!(!q.is_answered());

        q.answer = "Under 100ms".to_string();
        assert!(q.is_answered());
        assert!(!q.is_open_unanswered());

        q.status = QuestionStatus::Resolved;
        assert!(!q.is_answered());
        assert!(!q.is_open_unanswered());
    }

    #[test]
    fn id_numbers_parse_for_both_schemes() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(OpenQuestion::new("goals-Q12", "q", None, date).id_number(), Some(12));
        assert_eq!(OpenQuestion::new("Q-007", "q", None, date).id_number(), Some(7));
        assert_eq!(OpenQuestion::new("odd", "q", None, date).id_number(), None);
    }

    #[test]
    fn normalization_collapses_whitespace_and_case() {
        assert_eq!(
            normalize_question_text("  What   latency\ttarget? "),
            normalize_question_text("what latency target?")
        );
    }
}
