//! Service trait and response vetting

use indexmap::IndexMap;
use pdw_document::{tokenize, MarkerId};
use serde::{Deserialize, Serialize};

/// Ordered map of prior section id to its body text, oldest first
pub type PriorContext = IndexMap<MarkerId, String>;

/// Errors from a completion collaborator
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// Backend reported a failure
    #[error("completion backend error: {0}")]
    Backend(String),

    /// A required field was empty or absent
    #[error("missing required field '{field}' in {operation} response")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    /// Transport failure
    #[error("completion transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response payload could not be decoded
    #[error("invalid completion payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// One question proposed by the collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSuggestion {
    pub question: String,
    /// Section or subsection id the question is about
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// An answered ledger row handed to `integrate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub id: String,
    pub question: String,
    pub answer: String,
}

/// Issue severity reported by a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// One finding from a review gate run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewIssue {
    pub severity: Severity,
    pub section: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A proposed section replacement emitted by a review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSuggestion {
    pub section: String,
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Full review response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub passed: bool,
    #[serde(default)]
    pub issues: Vec<ReviewIssue>,
    #[serde(default)]
    pub patches: Vec<PatchSuggestion>,
    pub summary: String,
}

impl ReviewOutcome {
    /// Count of error-severity issues
    #[must_use]
    pub fn issue_count(&self) -> u32 {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count() as u32
    }

    /// Count of warning-severity issues
    #[must_use]
    pub fn warning_count(&self) -> u32 {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count() as u32
    }
}

/// The four black-box operations of the content collaborator
///
/// Implementations are synchronous; the runner calls them inline and
/// blocks until text comes back.
pub trait CompletionService {
    /// Produce a body for `section_id` from prior-section context
    ///
    /// # Errors
    /// Any [`CompletionError`]; the runner treats a failure as a blocked
    /// step, never as document corruption.
    fn draft(
        &self,
        section_id: &MarkerId,
        current_body: &str,
        prior_context: &PriorContext,
    ) -> Result<String, CompletionError>;

    /// Propose clarifying questions for a section that cannot be drafted
    ///
    /// # Errors
    /// Any [`CompletionError`].
    fn generate_questions(
        &self,
        section_id: &MarkerId,
        current_body: &str,
        prior_context: Option<&PriorContext>,
    ) -> Result<Vec<QuestionSuggestion>, CompletionError>;

    /// Fold answered questions into the section body
    ///
    /// # Errors
    /// Any [`CompletionError`].
    fn integrate(
        &self,
        section_id: &MarkerId,
        current_body: &str,
        answered: &[AnsweredQuestion],
        prior_context: Option<&PriorContext>,
    ) -> Result<String, CompletionError>;

    /// Review a scope of sections against a gate's rules
    ///
    /// # Errors
    /// Any [`CompletionError`].
    fn review(
        &self,
        gate_id: &MarkerId,
        section_contents: &IndexMap<MarkerId, String>,
        rules: &str,
    ) -> Result<ReviewOutcome, CompletionError>;
}

/// Drop any line of `text` that is marker syntax
///
/// The collaborator sees marker lines in its input and sometimes echoes
/// them back; they must never survive into a body or patch.
#[must_use]
pub fn strip_marker_syntax(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            trimmed != "-->" && tokenize(&[trimmed.to_string()]).is_empty()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Vet a plain-text response: must be non-empty once marker syntax is gone
///
/// # Errors
/// [`CompletionError::MissingField`] when nothing usable remains.
pub fn vet_text_response(
    operation: &'static str,
    text: &str,
) -> Result<String, CompletionError> {
    let stripped = strip_marker_syntax(text);
    if stripped.trim().is_empty() {
        return Err(CompletionError::MissingField {
            operation,
            field: "text",
        });
    }
    Ok(stripped)
}

/// Vet question suggestions: every entry needs a question and a target
///
/// Marker syntax is stripped from question text; entries that end up empty
/// are rejected rather than silently dropped.
///
/// # Errors
/// [`CompletionError::MissingField`] naming the first absent field.
pub fn vet_question_suggestions(
    suggestions: Vec<QuestionSuggestion>,
) -> Result<Vec<QuestionSuggestion>, CompletionError> {
    let mut vetted = Vec::with_capacity(suggestions.len());
    for mut suggestion in suggestions {
        suggestion.question = strip_marker_syntax(&suggestion.question).trim().to_string();
        if suggestion.question.is_empty() {
            return Err(CompletionError::MissingField {
                operation: "generate_questions",
                field: "question",
            });
        }
        if suggestion.target.trim().is_empty() {
            return Err(CompletionError::MissingField {
                operation: "generate_questions",
                field: "target",
            });
        }
        vetted.push(suggestion);
    }
    Ok(vetted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn marker_lines_are_stripped_from_responses() {
        let text = "Real prose.\n<!-- section:sneaky -->\nMore prose.\n-->";
        assert_eq!(strip_marker_syntax(text), "Real prose.\nMore prose.");
    }

    #[test]
    fn empty_after_stripping_is_a_missing_field() {
        let err = vet_text_response("draft", "<!-- PLACEHOLDER -->\n").unwrap_err();
        assert!(matches!(
            err,
            CompletionError::MissingField { operation: "draft", field: "text" }
        ));
    }

    #[test]
    fn question_suggestions_require_question_and_target() {
        let good = vec![QuestionSuggestion {
            question: "What latency target?".to_string(),
            target: "goals".to_string(),
            rationale: None,
        }];
        assert_eq!(vet_question_suggestions(good.clone()).unwrap(), good);

        let no_target = vec![QuestionSuggestion {
            question: "ok".to_string(),
            target: "  ".to_string(),
            rationale: None,
        }];
        assert!(vet_question_suggestions(no_target).is_err());
    }

    #[test]
    fn review_outcome_counts_by_severity() {
        let outcome = ReviewOutcome {
            passed: false,
            issues: vec![
                ReviewIssue {
                    severity: Severity::Error,
                    section: "goals".to_string(),
                    description: "contradiction".to_string(),
                    suggestion: None,
                },
                ReviewIssue {
                    severity: Severity::Warning,
                    section: "scope".to_string(),
                    description: "vague".to_string(),
                    suggestion: Some("tighten".to_string()),
                },
            ],
            patches: Vec::new(),
            summary: "one error, one warning".to_string(),
        };
        assert_eq!(outcome.issue_count(), 1);
        assert_eq!(outcome.warning_count(), 1);
    }

    #[test]
    fn review_outcome_deserializes_with_defaults() {
        let outcome: ReviewOutcome =
            serde_json::from_str(r#"{"passed": true, "summary": "clean"}"#).unwrap();
        assert!(outcome.passed);
        assert!(outcome.issues.is_empty());
        assert!(outcome.patches.is_empty());
    }
}
