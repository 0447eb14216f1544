//! Derived section state
//!
//! Nothing here is stored: state is computed from the document every time
//! it is needed, so there is no cache to fall out of sync.

use pdw_document::{is_locked, section_span, MarkerId, ParseFailure};
use pdw_ledger::questions_for_section;
use pdw_validate::body_end_boundary;

/// Facts derived for one section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionStatus {
    pub exists: bool,
    pub locked: bool,
    /// The body region still carries a placeholder token. The question
    /// ledger is excluded: an unanswered cell must not keep the section
    /// blank forever.
    pub is_blank: bool,
    /// Targeted questions still waiting on an answer
    pub has_open_questions: bool,
    /// Targeted questions answered but not yet folded into prose
    pub has_answered_questions: bool,
}

/// Classification the runner selects on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// Scheduled but absent from the document
    Missing,
    /// Terminal; no further automated edits
    Locked,
    /// Needs content: draft from context or generate fresh questions
    BlankNoQuestions,
    /// Blocked waiting on external answers
    BlankOpenQuestions,
    /// Ready to integrate
    HasAnsweredQuestions,
    /// Nothing to do; the scan skips it
    Complete,
}

impl SectionStatus {
    /// Collapse the derived facts into the runner's classification
    #[must_use]
    pub fn state(&self) -> TargetState {
        if !self.exists {
            TargetState::Missing
        } else if self.locked {
            TargetState::Locked
        } else if self.has_answered_questions {
            TargetState::HasAnsweredQuestions
        } else if self.is_blank && self.has_open_questions {
            TargetState::BlankOpenQuestions
        } else if self.is_blank {
            TargetState::BlankNoQuestions
        } else if self.has_open_questions {
            // Content exists but answers are still pending; treated as
            // blocked, not complete.
            TargetState::BlankOpenQuestions
        } else {
            TargetState::Complete
        }
    }
}

/// Derive the status of one section
///
/// # Errors
/// Propagates [`ParseFailure`] from a malformed question table.
pub fn section_status(lines: &[String], id: &MarkerId) -> Result<SectionStatus, ParseFailure> {
    let Some(span) = section_span(lines, id) else {
        return Ok(SectionStatus {
            exists: false,
            locked: false,
            is_blank: false,
            has_open_questions: false,
            has_answered_questions: false,
        });
    };

    let boundary = body_end_boundary(lines, &span);
    let is_blank = lines[span.start..boundary]
        .iter()
        .any(|line| pdw_document::contains_placeholder(line));

    let questions = questions_for_section(lines, id)?;
    let has_open_questions = questions.iter().any(|q| q.is_open_unanswered());
    let has_answered_questions = questions.iter().any(|q| q.is_answered());

    Ok(SectionStatus {
        exists: true,
        locked: is_locked(lines, id),
        is_blank,
        has_open_questions,
        has_answered_questions,
    })
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
    fn missing_locked_blank_and_complete_are_distinguished() {
        let lines = doc(&[
            "<!-- section:locked_one -->",
            "Done text.",
            "<!-- section_lock:locked_one lock=true -->",
            "<!-- section:blank_one -->",
            "<!-- PLACEHOLDER -->",
            "<!-- section:done_one -->",
            "Finished prose.",
        ]);

        assert_eq!(section_status(&lines, &id("ghost")).unwrap().state(), TargetState::Missing);
        assert_eq!(
            section_status(&lines, &id("locked_one")).unwrap().state(),
            TargetState::Locked
        );
        assert_eq!(
            section_status(&lines, &id("blank_one")).unwrap().state(),
            TargetState::BlankNoQuestions
        );
        assert_eq!(
            section_status(&lines, &id("done_one")).unwrap().state(),
            TargetState::Complete
        );
    }

    #[test]
    fn question_states_override_blankness_classification() {
        let lines = doc(&[
            "<!-- section:goals -->",
            "<!-- PLACEHOLDER -->",
            "<!-- subsection:questions_issues -->",
            "<!-- table:questions_issues -->",
            "| Question ID | Question | Date | Answer | Status |",
            "|---|---|---|---|---|",
            "| goals-Q1 | Latency? | 2026-01-01 |  | Open |",
        ]);

        let status = section_status(&lines, &id("goals")).unwrap();
        assert!(status.is_blank);
        assert!(status.has_open_questions);
        assert_eq!(status.state(), TargetState::BlankOpenQuestions);
    }

    #[test]
    fn answered_questions_take_precedence() {
        let lines = doc(&[
            "<!-- section:goals -->",
            "<!-- PLACEHOLDER -->",
            "<!-- subsection:questions_issues -->",
            "<!-- table:questions_issues -->",
            "| Question ID | Question | Date | Answer | Status |",
            "|---|---|---|---|---|",
            "| goals-Q1 | Latency? | 2026-01-01 | 100ms | Open |",
            "| goals-Q2 | Regions? | 2026-01-01 |  | Open |",
        ]);

        let status = section_status(&lines, &id("goals")).unwrap();
        assert!(status.has_answered_questions);
        assert_eq!(status.state(), TargetState::HasAnsweredQuestions);
    }

    #[test]
    fn placeholder_inside_the_ledger_does_not_blank_the_section() {
        let lines = doc(&[
            "<!-- section:goals -->",
            "Real body.",
            "<!-- subsection:questions_issues -->",
            "<!-- table:questions_issues -->",
            "| Question ID | Question | Date | Answer | Status |",
            "|---|---|---|---|---|",
            "| goals-Q1 | Latency? | 2026-01-01 | <!-- PLACEHOLDER --> | Resolved |",
        ]);

        let status = section_status(&lines, &id("goals")).unwrap();
        assert!(!status.is_blank);
        assert_eq!(status.state(), TargetState::Complete);
    }
}
