//! Testing utilities for the PDW workspace
//!
//! Shared fixtures and a scripted, deterministic completion collaborator.

#![allow(missing_docs)]

use std::cell::RefCell;
use std::collections::VecDeque;

use indexmap::IndexMap;
use pdw_completion::{
    AnsweredQuestion, CompletionError, CompletionService, PriorContext, QuestionSuggestion,
    ReviewOutcome,
};
use pdw_document::MarkerId;

/// Build an owned line array from string literals
pub fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

/// A small but complete planning document: metadata, workflow order with a
/// gate, blank sections, a per-section ledger, and the legacy ledger with
/// its lock
pub fn sample_plan_document() -> Vec<String> {
    lines(&[
        "<!-- meta:document_type value=\"planning_spec\" -->",
        "# Payment Gateway Plan",
        "",
        "<!-- workflow:order",
        "problem_statement",
        "assumptions",
        "review_gate:design_review",
        "solution_design",
        "-->",
        "",
        "<!-- section:problem_statement -->",
        "## Problem Statement",
        "",
        "<!-- PLACEHOLDER -->",
        "",
        "<!-- section:assumptions -->",
        "## Assumptions",
        "",
        "<!-- PLACEHOLDER -->",
        "",
        "<!-- subsection:questions_issues -->",
        "<!-- table:questions_issues -->",
        "| Question ID | Question | Date | Answer | Status |",
        "|---|---|---|---|---|",
        "",
        "<!-- section:solution_design -->",
        "## Solution Design",
        "",
        "<!-- PLACEHOLDER -->",
        "",
        "<!-- section:risks_open_issues -->",
        "## Risks & Open Issues",
        "",
        "<!-- subsection:open_questions -->",
        "<!-- table:open_questions -->",
        "| Question ID | Question | Date | Answer | Section Target | Resolution Status |",
        "|---|---|---|---|---|---|",
        "",
        "<!-- section_lock:risks_open_issues lock=false -->",
    ])
}

/// Deterministic completion collaborator for tests
///
/// Scripted responses are popped front-first; when a queue is empty the
/// service falls back to a deterministic default, so most tests only
/// script the responses they actually care about.
#[derive(Default)]
pub struct ScriptedCompletion {
    drafts: RefCell<VecDeque<String>>,
    questions: RefCell<VecDeque<Vec<QuestionSuggestion>>>,
    integrations: RefCell<VecDeque<String>>,
    reviews: RefCell<VecDeque<ReviewOutcome>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_draft(&self, text: impl Into<String>) {
        self.drafts.borrow_mut().push_back(text.into());
    }

    pub fn push_questions(&self, questions: Vec<QuestionSuggestion>) {
        self.questions.borrow_mut().push_back(questions);
    }

    pub fn push_integration(&self, text: impl Into<String>) {
        self.integrations.borrow_mut().push_back(text.into());
    }

    pub fn push_review(&self, outcome: ReviewOutcome) {
        self.reviews.borrow_mut().push_back(outcome);
    }

    /// Operations invoked so far, as `operation:target` strings
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn log(&self, operation: &str, target: &MarkerId) {
        self.calls.borrow_mut().push(format!("{operation}:{target}"));
    }
}

impl CompletionService for ScriptedCompletion {
    fn draft(
        &self,
        section_id: &MarkerId,
        _current_body: &str,
        prior_context: &PriorContext,
    ) -> Result<String, CompletionError> {
        self.log("draft", section_id);
        Ok(self.drafts.borrow_mut().pop_front().unwrap_or_else(|| {
            format!(
                "Drafted body for {section_id} from {} prior sections.",
                prior_context.len()
            )
        }))
    }

    fn generate_questions(
        &self,
        section_id: &MarkerId,
        _current_body: &str,
        _prior_context: Option<&PriorContext>,
    ) -> Result<Vec<QuestionSuggestion>, CompletionError> {
        self.log("questions", section_id);
        Ok(self.questions.borrow_mut().pop_front().unwrap_or_else(|| {
            vec![QuestionSuggestion {
                question: format!("What must {section_id} cover?"),
                target: section_id.to_string(),
                rationale: None,
            }]
        }))
    }

    fn integrate(
        &self,
        section_id: &MarkerId,
        _current_body: &str,
        answered: &[AnsweredQuestion],
        _prior_context: Option<&PriorContext>,
    ) -> Result<String, CompletionError> {
        self.log("integrate", section_id);
        Ok(self.integrations.borrow_mut().pop_front().unwrap_or_else(|| {
            answered
                .iter()
                .map(|q| format!("{} {}", q.question.trim_end_matches('?'), q.answer))
                .collect::<Vec<_>>()
                .join("\n\n")
        }))
    }

    fn review(
        &self,
        gate_id: &MarkerId,
        _section_contents: &IndexMap<MarkerId, String>,
        _rules: &str,
    ) -> Result<ReviewOutcome, CompletionError> {
        self.log("review", gate_id);
        Ok(self.reviews.borrow_mut().pop_front().unwrap_or_else(|| ReviewOutcome {
            passed: true,
            issues: Vec::new(),
            patches: Vec::new(),
            summary: "no findings".to_string(),
        }))
    }
}
