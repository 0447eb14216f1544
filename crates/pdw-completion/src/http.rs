//! Blocking HTTP backend
//!
//! Talks JSON to a completion server exposing one endpoint per operation
//! (`/draft`, `/questions`, `/integrate`, `/review`). The backend is
//! switchable behind [`CompletionService`]; nothing else in the workspace
//! knows HTTP exists.

use indexmap::IndexMap;
use pdw_document::MarkerId;
use serde::{Deserialize, Serialize};

use crate::service::{
    vet_question_suggestions, vet_text_response, AnsweredQuestion, CompletionError,
    CompletionService, PriorContext, QuestionSuggestion, ReviewOutcome,
};

/// Completion backend speaking JSON over HTTP
#[derive(Debug, Clone)]
pub struct HttpCompletionService {
    client: reqwest::blocking::Client,
    base_url: String,
    /// Profile identifier forwarded with every request, chosen by policy
    profile: Option<String>,
}

#[derive(Serialize)]
struct TextRequest<'a> {
    section_id: &'a str,
    current_body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    prior_context: Option<&'a IndexMap<MarkerId, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    answered: Option<&'a [AnsweredQuestion]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<&'a str>,
}

#[derive(Serialize)]
struct ReviewRequest<'a> {
    gate_id: &'a str,
    sections: &'a IndexMap<MarkerId, String>,
    rules: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<&'a str>,
}

#[derive(Deserialize)]
struct TextResponse {
    text: String,
}

#[derive(Deserialize)]
struct QuestionsResponse {
    questions: Vec<QuestionSuggestion>,
}

impl HttpCompletionService {
    /// Create a backend against `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.into(),
            profile: None,
        }
    }

    /// Forward a profile identifier with every request
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn post_text(&self, path: &str, request: &TextRequest<'_>) -> Result<String, CompletionError> {
        let response: TextResponse = self
            .client
            .post(self.endpoint(path))
            .json(request)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(response.text)
    }
}

impl CompletionService for HttpCompletionService {
    fn draft(
        &self,
        section_id: &MarkerId,
        current_body: &str,
        prior_context: &PriorContext,
    ) -> Result<String, CompletionError> {
        tracing::debug!(section = %section_id, "requesting draft");
        let text = self.post_text(
            "draft",
            &TextRequest {
                section_id: section_id.as_str(),
                current_body,
                prior_context: Some(prior_context),
                answered: None,
                profile: self.profile.as_deref(),
            },
        )?;
        vet_text_response("draft", &text)
    }

    fn generate_questions(
        &self,
        section_id: &MarkerId,
        current_body: &str,
        prior_context: Option<&PriorContext>,
    ) -> Result<Vec<QuestionSuggestion>, CompletionError> {
        tracing::debug!(section = %section_id, "requesting questions");
        let response: QuestionsResponse = self
            .client
            .post(self.endpoint("questions"))
            .json(&TextRequest {
                section_id: section_id.as_str(),
                current_body,
                prior_context,
                answered: None,
                profile: self.profile.as_deref(),
            })
            .send()?
            .error_for_status()?
            .json()?;
        vet_question_suggestions(response.questions)
    }

    fn integrate(
        &self,
        section_id: &MarkerId,
        current_body: &str,
        answered: &[AnsweredQuestion],
        prior_context: Option<&PriorContext>,
    ) -> Result<String, CompletionError> {
        tracing::debug!(section = %section_id, answered = answered.len(), "requesting integration");
        let text = self.post_text(
            "integrate",
            &TextRequest {
                section_id: section_id.as_str(),
                current_body,
                prior_context,
                answered: Some(answered),
                profile: self.profile.as_deref(),
            },
        )?;
        vet_text_response("integrate", &text)
    }

    fn review(
        &self,
        gate_id: &MarkerId,
        section_contents: &IndexMap<MarkerId, String>,
        rules: &str,
    ) -> Result<ReviewOutcome, CompletionError> {
        tracing::debug!(gate = %gate_id, sections = section_contents.len(), "requesting review");
        let outcome: ReviewOutcome = self
            .client
            .post(self.endpoint("review"))
            .json(&ReviewRequest {
                gate_id: gate_id.as_str(),
                sections: section_contents,
                rules,
                profile: self.profile.as_deref(),
            })
            .send()?
            .error_for_status()?
            .json()?;

        if outcome.summary.trim().is_empty() {
            return Err(CompletionError::MissingField {
                operation: "review",
                field: "summary",
            });
        }
        Ok(outcome)
    }
}
