//! Completion collaborator interface
//!
//! The content-generation service is an external collaborator: the core
//! hands it a region and context, gets text or structured suggestions
//! back, and treats everything in between as a black box. This crate owns
//! the four-operation service trait, the response DTOs, the vetting
//! applied to every response (required fields present, echoed marker
//! syntax stripped), and a blocking HTTP backend.
//!
//! Calls are blocking by design; cancellation and timeouts are the
//! caller's concern, imposed at the transport.

#![allow(missing_docs)]

pub mod http;
pub mod service;

pub use http::HttpCompletionService;
pub use service::{
    strip_marker_syntax, vet_question_suggestions, vet_text_response, AnsweredQuestion,
    CompletionError, CompletionService, PatchSuggestion, PriorContext, QuestionSuggestion,
    ReviewIssue, ReviewOutcome, Severity,
};
