//! Workflow error type

use pdw_completion::CompletionError;
use pdw_document::ParseFailure;
use pdw_validate::EditError;

use crate::policy::ConfigurationError;

/// Anything that can stop a workflow step
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Document structure the runner depends on failed to parse
    #[error(transparent)]
    Parse(#[from] ParseFailure),

    /// The completion collaborator failed
    #[error(transparent)]
    Completion(#[from] CompletionError),

    /// An edit was rejected by the structural boundary
    #[error(transparent)]
    Edit(#[from] EditError),

    /// No applicable policy
    #[error(transparent)]
    Config(#[from] ConfigurationError),

    /// A scheduled section has no marker in the document
    #[error("workflow target '{0}' has no section marker in the document")]
    MissingTarget(String),
}
