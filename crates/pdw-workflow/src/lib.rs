//! Workflow engine
//!
//! Walks a plan document's workflow order, classifies each target, and
//! performs exactly one mutation per step:
//! - integrate answered questions into their section
//! - draft a blank section from prior-section context
//! - record fresh clarifying questions
//! - run a review gate over its resolved scope
//!
//! A repeated-invocation driver loops single steps until a step blocks,
//! produces no change, or every target is complete. Policy (who drafts
//! what, which filters apply, how gate patches are applied) comes from an
//! externally validated registry consumed as data.

#![allow(missing_docs)]

pub mod context;
pub mod error;
pub mod gate;
pub mod policy;
pub mod runner;
pub mod scope;
pub mod state;

pub use context::{prior_context, section_body_text};
pub use error::WorkflowError;
pub use gate::persist_gate_result;
pub use policy::{
    AutoApply, ConfigurationError, OutputFormat, PolicyRegistry, ProcessMode, SectionPolicy,
    PLANNING_SPEC,
};
pub use runner::{StepOutcome, WorkflowRunner};
pub use scope::{apply_patches, resolve_scope, vet_patches, PatchVerdict, ReviewScope};
pub use state::{section_status, SectionStatus, TargetState};
