//! Processing policy registry
//!
//! Maps (document type, section id) to the section's processing policy.
//! The registry is configuration: it is validated elsewhere and consumed
//! here as data. Modes, formats, and application rules are closed enums,
//! so an unknown string fails at the boundary instead of silently
//! no-opping deep inside the runner.

use indexmap::IndexMap;
use pdw_validate::ContentFilter;
use serde::{Deserialize, Serialize};

use crate::scope::ReviewScope;

/// Built-in document type with full policy and milestone coverage
pub const PLANNING_SPEC: &str = "planning_spec";

/// How a section is worked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessMode {
    /// Automated drafting/integration through the completion collaborator
    #[default]
    Agent,
    /// Selected by the runner but left for a human
    Manual,
    /// Never selected
    Skip,
}

/// Output shape the collaborator is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Markdown,
    BulletList,
    Table,
}

/// Patch application rule for a review gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoApply {
    /// Always leave patches for human review
    #[default]
    Never,
    /// Apply every structurally valid patch
    Always,
    /// Apply only when the whole batch passed validation; no partial
    /// application
    IfValidationPasses,
}

/// Processing policy for one section or gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionPolicy {
    pub mode: ProcessMode,
    pub output_format: OutputFormat,
    /// Headings the editor keeps even when the collaborator omits them
    pub preserved_headers: Vec<String>,
    /// Collaborator profile forwarded with requests
    pub llm_profile: Option<String>,
    /// Review scope, for gate targets
    pub scope: ReviewScope,
    pub auto_apply_patches: AutoApply,
    /// Data-driven content filters applied by the sanitizer
    pub filters: Vec<ContentFilter>,
    /// Rules text handed to the review operation, for gate targets
    pub review_rules: String,
}

impl Default for SectionPolicy {
    fn default() -> Self {
        Self {
            mode: ProcessMode::Agent,
            output_format: OutputFormat::Markdown,
            preserved_headers: Vec::new(),
            llm_profile: None,
            scope: ReviewScope::AllPriorSections,
            auto_apply_patches: AutoApply::Never,
            filters: Vec::new(),
            review_rules: String::new(),
        }
    }
}

/// Configuration failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("unknown document type '{0}'")]
    UnknownDocumentType(String),

    #[error("no policy for section '{section}' in document type '{document_type}' and no default")]
    NoApplicablePolicy {
        document_type: String,
        section: String,
    },

    #[error("invalid review scope '{0}'")]
    InvalidScope(String),
}

#[derive(Debug, Clone, Default)]
struct DocTypePolicies {
    default: Option<SectionPolicy>,
    sections: IndexMap<String, SectionPolicy>,
    /// Milestone sections mapped to the version they complete
    milestones: IndexMap<String, String>,
}

/// Registry of per-document-type processing policies
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    types: IndexMap<String, DocTypePolicies>,
}

impl PolicyRegistry {
    /// Empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `planning_spec` document type
    ///
    /// Bullet-shaped list sections carry the bullet dedupe filter; the
    /// version-milestone table is defined only for this built-in type.
    /// New document types start with no milestones of their own.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.set_default(PLANNING_SPEC, SectionPolicy::default());

        for section in ["assumptions", "constraints"] {
            registry.register(
                PLANNING_SPEC,
                section,
                SectionPolicy {
                    output_format: OutputFormat::BulletList,
                    filters: vec![ContentFilter::DedupeBullets],
                    ..SectionPolicy::default()
                },
            );
        }

        for (section, version) in [
            ("problem_statement", "0.1"),
            ("requirements", "0.2"),
            ("solution_design", "0.3"),
            ("rollout_plan", "0.4"),
        ] {
            registry.set_milestone(PLANNING_SPEC, section, version);
        }

        registry
    }

    /// Set the fallback policy of a document type
    pub fn set_default(&mut self, document_type: impl Into<String>, policy: SectionPolicy) {
        self.types.entry(document_type.into()).or_default().default = Some(policy);
    }

    /// Register a section-specific policy
    pub fn register(
        &mut self,
        document_type: impl Into<String>,
        section: impl Into<String>,
        policy: SectionPolicy,
    ) {
        self.types
            .entry(document_type.into())
            .or_default()
            .sections
            .insert(section.into(), policy);
    }

    /// Tie a milestone section to the version it completes
    pub fn set_milestone(
        &mut self,
        document_type: impl Into<String>,
        section: impl Into<String>,
        version: impl Into<String>,
    ) {
        self.types
            .entry(document_type.into())
            .or_default()
            .milestones
            .insert(section.into(), version.into());
    }

    /// Look up the policy for a section, falling back to the type default
    ///
    /// # Errors
    /// [`ConfigurationError::UnknownDocumentType`] or
    /// [`ConfigurationError::NoApplicablePolicy`].
    pub fn policy_for(
        &self,
        document_type: &str,
        section: &str,
    ) -> Result<&SectionPolicy, ConfigurationError> {
        let policies = self
            .types
            .get(document_type)
            .ok_or_else(|| ConfigurationError::UnknownDocumentType(document_type.to_string()))?;

        policies
            .sections
            .get(section)
            .or(policies.default.as_ref())
            .ok_or_else(|| ConfigurationError::NoApplicablePolicy {
                document_type: document_type.to_string(),
                section: section.to_string(),
            })
    }

    /// Version a milestone section completes, if it is one
    #[must_use]
    pub fn milestone_version(&self, document_type: &str, section: &str) -> Option<&str> {
        self.types
            .get(document_type)?
            .milestones
            .get(section)
            .map(String::as_str)
    }
}
