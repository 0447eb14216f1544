//! Plan document model
//!
//! The foundation of the PDW workspace:
//! - Line-oriented document model ([`PlanDocument`])
//! - Marker grammar tokenizer (single pass, typed events)
//! - Section/subsection span computation and table discovery
//! - Workflow-order, lock, metadata, and gate-result extraction
//!
//! All operations are line-granular and pure: callers pass a line slice in
//! and receive owned results out. Nothing in this crate holds shared
//! mutable state, so every function is safe to call from a single-threaded
//! driver without synchronization.

#![allow(missing_docs)]

pub mod document;
pub mod error;
pub mod gate;
pub mod lock;
pub mod marker;
pub mod meta;
pub mod order;
pub mod span;

pub use document::PlanDocument;
pub use error::{MarkerIdError, ParseFailure, StructuralError};
pub use gate::{gate_results, render_gate_result_marker, GateResult, GateStatus};
pub use lock::{is_locked, lock_states, render_lock_marker, LockState};
pub use marker::{
    contains_marker_syntax, contains_placeholder, tokenize, MarkerEvent, MarkerId, MarkerToken,
    PLACEHOLDER,
};
pub use meta::{document_meta, render_meta_marker, MetaEntry, MetaKey};
pub use order::{parse_workflow_order, Target, WorkflowOrder};
pub use span::{
    find_sections, find_subsections_within, find_table_block, section_span, table_block_from,
    SectionSpan, SubsectionSpan,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
