//! Structural validation and safe editing
//!
//! The trusted boundary of the workspace. Three responsibilities:
//! - batch validation collecting every structural violation ([`validator`])
//! - narrowly-scoped auto-repair of forgotten ledger boilerplate ([`repair`])
//! - the single sanctioned mutation primitive, [`editor::replace_body`],
//!   which validates before and after and can therefore never return a
//!   corrupt document
//!
//! Everything else in the workspace treats "replace this region's prose"
//! as atomic because this crate makes it so.

#![allow(missing_docs)]

pub mod editor;
pub mod repair;
pub mod report;
pub mod validator;

pub use editor::{body_end_boundary, replace_body, sanitize_body, ContentFilter, EditError};
pub use repair::{repair_missing_ledger, Repair, ANCHOR_SECTION, ANCHOR_SUBSECTION};
pub use report::render_report;
pub use validator::{ensure_valid, validate_all, ValidationOutcome};
