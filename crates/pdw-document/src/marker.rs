//! Marker grammar tokenizer
//!
//! A single pass over the document lines yields a typed stream of
//! [`MarkerToken`]s. Everything downstream (spans, validation, workflow
//! order) is built from this stream, so malformedness is decided exactly
//! once, here, rather than per-check.
//!
//! Grammar (case-sensitive keywords, ids are `[a-z0-9_]+`):
//! - `<!-- section:ID -->`
//! - `<!-- subsection:ID -->`
//! - `<!-- table:ID -->`
//! - `<!-- section_lock:ID lock=(true|false) -->`
//! - `<!-- workflow:order` … `-->` (multi-line block)
//! - `<!-- meta:KEY value="..." -->` / `<!-- meta:version version="..." -->`
//! - `<!-- review_gate_result:GATE status=(passed|failed) issues=N warnings=N -->`
//! - `<!-- PLACEHOLDER -->`

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MarkerIdError;
use crate::gate::GateStatus;
use crate::meta::MetaKey;

/// Sentinel marking body content as not yet produced
pub const PLACEHOLDER: &str = "<!-- PLACEHOLDER -->";

static SECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<!--\s*section:([a-z0-9_]+)\s*-->$").unwrap());
static SUBSECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<!--\s*subsection:([a-z0-9_]+)\s*-->$").unwrap());
static TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<!--\s*table:([a-z0-9_]+)\s*-->$").unwrap());
static LOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<!--\s*section_lock:([a-z0-9_]+)\s+lock=(true|false)\s*-->$").unwrap());
static ORDER_START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<!--\s*workflow:order\s*$").unwrap());
static META_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^<!--\s*meta:([a-z0-9_]+)\s+(value|version)="([^"]*)"\s*-->$"#).unwrap());
static GATE_RESULT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^<!--\s*review_gate_result:([a-z0-9_]+)\s+status=(passed|failed)\s+issues=(\d+)\s+warnings=(\d+)\s*-->$",
    )
    .unwrap()
});
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<!--\s*PLACEHOLDER\s*-->$").unwrap());
static ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_]+$").unwrap());

/// Lines that try to be a marker but may not satisfy the grammar.
/// `section_lock` must come before `section` so the word boundary does not
/// mis-bucket it.
static ATTEMPT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<!--\s*(section_lock|section|subsection|table|workflow|meta|review_gate_result)\b")
        .unwrap()
});

/// Validated lowercase id token used by every marker kind
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(String);

impl MarkerId {
    /// Create an id, validating `[a-z0-9_]+`
    ///
    /// # Errors
    /// Returns [`MarkerIdError`] when the token contains anything outside
    /// lowercase alphanumerics and underscore, or is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, MarkerIdError> {
        let id = id.into();
        if ID_RE.is_match(&id) {
            Ok(Self(id))
        } else {
            Err(MarkerIdError(id))
        }
    }

    /// Get the id as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Construct from a regex capture already known to match `[a-z0-9_]+`
    pub(crate) fn from_validated(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl FromStr for MarkerId {
    type Err = MarkerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Display for MarkerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for MarkerId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<&str> for MarkerId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// One recognized marker occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerEvent {
    /// `section:ID`
    Section { id: MarkerId },
    /// `subsection:ID`
    Subsection { id: MarkerId },
    /// `table:ID`
    Table { id: MarkerId },
    /// `section_lock:ID lock=...`
    SectionLock { id: MarkerId, locked: bool },
    /// Opening line of a `workflow:order` block
    WorkflowOrderStart,
    /// A bare `-->` closing a block
    BlockEnd,
    /// `meta:KEY ...` with an allow-listed key
    Meta { key: MetaKey, value: String },
    /// `review_gate_result:GATE ...`
    ReviewGateResult {
        gate: MarkerId,
        status: GateStatus,
        issues: u32,
        warnings: u32,
    },
    /// A whole-line placeholder sentinel
    Placeholder,
    /// A marker attempt that does not satisfy the grammar
    Malformed { text: String },
}

/// A marker event bound to its 0-indexed source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerToken {
    pub line: usize,
    pub event: MarkerEvent,
}

/// Tokenize a document in one linear pass
///
/// Lines that are not marker attempts (prose, table rows, ordinary HTML
/// comments) produce no token. Marker attempts that fail the strict
/// grammar produce [`MarkerEvent::Malformed`], which the validator later
/// reports with the offending line.
#[must_use]
pub fn tokenize(lines: &[String]) -> Vec<MarkerToken> {
    let mut tokens = Vec::new();

    for (line_number, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        if let Some(event) = classify(line) {
            tokens.push(MarkerToken {
                line: line_number,
                event,
            });
        }
    }

    tracing::debug!(markers = tokens.len(), lines = lines.len(), "tokenized document");
    tokens
}

fn classify(line: &str) -> Option<MarkerEvent> {
    if line == "-->" {
        return Some(MarkerEvent::BlockEnd);
    }
    if !line.starts_with("<!--") {
        return None;
    }

    if let Some(caps) = SECTION_RE.captures(line) {
        return Some(MarkerEvent::Section {
            id: MarkerId::from_validated(&caps[1]),
        });
    }
    if let Some(caps) = SUBSECTION_RE.captures(line) {
        return Some(MarkerEvent::Subsection {
            id: MarkerId::from_validated(&caps[1]),
        });
    }
    if let Some(caps) = TABLE_RE.captures(line) {
        return Some(MarkerEvent::Table {
            id: MarkerId::from_validated(&caps[1]),
        });
    }
    if let Some(caps) = LOCK_RE.captures(line) {
        return Some(MarkerEvent::SectionLock {
            id: MarkerId::from_validated(&caps[1]),
            locked: &caps[2] == "true",
        });
    }
    if ORDER_START_RE.is_match(line) {
        return Some(MarkerEvent::WorkflowOrderStart);
    }
    if let Some(caps) = META_RE.captures(line) {
        // The key must be allow-listed and paired with its attribute form;
        // anything else is a malformed marker, not a silently ignored one.
        if let Some(key) = MetaKey::from_key_str(&caps[1]) {
            if key.attribute() == &caps[2] {
                return Some(MarkerEvent::Meta {
                    key,
                    value: caps[3].to_string(),
                });
            }
        }
        return Some(MarkerEvent::Malformed {
            text: line.to_string(),
        });
    }
    if let Some(caps) = GATE_RESULT_RE.captures(line) {
        let status = if &caps[2] == "passed" {
            GateStatus::Passed
        } else {
            GateStatus::Failed
        };
        // Counts are \d+ by construction; saturate rather than fail on
        // absurd values.
        let issues = caps[3].parse::<u32>().unwrap_or(u32::MAX);
        let warnings = caps[4].parse::<u32>().unwrap_or(u32::MAX);
        return Some(MarkerEvent::ReviewGateResult {
            gate: MarkerId::from_validated(&caps[1]),
            status,
            issues,
            warnings,
        });
    }
    if PLACEHOLDER_RE.is_match(line) {
        return Some(MarkerEvent::Placeholder);
    }
    if ATTEMPT_RE.is_match(line) {
        return Some(MarkerEvent::Malformed {
            text: line.to_string(),
        });
    }

    // An ordinary HTML comment; not part of the marker grammar.
    None
}

/// True when the line carries the placeholder sentinel anywhere in it,
/// including inside a table cell
#[inline]
#[must_use]
pub fn contains_placeholder(line: &str) -> bool {
    line.contains(PLACEHOLDER)
}

/// True when any line of `text` is marker syntax
///
/// Used to vet content coming back from a completion collaborator: a body
/// or patch may not smuggle in new structure.
#[must_use]
pub fn contains_marker_syntax(text: &str) -> bool {
    text.lines().any(|raw| {
        let line = raw.trim();
        line == "-->"
            || ATTEMPT_RE.is_match(line)
            || PLACEHOLDER_RE.is_match(line)
            || ORDER_START_RE.is_match(line)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn recognizes_every_marker_kind() {
        let lines = doc(&[
            "<!-- section:problem_statement -->",
            "<!-- subsection:open_questions -->",
            "<!-- table:open_questions -->",
            "<!-- section_lock:problem_statement lock=true -->",
            "<!-- workflow:order",
            "problem_statement",
            "-->",
            "<!-- meta:document_type value=\"planning_spec\" -->",
            "<!-- review_gate_result:design_review status=passed issues=0 warnings=2 -->",
            "<!-- PLACEHOLDER -->",
        ]);

        let tokens = tokenize(&lines);
        let events: Vec<&MarkerEvent> = tokens.iter().map(|t| &t.event).collect();

        assert_eq!(tokens.len(), 9);
        assert!(matches!(events[0], MarkerEvent::Section { id } if *id == "problem_statement"));
        assert!(matches!(events[1], MarkerEvent::Subsection { id } if *id == "open_questions"));
        assert!(matches!(events[2], MarkerEvent::Table { id } if *id == "open_questions"));
        assert!(
            matches!(events[3], MarkerEvent::SectionLock { id, locked: true } if *id == "problem_statement")
        );
        assert!(matches!(events[4], MarkerEvent::WorkflowOrderStart));
        assert!(matches!(events[5], MarkerEvent::BlockEnd));
        assert!(matches!(events[6], MarkerEvent::Meta { key: MetaKey::DocumentType, .. }));
        assert!(matches!(
            events[7],
            MarkerEvent::ReviewGateResult { status: GateStatus::Passed, issues: 0, warnings: 2, .. }
        ));
        assert!(matches!(events[8], MarkerEvent::Placeholder));
    }

    #[test]
    fn uppercase_and_hyphenated_ids_are_malformed() {
        let lines = doc(&[
            "<!-- section:Bad-Id -->",
            "<!-- table:UPPER -->",
            "<!-- section_lock:ok lock=maybe -->",
        ]);

        let tokens = tokenize(&lines);
        assert_eq!(tokens.len(), 3);
        for token in &tokens {
            assert!(matches!(token.event, MarkerEvent::Malformed { .. }));
        }
    }

    #[test]
    fn prose_and_plain_comments_produce_no_tokens() {
        let lines = doc(&[
            "Some prose about the system.",
            "| a | b |",
            "<!-- just a note to future editors -->",
            "",
        ]);
        assert!(tokenize(&lines).is_empty());
    }

    #[test]
    fn unknown_meta_key_is_malformed() {
        let lines = doc(&["<!-- meta:reviewer value=\"a\" -->"]);
        let tokens = tokenize(&lines);
        assert!(matches!(tokens[0].event, MarkerEvent::Malformed { .. }));
    }

    #[test]
    fn version_meta_uses_version_attribute() {
        let good = doc(&["<!-- meta:version version=\"0.3\" -->"]);
        let bad = doc(&["<!-- meta:version value=\"0.3\" -->"]);

        assert!(matches!(
            tokenize(&good)[0].event,
            MarkerEvent::Meta { key: MetaKey::Version, .. }
        ));
        assert!(matches!(tokenize(&bad)[0].event, MarkerEvent::Malformed { .. }));
    }

    #[test]
    fn placeholder_inside_table_cell_is_detected() {
        assert!(contains_placeholder("| risks-Q1 | What? | 2026-01-01 | <!-- PLACEHOLDER --> | Open |"));
        assert!(!contains_placeholder("| risks-Q1 | What? | 2026-01-01 | tbd | Open |"));
    }

    #[test]
    fn marker_syntax_detection_covers_blocks_and_placeholders() {
        assert!(contains_marker_syntax("text\n<!-- section:sneaky -->\nmore"));
        assert!(contains_marker_syntax("body\n-->"));
        assert!(contains_marker_syntax(PLACEHOLDER));
        assert!(!contains_marker_syntax("plain prose\nwith | pipes | only"));
    }

    #[test]
    fn marker_id_rejects_invalid_tokens() {
        assert!(MarkerId::new("risks_open_issues").is_ok());
        assert!(MarkerId::new("Risks").is_err());
        assert!(MarkerId::new("a b").is_err());
        assert!(MarkerId::new("").is_err());
    }
}
