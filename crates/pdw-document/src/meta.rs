//! Document-level metadata markers
//!
//! Only a fixed allow-list of keys is recognized; the `version` key uses
//! the `version="..."` attribute form, everything else uses `value="..."`.
//! A marker with any other key tokenizes as malformed.

use std::fmt::{self, Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::marker::{tokenize, MarkerEvent};

/// Allow-listed metadata keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaKey {
    DocumentType,
    Owner,
    Status,
    Version,
}

impl MetaKey {
    /// The key token as written in a marker
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentType => "document_type",
            Self::Owner => "owner",
            Self::Status => "status",
            Self::Version => "version",
        }
    }

    /// The attribute name this key is written with
    #[inline]
    #[must_use]
    pub fn attribute(&self) -> &'static str {
        match self {
            Self::Version => "version",
            _ => "value",
        }
    }

    /// Parse a key token, returning `None` for keys outside the allow-list
    #[must_use]
    pub fn from_key_str(key: &str) -> Option<Self> {
        match key {
            "document_type" => Some(Self::DocumentType),
            "owner" => Some(Self::Owner),
            "status" => Some(Self::Status),
            "version" => Some(Self::Version),
            _ => None,
        }
    }
}

impl Display for MetaKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One effective metadata entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaEntry {
    pub key: MetaKey,
    pub value: String,
    /// Line of the winning (last) occurrence
    pub line: usize,
}

/// Collect document metadata, last occurrence per key winning
#[must_use]
pub fn document_meta(lines: &[String]) -> IndexMap<MetaKey, MetaEntry> {
    let mut meta = IndexMap::new();
    for token in tokenize(lines) {
        if let MarkerEvent::Meta { key, value } = token.event {
            meta.insert(
                key,
                MetaEntry {
                    key,
                    value,
                    line: token.line,
                },
            );
        }
    }
    meta
}

/// Render a metadata marker line
#[must_use]
pub fn render_meta_marker(key: MetaKey, value: &str) -> String {
    format!("<!-- meta:{} {}=\"{}\" -->", key, key.attribute(), value)
}
