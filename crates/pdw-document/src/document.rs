//! Line-oriented document model
//!
//! A plan document is an ordered, 0-indexed sequence of text lines. The
//! line array is the single mutable resource of the whole system; every
//! operation here takes the document by reference and returns owned data,
//! and mutating components elsewhere take an owned copy and return a new
//! one.

use crate::marker;

/// An in-memory plan document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanDocument {
    lines: Vec<String>,
}

impl PlanDocument {
    /// Create a document from raw text, splitting on newlines
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// Create a document from an owned line array
    #[inline]
    #[must_use]
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Borrow the line array
    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Consume the document, yielding its line array
    #[inline]
    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Render back to text with a trailing newline
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }

    /// Number of lines
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when the document has no lines
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Get a single line by index
    #[inline]
    #[must_use]
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// True when any line in `[start, end)` carries the placeholder
    /// sentinel, including inside a table cell
    #[must_use]
    pub fn region_is_blank(&self, start: usize, end: usize) -> bool {
        let end = end.min(self.lines.len());
        if start >= end {
            return false;
        }
        self.lines[start..end]
            .iter()
            .any(|line| marker::contains_placeholder(line))
    }
}

impl From<Vec<String>> for PlanDocument {
    fn from(lines: Vec<String>) -> Self {
        Self::from_lines(lines)
    }
}
