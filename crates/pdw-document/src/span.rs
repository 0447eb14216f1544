//! Span computation over the marker token stream
//!
//! Sections and subsections are half-open line intervals `[start, end)`
//! bound to an id. Discovery is a purely structural pass over the token
//! stream produced by [`crate::marker::tokenize`]: collect (id, line)
//! pairs, then pair each with the next marker's line (or the scope end).
//! One linear pass over the document, no backtracking.

use crate::marker::{tokenize, MarkerEvent, MarkerId};

/// Half-open line interval `[start, end)` owned by a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSpan {
    pub id: MarkerId,
    pub start: usize,
    pub end: usize,
}

impl SectionSpan {
    /// True when `line` falls inside the span
    #[inline]
    #[must_use]
    pub fn contains(&self, line: usize) -> bool {
        line >= self.start && line < self.end
    }

    /// Number of lines covered
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Same shape as [`SectionSpan`], scoped to one parent section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsectionSpan {
    pub id: MarkerId,
    pub start: usize,
    pub end: usize,
}

impl SubsectionSpan {
    #[inline]
    #[must_use]
    pub fn contains(&self, line: usize) -> bool {
        line >= self.start && line < self.end
    }
}

/// Discover every section span in document order
///
/// A section opens at its marker line and closes at the next `section:`
/// marker or EOF. Duplicate ids still produce spans here; the validator is
/// responsible for reporting them.
#[must_use]
pub fn find_sections(lines: &[String]) -> Vec<SectionSpan> {
    let opens: Vec<(MarkerId, usize)> = tokenize(lines)
        .into_iter()
        .filter_map(|token| match token.event {
            MarkerEvent::Section { id } => Some((id, token.line)),
            _ => None,
        })
        .collect();

    opens
        .iter()
        .enumerate()
        .map(|(i, (id, start))| SectionSpan {
            id: id.clone(),
            start: *start,
            end: opens.get(i + 1).map_or(lines.len(), |(_, next)| *next),
        })
        .collect()
}

/// Find one section's span by id
#[must_use]
pub fn section_span(lines: &[String], id: &MarkerId) -> Option<SectionSpan> {
    find_sections(lines).into_iter().find(|span| span.id == *id)
}

/// Discover subsection spans inside one parent section
///
/// The algorithm is identical to [`find_sections`], scoped to the parent
/// interval: a subsection closes at the next `subsection:` marker or the
/// parent's end.
#[must_use]
pub fn find_subsections_within(lines: &[String], parent: &SectionSpan) -> Vec<SubsectionSpan> {
    let opens: Vec<(MarkerId, usize)> = tokenize(lines)
        .into_iter()
        .filter(|token| token.line > parent.start && token.line < parent.end)
        .filter_map(|token| match token.event {
            MarkerEvent::Subsection { id } => Some((id, token.line)),
            _ => None,
        })
        .collect();

    opens
        .iter()
        .enumerate()
        .map(|(i, (id, start))| SubsectionSpan {
            id: id.clone(),
            start: *start,
            end: opens.get(i + 1).map_or(parent.end, |(_, next)| *next),
        })
        .collect()
}

/// Locate the contiguous pipe-prefixed block bound to `table_id`
///
/// Scans forward from the table marker until a line that begins with `|`;
/// the block ends at the first line that does not. Hitting a `section:`
/// marker before any pipe line means the table is malformed in placement
/// and reported as absent, not as an empty table.
#[must_use]
pub fn find_table_block(lines: &[String], table_id: &MarkerId) -> Option<(usize, usize)> {
    let marker_line = tokenize(lines).into_iter().find_map(|token| match &token.event {
        MarkerEvent::Table { id } if *id == *table_id => Some(token.line),
        _ => None,
    })?;
    table_block_from(lines, marker_line)
}

/// Locate the pipe block for a table marker already known to sit at
/// `marker_line`
///
/// Same rules as [`find_table_block`]; used when iterating table markers
/// directly, where ids may repeat across the document.
#[must_use]
pub fn table_block_from(lines: &[String], marker_line: usize) -> Option<(usize, usize)> {
    // The table must begin before the next section opens.
    let boundary = tokenize(lines)
        .into_iter()
        .filter(|token| token.line > marker_line)
        .find_map(|token| match token.event {
            MarkerEvent::Section { .. } => Some(token.line),
            _ => None,
        })
        .unwrap_or(lines.len());

    let start = (marker_line + 1..boundary).find(|&i| lines[i].trim_start().starts_with('|'))?;

    let mut end = start;
    while end < lines.len() && lines[end].trim_start().starts_with('|') {
        end += 1;
    }
    Some((start, end))
}
