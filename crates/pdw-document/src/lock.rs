//! Section lock extraction
//!
//! `section_lock` markers may occur anywhere; the last occurrence per
//! section id wins. Whether the referenced section actually exists is the
//! validator's concern.

use indexmap::IndexMap;

use crate::marker::{tokenize, MarkerEvent, MarkerId};

/// Effective lock state for one section id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockState {
    pub id: MarkerId,
    pub locked: bool,
    /// Line of the winning (last) occurrence
    pub line: usize,
}

/// Collect effective lock states, last occurrence winning
#[must_use]
pub fn lock_states(lines: &[String]) -> IndexMap<MarkerId, LockState> {
    let mut states = IndexMap::new();
    for token in tokenize(lines) {
        if let MarkerEvent::SectionLock { id, locked } = token.event {
            states.insert(
                id.clone(),
                LockState {
                    id,
                    locked,
                    line: token.line,
                },
            );
        }
    }
    states
}

/// True when the last lock marker for `id` says `lock=true`
#[must_use]
pub fn is_locked(lines: &[String], id: &MarkerId) -> bool {
    lock_states(lines).get(id).is_some_and(|state| state.locked)
}

/// Render a lock marker line
#[must_use]
pub fn render_lock_marker(id: &MarkerId, locked: bool) -> String {
    format!("<!-- section_lock:{id} lock={locked} -->")
}
