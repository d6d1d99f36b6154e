// src/diff.rs

//! Change detection between the fresh fetch and the stored snapshot.
//!
//! An announcement is "new" iff no structurally-equal record exists in the
//! previous snapshot. This is a plain membership test over title and
//! optional url, not a keyed diff: the source exposes no stable identifier,
//! and removals are deliberately ignored (the snapshot only grows or is
//! replaced wholesale).

use crate::models::Snapshot;

/// Announcements present in `current` with no structural match in
/// `previous`, in `current`'s order.
pub fn new_items(current: &Snapshot, previous: &Snapshot) -> Snapshot {
    let news = current
        .news
        .iter()
        .filter(|item| !previous.contains(item))
        .cloned()
        .collect();
    Snapshot::new(news)
}
