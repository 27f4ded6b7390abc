//! Delta computation between two snapshots of the same feed.
//!
//! Entries are compared as whole values. An entry that drops out of the
//! source feed and later reappears is reported again.

use std::collections::HashSet;

use feed_trigger_core::{Entry, FeedSnapshot};

/// Entries of `new` that are not equal to any entry of `old`.
///
/// Metadata comes from `new`; surviving entries keep their order in `new`.
pub fn subtract(new: &FeedSnapshot, old: &FeedSnapshot) -> FeedSnapshot {
    let seen: HashSet<&Entry> = old.entries.iter().collect();
    let entries = new
        .entries
        .iter()
        .filter(|entry| !seen.contains(entry))
        .cloned()
        .collect();
    new.with_entries(entries)
}

/// Delta against an optional previous snapshot.
///
/// With no previous snapshot the whole feed is new.
pub fn delta(new: &FeedSnapshot, previous: Option<&FeedSnapshot>) -> FeedSnapshot {
    match previous {
        Some(old) => subtract(new, old),
        None => new.clone(),
    }
}
