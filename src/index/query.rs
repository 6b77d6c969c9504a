//! Metadata queries over loaded index entries.

use chrono::{DateTime, Utc};

use crate::model::message::MessageEntry;

/// Position and entry for an id.
pub fn find<'a>(entries: &'a [MessageEntry], id: &str) -> Option<(usize, &'a MessageEntry)> {
    entries.iter().enumerate().find(|(_, e)| e.id == id)
}

/// Sum of message sizes in bytes.
pub fn total_size(entries: &[MessageEntry]) -> u64 {
    entries.iter().map(|e| e.size).sum()
}

/// Number of messages not yet marked as seen.
pub fn unseen_count(entries: &[MessageEntry]) -> usize {
    entries.iter().filter(|e| !e.flags.seen).count()
}

/// Return the delivery date range (oldest, newest) across the given entries.
pub fn date_range(entries: &[MessageEntry]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let oldest = entries.iter().map(|e| e.date).min()?;
    let newest = entries.iter().map(|e| e.date).max()?;
    Some((oldest, newest))
}
