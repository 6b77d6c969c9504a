//! Message metadata and stored messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::EmailAddress;

/// Per-message flags kept in the index.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageFlags {
    /// The message has been opened by a reader.
    pub seen: bool,
}

/// Metadata for one stored message, as recorded in the mailbox index.
///
/// Entries are kept in delivery order; the index never re-sorts them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageEntry {
    /// Identifier, also the stem of the object file name (`<id>.raw`).
    pub id: String,

    /// Decoded `Subject:` header, empty when absent.
    pub subject: String,

    /// First `From:` address.
    pub from: EmailAddress,

    /// `To:` recipients, truncated to the first 5.
    pub to: Vec<EmailAddress>,

    /// Delivery timestamp supplied by the caller.
    pub date: DateTime<Utc>,

    /// Exact byte length of the stored object.
    pub size: u64,

    pub flags: MessageFlags,
}

/// A message read back from the store: metadata plus the raw payload.
#[derive(Debug, Clone)]
pub struct Message {
    pub entry: MessageEntry,
    pub raw: Vec<u8>,
}

impl Message {
    pub fn id(&self) -> &str {
        &self.entry.id
    }

    pub fn subject(&self) -> &str {
        &self.entry.subject
    }

    /// Size in bytes as recorded in the index.
    pub fn size(&self) -> u64 {
        self.entry.size
    }
}
