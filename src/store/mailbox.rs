//! Mailbox controller: append, list, get, delete and purge for one mailbox.
//!
//! ## On-disk states
//! - **Absent**: no directory, no index.
//! - **Materialized**: directory, index and at least one object.
//!
//! The first append materializes a mailbox; removing its last message
//! (by delete or purge) returns it to Absent.
//!
//! ## Ordering
//! - Append streams the payload to a staging file before taking the lock,
//!   so a slow sender never holds up other callers.
//! - Append files the object before the index entry that names it. A crash
//!   in between leaves an orphan object, never a dangling entry.
//! - Delete removes the object before persisting the shortened index.
//! - Every mutation holds the mailbox lock exclusively until the index is
//!   persisted; reads hold it shared.

use std::fmt;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::id::generate_id;
use crate::index::{self, query};
use crate::model::message::{Message, MessageEntry, MessageFlags};
use crate::parser::header::{self, HeaderSummary, HEADER_SCAN_LIMIT};
use crate::store::locks::MailboxLock;
use crate::store::objects::{self, StagedObject};

/// Handle to one mailbox.
///
/// Cheap to clone. Every handle for the same mailbox shares one lock, so
/// handles may be created freely and used from any thread.
#[derive(Debug, Clone)]
pub struct Mailbox {
    /// Original name, unknown for mailboxes discovered by walking the disk.
    name: Option<String>,
    hash: String,
    dir: PathBuf,
    /// Store-wide directory where payloads are streamed before filing.
    staging: PathBuf,
    lock: MailboxLock,
}

impl Mailbox {
    pub(crate) fn new(
        name: Option<String>,
        hash: String,
        dir: PathBuf,
        staging: PathBuf,
        lock: MailboxLock,
    ) -> Self {
        Self {
            name,
            hash,
            dir,
            staging,
            lock,
        }
    }

    /// Mailbox name, if this handle was opened by name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Hex hash the mailbox directory is named after.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Mailbox directory (may not exist).
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Whether the mailbox currently holds messages on disk.
    pub fn exists(&self) -> bool {
        let _guard = self.lock.read();
        index::index_path(&self.dir).is_file()
    }

    /// Store `raw` as a new message delivered at `date`. Returns its id.
    pub fn append(&self, raw: &[u8], date: DateTime<Utc>) -> Result<String> {
        self.append_from(raw, date)
    }

    /// Stream a new message from `reader`. Returns its id.
    ///
    /// The mailbox lock is only taken once the payload has been read in full.
    /// On failure the mailbox is left as it was: a filed object whose index
    /// entry could not be persisted is removed again, and a directory created
    /// for this append is removed if it ends up empty.
    pub fn append_from<R: Read>(&self, reader: R, date: DateTime<Utc>) -> Result<String> {
        let staged = objects::stage(&self.staging, reader, HEADER_SCAN_LIMIT)?;
        let summary = header::parse_summary(staged.head());

        let _guard = self.lock.write();
        self.file_staged(staged, summary, date, index::save)
    }

    /// All messages in delivery order. Empty for an absent mailbox.
    pub fn list(&self) -> Result<Vec<MessageEntry>> {
        let _guard = self.lock.read();
        self.load_or_empty()
    }

    /// Metadata for one message, without reading its payload.
    pub fn entry(&self, id: &str) -> Result<MessageEntry> {
        let _guard = self.lock.read();
        let entries = self.load_or_empty()?;
        query::find(&entries, id)
            .map(|(_, entry)| entry.clone())
            .ok_or_else(|| StoreError::MessageNotFound { id: id.to_string() })
    }

    /// Metadata and payload for one message.
    ///
    /// `MessageNotFound` if the index has no such id; `ObjectMissing` if the
    /// index has it but the object file is gone.
    pub fn get(&self, id: &str) -> Result<Message> {
        let _guard = self.lock.read();
        let entries = self.load_or_empty()?;
        let (_, entry) = query::find(&entries, id)
            .ok_or_else(|| StoreError::MessageNotFound { id: id.to_string() })?;

        let raw = objects::read(&self.dir, id).map_err(|e| match e {
            StoreError::ObjectNotFound(path) => {
                warn!(mailbox = %self, id, path = %path.display(), "Indexed message has no object");
                StoreError::ObjectMissing {
                    id: id.to_string(),
                    path,
                }
            }
            other => other,
        })?;

        Ok(Message {
            entry: entry.clone(),
            raw,
        })
    }

    /// Number of messages.
    pub fn count(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    /// Sum of message sizes in bytes.
    pub fn total_size(&self) -> Result<u64> {
        Ok(query::total_size(&self.list()?))
    }

    /// Set or clear the seen flag of one message.
    pub fn set_seen(&self, id: &str, seen: bool) -> Result<()> {
        let _guard = self.lock.write();
        let mut entries = self.load_or_empty()?;
        let (pos, _) = query::find(&entries, id)
            .ok_or_else(|| StoreError::MessageNotFound { id: id.to_string() })?;

        if entries[pos].flags.seen != seen {
            entries[pos].flags.seen = seen;
            index::save(&self.dir, &entries)?;
        }
        Ok(())
    }

    /// Delete one message.
    ///
    /// Removing the last message also removes the index and the mailbox
    /// directory. A missing object is tolerated: the entry is dropped anyway.
    pub fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.lock.write();
        let mut entries = self.load_or_empty()?;
        let (pos, _) = query::find(&entries, id)
            .ok_or_else(|| StoreError::MessageNotFound { id: id.to_string() })?;

        match objects::remove(&self.dir, id) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                warn!(mailbox = %self, id, "Object already gone; dropping index entry");
            }
            Err(e) => return Err(e),
        }

        entries.remove(pos);
        if entries.is_empty() {
            self.dismantle()?;
        } else {
            index::save(&self.dir, &entries)?;
        }

        info!(mailbox = %self, id, remaining = entries.len(), "Message deleted");
        Ok(())
    }

    /// Delete every message and the mailbox's on-disk structure.
    ///
    /// Returns the number of indexed messages removed. Purging an absent
    /// mailbox succeeds with zero. A corrupt index does not stop the purge.
    pub fn purge(&self) -> Result<usize> {
        let _guard = self.lock.write();
        let entries = match index::load(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e @ StoreError::Corrupt { .. }) => {
                warn!(mailbox = %self, error = %e, "Purging mailbox with unreadable index");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        for entry in &entries {
            match objects::remove(&self.dir, &entry.id) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!(mailbox = %self, id = %entry.id, "Object already gone");
                }
                Err(e) => return Err(e),
            }
        }

        match index::remove(&self.dir) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        // Sweeps orphans along with the directory
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        }

        if !entries.is_empty() {
            info!(mailbox = %self, count = entries.len(), "Mailbox purged");
        }
        Ok(entries.len())
    }

    // ── Private helpers ─────────────────────────────────────────────

    /// File a staged payload and record it in the index. Caller holds the write lock.
    fn file_staged(
        &self,
        staged: StagedObject,
        summary: HeaderSummary,
        date: DateTime<Utc>,
        save_index: impl FnOnce(&Path, &[MessageEntry]) -> Result<()>,
    ) -> Result<String> {
        let mut entries = self.load_or_empty()?;
        let materializing = entries.is_empty();
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let id = generate_id(date);
        let size = match objects::commit(staged, &self.dir, &id) {
            Ok(size) => size,
            Err(e) => {
                if materializing {
                    self.remove_dir_quietly();
                }
                return Err(e);
            }
        };

        entries.push(MessageEntry {
            id: id.clone(),
            subject: summary.subject,
            from: summary.from,
            to: summary.to,
            date,
            size,
            flags: MessageFlags::default(),
        });

        if let Err(e) = save_index(&self.dir, &entries) {
            if let Err(cleanup) = objects::remove(&self.dir, &id) {
                warn!(mailbox = %self, id = %id, error = %cleanup, "Could not remove unindexed object");
            }
            if materializing {
                self.remove_dir_quietly();
            }
            return Err(e);
        }

        info!(mailbox = %self, id = %id, size, "Message appended");
        Ok(id)
    }

    /// Load the index, treating a missing one as an empty mailbox.
    fn load_or_empty(&self) -> Result<Vec<MessageEntry>> {
        match index::load(&self.dir) {
            Ok(entries) => Ok(entries),
            Err(StoreError::IndexNotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Remove the index and the mailbox directory after the last message is gone.
    fn dismantle(&self) -> Result<()> {
        match index::remove(&self.dir) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
        self.remove_dir_quietly();
        Ok(())
    }

    /// Remove the mailbox directory if empty. Failure is logged, never returned.
    fn remove_dir_quietly(&self) {
        match fs::remove_dir(&self.dir) {
            Ok(()) => debug!(mailbox = %self, "Mailbox directory removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(mailbox = %self, path = %self.dir.display(), error = %e, "Could not remove mailbox directory");
            }
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "#{}", self.hash),
        }
    }
}
