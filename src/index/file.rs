//! Index persistence: load, atomic replace, and removal.
//!
//! The index is always rewritten in full. A new version is written to a
//! temporary file in the mailbox directory, synced, and renamed over the old
//! one, so a reader sees either the previous or the new index, never a mix.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::index::format::{IndexHeader, HEADER_SIZE, INDEX_FILE};
use crate::model::message::MessageEntry;

/// Path of the index file inside a mailbox directory.
pub fn index_path(mailbox_dir: &Path) -> PathBuf {
    mailbox_dir.join(INDEX_FILE)
}

/// Load the ordered entries of a mailbox.
///
/// Fails with `IndexNotFound` when the mailbox has no index and `Corrupt`
/// when the file cannot be decoded.
pub fn load(mailbox_dir: &Path) -> Result<Vec<MessageEntry>> {
    let path = index_path(mailbox_dir);
    let data = fs::read(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => StoreError::IndexNotFound(path.clone()),
        _ => StoreError::io(&path, e),
    })?;

    if data.len() < HEADER_SIZE {
        return Err(StoreError::corrupt(
            &path,
            format!("File too small ({} bytes)", data.len()),
        ));
    }

    let (header_bytes, entry_bytes) = data.split_at(HEADER_SIZE);
    let header: IndexHeader = bincode::deserialize(header_bytes)
        .map_err(|e| StoreError::corrupt(&path, format!("Header deserialization failed: {e}")))?;
    header
        .validate(entry_bytes)
        .map_err(|reason| StoreError::corrupt(&path, reason))?;

    let entries: Vec<MessageEntry> = bincode::deserialize(entry_bytes)
        .map_err(|e| StoreError::corrupt(&path, format!("Entry deserialization failed: {e}")))?;

    if entries.len() as u64 != header.message_count {
        return Err(StoreError::corrupt(
            &path,
            format!(
                "Message count mismatch: header says {}, found {}",
                header.message_count,
                entries.len()
            ),
        ));
    }

    debug!(path = %path.display(), count = entries.len(), "Loaded index");
    Ok(entries)
}

/// Replace the index with `entries`, in the order given.
pub fn save(mailbox_dir: &Path, entries: &[MessageEntry]) -> Result<()> {
    let path = index_path(mailbox_dir);

    let entry_bytes = bincode::serialize(entries)
        .map_err(|e| StoreError::corrupt(&path, format!("Entry serialization failed: {e}")))?;
    let header = IndexHeader::for_entries(&entry_bytes, entries.len() as u64);
    let header_bytes = bincode::serialize(&header)
        .map_err(|e| StoreError::corrupt(&path, format!("Header serialization failed: {e}")))?;

    // Pad header to HEADER_SIZE
    let mut padded_header = vec![0u8; HEADER_SIZE];
    let copy_len = header_bytes.len().min(HEADER_SIZE);
    padded_header[..copy_len].copy_from_slice(&header_bytes[..copy_len]);

    let mut tmp = NamedTempFile::new_in(mailbox_dir).map_err(|e| StoreError::io(mailbox_dir, e))?;
    tmp.write_all(&padded_header)
        .and_then(|()| tmp.write_all(&entry_bytes))
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(&path)
        .map_err(|e| StoreError::io(&path, e.error))?;

    debug!(path = %path.display(), count = entries.len(), "Index written");
    Ok(())
}

/// Delete the index file. `IndexNotFound` if it is already gone.
pub fn remove(mailbox_dir: &Path) -> Result<()> {
    let path = index_path(mailbox_dir);
    fs::remove_file(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => StoreError::IndexNotFound(path.clone()),
        _ => StoreError::io(&path, e),
    })?;
    debug!(path = %path.display(), "Index removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::MessageFlags;
    use crate::model::EmailAddress;
    use chrono::Utc;

    fn entry(id: &str, subject: &str, size: u64) -> MessageEntry {
        MessageEntry {
            id: id.to_string(),
            subject: subject.to_string(),
            from: EmailAddress::parse("a@b.com"),
            to: vec![],
            date: Utc::now(),
            size,
            flags: MessageFlags::default(),
        }
    }

    #[test]
    fn test_missing_index_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load(tmp.path()).unwrap_err();
        assert!(matches!(err, StoreError::IndexNotFound(_)), "got {err:?}");
    }

    #[test]
    fn test_save_then_load_keeps_order() {
        let tmp = tempfile::tempdir().unwrap();
        let entries = vec![entry("b", "second", 2), entry("a", "first", 1)];
        save(tmp.path(), &entries).unwrap();

        let loaded = load(tmp.path()).unwrap();
        assert_eq!(loaded, entries);
    }

    #[test]
    fn test_save_replaces_previous_version() {
        let tmp = tempfile::tempdir().unwrap();
        save(tmp.path(), &[entry("a", "one", 1), entry("b", "two", 2)]).unwrap();
        save(tmp.path(), &[entry("c", "three", 3)]).unwrap();

        let loaded = load(tmp.path()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "c");

        // Only the index itself remains, no temporary leftovers
        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(INDEX_FILE)]);
    }

    #[test]
    fn test_truncated_index_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(index_path(tmp.path()), b"short").unwrap();
        let err = load(tmp.path()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }), "got {err:?}");
    }

    #[test]
    fn test_flipped_byte_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        save(tmp.path(), &[entry("a", "subject", 10)]).unwrap();

        let path = index_path(tmp.path());
        let mut data = fs::read(&path).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xff;
        fs::write(&path, data).unwrap();

        let err = load(tmp.path()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }), "got {err:?}");
    }

    #[test]
    fn test_remove() {
        let tmp = tempfile::tempdir().unwrap();
        save(tmp.path(), &[entry("a", "subject", 10)]).unwrap();
        remove(tmp.path()).unwrap();
        assert!(!index_path(tmp.path()).exists());
        assert!(remove(tmp.path()).unwrap_err().is_not_found());
    }
}
