//! Message objects: one immutable `<id>.raw` file per message.

use std::fs;
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::id::is_valid_id;

/// Extension of object files.
pub const OBJECT_EXT: &str = "raw";

/// Path of the object for `id` inside a mailbox directory.
pub fn object_path(mailbox_dir: &Path, id: &str) -> PathBuf {
    mailbox_dir.join(format!("{id}.{OBJECT_EXT}"))
}

/// A payload streamed to a temporary file, not yet filed under an id.
///
/// Dropping it without [`commit`] deletes the temporary file.
#[derive(Debug)]
pub struct StagedObject {
    file: NamedTempFile,
    size: u64,
    head: Vec<u8>,
}

impl StagedObject {
    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The first bytes of the payload, up to the limit given to [`stage`].
    pub fn head(&self) -> &[u8] {
        &self.head
    }
}

/// Stream `reader` into a synced temporary file in `staging_dir`, keeping
/// its first `head_limit` bytes.
///
/// `staging_dir` must be on the same file system as the mailbox directories.
pub fn stage(staging_dir: &Path, reader: impl Read, head_limit: usize) -> Result<StagedObject> {
    let mut file = NamedTempFile::new_in(staging_dir).map_err(|e| StoreError::io(staging_dir, e))?;
    let mut capture = HeadCapture::new(reader, head_limit);
    let size = io::copy(&mut capture, &mut file)
        .and_then(|n| file.as_file().sync_all().map(|()| n))
        .map_err(|e| StoreError::io(file.path(), e))?;

    debug!(path = %file.path().display(), size, "Payload staged");
    Ok(StagedObject {
        file,
        size,
        head: capture.into_head(),
    })
}

/// File a staged payload as the object for `id`, returning its size.
///
/// Fails with `InvalidId` for an id `read` and `remove` would refuse, and
/// with `AlreadyExists` if `id` already has an object; the existing file is
/// left untouched.
pub fn commit(staged: StagedObject, mailbox_dir: &Path, id: &str) -> Result<u64> {
    if !is_valid_id(id) {
        return Err(StoreError::InvalidId { id: id.to_string() });
    }
    let path = object_path(mailbox_dir, id);
    let size = staged.size;

    staged
        .file
        .persist_noclobber(&path)
        .map_err(|e| match e.error.kind() {
            ErrorKind::AlreadyExists => StoreError::AlreadyExists(path.clone()),
            _ => StoreError::io(&path, e.error),
        })?;

    debug!(path = %path.display(), size, "Object written");
    Ok(size)
}

/// Read the full payload of `id`.
pub fn read(mailbox_dir: &Path, id: &str) -> Result<Vec<u8>> {
    let path = object_path(mailbox_dir, id);
    if !is_valid_id(id) {
        return Err(StoreError::ObjectNotFound(path));
    }
    fs::read(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => StoreError::ObjectNotFound(path.clone()),
        _ => StoreError::io(&path, e),
    })
}

/// Delete the object for `id`. `ObjectNotFound` if it does not exist.
pub fn remove(mailbox_dir: &Path, id: &str) -> Result<()> {
    let path = object_path(mailbox_dir, id);
    if !is_valid_id(id) {
        return Err(StoreError::ObjectNotFound(path));
    }
    fs::remove_file(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => StoreError::ObjectNotFound(path.clone()),
        _ => StoreError::io(&path, e),
    })?;
    debug!(path = %path.display(), "Object removed");
    Ok(())
}

/// Reader adapter that keeps a copy of the first `limit` bytes passing through.
struct HeadCapture<R> {
    inner: R,
    head: Vec<u8>,
    limit: usize,
}

impl<R: Read> HeadCapture<R> {
    fn new(inner: R, limit: usize) -> Self {
        Self {
            inner,
            head: Vec::new(),
            limit,
        }
    }

    fn into_head(self) -> Vec<u8> {
        self.head
    }
}

impl<R: Read> Read for HeadCapture<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        let room = self.limit.saturating_sub(self.head.len());
        self.head.extend_from_slice(&buf[..n.min(room)]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "20240101T000000000-00000001";

    fn write(dir: &Path, id: &str, payload: &[u8]) -> Result<u64> {
        commit(stage(dir, payload, 0)?, dir, id)
    }

    #[test]
    fn test_write_read_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let payload = b"Subject: hi\r\n\r\nbody\r\n";

        let size = write(tmp.path(), ID, payload).unwrap();
        assert_eq!(size, payload.len() as u64);
        assert!(object_path(tmp.path(), ID).is_file());
        assert_eq!(read(tmp.path(), ID).unwrap(), payload);

        remove(tmp.path(), ID).unwrap();
        assert!(!object_path(tmp.path(), ID).exists());
    }

    #[test]
    fn test_stage_in_separate_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = tmp.path().join("tmp");
        let mailbox = tmp.path().join("mailbox");
        fs::create_dir(&staging).unwrap();
        fs::create_dir(&mailbox).unwrap();

        let staged = stage(&staging, &b"Subject: hi\r\n\r\nbody"[..], 4).unwrap();
        assert_eq!(staged.size(), 19);
        assert_eq!(staged.head(), b"Subj");
        assert_eq!(fs::read_dir(&staging).unwrap().count(), 1);

        commit(staged, &mailbox, ID).unwrap();
        assert_eq!(fs::read_dir(&staging).unwrap().count(), 0);
        assert_eq!(read(&mailbox, ID).unwrap(), b"Subject: hi\r\n\r\nbody");
    }

    #[test]
    fn test_dropped_stage_leaves_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        drop(stage(tmp.path(), &b"abandoned"[..], 0).unwrap());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_second_write_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), ID, b"first").unwrap();

        let err = write(tmp.path(), ID, b"second").unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)), "got {err:?}");
        assert_eq!(read(tmp.path(), ID).unwrap(), b"first");

        // The rejected payload's temporary file does not linger
        let count = fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_commit_rejects_ids_read_would_refuse() {
        let tmp = tempfile::tempdir().unwrap();
        let err = write(tmp.path(), "+100000101T000000000-00000000", b"x").unwrap_err();
        assert!(matches!(err, StoreError::InvalidId { .. }), "got {err:?}");
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_object() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            read(tmp.path(), ID).unwrap_err(),
            StoreError::ObjectNotFound(_)
        ));
        assert!(remove(tmp.path(), ID).unwrap_err().is_not_found());
    }

    #[test]
    fn test_invalid_id_never_touches_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let outside = tmp.path().join("victim.raw");
        fs::write(&outside, b"keep me").unwrap();

        let inner = tmp.path().join("mailbox");
        fs::create_dir(&inner).unwrap();
        assert!(remove(&inner, "../victim").unwrap_err().is_not_found());
        assert!(outside.exists());
    }

    #[test]
    fn test_stage_into_missing_dir_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = stage(&tmp.path().join("gone"), &b"x"[..], 0).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }), "got {err:?}");
    }

    #[test]
    fn test_head_capture_limits_copy() {
        let data = vec![7u8; 100];
        let mut capture = HeadCapture::new(&data[..], 10);
        let mut out = Vec::new();
        capture.read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), 100);
        assert_eq!(capture.into_head(), &data[..10]);
    }
}
