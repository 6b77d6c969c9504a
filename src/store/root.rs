//! Store root: resolves mailbox names to handles and walks the shard tree.

use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::{self, Config};
use crate::error::{Result, StoreError};
use crate::store::locks::LockRegistry;
use crate::store::mailbox::Mailbox;
use crate::store::shard;

/// A message store rooted at one directory.
///
/// ```text
/// <root>/mail/<hash[0:3]>/<hash>/index.bin
/// <root>/mail/<hash[0:3]>/<hash>/<id>.raw
/// <root>/tmp/                      payloads still being received
/// ```
///
/// Share one `MailStore` between all callers of a process (e.g. behind an
/// `Arc`): per-mailbox locking is only effective among handles it produced.
#[derive(Debug)]
pub struct MailStore {
    root: PathBuf,
    mail_dir: PathBuf,
    staging_dir: PathBuf,
    locks: LockRegistry,
}

/// Directory under the root where incoming payloads are staged.
pub const STAGING_DIR: &str = "tmp";

impl MailStore {
    /// Open or create a store at `root`. Creates `<root>/mail` and
    /// `<root>/tmp` if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mail_dir = root.join(shard::MAIL_DIR);
        let staging_dir = root.join(STAGING_DIR);
        for dir in [&mail_dir, &staging_dir] {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }

        info!(root = %root.display(), "Opened mail store");
        Ok(Self {
            root,
            mail_dir,
            staging_dir,
            locks: LockRegistry::new(),
        })
    }

    /// Open the store at the configured root.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(config::store_root(config))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the shard tree.
    pub fn mail_dir(&self) -> &Path {
        &self.mail_dir
    }

    /// Handle for the mailbox called `name`. Never fails; the mailbox need not exist.
    pub fn mailbox_for(&self, name: &str) -> Mailbox {
        let hash = shard::hash_name(name);
        self.handle(Some(name.to_string()), hash)
    }

    /// Store a message for `name`, read from `reader`. Returns the new id.
    pub fn deliver<R: Read>(&self, name: &str, reader: R, date: DateTime<Utc>) -> Result<String> {
        self.mailbox_for(name).append_from(reader, date)
    }

    /// One handle per mailbox directory on disk, sorted by hash.
    ///
    /// Handles found this way carry no name: the directory only records the
    /// hash. They support every operation a named handle does.
    pub fn all_mailboxes(&self) -> Result<Vec<Mailbox>> {
        let mut hashes = Vec::new();
        for prefix in subdirectories(&self.mail_dir)? {
            if !shard::is_shard_prefix(&prefix) {
                continue;
            }
            for hash in subdirectories(&self.mail_dir.join(&prefix))? {
                if shard::is_mailbox_hash(&hash) && hash.starts_with(&prefix) {
                    hashes.push(hash);
                }
            }
        }
        hashes.sort();

        debug!(count = hashes.len(), "Enumerated mailboxes");
        Ok(hashes
            .into_iter()
            .map(|hash| self.handle(None, hash))
            .collect())
    }

    fn handle(&self, name: Option<String>, hash: String) -> Mailbox {
        let dir = shard::mailbox_dir(&self.mail_dir, &hash);
        let lock = self.locks.lock_for(&hash);
        Mailbox::new(name, hash, dir, self.staging_dir.clone(), lock)
    }
}

/// Names of the subdirectories of `dir`. A missing `dir` has none.
fn subdirectories(dir: &Path) -> Result<Vec<String>> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(dir, e)),
    };

    let mut names = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let is_dir = entry
            .file_type()
            .map_err(|e| StoreError::io(entry.path(), e))?
            .is_dir();
        if let (true, Ok(name)) = (is_dir, entry.file_name().into_string()) {
            names.push(name);
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_mail_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("new_store");
        let store = MailStore::open(&root).unwrap();
        assert!(store.mail_dir().is_dir());
        assert!(root.join(STAGING_DIR).is_dir());
        assert_eq!(store.root(), root);
        assert!(store.all_mailboxes().unwrap().is_empty());
    }

    #[test]
    fn test_handles_share_locks() {
        let tmp = tempfile::tempdir().unwrap();
        let store = MailStore::open(tmp.path()).unwrap();
        let _a = store.mailbox_for("fred");
        let _b = store.mailbox_for("fred");
        let _c = store.mailbox_for("wilma");
        assert_eq!(store.locks.live_count(), 2);
    }

    #[test]
    fn test_discovery_ignores_strays() {
        let tmp = tempfile::tempdir().unwrap();
        let store = MailStore::open(tmp.path()).unwrap();
        store
            .mailbox_for("fred")
            .append(b"Subject: hi\r\n\r\n", Utc::now())
            .unwrap();

        fs::create_dir_all(store.mail_dir().join("zzz")).unwrap();
        fs::create_dir_all(store.mail_dir().join("abc").join("not-a-hash")).unwrap();
        fs::write(store.mail_dir().join("README"), b"stray").unwrap();
        // Hash filed under the wrong prefix
        fs::create_dir_all(
            store
                .mail_dir()
                .join("000")
                .join(shard::hash_name("barney")),
        )
        .unwrap();

        let found = store.all_mailboxes().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].hash(), shard::hash_name("fred"));
        assert!(found[0].name().is_none());
        assert_eq!(found[0].path(), store.mailbox_for("fred").path());
    }
}
