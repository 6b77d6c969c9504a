//! Mailbox name → directory mapping.
//!
//! ```text
//! <root>/mail/<hash[0:3]>/<hash>/
//! ```
//!
//! `hash` is the lower-case hex SHA-1 of the mailbox name. The three-character
//! prefix caps the first level at 4096 directories and the hex encoding keeps
//! arbitrary names off the file system. The mapping is one-way: a directory
//! found on disk cannot be turned back into its mailbox name.
//!
//! Distinct names that collide on the hash share one directory. Collisions
//! are not detected.

use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};

/// Name of the directory under the store root that holds all mailboxes.
pub const MAIL_DIR: &str = "mail";

/// Length of the first-level shard prefix.
pub const SHARD_PREFIX_LEN: usize = 3;

/// Length of a hex SHA-1 digest.
pub const HASH_LEN: usize = 40;

/// Hex SHA-1 of a mailbox name.
pub fn hash_name(name: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(name.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Directory for the mailbox with this hash, under `mail_dir`.
pub fn mailbox_dir(mail_dir: &Path, hash: &str) -> PathBuf {
    mail_dir.join(shard_prefix(hash)).join(hash)
}

/// First-level shard directory name for a hash.
pub fn shard_prefix(hash: &str) -> &str {
    &hash[..SHARD_PREFIX_LEN.min(hash.len())]
}

/// Whether a directory name looks like a first-level shard.
pub fn is_shard_prefix(s: &str) -> bool {
    s.len() == SHARD_PREFIX_LEN && is_lower_hex(s)
}

/// Whether a directory name looks like a mailbox hash.
pub fn is_mailbox_hash(s: &str) -> bool {
    s.len() == HASH_LEN && is_lower_hex(s)
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
