//! Binary index file format.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ HEADER (64 bytes, fixed)             │
//! │  magic: [u8; 8] = b"MSTASHIX"        │
//! │  version: u32                        │
//! │  flags: u32                          │
//! │  message_count: u64                  │
//! │  sha256_entries: [u8; 32]            │
//! │  (padding to 64 bytes)               │
//! ├──────────────────────────────────────┤
//! │ ENTRIES (variable)                   │
//! │  bincode-serialized Vec<MessageEntry>│
//! └──────────────────────────────────────┘
//! ```

use sha2::{Digest, Sha256};

/// File name of the index inside a mailbox directory.
pub const INDEX_FILE: &str = "index.bin";

/// Magic bytes identifying a mailstash index file.
pub const MAGIC: &[u8; 8] = b"MSTASHIX";

/// Current index format version.
pub const VERSION: u32 = 1;

/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 64;

/// Serializable index header.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct IndexHeader {
    /// Magic bytes (must equal [`MAGIC`]).
    pub magic: [u8; 8],
    /// Format version (must equal [`VERSION`]).
    pub version: u32,
    /// Reserved flags (currently unused).
    pub flags: u32,
    /// Number of entries that follow the header.
    pub message_count: u64,
    /// SHA-256 of the serialized entries.
    pub sha256_entries: [u8; 32],
}

impl IndexHeader {
    /// Header describing `entry_bytes`, which hold `message_count` entries.
    pub fn for_entries(entry_bytes: &[u8], message_count: u64) -> Self {
        Self {
            magic: *MAGIC,
            version: VERSION,
            flags: 0,
            message_count,
            sha256_entries: checksum(entry_bytes),
        }
    }

    /// Check the magic and version, and that `entry_bytes` match the checksum.
    pub fn validate(&self, entry_bytes: &[u8]) -> std::result::Result<(), String> {
        if self.magic != *MAGIC {
            return Err("Invalid magic bytes".into());
        }
        if self.version != VERSION {
            return Err(format!(
                "Incompatible version: expected {VERSION}, found {}",
                self.version
            ));
        }
        if self.sha256_entries != checksum(entry_bytes) {
            return Err("Entry checksum mismatch".into());
        }
        Ok(())
    }
}

fn checksum(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fits() {
        let header = IndexHeader::for_entries(b"entries", 1);
        let bytes = bincode::serialize(&header).unwrap();
        assert!(bytes.len() <= HEADER_SIZE, "header is {} bytes", bytes.len());
    }

    #[test]
    fn test_validate() {
        let header = IndexHeader::for_entries(b"entries", 1);
        assert!(header.validate(b"entries").is_ok());
        assert!(header.validate(b"entrieS").is_err());

        let mut wrong_magic = IndexHeader::for_entries(b"entries", 1);
        wrong_magic.magic = *b"NOTMAGIC";
        assert!(wrong_magic.validate(b"entries").is_err());

        let mut wrong_version = IndexHeader::for_entries(b"entries", 1);
        wrong_version.version = VERSION + 1;
        let err = wrong_version.validate(b"entries").unwrap_err();
        assert!(err.contains("version"), "got: {err}");
    }
}
