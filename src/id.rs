//! Message identifiers.
//!
//! An id is the delivery timestamp (UTC, millisecond resolution) followed by
//! a fixed-width sequence number:
//!
//! ```text
//! 20261017T093015042-00000007
//! └──── timestamp ────┘ └ seq ┘
//! ```
//!
//! Ids sort lexically in the order they were minted as long as timestamps
//! are non-decreasing. Within one millisecond the sequence breaks the tie.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Width of the sequence field. The counter wraps at `10^SEQUENCE_DIGITS`.
const SEQUENCE_DIGITS: usize = 8;
const SEQUENCE_MODULUS: u64 = 100_000_000;

/// Timestamp layout, fixed width for years 0..=9999.
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3f";

/// 0000-01-01T00:00:00.000Z in epoch milliseconds.
const EARLIEST_MILLIS: i64 = -62_167_219_200_000;
/// 9999-12-31T23:59:59.999Z in epoch milliseconds.
const LATEST_MILLIS: i64 = 253_402_300_799_999;

/// Process-wide generator used by [`generate_id`].
static DEFAULT_GENERATOR: IdGenerator = IdGenerator::new();

/// Mints sortable ids from delivery timestamps.
///
/// The sequence is a single lock-free counter shared by every caller.
#[derive(Debug)]
pub struct IdGenerator {
    sequence: AtomicU64,
}

impl IdGenerator {
    /// A generator whose sequence starts at zero.
    pub const fn new() -> Self {
        Self {
            sequence: AtomicU64::new(0),
        }
    }

    /// Produce the next id for a delivery at `date`.
    ///
    /// Dates outside years 0..=9999 are clamped to the nearest representable
    /// millisecond so the id keeps its fixed shape.
    pub fn generate(&self, date: DateTime<Utc>) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) % SEQUENCE_MODULUS;
        format!(
            "{}-{:0width$}",
            clamp_to_id_range(date).format(TIMESTAMP_FORMAT),
            seq,
            width = SEQUENCE_DIGITS
        )
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_to_id_range(date: DateTime<Utc>) -> DateTime<Utc> {
    let millis = date.timestamp_millis().clamp(EARLIEST_MILLIS, LATEST_MILLIS);
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

/// Mint an id from the process-wide generator.
pub fn generate_id(date: DateTime<Utc>) -> String {
    DEFAULT_GENERATOR.generate(date)
}

/// Whether `s` has the shape of an id produced by this module.
///
/// Used to reject ids that could escape the mailbox directory when they are
/// turned into file names.
pub fn is_valid_id(s: &str) -> bool {
    let Some((stamp, seq)) = s.split_once('-') else {
        return false;
    };
    stamp.len() == 18
        && stamp.as_bytes()[8] == b'T'
        && stamp
            .bytes()
            .enumerate()
            .all(|(i, b)| i == 8 || b.is_ascii_digit())
        && seq.len() == SEQUENCE_DIGITS
        && seq.bytes().all(|b| b.is_ascii_digit())
}
