//! Per-mailbox index: the ordered metadata of every live message.

pub mod file;
pub mod format;
pub mod query;

pub use file::{index_path, load, remove, save};
