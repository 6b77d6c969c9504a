//! Core data model types for stored messages and addresses.

pub mod address;
pub mod message;

pub use address::EmailAddress;
pub use message::{Message, MessageEntry, MessageFlags};
