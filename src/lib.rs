//! `mailstash`: a file-system message store for a mail capture service.
//!
//! Messages are kept per mailbox under a sharded directory tree. Each mailbox
//! has an index of message metadata in delivery order and one raw file per
//! message. Start from [`MailStore`].

pub mod config;
pub mod error;
pub mod id;
pub mod index;
pub mod model;
pub mod parser;
pub mod store;

pub use error::{Result, StoreError};
pub use model::{EmailAddress, Message, MessageEntry, MessageFlags};
pub use store::{MailStore, Mailbox};
