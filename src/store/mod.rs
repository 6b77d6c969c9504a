//! Mailbox storage: sharded directories, message objects and the store root.

pub mod locks;
pub mod mailbox;
pub mod objects;
pub mod root;
pub mod shard;

pub use mailbox::Mailbox;
pub use root::MailStore;
