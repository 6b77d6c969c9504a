//! Email parsing: header summaries for the mailbox index.

pub mod header;
