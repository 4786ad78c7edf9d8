//! Opening mailbox store files.

pub mod reader;

pub use reader::{open_all, MailStore, StoreOptions};
