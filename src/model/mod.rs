//! Core data model types: stored messages and MIME part trees.

pub mod message;
pub mod mime;
