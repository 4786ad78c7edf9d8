//! `mboxgrams`: unigram and bigram frequency tables from mbox archives.
//!
//! This crate provides the core library: streaming mailbox readers, MIME
//! body selection, charset decoding, sentence tokenization and the n-gram
//! accumulator, plus the TSV writer used by the command-line tool.

pub mod config;
pub mod decode;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod stats;
pub mod store;
pub mod walker;
