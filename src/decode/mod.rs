//! Turning body bytes into counted tokens: charset decoding and tokenization.

pub mod charset;
pub mod tokenize;
