//! Email parsing: MBOX streaming reader, EML reader, header decoding, MIME tree and transfer decoding.

pub mod eml;
pub mod header;
pub mod mbox;
pub mod mime;
pub mod transfer;
