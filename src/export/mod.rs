//! Export functionality: frequency tables as TSV.

pub mod tsv;

pub use tsv::{write_bigrams, write_tables, write_unigrams, TableNames};
