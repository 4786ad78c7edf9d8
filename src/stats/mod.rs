//! Frequency tables and run statistics.

pub mod ngram;
pub mod run;

pub use ngram::{Bigram, NgramCounter};
pub use run::RunStats;
