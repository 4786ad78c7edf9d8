//! Write the frequency tables as tab-separated text.
//!
//! One `<ngram>\t<count>` line per entry, no header. Bigram tokens are
//! joined by a single space. Rows are sorted by descending count, then by
//! n-gram, so identical input always gives identical files.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::config::OutputConfig;
use crate::error::{GramsError, Result};
use crate::stats::NgramCounter;

/// File names of the two tables inside the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableNames<'a> {
    pub unigrams: &'a str,
    pub bigrams: &'a str,
}

impl Default for TableNames<'_> {
    fn default() -> Self {
        Self {
            unigrams: "unigrams.tsv",
            bigrams: "bigrams.tsv",
        }
    }
}

impl<'a> From<&'a OutputConfig> for TableNames<'a> {
    fn from(config: &'a OutputConfig) -> Self {
        Self {
            unigrams: &config.unigrams_file,
            bigrams: &config.bigrams_file,
        }
    }
}

/// Write the unigram table to `path`.
pub fn write_unigrams(path: &Path, counter: &NgramCounter) -> Result<()> {
    let file = unigram_file(path, counter)?;
    persist(file, path)
}

/// Write the bigram table to `path`.
pub fn write_bigrams(path: &Path, counter: &NgramCounter) -> Result<()> {
    let file = bigram_file(path, counter)?;
    persist(file, path)
}

/// Write both tables into `dir`, creating it if needed.
///
/// Both files are fully written before either is moved into place. The
/// bigram table is moved first; if the unigram table then cannot be moved,
/// the new bigram file is removed again. Returns the paths of the unigram
/// and bigram files.
pub fn write_tables(
    dir: &Path,
    names: TableNames<'_>,
    counter: &NgramCounter,
) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir).map_err(|e| GramsError::output(dir, e))?;
    let unigram_path = dir.join(names.unigrams);
    let bigram_path = dir.join(names.bigrams);

    let unigrams = unigram_file(&unigram_path, counter)?;
    let bigrams = bigram_file(&bigram_path, counter)?;
    persist(bigrams, &bigram_path)?;
    if let Err(e) = persist(unigrams, &unigram_path) {
        if let Err(cleanup) = std::fs::remove_file(&bigram_path) {
            warn!(path = %bigram_path.display(), error = %cleanup, "Could not remove bigram table");
        }
        return Err(e);
    }

    info!(
        unigrams = counter.unigrams().len(),
        bigrams = counter.distinct_bigrams(),
        dir = %dir.display(),
        "Wrote frequency tables"
    );
    Ok((unigram_path, bigram_path))
}

fn unigram_file(path: &Path, counter: &NgramCounter) -> Result<NamedTempFile> {
    write_temp(path, |out| {
        let unigrams = counter.unigrams().iter().map(|(k, &v)| (k.as_str(), v));
        for (token, count) in sorted_rows(unigrams) {
            writeln!(out, "{token}\t{count}")?;
        }
        Ok(())
    })
}

fn bigram_file(path: &Path, counter: &NgramCounter) -> Result<NamedTempFile> {
    write_temp(path, |out| {
        for ((first, second), count) in sorted_rows(counter.bigrams()) {
            writeln!(out, "{first} {second}\t{count}")?;
        }
        Ok(())
    })
}

/// Rows by descending count, ties broken by ascending key.
fn sorted_rows<K: Ord>(rows: impl IntoIterator<Item = (K, u64)>) -> Vec<(K, u64)> {
    let mut rows: Vec<(K, u64)> = rows.into_iter().collect();
    rows.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

/// Write into a temporary file next to `path`.
fn write_temp(
    path: &Path,
    fill: impl FnOnce(&mut dyn Write) -> std::io::Result<()>,
) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file = NamedTempFile::new_in(dir).map_err(|e| GramsError::output(path, e))?;

    let mut out = BufWriter::new(file);
    fill(&mut out).map_err(|e| GramsError::output(path, e))?;
    out.flush().map_err(|e| GramsError::output(path, e))?;
    out.into_inner()
        .map_err(|e| GramsError::output(path, e.into_error()))
}

fn persist(file: NamedTempFile, path: &Path) -> Result<()> {
    file.persist(path)
        .map_err(|e| GramsError::output(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NgramCounter {
        let mut counter = NgramCounter::new();
        counter.add_sentence(&["<S>", "hello", "world", "</S>"]);
        counter.add_sentence(&["<S>", "hello", "again", "</S>"]);
        counter
    }

    #[test]
    fn test_unigram_rows_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("u.tsv");
        write_unigrams(&path, &sample()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec!["</S>\t2", "<S>\t2", "hello\t2", "again\t1", "world\t1"]
        );
    }

    #[test]
    fn test_bigram_tokens_joined_by_space() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.tsv");
        write_bigrams(&path, &sample()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("<S> hello\t2\n"));
        assert!(text.contains("hello world\t1\n"));
        assert!(text.contains("again </S>\t1\n"));
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn test_write_tables_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let (unigrams, bigrams) = write_tables(&out, TableNames::default(), &sample()).unwrap();
        assert_eq!(unigrams, out.join("unigrams.tsv"));
        assert!(unigrams.is_file());
        assert!(bigrams.is_file());
        // No temporary files left behind.
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 2);
    }

    #[test]
    fn test_failed_unigram_move_leaves_no_bigram_table() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in the way makes moving the unigram table fail.
        std::fs::create_dir(dir.path().join("unigrams.tsv")).unwrap();
        std::fs::write(dir.path().join("unigrams.tsv/keep"), b"x").unwrap();

        let err = write_tables(dir.path(), TableNames::default(), &sample()).unwrap_err();
        assert!(matches!(err, GramsError::Output { .. }));
        assert!(!dir.path().join("bigrams.tsv").exists());
        assert!(dir.path().join("unigrams.tsv").is_dir());
        // Only the blocking directory is left.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_empty_counter_writes_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let (unigrams, _) =
            write_tables(dir.path(), TableNames::default(), &NgramCounter::new()).unwrap();
        assert_eq!(std::fs::read_to_string(unigrams).unwrap(), "");
    }
}
