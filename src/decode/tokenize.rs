//! Sentence and word tokenization of decoded body text.
//!
//! Sentences are found with Unicode (UAX #29) sentence boundaries after
//! whitespace has been collapsed, so hard-wrapped mail lines do not end a
//! sentence. A boundary right after a known abbreviation is dropped; after
//! an abbreviation that is also an ordinary word, or after a capital
//! initial, only when the next word does not look like a sentence start. Words are runs of word characters; runs of other
//! non-space characters become separate punctuation tokens.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// Sentinel token opening every sentence.
pub const SENTENCE_START: &str = "<S>";
/// Sentinel token closing every sentence.
pub const SENTENCE_END: &str = "</S>";

static WORD_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+|[^\w\s]+").expect("valid token regex"));

/// Abbreviations (lower-case, without the final period) that do not end a sentence.
const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "vs", "e.g", "i.e", "cf", "inc", "ltd",
    "corp", "dept", "fig", "approx", "resp", "u.s",
];

/// Abbreviations that are also common words ("the answer is no.").
const AMBIGUOUS_ABBREVIATIONS: &[&str] = &["no", "co", "al", "ca", "st"];

/// How a sentence piece ends, as far as joining it to the next one goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PieceEnd {
    Plain,
    Abbreviation,
    Ambiguous,
    Initial,
}

/// Splits text into sentinel-bracketed, lower-cased token sentences.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    abbreviations: HashSet<String>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self {
            abbreviations: DEFAULT_ABBREVIATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Tokenizer {
    /// Default abbreviations plus `extra` (trailing periods are ignored).
    pub fn with_extra_abbreviations<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokenizer = Self::default();
        tokenizer.abbreviations.extend(
            extra
                .into_iter()
                .map(|s| s.as_ref().trim().trim_end_matches('.').to_lowercase())
                .filter(|s| !s.is_empty()),
        );
        tokenizer
    }

    /// Lazily yield the sentences of `text`.
    ///
    /// Each item is `[<S>, token…, </S>]`. Sentences without any token are
    /// skipped.
    pub fn sentences(&self, text: &str) -> Sentences {
        let text = collapse_whitespace(text);
        let spans = self.sentence_spans(&text);
        Sentences {
            text,
            spans: spans.into_iter(),
        }
    }

    /// Byte ranges of the sentences of already-collapsed `text`.
    fn sentence_spans(&self, text: &str) -> Vec<Range<usize>> {
        let pieces: Vec<(usize, &str)> = text.split_sentence_bound_indices().collect();
        let mut spans: Vec<Range<usize>> = Vec::new();
        let mut continues = false;
        let mut after_initial = false;
        for (i, &(start, piece)) in pieces.iter().enumerate() {
            let end = start + piece.len();
            match spans.last_mut() {
                Some(last) if continues => last.end = end,
                _ => spans.push(start..end),
            }

            let next = pieces.get(i + 1).map_or("", |&(_, next)| next);
            let ending = self.piece_end(piece);
            continues = match ending {
                PieceEnd::Plain => false,
                PieceEnd::Abbreviation => true,
                PieceEnd::Ambiguous => continues_lowercase(next),
                // "J. R. R. Tolkien"
                PieceEnd::Initial => {
                    after_initial || continues_lowercase(next) || starts_with_initial(next)
                }
            };
            after_initial = continues && ending == PieceEnd::Initial;
        }
        spans
    }

    fn piece_end(&self, piece: &str) -> PieceEnd {
        let Some(stem) = piece.trim_end().strip_suffix('.') else {
            return PieceEnd::Plain;
        };
        let word = stem
            .rsplit(|c: char| c.is_whitespace() || matches!(c, '(' | '"' | '\''))
            .next()
            .unwrap_or("");

        let mut chars = word.chars();
        match (chars.next(), chars.next()) {
            (None, _) => PieceEnd::Plain,
            // The pronoun, not an initial.
            (Some('I'), None) => PieceEnd::Plain,
            (Some(c), None) if c.is_uppercase() => PieceEnd::Initial,
            _ => {
                let word = word.to_lowercase();
                if self.abbreviations.contains(&word) {
                    PieceEnd::Abbreviation
                } else if AMBIGUOUS_ABBREVIATIONS.contains(&word.as_str()) {
                    PieceEnd::Ambiguous
                } else {
                    PieceEnd::Plain
                }
            }
        }
    }
}

/// Start of `piece` with leading spaces and opening quotes removed.
fn next_word(piece: &str) -> &str {
    piece
        .trim_start()
        .trim_start_matches(|c: char| matches!(c, '(' | '"' | '\''))
}

/// Whether `next` begins with a lower-case letter or a digit.
fn continues_lowercase(next: &str) -> bool {
    next_word(next)
        .chars()
        .next()
        .is_some_and(|c| c.is_lowercase() || c.is_numeric())
}

/// Whether `next` begins with another capital initial (`R.`).
fn starts_with_initial(next: &str) -> bool {
    let mut chars = next_word(next).chars();
    matches!((chars.next(), chars.next()), (Some(c), Some('.')) if c.is_uppercase() && c != 'I')
}

/// Iterator returned by [`Tokenizer::sentences`].
#[derive(Debug)]
pub struct Sentences {
    text: String,
    spans: std::vec::IntoIter<Range<usize>>,
}

impl Iterator for Sentences {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let span = self.spans.next()?;
            let words = word_tokens(&self.text[span]);
            if words.is_empty() {
                continue;
            }
            let mut sentence = Vec::with_capacity(words.len() + 2);
            sentence.push(SENTENCE_START.to_string());
            sentence.extend(words);
            sentence.push(SENTENCE_END.to_string());
            return Some(sentence);
        }
    }
}

/// Lower-cased word and punctuation tokens of one sentence.
pub fn word_tokens(sentence: &str) -> Vec<String> {
    WORD_PUNCT
        .find_iter(sentence)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Replace every whitespace run (line breaks included) with a single space.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
