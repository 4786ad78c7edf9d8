//! Corpus-wide unigram and bigram frequency tables.

use std::collections::HashMap;

use crate::decode::tokenize::SENTENCE_START;

/// An ordered pair of adjacent tokens.
pub type Bigram<'a> = (&'a str, &'a str);

/// Running unigram and bigram counts for a whole corpus.
///
/// Only counts are kept, never text. Counts only ever grow. Two counters
/// built from disjoint shards of a corpus can be combined with
/// [`NgramCounter::merge`] and give the same tables as one sequential pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NgramCounter {
    unigrams: HashMap<String, u64>,
    /// First token -> second token -> count.
    bigrams: HashMap<String, HashMap<String, u64>>,
}

impl NgramCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every token once.
    pub fn add_unigrams<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for token in tokens {
            bump(&mut self.unigrams, token.as_ref());
        }
    }

    /// Count every adjacent pair of one sentence (sentinels included).
    ///
    /// Pairs never span two calls, so `(</S>, <S>)` cannot appear.
    pub fn add_bigrams<S: AsRef<str>>(&mut self, sentence: &[S]) {
        for pair in sentence.windows(2) {
            let (first, second) = (pair[0].as_ref(), pair[1].as_ref());
            if let Some(followers) = self.bigrams.get_mut(first) {
                bump(followers, second);
            } else {
                self.bigrams.insert(
                    first.to_string(),
                    HashMap::from([(second.to_string(), 1)]),
                );
            }
        }
    }

    /// Count one sentinel-bracketed sentence into both tables.
    pub fn add_sentence<S: AsRef<str>>(&mut self, sentence: &[S]) {
        self.add_unigrams(sentence);
        self.add_bigrams(sentence);
    }

    /// Add all counts of `other` into `self`.
    pub fn merge(&mut self, other: NgramCounter) {
        for (token, count) in other.unigrams {
            *self.unigrams.entry(token).or_insert(0) += count;
        }
        for (first, followers) in other.bigrams {
            let mine = self.bigrams.entry(first).or_default();
            for (second, count) in followers {
                *mine.entry(second).or_insert(0) += count;
            }
        }
    }

    /// The unigram table. Iteration order carries no meaning.
    pub fn unigrams(&self) -> &HashMap<String, u64> {
        &self.unigrams
    }

    /// Every bigram with its count. Iteration order carries no meaning.
    pub fn bigrams(&self) -> impl Iterator<Item = (Bigram<'_>, u64)> + '_ {
        self.bigrams.iter().flat_map(|(first, followers)| {
            followers
                .iter()
                .map(move |(second, &count)| ((first.as_str(), second.as_str()), count))
        })
    }

    /// Number of distinct bigrams.
    pub fn distinct_bigrams(&self) -> usize {
        self.bigrams.values().map(HashMap::len).sum()
    }

    /// Sum of all bigram counts.
    pub fn bigram_total(&self) -> u64 {
        self.bigrams.values().flat_map(HashMap::values).sum()
    }

    /// Count of a single token (0 if never seen).
    pub fn unigram_count(&self, token: &str) -> u64 {
        self.unigrams.get(token).copied().unwrap_or(0)
    }

    /// Count of an adjacent token pair (0 if never seen).
    pub fn bigram_count(&self, first: &str, second: &str) -> u64 {
        self.bigrams
            .get(first)
            .and_then(|followers| followers.get(second))
            .copied()
            .unwrap_or(0)
    }

    /// Number of sentences counted so far.
    pub fn sentence_count(&self) -> u64 {
        self.unigram_count(SENTENCE_START)
    }

    /// Sum of all unigram counts, sentinels included.
    pub fn total_tokens(&self) -> u64 {
        self.unigrams.values().sum()
    }

    /// `true` if nothing has been counted.
    pub fn is_empty(&self) -> bool {
        self.unigrams.is_empty()
    }
}

/// Count `key` once, allocating it only on first sight.
fn bump(table: &mut HashMap<String, u64>, key: &str) {
    if let Some(count) = table.get_mut(key) {
        *count += 1;
    } else {
        table.insert(key.to_string(), 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::tokenize::{Tokenizer, SENTENCE_END};

    fn counted(text: &str) -> NgramCounter {
        let mut counter = NgramCounter::new();
        for sentence in Tokenizer::default().sentences(text) {
            counter.add_sentence(&sentence);
        }
        counter
    }

    #[test]
    fn test_sentence_contributes_n_plus_one_bigrams() {
        let mut counter = NgramCounter::new();
        counter.add_sentence(&["<S>", "a", "b", "c", "</S>"]);
        assert_eq!(counter.bigram_total(), 4);
        assert_eq!(counter.distinct_bigrams(), 4);
        // Three tokens plus the two sentinels.
        assert_eq!(counter.total_tokens(), 5);
        assert_eq!(counter.bigram_count("<S>", "a"), 1);
        assert_eq!(counter.bigram_count("c", "</S>"), 1);
    }

    #[test]
    fn test_no_cross_sentence_bigram() {
        let counter = counted("First one. Second one. Third one.");
        assert_eq!(counter.bigram_count(SENTENCE_END, SENTENCE_START), 0);
        assert_eq!(counter.bigram_count(".", "second"), 0);
        assert_eq!(counter.bigram_count(SENTENCE_START, "second"), 1);

        let counter = counted("The answer is no. We leave now.");
        assert_eq!(counter.sentence_count(), 2);
        assert_eq!(counter.bigram_count(".", "we"), 0);
        assert_eq!(counter.bigram_count(SENTENCE_START, "we"), 1);
    }

    #[test]
    fn test_sentinels_balance() {
        let counter = counted("One. Two! Three? Four.");
        assert_eq!(counter.sentence_count(), 4);
        assert_eq!(counter.unigram_count(SENTENCE_END), 4);
    }

    #[test]
    fn test_repeated_tokens_accumulate() {
        let mut counter = NgramCounter::new();
        counter.add_unigrams(["x", "y", "x"]);
        counter.add_unigrams(vec!["x".to_string()]);
        assert_eq!(counter.unigram_count("x"), 3);
        assert_eq!(counter.unigram_count("y"), 1);
        assert_eq!(counter.unigram_count("z"), 0);
    }

    #[test]
    fn test_merge_equals_sequential() {
        let texts = ["Hello world. Bye now.", "Hello again.", "World peace now."];
        let tokenizer = Tokenizer::default();

        let mut sequential = NgramCounter::new();
        for text in texts {
            for sentence in tokenizer.sentences(text) {
                sequential.add_sentence(&sentence);
            }
        }

        let mut left = counted(texts[0]);
        let mut right = counted(texts[2]);
        right.merge(counted(texts[1]));
        left.merge(right);

        assert_eq!(left, sequential);
        assert_eq!(left.unigram_count("hello"), 2);
        assert_eq!(left.unigram_count("now"), 2);
        assert_eq!(left.bigram_count("bye", "now"), 1);
        assert_eq!(left.bigram_count("now", "."), 2);
    }

    #[test]
    fn test_repeated_bigrams_accumulate() {
        let mut counter = NgramCounter::new();
        counter.add_bigrams(&["a", "b", "a", "b"]);
        counter.add_bigrams(&["a", "c"]);
        assert_eq!(counter.bigram_count("a", "b"), 2);
        assert_eq!(counter.bigram_count("b", "a"), 1);
        assert_eq!(counter.bigram_count("a", "c"), 1);
        assert_eq!(counter.bigram_count("c", "a"), 0);
        assert_eq!(counter.distinct_bigrams(), 3);
        assert_eq!(counter.bigram_total(), 4);
    }

    #[test]
    fn test_empty_counter() {
        let counter = NgramCounter::new();
        assert!(counter.is_empty());
        assert_eq!(counter.sentence_count(), 0);
        assert_eq!(counter.distinct_bigrams(), 0);
        assert_eq!(counter.bigrams().count(), 0);
    }
}
