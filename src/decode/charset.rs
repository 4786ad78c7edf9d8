//! Charset decoding policy for message bodies.
//!
//! Declared charsets are tried first, in declaration order; if none of them
//! decodes the bytes, a fixed fallback list is tried. Every decode is strict:
//! a charset either maps all of the bytes or it fails. The first success wins.

use std::borrow::Cow;

use encoding_rs::Encoding;
use tracing::warn;

use crate::error::CharsetError;

/// A charset we know how to decode strictly.
///
/// ASCII and Latin-1 are handled directly because `encoding_rs` follows the
/// WHATWG rule of mapping both labels to Windows-1252, which is neither
/// strict for ASCII nor byte-identical to ISO-8859-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Ascii,
    Latin1,
    Other(&'static Encoding),
}

impl Charset {
    /// Resolve a charset label (case-insensitive, quotes and whitespace ignored).
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().trim_matches('"').trim().to_ascii_lowercase();
        match label.as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "us-ascii" | "ascii" | "ansi_x3.4-1968" | "iso646-us" | "646" | "us" => {
                Some(Self::Ascii)
            }
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin-1" | "latin1" | "l1"
            | "cp819" | "ibm819" => Some(Self::Latin1),
            other => Encoding::for_label(other.as_bytes()).map(|encoding| {
                if encoding == encoding_rs::UTF_8 {
                    Self::Utf8
                } else {
                    Self::Other(encoding)
                }
            }),
        }
    }

    /// Canonical name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Ascii => "us-ascii",
            Self::Latin1 => "iso-8859-1",
            Self::Other(encoding) => encoding.name(),
        }
    }

    /// Decode `bytes` without any replacement characters.
    pub fn decode<'b>(&self, bytes: &'b [u8]) -> Result<Cow<'b, str>, CharsetError> {
        let malformed = || CharsetError::Malformed {
            charset: self.name().to_string(),
        };
        match self {
            Self::Utf8 => std::str::from_utf8(bytes)
                .map(Cow::Borrowed)
                .map_err(|_| malformed()),
            Self::Ascii if bytes.is_ascii() => std::str::from_utf8(bytes)
                .map(Cow::Borrowed)
                .map_err(|_| malformed()),
            Self::Ascii => Err(malformed()),
            Self::Latin1 => Ok(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())),
            Self::Other(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .ok_or_else(malformed),
        }
    }
}

/// Decode `bytes` with the charset named by `label`.
pub fn decode_with_label<'b>(label: &str, bytes: &'b [u8]) -> Result<Cow<'b, str>, CharsetError> {
    Charset::from_label(label)
        .ok_or_else(|| CharsetError::UnknownCharset(label.to_string()))?
        .decode(bytes)
}

/// One failed decode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    /// The label as it was tried (declared label or fallback name).
    pub charset: String,
    /// Whether this attempt came from the fallback list.
    pub fallback: bool,
    pub error: CharsetError,
}

/// Successfully decoded body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBody {
    pub text: String,
    /// Canonical name of the charset that succeeded.
    pub charset: &'static str,
    /// `true` if no declared charset worked and a fallback was used.
    pub fallback: bool,
}

/// Declared-then-fallback decoding policy.
#[derive(Debug, Clone)]
pub struct CharsetPolicy {
    fallback: Vec<Charset>,
}

impl Default for CharsetPolicy {
    fn default() -> Self {
        Self {
            fallback: vec![Charset::Utf8, Charset::Ascii, Charset::Latin1],
        }
    }
}

impl CharsetPolicy {
    /// Build a policy from configured fallback labels.
    ///
    /// Unknown labels are dropped with a warning.
    pub fn with_fallback<S: AsRef<str>>(labels: &[S]) -> Self {
        let fallback = labels
            .iter()
            .filter_map(|label| {
                let label = label.as_ref();
                let charset = Charset::from_label(label);
                if charset.is_none() {
                    warn!(charset = label, "Ignoring unknown fallback charset");
                }
                charset
            })
            .collect();
        Self { fallback }
    }

    /// Fallback charsets in the order they are tried.
    pub fn fallback(&self) -> &[Charset] {
        &self.fallback
    }

    /// Decode a body.
    ///
    /// `declared` are the charset labels found anywhere in the message, in
    /// declaration order without duplicates. They are tried against these
    /// bytes even if they were declared on a different part. `on_failure` is
    /// called once for every attempt that fails.
    pub fn decode(
        &self,
        bytes: &[u8],
        declared: &[String],
        on_failure: &mut dyn FnMut(&DecodeFailure),
    ) -> Result<DecodedBody, CharsetError> {
        let mut attempted = Vec::with_capacity(declared.len() + self.fallback.len());

        for label in declared {
            attempted.push(label.clone());
            let result = Charset::from_label(label)
                .ok_or_else(|| CharsetError::UnknownCharset(label.clone()))
                .and_then(|charset| {
                    charset.decode(bytes).map(|text| DecodedBody {
                        text: text.into_owned(),
                        charset: charset.name(),
                        fallback: false,
                    })
                });
            match result {
                Ok(body) => return Ok(body),
                Err(error) => on_failure(&DecodeFailure {
                    charset: label.clone(),
                    fallback: false,
                    error,
                }),
            }
        }

        for charset in &self.fallback {
            attempted.push(charset.name().to_string());
            match charset.decode(bytes) {
                Ok(text) => {
                    return Ok(DecodedBody {
                        text: text.into_owned(),
                        charset: charset.name(),
                        fallback: true,
                    })
                }
                Err(error) => on_failure(&DecodeFailure {
                    charset: charset.name().to_string(),
                    fallback: true,
                    error,
                }),
            }
        }

        Err(CharsetError::Exhausted { attempted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_collecting(
        policy: &CharsetPolicy,
        bytes: &[u8],
        declared: &[&str],
    ) -> (Result<DecodedBody, CharsetError>, Vec<DecodeFailure>) {
        let declared: Vec<String> = declared.iter().map(|s| s.to_string()).collect();
        let mut failures = Vec::new();
        let result = policy.decode(bytes, &declared, &mut |f| failures.push(f.clone()));
        (result, failures)
    }

    #[test]
    fn test_labels() {
        assert_eq!(Charset::from_label("UTF-8"), Some(Charset::Utf8));
        assert_eq!(Charset::from_label("\"us-ascii\""), Some(Charset::Ascii));
        assert_eq!(Charset::from_label("ISO-8859-1"), Some(Charset::Latin1));
        assert_eq!(
            Charset::from_label("koi8-r"),
            Some(Charset::Other(encoding_rs::KOI8_R))
        );
        assert_eq!(Charset::from_label("x-no-such-charset"), None);
    }

    #[test]
    fn test_strict_ascii_rejects_high_bytes() {
        assert!(Charset::Ascii.decode(b"caf\xe9").is_err());
        assert_eq!(Charset::Ascii.decode(b"plain").unwrap(), "plain");
    }

    #[test]
    fn test_latin1_is_total() {
        let all: Vec<u8> = (0..=255).collect();
        let text = Charset::Latin1.decode(&all).unwrap();
        assert_eq!(text.chars().count(), 256);
        assert_eq!(text.chars().nth(0x80), Some('\u{80}'));
    }

    #[test]
    fn test_declared_charset_wins() {
        let (result, failures) =
            decode_collecting(&CharsetPolicy::default(), b"caf\xe9", &["iso-8859-1"]);
        let body = result.unwrap();
        assert_eq!(body.text, "café");
        assert_eq!(body.charset, "iso-8859-1");
        assert!(!body.fallback);
        assert!(failures.is_empty());
    }

    #[test]
    fn test_first_success_not_best_match() {
        // windows-1251 accepts these bytes, so it wins even though the text
        // was really Latin-1.
        let (result, _) = decode_collecting(
            &CharsetPolicy::default(),
            b"caf\xe9",
            &["windows-1251", "iso-8859-1"],
        );
        assert_eq!(result.unwrap().charset, "windows-1251");
    }

    #[test]
    fn test_failed_declared_then_fallback() {
        let (result, failures) =
            decode_collecting(&CharsetPolicy::default(), b"caf\xe9", &["utf-8", "x-bogus"]);
        let body = result.unwrap();
        assert_eq!(body.text, "café");
        assert!(body.fallback);
        assert_eq!(body.charset, "iso-8859-1");

        // Two declared failures, then utf-8 and us-ascii from the fallback list.
        let tried: Vec<&str> = failures.iter().map(|f| f.charset.as_str()).collect();
        assert_eq!(tried, vec!["utf-8", "x-bogus", "utf-8", "us-ascii"]);
        assert_eq!(
            failures[1].error,
            CharsetError::UnknownCharset("x-bogus".into())
        );
    }

    #[test]
    fn test_undeclared_latin1_falls_back() {
        let (result, failures) = decode_collecting(&CharsetPolicy::default(), b"na\xefve", &[]);
        assert_eq!(result.unwrap().text, "naïve");
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|f| f.fallback));
    }

    #[test]
    fn test_undeclared_utf8_uses_first_fallback() {
        let (result, failures) =
            decode_collecting(&CharsetPolicy::default(), "naïve".as_bytes(), &[]);
        let body = result.unwrap();
        assert_eq!(body.text, "naïve");
        assert_eq!(body.charset, "utf-8");
        assert!(failures.is_empty());
    }

    #[test]
    fn test_exhausted_without_latin1() {
        let policy = CharsetPolicy::with_fallback(&["utf-8", "ascii", "no-such"]);
        assert_eq!(policy.fallback().len(), 2);
        let (result, failures) = decode_collecting(&policy, b"\xff\xfe\xfd", &["utf-8"]);
        assert_eq!(
            result.unwrap_err(),
            CharsetError::Exhausted {
                attempted: vec!["utf-8".into(), "utf-8".into(), "us-ascii".into()]
            }
        );
        assert_eq!(failures.len(), 3);
    }
}
