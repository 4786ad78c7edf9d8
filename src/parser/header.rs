//! RFC 5322 header block handling and RFC 2047 encoded-word decoding.

use tracing::debug;

use crate::decode::charset::decode_with_label;
use crate::model::message::MessageHeaders;
use crate::parser::mbox::skip_from_line;
use crate::parser::transfer::{decode_base64, decode_q_encoding};

/// Extract the headers the walker reports from a raw message.
///
/// A leading mbox `From ` line is skipped.
pub fn parse_message_headers(raw_message: &[u8]) -> MessageHeaders {
    let text = decode_header_bytes(split_header_block(raw_message));
    let headers = unfold_headers(&text);

    MessageHeaders {
        subject: decode_header(get_header(&headers, "subject")),
        from: decode_header(get_header(&headers, "from")),
        message_id: get_header(&headers, "message-id").map(|s| s.trim().to_string()),
    }
}

/// Decode an optional raw header value.
///
/// `None` stays `None`; anything else goes through [`decode_encoded_words`].
pub fn decode_header(raw: Option<&str>) -> Option<String> {
    raw.map(decode_encoded_words)
}

/// The header block of a raw message, without any mbox `From ` line.
///
/// A message with no blank line is all headers.
pub fn split_header_block(raw_message: &[u8]) -> &[u8] {
    let message = skip_from_line(raw_message);
    &message[..find_header_end(message).unwrap_or(message.len())]
}

/// Find the byte offset where headers end (position of the first blank line).
pub fn find_header_end(data: &[u8]) -> Option<usize> {
    if data.starts_with(b"\n") || data.starts_with(b"\r\n") {
        return Some(0);
    }
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some(i);
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some(i);
        }
    }
    None
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Unfold headers: join continuation lines (starting with space or tab) with the previous header.
///
/// Returns a list of `(lowercase_name, raw_value)` pairs.
pub fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_lowercase();
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
    }

    result
}

/// Get the first value for a header name (lower-case).
pub fn get_header<'h>(headers: &'h [(String, String)], name: &str) -> Option<&'h str> {
    headers
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// An encoded-word whose payload or charset cannot be decoded is kept in its
/// raw `=?…?=` form; the rest of the header is still decoded.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        // Whitespace between two encoded words is not part of the text (RFC 2047 §6.2)
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];
        match EncodedWord::split(after_start) {
            Some(word) => {
                let raw = &remaining[start..start + 2 + word.consumed];
                match word.decode() {
                    Some(text) => {
                        result.push_str(&text);
                        last_was_encoded = true;
                    }
                    None => {
                        debug!(word = raw, "Keeping undecodable encoded-word as-is");
                        result.push_str(raw);
                        last_was_encoded = false;
                    }
                }
                remaining = &remaining[start + 2 + word.consumed..];
            }
            None => {
                result.push_str("=?");
                remaining = after_start;
                last_was_encoded = false;
            }
        }
    }

    result.push_str(remaining);
    result
}

/// The three fields of `charset?encoding?text?=`.
struct EncodedWord<'a> {
    charset: &'a str,
    encoding: &'a str,
    text: &'a str,
    /// Bytes consumed from the string *after* the initial `=?`.
    consumed: usize,
}

impl<'a> EncodedWord<'a> {
    fn split(s: &'a str) -> Option<Self> {
        let first_q = s.find('?')?;
        let charset = &s[..first_q];
        if charset.contains(char::is_whitespace) {
            return None;
        }

        let rest = &s[first_q + 1..];
        let second_q = rest.find('?')?;
        let encoding = &rest[..second_q];
        if encoding.len() != 1 {
            return None;
        }

        let rest2 = &rest[second_q + 1..];
        let end = rest2.find("?=")?;

        Some(Self {
            charset,
            encoding,
            text: &rest2[..end],
            consumed: first_q + 1 + second_q + 1 + end + 2,
        })
    }

    fn decode(&self) -> Option<String> {
        let bytes = match self.encoding {
            "B" | "b" => decode_base64(self.text.as_bytes())?,
            "Q" | "q" => decode_q_encoding(self.text),
            _ => return None,
        };

        // RFC 2231 language suffix: "utf-8*en"
        let charset = self.charset.split('*').next().unwrap_or("");
        let charset = if charset.is_empty() { "utf-8" } else { charset };

        decode_with_label(charset, &bytes)
            .map(|text| text.into_owned())
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_encoded_word() {
        let input = "=?UTF-8?B?SG9sYSBtdW5kbw==?=";
        assert_eq!(decode_encoded_words(input), "Hola mundo");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        let input = "=?ISO-8859-1?Q?caf=E9?=";
        assert_eq!(decode_encoded_words(input), "café");
    }

    #[test]
    fn test_decode_multiple_encoded_words() {
        let input = "=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?=";
        assert_eq!(decode_encoded_words(input), "Hola mundo");
    }

    #[test]
    fn test_decode_mixed_plain_and_encoded() {
        let input = "Re: =?UTF-8?B?SG9sYQ==?= there";
        assert_eq!(decode_encoded_words(input), "Re: Hola there");
    }

    #[test]
    fn test_undecodable_word_passes_through() {
        // 0xE9 alone is not valid UTF-8.
        let input = "Hi =?UTF-8?Q?caf=E9?= and =?UTF-8?B?SG9sYQ==?=";
        assert_eq!(
            decode_encoded_words(input),
            "Hi =?UTF-8?Q?caf=E9?= and Hola"
        );
    }

    #[test]
    fn test_unknown_charset_passes_through() {
        let input = "=?x-martian?Q?zork?=";
        assert_eq!(decode_encoded_words(input), input);
    }

    #[test]
    fn test_missing_charset_defaults_to_utf8() {
        assert_eq!(decode_encoded_words("=??Q?caf=C3=A9?="), "café");
    }

    #[test]
    fn test_language_suffix_ignored() {
        assert_eq!(decode_encoded_words("=?ISO-8859-1*fr?Q?=E9t=E9?="), "été");
    }

    #[test]
    fn test_not_an_encoded_word() {
        assert_eq!(decode_encoded_words("what =? is this"), "what =? is this");
        assert_eq!(decode_encoded_words("Normal subject"), "Normal subject");
    }

    #[test]
    fn test_decode_header_absent() {
        assert_eq!(decode_header(None), None);
        assert_eq!(decode_header(Some("")), Some(String::new()));
    }

    #[test]
    fn test_decode_windows1252_encoded_word() {
        let input = "=?Windows-1252?Q?M=FCller?=";
        assert_eq!(decode_encoded_words(input), "Müller");
    }

    #[test]
    fn test_unfold_headers() {
        let text = "Subject: This is a long\n\tsubject line\nFrom: user@example.com\n";
        let headers = unfold_headers(text);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].0, "subject");
        assert_eq!(headers[0].1, "This is a long subject line");
    }

    #[test]
    fn test_find_header_end() {
        let data = b"From: a@b.com\nSubject: Hi\n\nBody\n";
        assert_eq!(find_header_end(data), Some(25));
        let data = b"From: a@b.com\r\nSubject: Hi\r\n\r\nBody\r\n";
        assert_eq!(find_header_end(data), Some(26));
    }

    #[test]
    fn test_split_header_block() {
        let raw = b"From a@b Mon Jan 01 00:00:00 2024\nSubject: x\n\nbody\n";
        assert_eq!(split_header_block(raw), b"Subject: x");
        assert_eq!(split_header_block(b"Subject: only"), b"Subject: only");
    }

    #[test]
    fn test_parse_message_headers() {
        let raw = b"From sender@example.com Mon Jan 01 00:00:00 2024\n\
Message-ID: <m1@example.com>\n\
From: =?UTF-8?Q?Jos=C3=A9?= <jose@example.com>\n\
Subject: =?UTF-8?B?SG9sYQ==?=\n\
\tworld\n\
\n\
Subject: not a header\n";
        let headers = parse_message_headers(raw);
        assert_eq!(headers.message_id.as_deref(), Some("<m1@example.com>"));
        assert_eq!(headers.from.as_deref(), Some("José <jose@example.com>"));
        assert_eq!(headers.subject.as_deref(), Some("Hola world"));
    }

    #[test]
    fn test_parse_message_headers_missing() {
        let headers = parse_message_headers(b"X-Other: 1\n\nbody\n");
        assert_eq!(headers, MessageHeaders::default());
    }
}
