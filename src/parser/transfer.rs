//! Content-Transfer-Encoding and RFC 2047 payload decoding.
//!
//! Decoding here is lenient: mail in the wild has broken base64 line
//! lengths, stray characters and half-escaped quoted-printable, and a body
//! that is slightly mangled is still worth counting.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use tracing::debug;

/// Standard alphabet, padding optional, trailing bits tolerated.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode base64, skipping every byte outside the alphabet (line breaks,
/// whitespace, padding, garbage).
pub fn decode_base64(input: &[u8]) -> Option<Vec<u8>> {
    let mut cleaned: Vec<u8> = input
        .iter()
        .copied()
        .filter(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/')
        .collect();
    // A single dangling sextet cannot encode a byte.
    if cleaned.len() % 4 == 1 {
        cleaned.pop();
    }
    LENIENT_BASE64.decode(&cleaned).ok()
}

/// Decode a quoted-printable body, leaving malformed escapes as they are.
pub fn decode_quoted_printable(input: &[u8]) -> Vec<u8> {
    quoted_printable::decode(input, quoted_printable::ParseMode::Robust).unwrap_or_else(|e| {
        debug!(error = %e, "Quoted-printable decoding failed, keeping raw bytes");
        input.to_vec()
    })
}

/// Decode RFC 2047 Q-encoding: underscores → spaces, `=XX` → byte.
pub fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                match hex_pair(bytes[i + 1], bytes[i + 2]) {
                    Some(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    None => {
                        result.push(b'=');
                        i += 1;
                    }
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let hi = (hi as char).to_digit(16)?;
    let lo = (lo as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

/// Undo a part's `Content-Transfer-Encoding`.
///
/// `7bit`, `8bit`, `binary`, unknown and absent encodings leave the bytes
/// untouched. Undecodable base64 also falls back to the raw bytes.
pub fn decode_transfer(encoding: Option<&str>, raw: &[u8]) -> Vec<u8> {
    let encoding = encoding.map(|e| e.trim().to_ascii_lowercase());
    match encoding.as_deref() {
        Some("base64") => decode_base64(raw).unwrap_or_else(|| {
            debug!("Base64 body could not be decoded, keeping raw bytes");
            raw.to_vec()
        }),
        Some("quoted-printable") => decode_quoted_printable(raw),
        _ => raw.to_vec(),
    }
}
