//! MIME handling: building a [`MimePart`] tree from a raw message, picking
//! the plaintext body, and collecting charsets and attachment names.

use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};
use tracing::{debug, warn};

use crate::model::mime::{MimePart, PartBody};
use crate::parser::mbox::skip_from_line;
use crate::parser::transfer::decode_transfer;

/// Maximum depth for recursive multipart parsing (to prevent stack overflow on adversarial input).
const MAX_DEPTH: usize = 32;

/// Content type assumed when a part does not declare one.
const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Parse a complete raw message (headers + body) into its part tree.
///
/// A leading mbox `From ` line is skipped. Returns `None` only when
/// `mail-parser` cannot make anything of the input.
pub fn parse_message(raw_message: &[u8]) -> Option<MimePart> {
    let message_bytes = skip_from_line(raw_message);
    let parsed = MessageParser::default().parse(message_bytes)?;
    convert_message(&parsed, 0)
}

fn convert_message(msg: &Message<'_>, depth: usize) -> Option<MimePart> {
    let root = msg.parts.first()?;
    Some(convert_part(msg, root, depth))
}

fn convert_part(msg: &Message<'_>, part: &MessagePart<'_>, depth: usize) -> MimePart {
    let content_type = part
        .content_type()
        .map(|ct| match ct.subtype() {
            Some(sub) => format!("{}/{}", ct.ctype(), sub),
            None => ct.ctype().to_string(),
        })
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let body = match &part.body {
        PartType::Multipart(ids) if depth < MAX_DEPTH => PartBody::Container(
            ids.iter()
                .filter_map(|&id| msg.parts.get(id as usize))
                .map(|child| convert_part(msg, child, depth + 1))
                .collect(),
        ),
        PartType::Message(nested) if depth < MAX_DEPTH => {
            PartBody::Container(convert_message(nested, depth + 1).into_iter().collect())
        }
        PartType::Multipart(_) | PartType::Message(_) => {
            warn!(depth, "MIME nesting too deep, ignoring nested parts");
            PartBody::Container(Vec::new())
        }
        _ if content_type.to_ascii_lowercase().starts_with("multipart/") => {
            debug!(content_type = %content_type, "Multipart part without parsable children");
            PartBody::Container(Vec::new())
        }
        _ => PartBody::Leaf(leaf_payload(msg, part)),
    };

    let mut result = match body {
        PartBody::Container(children) => MimePart::container(&content_type, children),
        PartBody::Leaf(payload) => MimePart::leaf(&content_type, payload),
    };
    if let Some(charset) = part.content_type().and_then(|ct| ct.attribute("charset")) {
        result = result.with_charset(charset.trim().trim_matches('"'));
    }
    if let Some(disposition) = part.content_disposition() {
        result = result.with_disposition(disposition.ctype(), part.attachment_name());
    }
    result
}

/// The transfer-decoded bytes of a leaf, before any charset decoding.
///
/// `mail-parser` already converts text parts to UTF-8, which would hide the
/// declared charset from the decoding policy, so the raw body is cut out of
/// the message again and only the transfer encoding is undone.
fn leaf_payload(msg: &Message<'_>, part: &MessagePart<'_>) -> Vec<u8> {
    let start = part.offset_body as usize;
    let end = part.offset_end as usize;
    match msg.raw_message.get(start..end) {
        Some(raw) => decode_transfer(part.content_transfer_encoding(), raw),
        None => {
            debug!(start, end, "Part offsets outside message, using parsed contents");
            part.contents().to_vec()
        }
    }
}

/// Select the plaintext body of a message.
///
/// Walks the tree depth-first in pre-order; every `text/plain` leaf replaces
/// the previous candidate, so the last one visited wins.
pub fn resolve_plain_body(root: &MimePart) -> Option<&[u8]> {
    root.walk()
        .filter(|part| part.is_plain_text())
        .filter_map(MimePart::payload)
        .last()
}

/// Charsets declared anywhere in the message, in pre-order, first occurrence kept.
pub fn declared_charsets(root: &MimePart) -> Vec<String> {
    let mut charsets: Vec<String> = Vec::new();
    for charset in root.walk().filter_map(|part| part.charset.as_ref()) {
        if !charsets.contains(charset) {
            charsets.push(charset.clone());
        }
    }
    charsets
}

/// Filenames of the parts carrying a `Content-Disposition` header.
///
/// Only reported for messages whose top-level type is `multipart/*`;
/// `multipart/*` parts themselves are skipped. A disposition without a
/// filename yields `None`.
pub fn attachment_filenames(root: &MimePart) -> Vec<Option<String>> {
    if !root.is_multipart() {
        return Vec::new();
    }
    root.walk()
        .filter(|part| !part.is_multipart() && part.disposition.is_some())
        .map(|part| part.filename.clone())
        .collect()
}
