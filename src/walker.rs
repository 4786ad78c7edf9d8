//! Drives the whole pipeline over one or more mailbox stores.
//!
//! For each message: headers are decoded for diagnostics, the MIME tree is
//! built, the plaintext body is selected and decoded, and its sentences are
//! counted into the caller's [`NgramCounter`]. Nothing that goes wrong with a
//! single message stops the walk; only failing to open a store does, and all
//! stores are opened before the first message is read.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::decode::charset::CharsetPolicy;
use crate::decode::tokenize::Tokenizer;
use crate::error::Result;
use crate::model::message::StoredMessage;
use crate::parser::header::parse_message_headers;
use crate::parser::mime::{attachment_filenames, declared_charsets, parse_message, resolve_plain_body};
use crate::stats::{NgramCounter, RunStats};
use crate::store::{open_all, StoreOptions};

/// Everything that shapes a walk besides the input paths.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Log each message's byte range (or that it is unavailable).
    pub report_offsets: bool,
    pub store: StoreOptions,
    pub charsets: CharsetPolicy,
    pub tokenizer: Tokenizer,
}

impl WalkOptions {
    /// Options built from the configuration file.
    pub fn from_config(config: &Config, report_offsets: bool) -> Self {
        Self {
            report_offsets,
            store: StoreOptions::from(&config.performance),
            charsets: CharsetPolicy::with_fallback(config.decoding.fallback_charsets.as_slice()),
            tokenizer: Tokenizer::with_extra_abbreviations(&config.tokenizer.extra_abbreviations),
        }
    }
}

/// Walk every message of every store in `paths`, in order.
///
/// `progress` receives `(bytes_read, total_bytes)` summed over all stores.
/// Returns an error, with `counter` untouched, if any store cannot be opened.
pub fn walk_mailboxes(
    paths: &[PathBuf],
    options: &WalkOptions,
    counter: &mut NgramCounter,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<RunStats> {
    let stores = open_all(paths, &options.store)?;
    let total_bytes: u64 = stores.iter().map(|store| store.file_size()).sum();

    let mut stats = RunStats {
        stores: stores.len(),
        ..RunStats::default()
    };
    let mut bytes_before: u64 = 0;

    for (path, store) in paths.iter().zip(&stores) {
        info!(path = %path.display(), "Reading mailbox");
        if options.report_offsets && !store.supports_offsets() {
            info!(path = %path.display(), "Store has no byte offsets");
        }

        let store_progress = |read: u64, _size: u64| {
            if let Some(cb) = progress {
                cb(bytes_before + read, total_bytes);
            }
        };
        let count = store.for_each_message(
            &mut |msg| {
                process_message(&msg, options, counter, &mut stats);
                true
            },
            Some(&store_progress),
        )?;

        bytes_before += store.file_size();
        info!(path = %path.display(), messages = count, "Finished mailbox");
    }

    Ok(stats)
}

/// Run one message through the pipeline.
fn process_message(
    msg: &StoredMessage<'_>,
    options: &WalkOptions,
    counter: &mut NgramCounter,
    stats: &mut RunStats,
) {
    stats.messages += 1;
    stats.bytes_scanned += msg.raw.len() as u64;

    let headers = parse_message_headers(msg.raw);
    let subject = headers.subject.as_deref().unwrap_or("");
    let from = headers.from.as_deref().unwrap_or("");
    info!(
        key = msg.key,
        message_id = headers.message_id.as_deref().unwrap_or(""),
        subject,
        "Message"
    );

    if options.report_offsets {
        match msg.range {
            Some(range) => info!(key = msg.key, start = range.start, stop = range.stop, "Offsets"),
            None => {
                stats.offsets_unavailable += 1;
                info!(key = msg.key, "Offsets unavailable");
            }
        }
    }

    let Some(root) = parse_message(msg.raw) else {
        stats.unparseable += 1;
        warn!(key = msg.key, subject, "Could not parse message");
        return;
    };

    for filename in attachment_filenames(&root) {
        info!(
            key = msg.key,
            filename = filename.as_deref().unwrap_or("<unnamed>"),
            "Attachment"
        );
    }

    let Some(body) = resolve_plain_body(&root) else {
        stats.bodies_absent += 1;
        debug!(key = msg.key, "No text/plain part");
        return;
    };

    let declared = declared_charsets(&root);
    let decoded = options.charsets.decode(body, &declared, &mut |failure| {
        stats.charset_failures += 1;
        warn!(
            key = msg.key,
            subject,
            from,
            charset = %failure.charset,
            declared = ?declared,
            error = %failure.error,
            "Charset decoding failed"
        );
    });

    let decoded = match decoded {
        Ok(decoded) => decoded,
        Err(e) => {
            stats.decode_exhausted += 1;
            warn!(key = msg.key, subject, from, declared = ?declared, error = %e, "Body skipped");
            return;
        }
    };
    if decoded.fallback {
        stats.fallback_decodes += 1;
    }
    stats.bodies_decoded += 1;

    for sentence in options.tokenizer.sentences(&decoded.text) {
        stats.sentences += 1;
        stats.tokens += sentence.len().saturating_sub(2) as u64;
        counter.add_sentence(&sentence);
    }
}
