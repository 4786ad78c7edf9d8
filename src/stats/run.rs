//! Per-run bookkeeping reported at the end of a walk.

use serde::Serialize;

/// What happened during one run over a set of mailbox stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Stores opened and walked.
    pub stores: usize,
    /// Messages seen across all stores.
    pub messages: u64,
    /// Messages that `mail-parser` could not parse at all.
    pub unparseable: u64,
    /// Messages with a plaintext body that was decoded and tokenized.
    pub bodies_decoded: u64,
    /// Messages without any `text/plain` leaf.
    pub bodies_absent: u64,
    /// Bodies decoded only thanks to the fallback charset list.
    pub fallback_decodes: u64,
    /// Individual failed charset attempts.
    pub charset_failures: u64,
    /// Bodies for which every charset candidate failed.
    pub decode_exhausted: u64,
    /// Messages whose byte range could not be reported.
    pub offsets_unavailable: u64,
    /// Sentences counted.
    pub sentences: u64,
    /// Tokens counted, sentinels excluded.
    pub tokens: u64,
    /// Raw message bytes read from all stores.
    pub bytes_scanned: u64,
}

impl RunStats {
    /// Messages whose body was not decoded, so contributed nothing.
    pub fn messages_without_tokens(&self) -> u64 {
        self.messages.saturating_sub(self.bodies_decoded)
    }
}
