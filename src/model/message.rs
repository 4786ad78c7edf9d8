//! Messages as read from a mailbox store.

/// Half-open byte range `[start, stop)` of a message inside its store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Offset of the `From ` separator line.
    pub start: u64,
    /// Offset just past the message (the blank separator line is excluded).
    pub stop: u64,
}

impl ByteRange {
    /// Length of the range in bytes.
    pub fn len(&self) -> u64 {
        self.stop.saturating_sub(self.start)
    }

    /// `true` if the range covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One message handed out by a store, borrowed for the duration of a callback.
#[derive(Debug)]
pub struct StoredMessage<'a> {
    /// Ordinal of the message within its store (0, 1, 2, …).
    pub key: u64,
    /// Byte range in the store file; `None` when the store cannot tell.
    pub range: Option<ByteRange>,
    /// Raw message bytes, including the `From ` line for mbox stores.
    pub raw: &'a [u8],
}

/// Headers the walker reports per message.
///
/// `subject` and `from` are RFC 2047-decoded; all three are `None` when
/// the header is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeaders {
    pub subject: Option<String>,
    pub from: Option<String>,
    pub message_id: Option<String>,
}
