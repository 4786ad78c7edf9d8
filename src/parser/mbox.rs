//! Streaming MBOX reader.
//!
//! Reads MBOX files line-by-line through a large buffer and hands out one
//! message at a time. Never loads the entire file into memory. Tolerant of
//! malformed input.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{GramsError, Result};
use crate::model::message::{ByteRange, StoredMessage};

/// Default size of the internal read buffer (1 MB for fast sequential reads on modern SSDs).
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Default maximum message size in bytes (256 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 256 * 1024 * 1024;

/// How far into a file [`MboxReader::validate`] looks for the first line.
const VALIDATE_LIMIT: u64 = 64 * 1024;

/// Progress is reported every 4 MB.
const PROGRESS_INTERVAL: u64 = 4 * 1024 * 1024;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Streaming MBOX reader.
///
/// Reads through the file sequentially, invoking a caller-supplied callback for
/// every message it finds. The reader is tolerant of:
///
/// - Mixed `\n` and `\r\n` line endings
/// - `From ` lines not preceded by a blank line (logs a warning)
/// - Truncated messages at EOF
/// - NUL bytes and other binary content in the body
/// - UTF-8 BOM at the start of the file
///
/// Each message is reported with its byte range `[start, stop)`: `start` is
/// the offset of its `From ` line, `stop` leaves out the blank line that
/// separates it from the next message (or ends the file).
#[derive(Debug)]
pub struct MboxReader {
    path: PathBuf,
    file_size: u64,
    buffer_size: usize,
    max_message_size: usize,
}

impl MboxReader {
    /// Create a reader for the given MBOX file.
    ///
    /// Verifies that the file exists and is readable, but does NOT validate
    /// that it is actually an MBOX; see [`MboxReader::validate`].
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GramsError::FileNotFound(path.clone())
            } else {
                GramsError::io(&path, e)
            }
        })?;
        if metadata.is_dir() {
            return Err(GramsError::InvalidMbox(path));
        }
        Ok(Self {
            path,
            file_size: metadata.len(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        })
    }

    /// Use a read buffer of `size` bytes (at least 4 KB).
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(4096);
        self
    }

    /// Truncate messages larger than `size` bytes.
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Total size of the underlying file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Check that the file looks like an MBOX.
    ///
    /// An empty (or all-blank) file is a valid, empty mailbox. Otherwise the
    /// first non-blank line, after an optional BOM, must be a `From ` line.
    pub fn validate(&self) -> Result<()> {
        if self.file_size == 0 {
            return Ok(());
        }

        let file = File::open(&self.path).map_err(|e| GramsError::io(&self.path, e))?;
        let mut reader = BufReader::new(file.take(VALIDATE_LIMIT));
        let mut line = Vec::with_capacity(256);
        let mut first = true;

        loop {
            line.clear();
            let n = reader
                .read_until(b'\n', &mut line)
                .map_err(|e| GramsError::io(&self.path, e))?;
            if n == 0 {
                // Nothing but blank lines within the limit.
                return if reader.into_inner().limit() == 0 {
                    Err(GramsError::InvalidMbox(self.path.clone()))
                } else {
                    Ok(())
                };
            }
            let content = if first {
                line.strip_prefix(UTF8_BOM).unwrap_or(&line)
            } else {
                &line[..]
            };
            first = false;
            if is_blank_line(content) {
                continue;
            }
            return if content.starts_with(b"From ") {
                Ok(())
            } else {
                Err(GramsError::InvalidMbox(self.path.clone()))
            };
        }
    }

    /// Read the full MBOX, calling `message_callback` for each message found.
    ///
    /// The callback returns `true` to continue or `false` to stop early.
    /// `progress_callback` receives `(bytes_read, file_size)`.
    ///
    /// Returns the number of messages delivered.
    pub fn for_each_message(
        &self,
        message_callback: &mut dyn FnMut(StoredMessage<'_>) -> bool,
        progress_callback: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64> {
        if self.file_size == 0 {
            return Ok(0);
        }

        let file = File::open(&self.path).map_err(|e| GramsError::io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(self.buffer_size, file);

        let mut pending = PendingMessage::new(self.max_message_size);
        let mut count: u64 = 0;
        let mut current_offset: u64 = 0;
        let mut prev_line_was_empty = true;
        let mut first_line = true;
        let mut last_progress: u64 = 0;

        // Reusable line buffer
        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);

        loop {
            line_buf.clear();
            let line_len = reader
                .read_until(b'\n', &mut line_buf)
                .map_err(|e| GramsError::io(&self.path, e))? as u64;
            if line_len == 0 {
                break; // EOF
            }

            let line = if first_line {
                line_buf.strip_prefix(UTF8_BOM).unwrap_or(&line_buf)
            } else {
                &line_buf[..]
            };

            if is_mbox_separator(line) {
                if !first_line && !prev_line_was_empty {
                    warn!(
                        offset = current_offset,
                        "Found 'From ' separator without preceding blank line"
                    );
                }
                if pending.started {
                    if !message_callback(pending.as_stored(count, current_offset)) {
                        return Ok(count + 1);
                    }
                    count += 1;
                }
                // The BOM is not part of the first message.
                let start = current_offset + (line_len - line.len() as u64);
                pending.restart(start, line);
            } else if pending.started {
                pending.push_line(line);
            } else if !is_blank_line(line) {
                debug!(offset = current_offset, "Skipping text before first 'From ' line");
            }

            prev_line_was_empty = is_blank_line(line);
            first_line = false;
            current_offset += line_len;

            if let Some(cb) = progress_callback {
                if current_offset - last_progress >= PROGRESS_INTERVAL {
                    cb(current_offset, self.file_size);
                    last_progress = current_offset;
                }
            }
        }

        // Flush last message
        if pending.started {
            message_callback(pending.as_stored(count, current_offset));
            count += 1;
        }

        if let Some(cb) = progress_callback {
            cb(current_offset, self.file_size);
        }

        Ok(count)
    }
}

/// The message currently being accumulated.
struct PendingMessage {
    started: bool,
    start: u64,
    buf: Vec<u8>,
    /// Length of the trailing blank line, if the last line read was blank.
    trailing_blank: usize,
    truncated: bool,
    max_size: usize,
}

impl PendingMessage {
    fn new(max_size: usize) -> Self {
        Self {
            started: false,
            start: 0,
            buf: Vec::with_capacity(64 * 1024),
            trailing_blank: 0,
            truncated: false,
            max_size,
        }
    }

    fn restart(&mut self, start: u64, from_line: &[u8]) {
        self.started = true;
        self.start = start;
        self.buf.clear();
        self.buf.extend_from_slice(from_line);
        self.trailing_blank = 0;
        self.truncated = false;
    }

    fn push_line(&mut self, line: &[u8]) {
        self.trailing_blank = if is_blank_line(line) { line.len() } else { 0 };
        if self.buf.len() + line.len() <= self.max_size {
            self.buf.extend_from_slice(line);
        } else if !self.truncated {
            warn!(
                offset = self.start,
                max_size = self.max_size,
                "Message exceeds maximum size, truncating body"
            );
            self.truncated = true;
        }
    }

    /// View the message ending at `end` (the offset of the next `From ` line or EOF).
    fn as_stored(&self, key: u64, end: u64) -> StoredMessage<'_> {
        let stop = end - self.trailing_blank as u64;
        let raw = if self.truncated {
            &self.buf[..]
        } else {
            &self.buf[..self.buf.len() - self.trailing_blank]
        };
        StoredMessage {
            key,
            range: Some(ByteRange {
                start: self.start,
                stop,
            }),
            raw,
        }
    }
}

/// Skip the `From ` separator line (and a BOM) at the start of an MBOX message.
pub fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

    if data.starts_with(b"From ") {
        return match memchr_newline(data) {
            Some(pos) => &data[pos + 1..],
            None => &[],
        };
    }
    data
}

/// Fast newline search (equivalent to memchr for `\n`).
#[inline]
fn memchr_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8]) -> bool {
    line.starts_with(b"From ")
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}
