//! Reader for individual `.eml` files (RFC 5322 messages without MBOX framing).

use std::path::{Path, PathBuf};

use crate::error::{GramsError, Result};
use crate::model::message::StoredMessage;

/// A store holding exactly one message.
///
/// An EML file is a bare RFC 5322 message (no `From ` separator), so there
/// is no byte range to report: its single message has key 0 and no range.
#[derive(Debug)]
pub struct EmlReader {
    path: PathBuf,
    file_size: u64,
}

impl EmlReader {
    /// Open an `.eml` file, checking that it exists.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GramsError::FileNotFound(path.clone())
            } else {
                GramsError::io(&path, e)
            }
        })?;
        Ok(Self {
            path,
            file_size: metadata.len(),
        })
    }

    /// Size of the file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Read the message and hand it to `message_callback`.
    ///
    /// An empty file holds no message. Returns the number of messages delivered.
    pub fn for_each_message(
        &self,
        message_callback: &mut dyn FnMut(StoredMessage<'_>) -> bool,
    ) -> Result<u64> {
        let data = std::fs::read(&self.path).map_err(|e| GramsError::io(&self.path, e))?;
        if data.is_empty() {
            return Ok(0);
        }
        message_callback(StoredMessage {
            key: 0,
            range: None,
            raw: &data,
        });
        Ok(1)
    }
}
