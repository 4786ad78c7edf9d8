//! Mailbox stores: one file, an ordered sequence of messages.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::PerformanceConfig;
use crate::error::Result;
use crate::model::message::StoredMessage;
use crate::parser::eml::EmlReader;
use crate::parser::mbox::{MboxReader, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_MESSAGE_SIZE};

/// Tuning knobs for reading stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub buffer_size: usize,
    pub max_message_size: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl From<&PerformanceConfig> for StoreOptions {
    fn from(config: &PerformanceConfig) -> Self {
        Self {
            buffer_size: config.read_buffer_size,
            max_message_size: config.max_message_size,
        }
    }
}

/// An opened, validated mailbox store.
///
/// `.eml` files are single-message stores without byte offsets; every other
/// path is read as an MBOX.
#[derive(Debug)]
pub enum MailStore {
    Mbox(MboxReader),
    Eml(EmlReader),
}

impl MailStore {
    /// Open and validate a store with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &StoreOptions::default())
    }

    /// Open and validate a store.
    ///
    /// Fails with `FileNotFound` for a missing path and `InvalidMbox` for a
    /// file that is not an MBOX.
    pub fn open_with(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self> {
        let path = path.as_ref();
        let store = if is_eml(path) {
            Self::Eml(EmlReader::new(path)?)
        } else {
            let reader = MboxReader::new(path)?
                .with_buffer_size(options.buffer_size)
                .with_max_message_size(options.max_message_size);
            reader.validate()?;
            Self::Mbox(reader)
        };
        debug!(path = %path.display(), size = store.file_size(), "Opened mailbox store");
        Ok(store)
    }

    /// Size of the store file in bytes.
    pub fn file_size(&self) -> u64 {
        match self {
            Self::Mbox(reader) => reader.file_size(),
            Self::Eml(reader) => reader.file_size(),
        }
    }

    /// Whether messages of this store come with byte ranges.
    pub fn supports_offsets(&self) -> bool {
        matches!(self, Self::Mbox(_))
    }

    /// Hand every message to `message_callback`, in store order.
    ///
    /// Returns the number of messages delivered.
    pub fn for_each_message(
        &self,
        message_callback: &mut dyn FnMut(StoredMessage<'_>) -> bool,
        progress_callback: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64> {
        match self {
            Self::Mbox(reader) => reader.for_each_message(message_callback, progress_callback),
            Self::Eml(reader) => {
                let count = reader.for_each_message(message_callback)?;
                if let Some(cb) = progress_callback {
                    cb(reader.file_size(), reader.file_size());
                }
                Ok(count)
            }
        }
    }
}

fn is_eml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"))
}

/// Open every path before anything is read, so a bad path fails the run early.
pub fn open_all(paths: &[PathBuf], options: &StoreOptions) -> Result<Vec<MailStore>> {
    paths
        .iter()
        .map(|path| MailStore::open_with(path, options))
        .collect()
}
