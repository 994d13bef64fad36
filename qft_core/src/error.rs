//! Error types for a single file transfer.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can abort one transfer, on either side of the connection.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The local source file could not be opened for reading.
    #[error("cannot open {path:?}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Handshake failure, resolution failure or connect timeout.
    #[error("cannot connect to {addr}: {reason}")]
    Connect { addr: String, reason: String },

    /// The transport refused to open (or accept) a stream.
    #[error("cannot open stream: {0}")]
    StreamOpen(#[source] quinn::ConnectionError),

    /// The stream or connection failed mid-transfer.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    /// Local storage failure (create, read or write).
    #[error("storage error at {path:?}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The name does not fit the 32-bit length field.
    #[error("cannot encode header: name is {len} bytes, limit is {max}")]
    Encoding { len: usize, max: u64 },

    /// The stream ended before the full header arrived.
    #[error("truncated header: {0}")]
    TruncatedHeader(String),

    /// The declared name length exceeds what the receiver accepts.
    #[error("header too large: declared name length {len}, max {max}")]
    HeaderTooLarge { len: u32, max: u32 },

    /// Configuration file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl TransferError {
    pub(crate) fn transport(message: impl Into<String>, source: Option<io::Error>) -> Self {
        TransferError::Transport {
            message: message.into(),
            source,
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TransferError::Storage {
            path: path.into(),
            source,
        }
    }

    /// Returns true for framing violations (bad or incomplete header).
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            TransferError::Encoding { .. }
                | TransferError::TruncatedHeader(_)
                | TransferError::HeaderTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;
