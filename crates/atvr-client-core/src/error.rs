//! Error types for the client engine.

use thiserror::Error;

use crate::prefs::PrefsError;

/// Errors that can occur in the client engine.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("discovery error: {0}")]
    Discovery(String),

    #[error("resolution of {0} timed out")]
    ResolveTimeout(String),

    #[error("connection attempt timed out")]
    ConnectTimeout,

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation was cancelled by the supervisor or the user. Expected
    /// during disconnect and suspend; never surfaced as an error state.
    #[error("operation cancelled")]
    Cancelled,

    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("unexpected protocol status {0}")]
    Status(u32),

    #[error("identity storage error: {0}")]
    IdentityStore(String),

    #[error(transparent)]
    Prefs(#[from] PrefsError),

    #[error("protocol error: {0}")]
    Protocol(#[from] atvr_proto::error::ProtoError),
}

impl ClientError {
    /// True for conditions the supervisor treats as expected rather than as
    /// failures (cancelled sends/receives during teardown).
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
