use std::time::Duration;

use orkiv_shared::JidError;
use thiserror::Error;

/// Failures reported by a transport implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server refused the credentials.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The server could not be reached or the stream broke.
    #[error("Network error: {0}")]
    Network(String),

    /// The server or the transport refused a request.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// No stream is open.
    #[error("Stream is closed")]
    Closed,
}

/// Why a connect attempt ended without a session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Invalid identity: {0}")]
    InvalidIdentity(#[from] JidError),

    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("Connect timed out after {0:?}")]
    Timeout(Duration),

    #[error("A session is already connecting or connected")]
    AlreadyActive,

    /// The attempt was cancelled by `disconnect`.
    #[error("Connect attempt aborted")]
    Aborted,
}

impl From<TransportError> for ConnectError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Auth(reason) => Self::AuthRejected(reason),
            TransportError::Network(reason) | TransportError::Rejected(reason) => {
                Self::NetworkUnavailable(reason)
            }
            TransportError::Closed => Self::NetworkUnavailable("stream closed".to_string()),
        }
    }
}

/// Why an outbound action was not carried out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("Not connected")]
    NotConnected,

    #[error("Transport rejected the stanza: {0}")]
    TransportRejected(String),

    #[error("Transport did not accept the stanza within {0:?}")]
    Timeout(Duration),
}

impl From<TransportError> for SendError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Closed => Self::NotConnected,
            other => Self::TransportRejected(other.to_string()),
        }
    }
}
