use thiserror::Error;

/// A specialized `Result` type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors a [`crate::Connector`] can surface.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum TransportError {
    /// The underlying stream is closed; nothing more can be sent.
    #[error("connector is disconnected")]
    Disconnected,

    /// The payload could not be framed/serialized for transmission.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The underlying transport reported an I/O-level failure.
    #[error("transport send failed: {0}")]
    SendFailed(String),
}
