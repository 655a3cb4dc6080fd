use linkmesh_schema::ValidationIssue;
use thiserror::Error;

/// Everything that can go wrong attaching a catalog to a [`crate::Link`] or
/// handling one envelope on it.
///
/// [`Error::Request`] is the one variant a handler is expected to return on
/// purpose: its message is sent back to the caller verbatim as `data.error`
/// (spec.md §5 "RequestError"). Every other variant is treated as an
/// internal failure — logged here, reported to the caller as a generic
/// message — because surfacing it verbatim could leak implementation
/// details across a link boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// Inbound or outbound payload failed schema validation.
    #[error("validation failed: {0:?}")]
    Validation(Vec<ValidationIssue>),

    /// No handler (and no applicable forwarding rule) is registered for a
    /// message this link is declared to receive.
    #[error("{link}: no handler registered for {message}")]
    MissingHandler { link: String, message: String },

    /// A handler rejected the call for a caller-visible reason (bad
    /// arguments, not found, permission denied). Carries the exact string
    /// that crosses the wire in `data.error`.
    #[error("{0}")]
    Request(String),

    /// A handler failed for a reason that should not be disclosed to the
    /// peer (panicked, returned an unexpected internal error).
    #[error("internal error")]
    Internal,

    /// The connector underneath this link is gone.
    #[error("link is disconnected")]
    Disconnected,

    /// A forwarding hop could not be completed (no assigned instance, no
    /// upstream link, etc).
    #[error("forwarding failed: {0}")]
    Forwarding(String),

    /// A correlated request timed out waiting for its response.
    #[error("request timed out")]
    Timeout,

    /// `request::send`/`event::send` was asked for a name the catalog has
    /// no entry for — a programming error, never a wire condition.
    #[error("{0}: no such catalog entry")]
    UnknownMessage(String),
}

impl From<linkmesh_transport::TransportError> for Error {
    fn from(source: linkmesh_transport::TransportError) -> Self {
        match source {
            linkmesh_transport::TransportError::Disconnected => Error::Disconnected,
            other => Error::Forwarding(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
