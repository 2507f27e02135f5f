//! Error types for the RTSP rendezvous server.

use std::fmt;

/// Errors that can occur in the RTSP server library.
#[derive(Debug, thiserror::Error)]
pub enum RtspError {
    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse an RTSP request message (RFC 2326 §6) or an
    /// interleaved frame header.
    #[error("RTSP parse error: {kind}")]
    Parse { kind: ParseErrorKind },

    /// [`Server::start`](crate::Server::start) has not been called yet.
    #[error("server not started")]
    NotStarted,

    /// [`Server::start`](crate::Server::start) was called while already running.
    #[error("server already running")]
    AlreadyRunning,
}

/// Specific kind of RTSP parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input was empty (no request line).
    EmptyRequest,
    /// Request line did not have the expected `Method URI Version` format.
    InvalidRequestLine,
    /// A header line did not contain a colon separator.
    InvalidHeader,
    /// `Content-Length` header value was not a valid non-negative integer.
    InvalidContentLength,
    /// An interleaved frame's leading byte was not `0x24` at a frame boundary.
    InvalidFrameMagic,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRequest => write!(f, "empty request"),
            Self::InvalidRequestLine => write!(f, "invalid request line"),
            Self::InvalidHeader => write!(f, "invalid header"),
            Self::InvalidContentLength => write!(f, "invalid Content-Length"),
            Self::InvalidFrameMagic => write!(f, "invalid interleaved frame magic byte"),
        }
    }
}

/// Convenience alias for `Result<T, RtspError>`.
pub type Result<T> = std::result::Result<T, RtspError>;

/// Reason a connection closed. Used only for logging; every close path
/// converges on the same cleanup regardless of reason (invariant I6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Client sent TEARDOWN.
    Teardown,
    /// Client disconnected or a read/write timed out.
    PeerGone,
    /// A malformed request or an illegal method-for-state was received.
    ProtocolError,
    /// The publisher for this connection's path was removed (I2 cascade).
    PublisherGone,
    /// The server is shutting down.
    ServerShutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Teardown => "teardown",
            Self::PeerGone => "peer gone",
            Self::ProtocolError => "protocol error",
            Self::PublisherGone => "publisher gone",
            Self::ServerShutdown => "server shutdown",
        };
        write!(f, "{s}")
    }
}
