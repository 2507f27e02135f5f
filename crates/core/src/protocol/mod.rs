//! RTSP protocol implementation (RFC 2326).
//!
//! This module handles the text-based RTSP signaling protocol — parsing
//! requests, building responses, framing interleaved binary frames, and
//! the `Transport:` header grammar SETUP/ANNOUNCE negotiate over. Method
//! dispatch and the connection state machine live in [`crate::connection`].
//!
//! ## RTSP message format (RFC 2326 §4)
//!
//! RTSP messages follow HTTP/1.1 syntax with a different method set:
//!
//! ```text
//! DESCRIBE rtsp://server/cam RTSP/1.0\r\n
//! CSeq: 2\r\n
//! Accept: application/sdp\r\n
//! \r\n
//! ```
//!
//! ## Supported methods
//!
//! | Method | RFC section | Purpose |
//! |--------|-------------|---------|
//! | OPTIONS | §10.1 | Capability discovery |
//! | DESCRIBE | §10.2 | Retrieve SDP session description |
//! | ANNOUNCE | §10.3 | Publish an SDP description (publisher branch) |
//! | SETUP | §10.4 | Negotiate transport (UDP ports or TCP channels) |
//! | PLAY | §10.5 | Start media delivery (reader branch) |
//! | PAUSE | §10.6 | Suspend media delivery |
//! | RECORD | §10.11 | Start accepting media (publisher branch) |
//! | TEARDOWN | §10.7 | Destroy session |

pub mod codec;
pub mod request;
pub mod response;
pub mod sdp;
pub mod transport_header;

pub use codec::{CodecError, Message};
pub use request::RtspRequest;
pub use response::RtspResponse;
pub use transport_header::TransportHeader;
