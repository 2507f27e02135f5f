//! Media relay (C6/C7): moving RTP/RTCP payloads from a RECORD publisher to
//! every PLAY reader on the same path, over UDP or TCP-interleaved
//! transport.

pub mod tcp;
pub mod udp;

pub use tcp::{Flow, decode_channel, encode_channel};
pub use udp::UdpRelay;
