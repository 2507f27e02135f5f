//! # rtsp — RTSP rendezvous server
//!
//! A Rust library that lets one publisher push a live stream over RTSP
//! (`ANNOUNCE`/`RECORD`) and fans it out, unmodified, to any number of
//! readers (`SETUP`/`PLAY`) over UDP or TCP-interleaved RTP/RTCP. The
//! server never inspects media payloads beyond counting SDP `m=` lines —
//! it relays bytes, it does not transcode or packetize them.
//!
//! ## Protocol references
//!
//! | RFC | Topic | How this crate uses it |
//! |-----|-------|----------------------|
//! | [RFC 2326](https://tools.ietf.org/html/rfc2326) | RTSP 1.0 | Request/response parsing, session lifecycle, transport negotiation, `$`-framed interleaved data |
//! | [RFC 4566](https://tools.ietf.org/html/rfc4566) | SDP | Opaque relay of publisher SDP; only `m=` line counts are inspected |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  Server        — public API, orchestrator│
//! ├──────────────────────────────────────────┤
//! │  Connection    — per-socket driver, C5    │
//! │  Registry      — path/session state, C4  │
//! ├──────────────────────────────────────────┤
//! │  Protocol      — RTSP parsing, SDP, wire  │
//! │  Relay         — UDP + TCP media fan-out  │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use rtsp::{Server, ServerConfig};
//!
//! let mut server = Server::new(ServerConfig::default());
//! server.start().unwrap();
//! ```
//!
//! ## Crate layout
//!
//! - [`server`] — High-level [`Server`] orchestrator.
//! - [`config`] — [`ServerConfig`] and [`config::Protocol`].
//! - [`registry`] — [`registry::Registry`], the path→publisher/reader map.
//! - [`connection`] — Per-connection accept loop, dispatch, and egress queue.
//! - [`protocol`] — RTSP request/response parsing, wire codec, SDP, transport headers.
//! - [`relay`] — UDP and TCP-interleaved media fan-out.
//! - [`path`] — RTSP URL path/query extraction.
//! - [`hooks`] — [`hooks::ServerHooks`] observability seam.
//! - [`error`] — [`RtspError`] enum and [`Result`] alias.

pub mod config;
pub mod connection;
pub mod error;
pub mod hooks;
pub mod path;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod server;

pub use config::{Protocol, ServerConfig};
pub use error::{Result, RtspError};
pub use hooks::{NoopHooks, ServerHooks};
pub use registry::Registry;
pub use server::Server;
