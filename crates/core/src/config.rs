//! Server-level configuration consumed by the core (§6, §9).
//!
//! The core never loads this from disk — a YAML file is an external
//! collaborator the `rtsp-server` CLI binary owns (see `crates/cli/src/config.rs`).
//! This module only defines the shape the core depends on.

use std::collections::HashSet;
use std::time::Duration;

/// A transport protocol a reader or publisher may propose in SETUP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Udp,
    Tcp,
}

/// Server-level configuration.
///
/// Constructed by an embedder (or by the CLI binary from YAML + flags)
/// and handed to [`crate::Server::with_config`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the RTSP TCP listener binds to, e.g. `0.0.0.0:8554`.
    pub rtsp_bind: String,
    /// UDP port the RTP listener binds to.
    pub rtp_port: u16,
    /// UDP port the RTCP listener binds to.
    pub rtcp_port: u16,
    /// Timeout applied to every socket read.
    pub read_timeout: Duration,
    /// Timeout applied to every socket write.
    pub write_timeout: Duration,
    /// Transport protocols SETUP is allowed to negotiate. A SETUP proposing
    /// a protocol outside this set is rejected with `461 Unsupported Transport`.
    pub protocols: HashSet<Protocol>,
    /// Required `?key=` query parameter value for ANNOUNCE. `None` disables
    /// publish authentication.
    pub publish_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rtsp_bind: "0.0.0.0:8554".to_string(),
            rtp_port: 8000,
            rtcp_port: 8001,
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            protocols: HashSet::from([Protocol::Udp, Protocol::Tcp]),
            publish_key: None,
        }
    }
}

impl ServerConfig {
    /// Whether `proto` is one of the protocols SETUP may negotiate.
    pub fn allows(&self, proto: Protocol) -> bool {
        self.protocols.contains(&proto)
    }
}
