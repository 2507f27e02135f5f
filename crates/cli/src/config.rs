//! YAML configuration file shape, merged with CLI flag overrides into
//! [`rtsp::ServerConfig`].
//!
//! The core library never loads configuration from disk (see
//! `rtsp::config`'s module doc) — that is this binary's job.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use rtsp::{Protocol, ServerConfig};

/// Deserializable shape of the server's YAML config file. Every field is
/// optional; absent fields fall back to [`ServerConfig::default`].
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub rtsp_bind: Option<String>,
    pub rtp_port: Option<u16>,
    pub rtcp_port: Option<u16>,
    pub read_timeout_secs: Option<u64>,
    pub write_timeout_secs: Option<u64>,
    pub protocols: Option<Vec<String>>,
    pub publish_key: Option<String>,
}

impl FileConfig {
    /// Read and parse a YAML config file. Returns the default (empty)
    /// config if `path` does not exist.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&text)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Apply this file's values over [`ServerConfig::default`]. Fields left
    /// `None` keep the default.
    pub fn into_server_config(self) -> ServerConfig {
        let mut config = ServerConfig::default();
        if let Some(v) = self.rtsp_bind {
            config.rtsp_bind = v;
        }
        if let Some(v) = self.rtp_port {
            config.rtp_port = v;
        }
        if let Some(v) = self.rtcp_port {
            config.rtcp_port = v;
        }
        if let Some(v) = self.read_timeout_secs {
            config.read_timeout = Duration::from_secs(v);
        }
        if let Some(v) = self.write_timeout_secs {
            config.write_timeout = Duration::from_secs(v);
        }
        if let Some(protocols) = self.protocols {
            let parsed: std::collections::HashSet<Protocol> =
                protocols.iter().filter_map(|p| parse_protocol(p)).collect();
            if !parsed.is_empty() {
                config.protocols = parsed;
            }
        }
        if self.publish_key.is_some() {
            config.publish_key = self.publish_key;
        }
        config
    }
}

fn parse_protocol(raw: &str) -> Option<Protocol> {
    match raw.to_ascii_lowercase().as_str() {
        "udp" => Some(Protocol::Udp),
        "tcp" => Some(Protocol::Tcp),
        other => {
            tracing::warn!(protocol = other, "unknown protocol in config file, ignoring");
            None
        }
    }
}
