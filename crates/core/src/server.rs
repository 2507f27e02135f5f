//! High-level server orchestrator (C8, spec §5).
//!
//! Grounded on `Server::start`/`stop` (bind the TCP listener, flip a shared
//! `running` flag, spawn the accept loop on its own thread) and
//! `transport/udp.rs`'s single-bound-socket pattern, extended to bind the
//! two fixed-port RTP/RTCP listeners `relay::udp::UdpRelay` needs instead of
//! one ephemeral outbound socket.

use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::config::ServerConfig;
use crate::connection;
use crate::error::{Result, RtspError};
use crate::hooks::{NoopHooks, ServerHooks};
use crate::registry::Registry;
use crate::relay::UdpRelay;

/// RTSP rendezvous server: owns the registry, the RTSP accept loop, and the
/// UDP relay listeners.
pub struct Server {
    config: Arc<ServerConfig>,
    hooks: Arc<dyn ServerHooks>,
    registry: Registry,
    running: Arc<AtomicBool>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_hooks(config, Arc::new(NoopHooks))
    }

    /// Create a server with an observability hook implementation in place
    /// of the no-op default.
    pub fn with_hooks(config: ServerConfig, hooks: Arc<dyn ServerHooks>) -> Self {
        Self {
            config: Arc::new(config),
            hooks,
            registry: Registry::new(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Bind the RTSP TCP listener and the RTP/RTCP UDP listeners, then spawn
    /// the accept loop. Returns once all three sockets are bound.
    pub fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(RtspError::AlreadyRunning);
        }

        let listener = TcpListener::bind(&self.config.rtsp_bind)?;
        listener.set_nonblocking(true)?;

        let udp_bind_host = bind_host(&self.config.rtsp_bind);
        let udp_relay = Arc::new(UdpRelay::bind(
            &udp_bind_host,
            self.config.rtp_port,
            self.config.rtcp_port,
        )?);

        self.running.store(true, Ordering::SeqCst);

        udp_relay.clone().spawn(self.registry.clone(), self.running.clone());

        let registry = self.registry.clone();
        let config = self.config.clone();
        let hooks = self.hooks.clone();
        let running = self.running.clone();

        tracing::info!(
            rtsp_bind = %self.config.rtsp_bind,
            rtp_port = self.config.rtp_port,
            rtcp_port = self.config.rtcp_port,
            "RTSP server listening"
        );

        thread::spawn(move || {
            connection::accept_loop(listener, registry, config, udp_relay, hooks, running);
        });

        Ok(())
    }

    /// Stop accepting new work, then force-close every open connection
    /// (spec §5 "Cancellation"). The accept loop and UDP listeners notice
    /// `running` on their next poll and exit on their own.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.registry.close_all();
        tracing::info!("server stopping");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Strip the port from a `host:port` bind address for reuse as the UDP
/// listeners' bind host.
fn bind_host(rtsp_bind: &str) -> String {
    rtsp_bind
        .rsplit_once(':')
        .map(|(host, _)| host.to_string())
        .unwrap_or_else(|| rtsp_bind.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_host_strips_port() {
        assert_eq!(bind_host("0.0.0.0:8554"), "0.0.0.0");
        assert_eq!(bind_host("127.0.0.1:8554"), "127.0.0.1");
    }
}
