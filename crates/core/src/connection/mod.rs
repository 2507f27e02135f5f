//! Per-connection driver (C5 concurrency, spec §5): the accept loop and the
//! per-TCP-connection read loop that ties the method dispatcher
//! ([`handler`]), the egress queue ([`egress`]), and the shared
//! [`crate::registry::Registry`] together.
//!
//! Grounded on `transport/tcp.rs`'s `accept_loop`/`Connection` split (poll
//! the `running` flag between accepts, one thread per connection), extended
//! with a dedicated writer thread per connection (`egress`) and a
//! interleaved-frame branch in the read loop that the teacher's push-only
//! connection never needed.

pub mod egress;
pub mod handler;

use std::io::BufReader;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::CloseReason;
use crate::hooks::ServerHooks;
use crate::protocol::codec::{self, CodecError, Message};
use crate::registry::{ConnectionId, ConnectionState, Registry};
use crate::relay::{UdpRelay, decode_channel};
use egress::EgressQueue;
use handler::HandlerOutcome;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Non-blocking TCP accept loop. Spawns one thread per accepted connection.
pub fn accept_loop(
    listener: TcpListener,
    registry: Registry,
    config: Arc<ServerConfig>,
    udp_relay: Arc<UdpRelay>,
    hooks: Arc<dyn ServerHooks>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                if stream.set_nonblocking(false).is_err() {
                    continue;
                }
                let registry = registry.clone();
                let config = config.clone();
                let udp_relay = udp_relay.clone();
                let hooks = hooks.clone();
                let running = running.clone();
                thread::spawn(move || Connection::handle(stream, registry, config, udp_relay, hooks, running));
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(e) => {
                if running.load(Ordering::SeqCst) {
                    tracing::warn!(error = %e, "TCP accept error");
                }
            }
        }
    }
    tracing::debug!("accept loop exited");
}

struct Connection {
    id: ConnectionId,
    reader: BufReader<TcpStream>,
    egress: Arc<EgressQueue>,
    registry: Registry,
    config: Arc<ServerConfig>,
    udp_relay: Arc<UdpRelay>,
    hooks: Arc<dyn ServerHooks>,
    peer_addr: SocketAddr,
}

impl Connection {
    fn handle(
        stream: TcpStream,
        registry: Registry,
        config: Arc<ServerConfig>,
        udp_relay: Arc<UdpRelay>,
        hooks: Arc<dyn ServerHooks>,
        running: Arc<AtomicBool>,
    ) {
        let Ok(peer_addr) = stream.peer_addr() else {
            return;
        };
        let Ok(reader_stream) = stream.try_clone() else {
            return;
        };
        if reader_stream.set_read_timeout(Some(config.read_timeout)).is_err() {
            return;
        }
        let Ok(egress) = EgressQueue::spawn(stream, config.write_timeout) else {
            return;
        };
        let egress = Arc::new(egress);

        let id = registry.register_client(peer_addr.ip());
        registry.set_egress(id, egress.clone());

        tracing::info!(%peer_addr, "client connected");

        let mut conn = Connection {
            id,
            reader: BufReader::new(reader_stream),
            egress,
            registry,
            config,
            udp_relay,
            hooks,
            peer_addr,
        };

        let reason = conn.run(&running);
        conn.cleanup(reason);

        tracing::info!(peer = %conn.peer_addr, %reason, "client disconnected");
    }

    /// Read/dispatch loop. Returns the reason the loop exited.
    fn run(&mut self, running: &Arc<AtomicBool>) -> CloseReason {
        while running.load(Ordering::SeqCst) {
            match codec::read_message(&mut self.reader) {
                Ok(Message::Request(request)) => {
                    let method = request.method.clone();
                    let outcome = handler::dispatch(self.id, &self.registry, &self.config, &request);
                    if let Some(reason) = self.apply_outcome(&method, outcome) {
                        return reason;
                    }
                }
                Ok(Message::Interleaved { channel, payload }) => {
                    if let Err(reason) = self.ingest_interleaved(channel, &payload) {
                        return reason;
                    }
                }
                Err(CodecError::Timeout) => continue,
                Err(CodecError::Eof) => return CloseReason::PeerGone,
                Err(CodecError::Io(error)) => {
                    tracing::debug!(%error, peer = %self.peer_addr, "connection read error");
                    return CloseReason::PeerGone;
                }
                Err(CodecError::Parse(error)) => {
                    tracing::warn!(%error, peer = %self.peer_addr, "malformed request");
                    return CloseReason::ProtocolError;
                }
            }
        }
        CloseReason::ServerShutdown
    }

    /// Apply one dispatch outcome: queue its response (if any) and perform
    /// the named state transition. Returns `Some(reason)` if the connection
    /// should close.
    fn apply_outcome(&mut self, method: &str, outcome: HandlerOutcome) -> Option<CloseReason> {
        match outcome {
            HandlerOutcome::Respond(response) => {
                if method == "ANNOUNCE" && response.status_code == 200 {
                    if let Some(path) = self.registry.client_path(self.id) {
                        self.hooks.on_publisher_claimed(&path);
                    }
                }
                self.egress.send_response(&response);
                None
            }
            HandlerOutcome::RespondThenPlay(response) => {
                // Queue the response before the transition so no relayed
                // frame can reach this reader before its 200 OK does.
                self.egress.send_response(&response);
                self.registry.set_state(self.id, ConnectionState::Play);
                if let Some(path) = self.registry.client_path(self.id) {
                    self.hooks.on_reader_attached(&path);
                }
                None
            }
            HandlerOutcome::RespondThenRecord(response) => {
                self.egress.send_response(&response);
                self.registry.set_state(self.id, ConnectionState::Record);
                None
            }
            HandlerOutcome::RespondAuthFailure(response) => {
                self.egress.send_response(&response);
                Some(CloseReason::ProtocolError)
            }
            HandlerOutcome::Close(response, reason) => {
                if let Some(response) = response {
                    self.egress.send_response(&response);
                }
                Some(reason)
            }
        }
    }

    /// Handle an interleaved frame arriving mid-loop: only a RECORD
    /// publisher legitimately sends these (spec §4.7). An out-of-range
    /// track index is a protocol violation, not a tolerable glitch: abort
    /// the connection rather than silently drop.
    fn ingest_interleaved(&self, channel: u8, payload: &[u8]) -> Result<(), CloseReason> {
        if self.registry.client_state(self.id) != Some(ConnectionState::Record) {
            tracing::debug!(peer = %self.peer_addr, "interleaved frame outside RECORD, dropping");
            return Ok(());
        }
        let (track_index, flow) = decode_channel(channel);
        if track_index >= self.registry.track_count(self.id) {
            tracing::warn!(peer = %self.peer_addr, channel, "interleaved frame for unknown track, aborting connection");
            return Err(CloseReason::ProtocolError);
        }
        let Some(path) = self.registry.client_path(self.id) else {
            return Ok(());
        };
        self.udp_relay.forward(&self.registry, &path, track_index, flow, payload);
        Ok(())
    }

    fn cleanup(&self, reason: CloseReason) {
        let path = self.registry.client_path(self.id);
        let was_publisher = path
            .as_deref()
            .and_then(|p| self.registry.lookup_publisher(p))
            .map(|snapshot| snapshot.id == self.id)
            .unwrap_or(false);

        let cascade = self.registry.unregister_client(self.id);
        for other in cascade {
            if let Some(egress) = self.registry.egress_for(other) {
                egress.close();
            }
        }

        if let Some(path) = path {
            if was_publisher {
                self.hooks.on_publisher_released(&path);
            } else {
                self.hooks.on_reader_detached(&path);
            }
        }

        tracing::debug!(peer = %self.peer_addr, %reason, "connection cleaned up");
    }
}
