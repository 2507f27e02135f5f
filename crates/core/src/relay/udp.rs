//! UDP RTP/RTCP relay (C6, spec §4.6).
//!
//! Grounded on `transport/udp.rs::UdpTransport` (a single bound socket with
//! a thin `send_to` wrapper) and `transport/tcp.rs::accept_loop`'s
//! thread-per-listener pattern gated by a shared `running: Arc<AtomicBool>`
//! flag, extended to two listener sockets that demultiplex incoming
//! datagrams by source address instead of blindly pushing to one session.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::registry::{Registry, TrackAddr};
use crate::relay::tcp::{Flow, encode_channel};

const RECV_BUF_SIZE: usize = 2048;
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// The two bound UDP listener sockets, shared between the demultiplexing
/// listener threads and any ingress path that needs to relay a frame (the
/// listeners themselves, and a TCP publisher's interleaved ingest loop when
/// its readers are on UDP).
pub struct UdpRelay {
    rtp_socket: UdpSocket,
    rtcp_socket: UdpSocket,
}

impl UdpRelay {
    /// Bind both listener sockets. Read timeouts bound how promptly
    /// `running` is observed.
    pub fn bind(bind_host: &str, rtp_port: u16, rtcp_port: u16) -> io::Result<Self> {
        let rtp_socket = UdpSocket::bind((bind_host, rtp_port))?;
        let rtcp_socket = UdpSocket::bind((bind_host, rtcp_port))?;
        rtp_socket.set_read_timeout(Some(POLL_INTERVAL))?;
        rtcp_socket.set_read_timeout(Some(POLL_INTERVAL))?;
        Ok(Self { rtp_socket, rtcp_socket })
    }

    /// Spawn the RTP and RTCP demultiplexing threads. `self` is shared via
    /// `Arc` so both threads, and any TCP ingest loop that needs to relay
    /// to a UDP reader, send from the same bound sockets.
    pub fn spawn(self: Arc<Self>, registry: Registry, running: Arc<AtomicBool>) {
        for flow in [Flow::Rtp, Flow::Rtcp] {
            let relay = self.clone();
            let registry = registry.clone();
            let running = running.clone();
            thread::spawn(move || relay.listen(flow, registry, running));
        }
    }

    fn socket_for(&self, flow: Flow) -> &UdpSocket {
        match flow {
            Flow::Rtp => &self.rtp_socket,
            Flow::Rtcp => &self.rtcp_socket,
        }
    }

    fn listen(&self, flow: Flow, registry: Registry, running: Arc<AtomicBool>) {
        let socket = self.socket_for(flow);
        let mut buf = [0u8; RECV_BUF_SIZE];
        while running.load(Ordering::SeqCst) {
            match socket.recv_from(&mut buf) {
                Ok((n, src)) => {
                    let is_rtcp = matches!(flow, Flow::Rtcp);
                    if let Some((path, track_index)) =
                        registry.find_publisher_track_by_udp_source(src.ip(), src.port(), is_rtcp)
                    {
                        self.forward(&registry, &path, track_index, flow, &buf[..n]);
                    }
                    // No match: silently drop (spec §4.6 step 4).
                }
                Err(ref e)
                    if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
                Err(e) => tracing::warn!(error = %e, ?flow, "UDP recv error"),
            }
        }
        tracing::debug!(?flow, "UDP listener exiting");
    }

    /// Forward one frame to every PLAY reader on `path` carrying
    /// `track_index`. UDP readers receive a direct `send_to`; TCP readers
    /// receive it encoded as an interleaved frame through their egress queue.
    pub fn forward(
        &self,
        registry: &Registry,
        path: &str,
        track_index: usize,
        flow: Flow,
        payload: &[u8],
    ) {
        for target in registry.forward(path, track_index) {
            match target.addr {
                TrackAddr::Udp { rtp_port, rtcp_port } => {
                    let port = if matches!(flow, Flow::Rtcp) { rtcp_port } else { rtp_port };
                    let dest = SocketAddr::new(target.peer_ip, port);
                    if let Err(error) = self.socket_for(flow).send_to(payload, dest) {
                        tracing::debug!(%error, reader = ?target.reader_id, "UDP forward failed");
                    }
                }
                TrackAddr::Tcp { .. } => {
                    if let Some(egress) = &target.egress {
                        egress.send_frame(encode_channel(track_index, flow), payload);
                    }
                }
            }
        }
    }
}
