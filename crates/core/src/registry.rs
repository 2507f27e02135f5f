//! The session registry (C4, spec §4.4 / §5): the process-wide mapping from
//! path to publisher, the set of connected clients, and the mutual-exclusion
//! discipline (I1-I6) that lets publishers and readers multiplex safely.
//!
//! Grounded on `mount.rs`'s `MountRegistry` (a single `RwLock`-guarded map,
//! read-locked for lookups and fan-out, write-locked for mutation), extended
//! with the publisher-claim/cascade-close semantics a push-only mount never
//! needed. Each connection's shared-visible fields (state, path, protocol,
//! tracks, SDP) live inside the same lock as the maps themselves, per spec
//! §6's "Shared state" note.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Protocol;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one connection across its lifetime. Cheap to copy and pass
/// around independently of the connection's own thread/socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A connection's position in the publish/read state machine (spec §4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Starting,
    Announce,
    PreRecord,
    Record,
    PrePlay,
    Play,
}

/// Where one track's media is addressed, fixed at SETUP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackAddr {
    Udp { rtp_port: u16, rtcp_port: u16 },
    Tcp { rtp_channel: u8, rtcp_channel: u8 },
}

/// A reader's sink for relayed interleaved frames (TCP only — UDP readers
/// are addressed directly by `TrackAddr::Udp` and need no queue). Bounded
/// egress queues are implemented by `crate::connection::egress`.
pub trait Egress: Send + Sync {
    fn send_frame(&self, channel: u8, payload: &[u8]);

    /// Force this connection's socket closed. Used to wake a cascaded-close
    /// target's blocked read (I2) without needing a second shared flag.
    fn close(&self) {}
}

struct ClientRecord {
    id: ConnectionId,
    state: ConnectionState,
    path: Option<String>,
    protocol: Option<Protocol>,
    peer_ip: IpAddr,
    tracks: Vec<TrackAddr>,
    sdp: Option<Arc<Vec<u8>>>,
    media_count: usize,
    egress: Option<Arc<dyn Egress>>,
}

impl ClientRecord {
    fn new(id: ConnectionId, peer_ip: IpAddr) -> Self {
        Self {
            id,
            state: ConnectionState::Starting,
            path: None,
            protocol: None,
            peer_ip,
            tracks: Vec::new(),
            sdp: None,
            media_count: 0,
            egress: None,
        }
    }
}

/// SETUP tried to claim a path already owned by another publisher (I1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathTaken;

/// A read-only snapshot of the publisher for DESCRIBE/SETUP to consult
/// without holding the registry lock any longer than the lookup itself.
#[derive(Clone)]
pub struct PublisherSnapshot {
    pub id: ConnectionId,
    pub sdp: Arc<Vec<u8>>,
    pub media_count: usize,
}

/// One reader's fan-out target for a single track, snapshotted under the
/// read lock (spec §6: fan-out never performs egress I/O under the lock).
#[derive(Clone)]
pub struct ForwardTarget {
    pub reader_id: ConnectionId,
    pub peer_ip: IpAddr,
    pub addr: TrackAddr,
    pub egress: Option<Arc<dyn Egress>>,
}

struct Inner {
    publishers: HashMap<String, ConnectionId>,
    clients: HashMap<ConnectionId, ClientRecord>,
}

/// The process-wide registry. Cheap to clone (an `Arc` handle); every
/// connection thread holds one.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RwLock<Inner>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                publishers: HashMap::new(),
                clients: HashMap::new(),
            })),
        }
    }

    /// Register a newly-accepted connection. Starts in `Starting` with no
    /// path, protocol, or tracks.
    pub fn register_client(&self, peer_ip: IpAddr) -> ConnectionId {
        let id = ConnectionId::next();
        self.inner
            .write()
            .clients
            .insert(id, ClientRecord::new(id, peer_ip));
        id
    }

    /// Remove `id` from the registry (I6). If it was the publisher for its
    /// path, the path entry is released and every other client bound to
    /// that path is returned so the caller can cascade-close them (I2).
    pub fn unregister_client(&self, id: ConnectionId) -> Vec<ConnectionId> {
        let mut inner = self.inner.write();
        let Some(path) = inner.clients.get(&id).and_then(|c| c.path.clone()) else {
            inner.clients.remove(&id);
            return Vec::new();
        };
        inner.clients.remove(&id);

        if inner.publishers.get(&path) == Some(&id) {
            inner.publishers.remove(&path);
            inner
                .clients
                .values()
                .filter(|c| c.path.as_deref() == Some(path.as_str()))
                .map(|c| c.id)
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Claim `path` for `id` (I1). Fails if another connection already
    /// owns it.
    pub fn claim_publisher(&self, path: &str, id: ConnectionId) -> Result<(), PathTaken> {
        let mut inner = self.inner.write();
        if inner.publishers.contains_key(path) {
            return Err(PathTaken);
        }
        inner.publishers.insert(path.to_string(), id);
        if let Some(client) = inner.clients.get_mut(&id) {
            client.path = Some(path.to_string());
        }
        tracing::info!(path, "publisher claimed");
        Ok(())
    }

    /// Release `path` if `id` is still its owner (I2's trigger path,
    /// distinct from the implicit release in [`unregister_client`]). Returns
    /// the other clients bound to `path` to cascade-close.
    pub fn release_publisher(&self, path: &str, id: ConnectionId) -> Vec<ConnectionId> {
        let mut inner = self.inner.write();
        if inner.publishers.get(path) != Some(&id) {
            return Vec::new();
        }
        inner.publishers.remove(path);
        tracing::info!(path, "publisher released");
        inner
            .clients
            .values()
            .filter(|c| c.id != id && c.path.as_deref() == Some(path))
            .map(|c| c.id)
            .collect()
    }

    /// Snapshot the publisher for `path`, if one exists and has an SDP
    /// (i.e. has passed ANNOUNCE).
    pub fn lookup_publisher(&self, path: &str) -> Option<PublisherSnapshot> {
        let inner = self.inner.read();
        let id = *inner.publishers.get(path)?;
        let client = inner.clients.get(&id)?;
        Some(PublisherSnapshot {
            id,
            sdp: client.sdp.clone()?,
            media_count: client.media_count,
        })
    }

    pub fn set_state(&self, id: ConnectionId, state: ConnectionState) {
        if let Some(c) = self.inner.write().clients.get_mut(&id) {
            c.state = state;
        }
    }

    pub fn client_state(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.inner.read().clients.get(&id).map(|c| c.state)
    }

    pub fn client_path(&self, id: ConnectionId) -> Option<String> {
        self.inner.read().clients.get(&id).and_then(|c| c.path.clone())
    }

    /// Bind `id` to `path` (a reader's first SETUP). If already bound,
    /// enforces I6 (path unchanged) and fails on mismatch.
    pub fn bind_path(&self, id: ConnectionId, path: &str) -> bool {
        let mut inner = self.inner.write();
        let Some(c) = inner.clients.get_mut(&id) else {
            return false;
        };
        match &c.path {
            Some(existing) => existing == path,
            None => {
                c.path = Some(path.to_string());
                true
            }
        }
    }

    /// Attach a publisher's parsed SDP: raw bytes plus the media-line count
    /// that bounds the track list (I4).
    pub fn set_sdp(&self, id: ConnectionId, sdp: Arc<Vec<u8>>, media_count: usize) {
        if let Some(c) = self.inner.write().clients.get_mut(&id) {
            c.sdp = Some(sdp);
            c.media_count = media_count;
        }
    }

    /// Record a reader's track cap, copied from the publisher's media
    /// count at first SETUP (readers never ANNOUNCE their own SDP).
    pub fn set_media_count(&self, id: ConnectionId, media_count: usize) {
        if let Some(c) = self.inner.write().clients.get_mut(&id) {
            c.media_count = media_count;
        }
    }

    /// Record `id`'s transport protocol, enforcing I5 (a connection's
    /// tracks all share one protocol). Returns `false` on a conflicting
    /// second protocol.
    pub fn set_protocol(&self, id: ConnectionId, protocol: Protocol) -> bool {
        match self.inner.write().clients.get_mut(&id) {
            Some(c) => match c.protocol {
                None => {
                    c.protocol = Some(protocol);
                    true
                }
                Some(existing) => existing == protocol,
            },
            None => false,
        }
    }

    pub fn protocol(&self, id: ConnectionId) -> Option<Protocol> {
        self.inner.read().clients.get(&id).and_then(|c| c.protocol)
    }

    /// Append a track for `id`, enforcing I4 (track count never exceeds
    /// the media count). Returns the new track's index.
    pub fn push_track(&self, id: ConnectionId, addr: TrackAddr) -> Option<usize> {
        let mut inner = self.inner.write();
        let c = inner.clients.get_mut(&id)?;
        if c.tracks.len() >= c.media_count {
            return None;
        }
        c.tracks.push(addr);
        Some(c.tracks.len() - 1)
    }

    pub fn track_count(&self, id: ConnectionId) -> usize {
        self.inner
            .read()
            .clients
            .get(&id)
            .map(|c| c.tracks.len())
            .unwrap_or(0)
    }

    pub fn media_count(&self, id: ConnectionId) -> usize {
        self.inner
            .read()
            .clients
            .get(&id)
            .map(|c| c.media_count)
            .unwrap_or(0)
    }

    pub fn set_egress(&self, id: ConnectionId, egress: Arc<dyn Egress>) {
        if let Some(c) = self.inner.write().clients.get_mut(&id) {
            c.egress = Some(egress);
        }
    }

    /// Look up `id`'s egress handle, e.g. to force-close it during an I2
    /// cascade.
    pub fn egress_for(&self, id: ConnectionId) -> Option<Arc<dyn Egress>> {
        self.inner.read().clients.get(&id).and_then(|c| c.egress.clone())
    }

    /// Force-close every connected client's socket (spec §5 "Cancellation":
    /// supervisor shutdown closes every connection after the listeners).
    pub fn close_all(&self) {
        let handles: Vec<Arc<dyn Egress>> = self
            .inner
            .read()
            .clients
            .values()
            .filter_map(|c| c.egress.clone())
            .collect();
        for egress in handles {
            egress.close();
        }
    }

    /// Snapshot every PLAY reader on `path` carrying `track_index`, for the
    /// relay layer to forward one frame to outside the lock.
    pub fn forward(&self, path: &str, track_index: usize) -> Vec<ForwardTarget> {
        self.inner
            .read()
            .clients
            .values()
            .filter(|c| c.state == ConnectionState::Play && c.path.as_deref() == Some(path))
            .filter_map(|c| {
                c.tracks.get(track_index).map(|addr| ForwardTarget {
                    reader_id: c.id,
                    peer_ip: c.peer_ip,
                    addr: *addr,
                    egress: c.egress.clone(),
                })
            })
            .collect()
    }

    /// Locate the publisher track whose announced UDP port matches an
    /// incoming datagram's source `(peer_ip, port)` (spec §4.6). `is_rtcp`
    /// selects which of the track's two announced ports to match against.
    pub fn find_publisher_track_by_udp_source(
        &self,
        peer_ip: IpAddr,
        port: u16,
        is_rtcp: bool,
    ) -> Option<(String, usize)> {
        let inner = self.inner.read();
        inner.clients.values().find_map(|client| {
            if client.state != ConnectionState::Record || client.peer_ip != peer_ip {
                return None;
            }
            client.tracks.iter().enumerate().find_map(|(idx, track)| {
                let TrackAddr::Udp { rtp_port, rtcp_port } = track else {
                    return None;
                };
                let matches = if is_rtcp { *rtcp_port == port } else { *rtp_port == port };
                matches.then(|| client.path.clone()).flatten().map(|path| (path, idx))
            })
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Mutex;

    fn ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    #[test]
    fn claim_publisher_then_second_claim_fails() {
        let registry = Registry::new();
        let a = registry.register_client(ip());
        let b = registry.register_client(ip());

        assert!(registry.claim_publisher("/cam", a).is_ok());
        assert_eq!(registry.claim_publisher("/cam", b), Err(PathTaken));
    }

    #[test]
    fn unregister_publisher_cascades_to_readers() {
        let registry = Registry::new();
        let publisher = registry.register_client(ip());
        let reader = registry.register_client(ip());

        registry.claim_publisher("/cam", publisher).unwrap();
        registry.set_state(reader, ConnectionState::Play);
        // Readers bind to a path via SETUP, not claim_publisher; set it directly.
        registry.inner.write().clients.get_mut(&reader).unwrap().path = Some("/cam".to_string());

        let cascade = registry.unregister_client(publisher);
        assert_eq!(cascade, vec![reader]);
        assert!(registry.lookup_publisher("/cam").is_none());
    }

    #[test]
    fn release_publisher_by_non_owner_is_noop() {
        let registry = Registry::new();
        let a = registry.register_client(ip());
        let b = registry.register_client(ip());
        registry.claim_publisher("/cam", a).unwrap();

        assert!(registry.release_publisher("/cam", b).is_empty());
        assert_eq!(registry.inner.read().publishers.get("/cam"), Some(&a));
    }

    #[test]
    fn bind_path_enforces_i6() {
        let registry = Registry::new();
        let id = registry.register_client(ip());
        assert!(registry.bind_path(id, "/cam"));
        assert!(registry.bind_path(id, "/cam"));
        assert!(!registry.bind_path(id, "/other"));
    }

    #[test]
    fn protocol_is_consistent_across_tracks() {
        let registry = Registry::new();
        let id = registry.register_client(ip());
        assert!(registry.set_protocol(id, Protocol::Udp));
        assert!(registry.set_protocol(id, Protocol::Udp));
        assert!(!registry.set_protocol(id, Protocol::Tcp));
    }

    #[test]
    fn track_count_never_exceeds_media_count() {
        let registry = Registry::new();
        let id = registry.register_client(ip());
        registry.set_sdp(id, Arc::new(b"v=0\r\n".to_vec()), 1);

        assert_eq!(
            registry.push_track(id, TrackAddr::Udp { rtp_port: 1, rtcp_port: 2 }),
            Some(0)
        );
        assert_eq!(
            registry.push_track(id, TrackAddr::Udp { rtp_port: 3, rtcp_port: 4 }),
            None
        );
    }

    struct RecordingEgress(Mutex<Vec<(u8, Vec<u8>)>>);

    impl Egress for RecordingEgress {
        fn send_frame(&self, channel: u8, payload: &[u8]) {
            self.0.lock().unwrap().push((channel, payload.to_vec()));
        }
    }

    #[test]
    fn forward_only_targets_play_readers_on_path_with_track() {
        let registry = Registry::new();
        let reader = registry.register_client(ip());
        let egress = Arc::new(RecordingEgress(Mutex::new(Vec::new())));

        {
            let mut inner = registry.inner.write();
            let c = inner.clients.get_mut(&reader).unwrap();
            c.path = Some("/cam".to_string());
            c.state = ConnectionState::Play;
            c.tracks.push(TrackAddr::Tcp { rtp_channel: 0, rtcp_channel: 1 });
        }
        registry.set_egress(reader, egress.clone());

        let targets = registry.forward("/cam", 0);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].reader_id, reader);

        assert!(registry.forward("/other", 0).is_empty());
        assert!(registry.forward("/cam", 1).is_empty());
    }
}
