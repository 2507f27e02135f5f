//! Observability hook seam (C11, spec §6: "External interfaces").
//!
//! Grounded on the `Packetizer` trait extension point (`media/mod.rs`):
//! a plain trait object registered on the server at construction time, with
//! a no-op default so embedders who don't care pay nothing. Applied here to
//! a metrics/event seam instead of a codec seam, since codec packetization
//! itself is out of scope for a relay server.

/// Lifecycle events a metrics exporter or spawn-on-event integration can
/// observe without the core depending on any particular backend.
pub trait ServerHooks: Send + Sync {
    fn on_publisher_claimed(&self, _path: &str) {}
    fn on_publisher_released(&self, _path: &str) {}
    fn on_reader_attached(&self, _path: &str) {}
    fn on_reader_detached(&self, _path: &str) {}
}

/// Default implementation: observes nothing.
pub struct NoopHooks;

impl ServerHooks for NoopHooks {}
