//! Per-connection egress queue and writer thread (spec §5: "the writer
//! thread is the sole writer" for a TCP connection's socket).
//!
//! Grounded on the reader/writer split in
//! `other_examples/01718558_Lohann-oddity-rtsp_..._connection.rs`: a
//! dedicated thread owns the socket's write half and drains a channel, so
//! RTSP responses and interleaved media frames from different call sites
//! never race on one `write`. `sync_channel` matches the bounded,
//! drop-on-overflow egress queue spec §4.7 describes for relayed frames;
//! responses use a blocking send so they are never dropped.

use std::io::Write;
use std::net::TcpStream;
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::thread;
use std::time::Duration;

use crate::protocol::codec;
use crate::protocol::response::RtspResponse;
use crate::registry::Egress;

const EGRESS_QUEUE_CAPACITY: usize = 64;

enum Frame {
    Response(Vec<u8>),
    Interleaved { channel: u8, payload: Vec<u8> },
}

/// A connection's outbound queue, backed by a thread that owns the TCP
/// socket's write half for the connection's lifetime.
pub struct EgressQueue {
    sender: SyncSender<Frame>,
    shutdown_handle: TcpStream,
}

impl EgressQueue {
    /// Spawn the writer thread over `stream`, with `write_timeout` applied
    /// to the socket so a wedged peer makes writes fail (fatally, per spec
    /// §5) instead of blocking the writer thread forever. The thread exits
    /// (and the queue starts rejecting sends) once the socket errors or the
    /// queue is dropped.
    pub fn spawn(stream: TcpStream, write_timeout: Duration) -> std::io::Result<Self> {
        stream.set_write_timeout(Some(write_timeout))?;
        let shutdown_handle = stream.try_clone()?;
        let (sender, receiver) = sync_channel(EGRESS_QUEUE_CAPACITY);
        thread::spawn(move || Self::run(stream, receiver));
        Ok(Self { sender, shutdown_handle })
    }

    fn run(mut stream: TcpStream, receiver: Receiver<Frame>) {
        while let Ok(frame) = receiver.recv() {
            let result = match frame {
                Frame::Response(bytes) => stream.write_all(&bytes),
                Frame::Interleaved { channel, payload } => {
                    codec::write_interleaved(&mut stream, channel, &payload)
                }
            };
            if let Err(error) = result {
                tracing::debug!(%error, "egress writer stopping");
                break;
            }
        }
    }

    /// Queue a complete RTSP response. Blocks (applying backpressure) rather
    /// than dropping — a response is never optional. Returns `false` if the
    /// writer thread has already exited.
    pub fn send_response(&self, response: &RtspResponse) -> bool {
        self.sender.send(Frame::Response(response.serialize())).is_ok()
    }
}

impl Egress for EgressQueue {
    fn send_frame(&self, channel: u8, payload: &[u8]) {
        match self.sender.try_send(Frame::Interleaved {
            channel,
            payload: payload.to_vec(),
        }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::debug!(channel, "egress queue full, dropping relayed frame");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    fn close(&self) {
        let _ = self.shutdown_handle.shutdown(std::net::Shutdown::Both);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn queued_response_and_frame_arrive_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server_side, _) = listener.accept().unwrap();

        let queue = EgressQueue::spawn(server_side, Duration::from_secs(2)).unwrap();
        let resp = RtspResponse::ok().add_header("CSeq", "1");
        assert!(queue.send_response(&resp));
        queue.send_frame(0, b"rtp-bytes");

        let mut client = client;
        let mut buf = vec![0u8; 4096];
        // give the writer thread a moment; read is blocking so this will
        // simply wait for bytes to arrive.
        let mut total = Vec::new();
        while total.len() < resp.serialize().len() + 4 + "rtp-bytes".len() {
            let n = client.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            total.extend_from_slice(&buf[..n]);
        }

        let expected_resp = resp.serialize();
        assert_eq!(&total[..expected_resp.len()], &expected_resp[..]);
        assert_eq!(total[expected_resp.len()], 0x24);
    }
}
