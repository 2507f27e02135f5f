//! Method dispatch for a single connection (C5, spec §4.5).
//!
//! Grounded on `protocol/handler.rs::MethodHandler` (per-method functions,
//! CSeq echoing, `extract_session_id`-style header parsing), replacing its
//! direct respond-and-mutate style with the tagged [`HandlerOutcome`] the
//! spec's control-flow-sentinel redesign calls for, and replacing its
//! single-role SETUP/PLAY with the full STARTING/ANNOUNCE/PRE_RECORD/
//! RECORD/PRE_PLAY/PLAY machine (§4.5) ANNOUNCE/RECORD requires.

use std::sync::Arc;

use crate::config::{Protocol, ServerConfig};
use crate::error::CloseReason;
use crate::path;
use crate::protocol::request::RtspRequest;
use crate::protocol::response::RtspResponse;
use crate::protocol::sdp;
use crate::protocol::transport_header::TransportHeader;
use crate::registry::{ConnectionId, ConnectionState, PathTaken, Registry, TrackAddr};

/// Fixed opaque `Session` token (spec §9 Open Question: preserved as a
/// literal rather than generated per connection).
pub const SESSION_TOKEN: &str = "12345678;timeout=60";
/// Fixed SSRC advertised in every SETUP `Transport` response.
pub const SSRC: &str = "1234ABCD";

/// The result of dispatching one request, naming the side effect the
/// connection loop must perform after writing (or instead of writing) a
/// response.
pub enum HandlerOutcome {
    /// Write the response; remain in the same state.
    Respond(RtspResponse),
    /// Write the response, then transition into PLAY and begin relaying.
    RespondThenPlay(RtspResponse),
    /// Write the response, then transition into RECORD and begin ingest.
    RespondThenRecord(RtspResponse),
    /// Write the response (an auth failure), then close.
    RespondAuthFailure(RtspResponse),
    /// Optionally write a response, then close for `reason`. `None` means
    /// close silently (TEARDOWN).
    Close(Option<RtspResponse>, CloseReason),
}

fn generic_error(cseq: &str) -> HandlerOutcome {
    HandlerOutcome::Close(
        Some(RtspResponse::bad_request().add_header("CSeq", cseq)),
        CloseReason::ProtocolError,
    )
}

/// Dispatch one request for connection `id`. Reads/writes state exclusively
/// through `registry`; never touches a socket.
pub fn dispatch(
    id: ConnectionId,
    registry: &Registry,
    config: &ServerConfig,
    request: &RtspRequest,
) -> HandlerOutcome {
    if request.method != "OPTIONS" && request.cseq().is_none() {
        return HandlerOutcome::Close(Some(RtspResponse::bad_request()), CloseReason::ProtocolError);
    }
    let cseq = request.cseq().unwrap_or("0");

    match request.method.as_str() {
        "OPTIONS" => HandlerOutcome::Respond(options_response(cseq)),
        "DESCRIBE" => describe(id, registry, cseq, request),
        "ANNOUNCE" => announce(id, registry, config, cseq, request),
        "SETUP" => setup(id, registry, config, cseq, request),
        "PLAY" => play(id, registry, cseq, request),
        "PAUSE" => pause(id, registry, cseq),
        "RECORD" => record(id, registry, cseq, request),
        "TEARDOWN" => HandlerOutcome::Close(None, CloseReason::Teardown),
        other => {
            tracing::warn!(method = other, %cseq, "unsupported RTSP method");
            HandlerOutcome::Respond(RtspResponse::new(501, "Not Implemented").add_header("CSeq", cseq))
        }
    }
}

fn options_response(cseq: &str) -> RtspResponse {
    RtspResponse::ok()
        .add_header("CSeq", cseq)
        .add_header("Public", "DESCRIBE, ANNOUNCE, SETUP, PLAY, PAUSE, RECORD, TEARDOWN")
}

fn describe(id: ConnectionId, registry: &Registry, cseq: &str, request: &RtspRequest) -> HandlerOutcome {
    if registry.client_state(id) != Some(ConnectionState::Starting) {
        return generic_error(cseq);
    }
    let Some(path) = path::extract_path(&request.uri) else {
        return generic_error(cseq);
    };

    match registry.lookup_publisher(path) {
        Some(publisher) => HandlerOutcome::Respond(
            RtspResponse::ok()
                .add_header("CSeq", cseq)
                .add_header("Content-Type", "application/sdp")
                .add_header("Content-Base", &request.uri)
                .with_body(publisher.sdp.as_ref().clone()),
        ),
        None => {
            tracing::debug!(path, "DESCRIBE for unknown publisher");
            HandlerOutcome::Respond(RtspResponse::not_found().add_header("CSeq", cseq))
        }
    }
}

fn announce(
    id: ConnectionId,
    registry: &Registry,
    config: &ServerConfig,
    cseq: &str,
    request: &RtspRequest,
) -> HandlerOutcome {
    if registry.client_state(id) != Some(ConnectionState::Starting) {
        return generic_error(cseq);
    }
    match request.get_header("Content-Type") {
        Some(ct) if ct.eq_ignore_ascii_case("application/sdp") => {}
        _ => return generic_error(cseq),
    }
    if request.body.is_empty() {
        return generic_error(cseq);
    }
    let Some(path) = path::extract_path(&request.uri) else {
        return generic_error(cseq);
    };

    if let Some(expected_key) = &config.publish_key {
        let provided = path::extract_query_param(&request.uri, "key");
        if provided != Some(expected_key.as_str()) {
            tracing::warn!(path, "ANNOUNCE with wrong publish key");
            return HandlerOutcome::RespondAuthFailure(
                RtspResponse::unauthorized().add_header("CSeq", cseq),
            );
        }
    }

    match registry.claim_publisher(path, id) {
        Ok(()) => {
            let media_count = sdp::count_media_lines(&request.body);
            registry.set_sdp(id, Arc::new(request.body.clone()), media_count);
            registry.set_state(id, ConnectionState::Announce);
            HandlerOutcome::Respond(RtspResponse::ok().add_header("CSeq", cseq))
        }
        Err(PathTaken) => {
            tracing::warn!(path, "ANNOUNCE for path with existing publisher");
            generic_error(cseq)
        }
    }
}

fn setup(
    id: ConnectionId,
    registry: &Registry,
    config: &ServerConfig,
    cseq: &str,
    request: &RtspRequest,
) -> HandlerOutcome {
    let state = registry.client_state(id);
    let is_publisher_branch = matches!(
        state,
        Some(ConnectionState::Announce) | Some(ConnectionState::PreRecord)
    );
    let is_reader_branch = matches!(
        state,
        Some(ConnectionState::Starting) | Some(ConnectionState::PrePlay)
    );
    if !is_publisher_branch && !is_reader_branch {
        return generic_error(cseq);
    }

    let Some(transport_raw) = request.get_header("Transport") else {
        return generic_error(cseq);
    };
    let transport = TransportHeader::parse(transport_raw);
    if !transport.has_flag("unicast") {
        return generic_error(cseq);
    }
    if is_publisher_branch != transport.is_record_mode() {
        return generic_error(cseq);
    }

    let Some(path) = path::extract_path(&request.uri) else {
        return generic_error(cseq);
    };
    if !registry.bind_path(id, path) {
        return generic_error(cseq);
    }

    if is_reader_branch {
        let Some(publisher) = registry.lookup_publisher(path) else {
            return generic_error(cseq);
        };
        if registry.media_count(id) == 0 {
            registry.set_media_count(id, publisher.media_count);
        }
    }

    let Some(protocol) = transport.protocol() else {
        return generic_error(cseq);
    };
    if !config.allows(protocol) {
        tracing::warn!(?protocol, "SETUP proposed a disabled transport protocol");
        return HandlerOutcome::Close(
            Some(RtspResponse::unsupported_transport().add_header("CSeq", cseq)),
            CloseReason::ProtocolError,
        );
    }
    if !registry.set_protocol(id, protocol) {
        return generic_error(cseq);
    }

    let response = match protocol {
        Protocol::Udp => setup_udp(id, registry, config, cseq, &transport),
        Protocol::Tcp => setup_tcp(id, registry, cseq, &transport),
    };
    let Some(response) = response else {
        return generic_error(cseq);
    };

    registry.set_state(
        id,
        if is_publisher_branch {
            ConnectionState::PreRecord
        } else {
            ConnectionState::PrePlay
        },
    );
    HandlerOutcome::Respond(response)
}

fn setup_udp(
    id: ConnectionId,
    registry: &Registry,
    config: &ServerConfig,
    cseq: &str,
    transport: &TransportHeader,
) -> Option<RtspResponse> {
    let (client_rtp, client_rtcp) = transport.client_port()?;
    registry.push_track(
        id,
        TrackAddr::Udp {
            rtp_port: client_rtp,
            rtcp_port: client_rtcp,
        },
    )?;

    let server_rtp = config.rtp_port;
    let server_rtcp = config.rtcp_port;
    Some(
        RtspResponse::ok()
            .add_header("CSeq", cseq)
            .add_header(
                "Transport",
                &format!(
                    "RTP/AVP;unicast;client_port={client_rtp}-{client_rtcp};server_port={server_rtp}-{server_rtcp};ssrc={SSRC}"
                ),
            )
            .add_header("Session", SESSION_TOKEN),
    )
}

fn setup_tcp(
    id: ConnectionId,
    registry: &Registry,
    cseq: &str,
    transport: &TransportHeader,
) -> Option<RtspResponse> {
    let next_index = registry.track_count(id);
    let rtp_channel = 2 * next_index as u8;
    let rtcp_channel = rtp_channel + 1;

    if let Some((lo, hi)) = transport.interleaved() {
        if (lo, hi) != (rtp_channel, rtcp_channel) {
            return None;
        }
    }

    registry.push_track(
        id,
        TrackAddr::Tcp {
            rtp_channel,
            rtcp_channel,
        },
    )?;

    Some(
        RtspResponse::ok()
            .add_header("CSeq", cseq)
            .add_header(
                "Transport",
                &format!("RTP/AVP/TCP;unicast;interleaved={rtp_channel}-{rtcp_channel}"),
            )
            .add_header("Session", SESSION_TOKEN),
    )
}

fn play(id: ConnectionId, registry: &Registry, cseq: &str, request: &RtspRequest) -> HandlerOutcome {
    if registry.client_state(id) != Some(ConnectionState::PrePlay) {
        return generic_error(cseq);
    }
    let Some(path) = path::extract_path(&request.uri) else {
        return generic_error(cseq);
    };
    if registry.client_path(id).as_deref() != Some(path) {
        return generic_error(cseq);
    }
    let media_count = registry.media_count(id);
    if media_count == 0 || registry.track_count(id) != media_count {
        return generic_error(cseq);
    }

    HandlerOutcome::RespondThenPlay(
        RtspResponse::ok()
            .add_header("CSeq", cseq)
            .add_header("Session", SESSION_TOKEN),
    )
}

fn pause(id: ConnectionId, registry: &Registry, cseq: &str) -> HandlerOutcome {
    if registry.client_state(id) != Some(ConnectionState::Play) {
        return generic_error(cseq);
    }
    registry.set_state(id, ConnectionState::PrePlay);
    HandlerOutcome::Respond(
        RtspResponse::ok()
            .add_header("CSeq", cseq)
            .add_header("Session", SESSION_TOKEN),
    )
}

fn record(id: ConnectionId, registry: &Registry, cseq: &str, request: &RtspRequest) -> HandlerOutcome {
    if registry.client_state(id) != Some(ConnectionState::PreRecord) {
        return generic_error(cseq);
    }
    let Some(path) = path::extract_path(&request.uri) else {
        return generic_error(cseq);
    };
    if registry.client_path(id).as_deref() != Some(path) {
        return generic_error(cseq);
    }
    let media_count = registry.media_count(id);
    if media_count == 0 || registry.track_count(id) != media_count {
        return generic_error(cseq);
    }

    HandlerOutcome::RespondThenRecord(
        RtspResponse::ok()
            .add_header("CSeq", cseq)
            .add_header("Session", SESSION_TOKEN),
    )
}
