// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The crate's error hierarchy: a single [`Error`] newtype wrapping an
//! [`ErrorInt`] behind an `Arc`, so it can be cloned into every pending
//! caller when a connection or session is torn down (see `§5 Cancellation`).

use std::sync::Arc;

use crate::{ConnectionContext, RtspMessageContext};

/// An error from this crate.
///
/// Cheaply clonable: internally an `Arc<ErrorInt>`. This matters because a
/// single transport fault (e.g. a UDP timeout) must be delivered to every
/// task blocked on that session's I/O, not just the one that observed it.
#[derive(Clone)]
pub struct Error(pub(crate) Arc<ErrorInt>);

impl Error {
    /// Returns the error kind's stable name, for metrics/logging grouping.
    pub fn kind(&self) -> &'static str {
        self.0.kind()
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&*self.0, f)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        wrap!(ErrorInt::Io(e))
    }
}

/// The full set of error kinds produced by this crate (see spec `§7 Error handling design`).
#[derive(Debug, thiserror::Error)]
pub enum ErrorInt {
    // --- Framing ---
    #[error("{conn_ctx}: short read while expecting {expected} more byte(s)")]
    ShortRead {
        conn_ctx: ConnectionContext,
        expected: usize,
    },

    #[error("{conn_ctx}: expected interleaved frame magic 0x24, got {actual:#04x}")]
    BadMagic { conn_ctx: ConnectionContext, actual: u8 },

    #[error("{conn_ctx}: Content-Length {len} exceeds the 128 KiB limit")]
    ContentLengthTooLarge { conn_ctx: ConnectionContext, len: usize },

    #[error("{conn_ctx}: malformed header: {description}")]
    MalformedHeader {
        conn_ctx: ConnectionContext,
        description: String,
    },

    #[error("malformed URL {url:?}: {description}")]
    MalformedUrl { url: String, description: String },

    #[error("{conn_ctx}: unsupported protocol literal {literal:?}")]
    UnsupportedProtocol {
        conn_ctx: ConnectionContext,
        literal: String,
    },

    // --- Protocol / state ---
    #[error("wrong state: expected one of {allowed:?}, got {actual:?}")]
    WrongState {
        allowed: &'static [&'static str],
        actual: &'static str,
    },

    #[error("session {id} not found")]
    SessionNotFound { id: String },

    #[error("session {id} timed out")]
    SessionTimedOut { id: String },

    #[error("session {id}: path changed from {old:?} to {new:?}")]
    PathHasChanged {
        id: String,
        old: String,
        new: String,
    },

    #[error("session {id} was created by a different peer IP")]
    CannotUseSessionCreatedByOtherIp { id: String },

    #[error("terminated: {reason}")]
    Terminated { reason: String },

    #[error("torn down by {by}")]
    Teardown { by: &'static str },

    // --- Setup ---
    #[error("track {index} already set up")]
    TrackAlreadySetup { index: usize },

    #[error("tracks use different transport protocols")]
    TracksDifferentProtocols,

    #[error("cannot set up tracks with different URLs")]
    CannotSetupTracksDifferentUrls,

    #[error("invalid Transport header: {description}")]
    TransportHeaderInvalid { description: String },

    #[error("Transport header selected TCP but provided no interleaved channel ids")]
    TransportHeaderNoInterleavedIds,

    #[error("interleaved channel id(s) {ids:?} already in use")]
    InterleavedIdsAlreadyUsed { ids: Vec<u8> },

    #[error("UDP ports {client_port}-{rtcp_port} already in use")]
    UdpPortsAlreadyInUse { client_port: u16, rtcp_port: u16 },

    #[error("server did not provide server_port in Transport response")]
    ServerPortsNotProvided,

    #[error("PLAY requires at least one set-up media")]
    NoTracksSetup,

    #[error("RECORD requires every announced media to be set up ({setup} of {announced})")]
    NotAllAnnouncedTracksSetup { setup: usize, announced: usize },

    // --- Transport ---
    #[error("no UDP packet received within {timeout_secs}s")]
    UdpTimeout { timeout_secs: u64 },

    #[error("no TCP data received within {timeout_secs}s")]
    TcpTimeout { timeout_secs: u64 },

    #[error("no UDP packets recently; switching to TCP is recommended")]
    NoUdpPacketsRecently,

    #[error("outbound ring overflowed (capacity {capacity})")]
    Overflow { capacity: usize },

    // --- Auth ---
    #[error("authentication failed")]
    AuthFailed,

    #[error("wrong nonce in Authorization header")]
    WrongNonce,

    #[error("wrong realm in Authorization header")]
    WrongRealm,

    #[error("wrong URL in Authorization header: {uri:?}")]
    WrongUrl { uri: String },

    #[error("malformed Authorization header: {description}")]
    MalformedAuth { description: String },

    // --- Status ---
    #[error("wrong status code {code} ({message:?})")]
    WrongStatusCode { code: u16, message: String },

    #[error("Content-Type header missing")]
    ContentTypeMissing,

    #[error("unsupported Content-Type {content_type:?}")]
    ContentTypeUnsupported { content_type: String },

    // --- Ambient ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{conn_ctx} {msg_ctx}: {description}")]
    RtspFramingError {
        conn_ctx: ConnectionContext,
        msg_ctx: RtspMessageContext,
        description: String,
    },

    #[error("{conn_ctx} {msg_ctx} channel={channel_id} stream={stream_id}: {description}")]
    RtpPacketError {
        conn_ctx: ConnectionContext,
        msg_ctx: RtspMessageContext,
        channel_id: u8,
        stream_id: usize,
        ssrc: u32,
        sequence_number: u16,
        description: String,
    },
}

impl ErrorInt {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            ErrorInt::ShortRead { .. } => "short_read",
            ErrorInt::BadMagic { .. } => "bad_magic",
            ErrorInt::ContentLengthTooLarge { .. } => "content_length_too_large",
            ErrorInt::MalformedHeader { .. } => "malformed_header",
            ErrorInt::MalformedUrl { .. } => "malformed_url",
            ErrorInt::UnsupportedProtocol { .. } => "unsupported_protocol",
            ErrorInt::WrongState { .. } => "wrong_state",
            ErrorInt::SessionNotFound { .. } => "session_not_found",
            ErrorInt::SessionTimedOut { .. } => "session_timed_out",
            ErrorInt::PathHasChanged { .. } => "path_has_changed",
            ErrorInt::CannotUseSessionCreatedByOtherIp { .. } => {
                "cannot_use_session_created_by_other_ip"
            }
            ErrorInt::Terminated { .. } => "terminated",
            ErrorInt::Teardown { .. } => "teardown",
            ErrorInt::TrackAlreadySetup { .. } => "track_already_setup",
            ErrorInt::TracksDifferentProtocols => "tracks_different_protocols",
            ErrorInt::CannotSetupTracksDifferentUrls => "cannot_setup_tracks_different_urls",
            ErrorInt::TransportHeaderInvalid { .. } => "transport_header_invalid",
            ErrorInt::TransportHeaderNoInterleavedIds => "transport_header_no_interleaved_ids",
            ErrorInt::InterleavedIdsAlreadyUsed { .. } => "interleaved_ids_already_used",
            ErrorInt::UdpPortsAlreadyInUse { .. } => "udp_ports_already_in_use",
            ErrorInt::ServerPortsNotProvided => "server_ports_not_provided",
            ErrorInt::NoTracksSetup => "no_tracks_setup",
            ErrorInt::NotAllAnnouncedTracksSetup { .. } => "not_all_announced_tracks_setup",
            ErrorInt::UdpTimeout { .. } => "udp_timeout",
            ErrorInt::TcpTimeout { .. } => "tcp_timeout",
            ErrorInt::NoUdpPacketsRecently => "no_udp_packets_recently",
            ErrorInt::Overflow { .. } => "overflow",
            ErrorInt::AuthFailed => "auth_failed",
            ErrorInt::WrongNonce => "wrong_nonce",
            ErrorInt::WrongRealm => "wrong_realm",
            ErrorInt::WrongUrl { .. } => "wrong_url",
            ErrorInt::MalformedAuth { .. } => "malformed_auth",
            ErrorInt::WrongStatusCode { .. } => "wrong_status_code",
            ErrorInt::ContentTypeMissing => "content_type_missing",
            ErrorInt::ContentTypeUnsupported { .. } => "content_type_unsupported",
            ErrorInt::Io(_) => "io",
            ErrorInt::RtspFramingError { .. } => "rtsp_framing_error",
            ErrorInt::RtpPacketError { .. } => "rtp_packet_error",
        }
    }
}

/// Returns the RTSP status code that should be sent in response to `err`, if it
/// arose from handling a request (vs. a transport-level fault that has no response).
pub fn status_code_for(err: &ErrorInt) -> Option<u16> {
    Some(match err {
        ErrorInt::WrongState { .. } => 455, // Method Not Valid In This State
        ErrorInt::SessionNotFound { .. } => 454,
        ErrorInt::PathHasChanged { .. } => 454,
        ErrorInt::CannotUseSessionCreatedByOtherIp { .. } => 454,
        ErrorInt::TrackAlreadySetup { .. } => 459, // Aggregate Operation Not Allowed (closest 4xx)
        ErrorInt::TracksDifferentProtocols => 461,
        ErrorInt::CannotSetupTracksDifferentUrls => 459,
        ErrorInt::TransportHeaderInvalid { .. } => 461,
        ErrorInt::TransportHeaderNoInterleavedIds => 461,
        ErrorInt::InterleavedIdsAlreadyUsed { .. } => 461,
        ErrorInt::UdpPortsAlreadyInUse { .. } => 461,
        ErrorInt::ServerPortsNotProvided => 461,
        ErrorInt::NoTracksSetup => 455,
        ErrorInt::NotAllAnnouncedTracksSetup { .. } => 455,
        ErrorInt::AuthFailed
        | ErrorInt::WrongNonce
        | ErrorInt::WrongRealm
        | ErrorInt::WrongUrl { .. }
        | ErrorInt::MalformedAuth { .. } => 401,
        ErrorInt::ContentTypeMissing | ErrorInt::ContentTypeUnsupported { .. } => 415,
        ErrorInt::MalformedHeader { .. }
        | ErrorInt::MalformedUrl { .. }
        | ErrorInt::RtspFramingError { .. } => 400,
        ErrorInt::UnsupportedProtocol { .. } => 505,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_cloneable_and_shares_kind() {
        let e: Error = wrap!(ErrorInt::AuthFailed);
        let e2 = e.clone();
        assert_eq!(e.kind(), "auth_failed");
        assert_eq!(e2.kind(), e.kind());
    }

    #[test]
    fn status_code_mapping() {
        assert_eq!(status_code_for(&ErrorInt::AuthFailed), Some(401));
        assert_eq!(
            status_code_for(&ErrorInt::SessionNotFound { id: "x".into() }),
            Some(454)
        );
        assert_eq!(status_code_for(&ErrorInt::Io(std::io::Error::new(std::io::ErrorKind::Other, "x"))), None);
    }
}
