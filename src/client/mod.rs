// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side core: connection state machine and outbound request
//! construction (auth retry, CSeq sequencing). Transport selection
//! (UDP/TCP/tunnel) and the actual socket I/O live in [`crate::transport`]
//! and are wired together by the embedding application; this module has no
//! socket of its own, matching the server core's split in [`crate::server`].

pub mod conn;
pub mod session;

pub use conn::RequestBuilder;
pub use session::{ClientSession, ClientState, SetupMedia};

use std::time::Duration;

/// Default switchover timeout before auto-detected UDP falls back to TCP
/// (spec `§4.F`: "lack of UDP packets within a switchover timeout (default
/// 3s)").
pub const DEFAULT_UDP_SWITCHOVER: Duration = Duration::from_secs(3);

/// Default number of consecutive auth failures before a connection is
/// closed outright rather than challenged again (spec `§4.A Propagation
/// policy`: "repeated failures (configurable, default 3) force a
/// connection close").
pub const DEFAULT_MAX_AUTH_FAILURES: u32 = 3;

/// How a client wants a media's RTP/RTCP delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportPreference {
    /// Try UDP first, falling back to TCP after [`DEFAULT_UDP_SWITCHOVER`]
    /// or an explicit `461` response.
    AutoDetect,
    Udp,
    Tcp,
    UdpMulticast,
}
