// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RTSP client and server core.
//!
//! This crate implements the wire codec, session/connection state machines,
//! transport multiplexer, and authentication core shared by an RTSP client
//! and an RTSP server. Payload-format (de)packetization, SDP parsing, and
//! TLS configuration are left to collaborators; see [`codec`], [`sdp`], and
//! [`tls`].

#[macro_use]
mod macros;

pub mod auth;
pub mod client;
pub mod codec;
mod clock;
pub mod config;
mod error;
pub mod proto;
pub mod rtp;
pub mod sdp;
pub mod server;
pub mod tls;
pub mod transport;

pub use clock::{Clock, FixedRandom, OsRandom, RandomSource, SimClock, SystemClock};
pub use error::{Error, ErrorInt};

use std::net::SocketAddr;
use std::ops::Range;

/// Context identifying a single TCP (or tunneled) connection, for error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionContext {
    pub local_addr: SocketAddr,
    pub peer_addr: SocketAddr,
}

impl ConnectionContext {
    pub fn new(local_addr: SocketAddr, peer_addr: SocketAddr) -> Self {
        Self {
            local_addr,
            peer_addr,
        }
    }

    #[doc(hidden)]
    #[cfg(test)]
    pub fn dummy() -> Self {
        Self {
            local_addr: "127.0.0.1:0".parse().unwrap(),
            peer_addr: "127.0.0.1:0".parse().unwrap(),
        }
    }
}

impl std::fmt::Display for ConnectionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.peer_addr, self.local_addr)
    }
}

/// Context identifying a single message within a connection, for error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RtspMessageContext {
    /// Byte position within the connection at which this message started.
    pub pos: u64,

    /// Monotonic timestamp at which the first byte of the message was received.
    pub received_at: std::time::Instant,
}

impl std::fmt::Display for RtspMessageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "msg@{}", self.pos)
    }
}

/// A 90kHz-or-other-clock-rate timestamp, monotonically decoded from wrapping
/// 32-bit RTP timestamps by [`rtp::TimestampDecoder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    /// Decoded 64-bit timestamp, in units of `1/clock_rate` seconds.
    timestamp: i64,
    clock_rate: std::num::NonZeroU32,

    /// The RTP timestamp corresponding to `timestamp`, for correlating with
    /// raw packet fields.
    start: u32,
}

impl Timestamp {
    pub fn new(timestamp: i64, clock_rate: std::num::NonZeroU32, start: u32) -> Self {
        Self {
            timestamp,
            clock_rate,
            start,
        }
    }

    #[inline]
    pub fn elapsed(&self) -> i64 {
        self.timestamp
    }

    #[inline]
    pub fn clock_rate(&self) -> u32 {
        self.clock_rate.get()
    }

    #[inline]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}Hz", self.timestamp, self.clock_rate)
    }
}

/// A 64-bit NTP timestamp, as carried in RTCP sender reports: 32 bits of
/// seconds since the NTP epoch, 32 bits of fraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NtpTimestamp(pub u64);

impl std::fmt::Display for NtpTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{:06}",
            self.0 >> 32,
            ((self.0 & 0xFFFF_FFFF) * 1_000_000) >> 32
        )
    }
}

/// Returns `needle`'s byte range within `haystack`, if `needle` is a subslice of it.
///
/// Used to recover a `Bytes` sub-range (e.g. an RTP payload) from a `&[u8]`
/// view produced by a zero-copy parser, so the caller can `data.truncate`/`advance`
/// rather than copy.
pub(crate) fn as_range(haystack: &[u8], needle: &[u8]) -> Option<Range<usize>> {
    if needle.is_empty() {
        return None;
    }
    let haystack_start = haystack.as_ptr() as usize;
    let needle_start = needle.as_ptr() as usize;
    if needle_start < haystack_start
        || needle_start + needle.len() > haystack_start + haystack.len()
    {
        return None;
    }
    let start = needle_start - haystack_start;
    Some(start..start + needle.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_range_finds_subslice() {
        let buf = vec![1u8, 2, 3, 4, 5];
        let sub = &buf[1..3];
        assert_eq!(as_range(&buf, sub), Some(1..3));
    }

    #[test]
    fn as_range_rejects_foreign_slice() {
        let buf = vec![1u8, 2, 3];
        let other = vec![1u8, 2, 3];
        assert_eq!(as_range(&buf, &other[..]), None);
    }

    #[test]
    fn as_range_rejects_empty() {
        let buf = vec![1u8, 2, 3];
        assert_eq!(as_range(&buf, &buf[0..0]), None);
    }
}
