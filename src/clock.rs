// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Injectable wall-clock and randomness capabilities.
//!
//! The core never reads [`std::time::Instant::now`], [`std::time::SystemTime::now`],
//! or a process-wide RNG directly; every place that needs "now" or "some random
//! bytes" takes a `&dyn Clock` / `&dyn RandomSource` instead, per Design Notes §9
//! ("avoid any process-wide singleton in the core"). Tests substitute
//! [`SimClock`]/[`FixedRandom`] for deterministic nonces, session ids, and
//! timeout behavior.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Wall-clock and monotonic-clock source.
pub trait Clock: Send + Sync {
    /// A monotonic instant, used for timeouts and RTP timestamp deltas.
    fn now_instant(&self) -> Instant;

    /// The current UTC wall-clock time, used for the `Range` header's
    /// `clock=` form and RTCP sender-report NTP timestamps.
    fn now_utc(&self) -> time::OffsetDateTime;
}

/// Production clock backed by the OS.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_instant(&self) -> Instant {
        Instant::now()
    }

    fn now_utc(&self) -> time::OffsetDateTime {
        time::OffsetDateTime::now_utc()
    }
}

/// Deterministic clock for tests: starts at a fixed `Instant`/UTC time and only
/// advances when explicitly told to via [`SimClock::advance`].
pub struct SimClock {
    base: Instant,
    base_utc: time::OffsetDateTime,
    offset_millis: AtomicI64,
}

impl SimClock {
    pub fn new(base_utc: time::OffsetDateTime) -> Self {
        Self {
            base: Instant::now(),
            base_utc,
            offset_millis: AtomicI64::new(0),
        }
    }

    pub fn advance(&self, d: Duration) {
        self.offset_millis
            .fetch_add(d.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for SimClock {
    fn now_instant(&self) -> Instant {
        self.base + Duration::from_millis(self.offset_millis.load(Ordering::SeqCst) as u64)
    }

    fn now_utc(&self) -> time::OffsetDateTime {
        self.base_utc + Duration::from_millis(self.offset_millis.load(Ordering::SeqCst) as u64)
    }
}

/// Source of cryptographically-irrelevant-but-unpredictable randomness: session
/// ids, Digest nonces, SSRCs chosen by this side.
pub trait RandomSource: Send + Sync {
    /// Fills `buf` with random bytes.
    fn fill(&self, buf: &mut [u8]);

    /// Convenience: a random 16-byte value, hex-encoded — used for both session
    /// ids and Digest nonces (spec §3, §4.B).
    fn hex16(&self) -> String {
        let mut buf = [0u8; 16];
        self.fill(&mut buf);
        hex::encode(buf)
    }
}

/// Production randomness, backed by the OS CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) {
        use rand::RngCore;
        rand::rngs::OsRng.fill_bytes(buf);
    }
}

/// Deterministic "randomness" for tests: cycles through a fixed byte, or a
/// caller-supplied sequence of fixed-size chunks.
pub struct FixedRandom {
    chunks: Mutex<std::collections::VecDeque<Vec<u8>>>,
    fallback: u8,
}

impl FixedRandom {
    /// A source that always fills with `fallback`.
    pub fn constant(fallback: u8) -> Self {
        Self {
            chunks: Mutex::new(std::collections::VecDeque::new()),
            fallback,
        }
    }

    /// A source that returns `chunks` in order (truncated/padded to the
    /// requested length), then falls back to zero bytes.
    pub fn sequence(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks: Mutex::new(chunks.into()),
            fallback: 0,
        }
    }
}

impl RandomSource for FixedRandom {
    fn fill(&self, buf: &mut [u8]) {
        let mut chunks = self.chunks.lock();
        if let Some(chunk) = chunks.pop_front() {
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            for b in &mut buf[n..] {
                *b = 0;
            }
        } else {
            for b in buf.iter_mut() {
                *b = self.fallback;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_clock_advances_on_demand() {
        let c = SimClock::new(time::macros::datetime!(2024-01-01 00:00:00 UTC));
        let t0 = c.now_instant();
        c.advance(Duration::from_secs(5));
        assert_eq!(c.now_instant() - t0, Duration::from_secs(5));
        assert_eq!((c.now_utc() - time::macros::datetime!(2024-01-01 00:00:00 UTC)).whole_seconds(), 5);
    }

    #[test]
    fn fixed_random_returns_configured_sequence() {
        let r = FixedRandom::sequence(vec![vec![0xAB; 16]]);
        assert_eq!(r.hex16(), "ab".repeat(16));
        // subsequent calls fall back to zero.
        assert_eq!(r.hex16(), "00".repeat(16));
    }
}
