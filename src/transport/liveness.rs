// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session liveness tracking: TCP read timeout and UDP packet/keep-alive
//! timeout (spec `§4.D Liveness`).

use std::time::{Duration, Instant};

use crate::{Clock, Error, ErrorInt};

pub const DEFAULT_TCP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default UDP timeout: 3x a typical 5s RTCP interval.
pub const DEFAULT_UDP_TIMEOUT: Duration = Duration::from_secs(15);

/// Tracks the last time a TCP connection produced any inbound byte.
pub struct TcpLiveness {
    timeout: Duration,
    last_seen: Instant,
}

impl TcpLiveness {
    pub fn new(timeout: Duration, clock: &dyn Clock) -> Self {
        Self { timeout, last_seen: clock.now_instant() }
    }

    pub fn record_activity(&mut self, clock: &dyn Clock) {
        self.last_seen = clock.now_instant();
    }

    pub fn check(&self, clock: &dyn Clock) -> Result<(), Error> {
        let elapsed = clock.now_instant().saturating_duration_since(self.last_seen);
        if elapsed >= self.timeout {
            bail!(ErrorInt::TcpTimeout { timeout_secs: self.timeout.as_secs() });
        }
        Ok(())
    }
}

/// Tracks the last time an RTP/RTCP packet, or a keep-alive request, arrived
/// for a UDP session.
pub struct UdpLiveness {
    timeout: Duration,
    last_seen: Instant,
}

impl UdpLiveness {
    pub fn new(timeout: Duration, clock: &dyn Clock) -> Self {
        Self { timeout, last_seen: clock.now_instant() }
    }

    pub fn record_packet(&mut self, clock: &dyn Clock) {
        self.last_seen = clock.now_instant();
    }

    /// A `GET_PARAMETER`/`OPTIONS` keep-alive counts as liveness too.
    pub fn record_keepalive(&mut self, clock: &dyn Clock) {
        self.last_seen = clock.now_instant();
    }

    pub fn check(&self, clock: &dyn Clock) -> Result<(), Error> {
        let elapsed = clock.now_instant().saturating_duration_since(self.last_seen);
        if elapsed >= self.timeout {
            bail!(ErrorInt::UdpTimeout { timeout_secs: self.timeout.as_secs() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimClock;

    #[test]
    fn tcp_liveness_passes_before_timeout_and_fails_after() {
        let clock = SimClock::new(time::macros::datetime!(2024-01-01 00:00:00 UTC));
        let liveness = TcpLiveness::new(Duration::from_secs(10), &clock);
        clock.advance(Duration::from_secs(9));
        assert!(liveness.check(&clock).is_ok());
        clock.advance(Duration::from_secs(2));
        assert!(liveness.check(&clock).is_err());
    }

    #[test]
    fn activity_resets_the_tcp_timeout_window() {
        let clock = SimClock::new(time::macros::datetime!(2024-01-01 00:00:00 UTC));
        let mut liveness = TcpLiveness::new(Duration::from_secs(10), &clock);
        clock.advance(Duration::from_secs(9));
        liveness.record_activity(&clock);
        clock.advance(Duration::from_secs(9));
        assert!(liveness.check(&clock).is_ok());
    }

    #[test]
    fn udp_keepalive_resets_the_timeout_window() {
        let clock = SimClock::new(time::macros::datetime!(2024-01-01 00:00:00 UTC));
        let mut liveness = UdpLiveness::new(DEFAULT_UDP_TIMEOUT, &clock);
        clock.advance(Duration::from_secs(14));
        liveness.record_keepalive(&clock);
        clock.advance(Duration::from_secs(14));
        assert!(liveness.check(&clock).is_ok());
    }
}
