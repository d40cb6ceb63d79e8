// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-track RTP timestamp unwrapping and cross-track presentation-timestamp
//! synthesis (spec `§4.C Timestamp decoder` / `Global (cross-track) PTS synthesis`).

use std::num::NonZeroU32;
use std::time::Instant;

use crate::Timestamp;

/// Unwraps a track's wrapping 32-bit RTP timestamps into a monotonically
/// meaningful 64-bit value, handling wraparound in either direction.
pub struct TimestampDecoder {
    clock_rate: NonZeroU32,
    prev: Option<u32>,
    accumulated: i64,
}

impl TimestampDecoder {
    pub fn new(clock_rate: NonZeroU32) -> Self {
        Self {
            clock_rate,
            prev: None,
            accumulated: 0,
        }
    }

    /// Advances the decoder to raw RTP timestamp `raw`, returning the
    /// unwrapped [`Timestamp`].
    pub fn decode(&mut self, raw: u32) -> Timestamp {
        match self.prev {
            None => {
                self.accumulated = 0;
            }
            Some(prev) => {
                let delta = raw.wrapping_sub(prev) as i32;
                self.accumulated += delta as i64;
            }
        }
        self.prev = Some(raw);
        Timestamp::new(self.accumulated, self.clock_rate, raw)
    }
}

/// Scales `v` by `m/d` as `(v/d)*m + ((v%d)*m)/d`, avoiding the 64-bit
/// overflow that a naive `v*m/d` risks for large timestamp/rate products
/// while preserving the same resolution (spec `§4.C`).
fn checked_scale(v: i64, m: i64, d: i64) -> i64 {
    (v / d) * m + ((v % d) * m) / d
}

/// Synthesizes a shared presentation-time axis across a session's tracks
/// when no RTCP sender report has yet correlated them: the first track to
/// report an anchor packet becomes the *leading* track, and later tracks'
/// starting PTS is derived from wall-clock elapsed time since the leading
/// track's anchor (spec `§4.C Global (cross-track) PTS synthesis`).
#[derive(Default)]
pub struct Timeline {
    leading: Option<usize>,
    anchored: std::collections::HashSet<usize>,
    start_ntp: Option<Instant>,
    start_pts_lead: i64,
    rate_lead: u32,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call once per track at that track's first anchor-eligible packet
    /// (conventionally one whose presentation time equals its decode time),
    /// and again whenever the leading track re-anchors. Returns the
    /// synthesized starting PTS, in `clock_rate`'s units, for `stream_id`.
    pub fn anchor(
        &mut self,
        stream_id: usize,
        clock_rate: u32,
        local_pts: i64,
        now: Instant,
    ) -> i64 {
        match self.leading {
            None => {
                self.leading = Some(stream_id);
                self.rate_lead = clock_rate;
                self.start_pts_lead = local_pts;
                self.start_ntp = Some(now);
                self.anchored.insert(stream_id);
                local_pts
            }
            Some(lead) if lead == stream_id => {
                // The leading track re-anchors each time it reports a fresh
                // PTS==DTS packet.
                self.rate_lead = clock_rate;
                self.start_pts_lead = local_pts;
                self.start_ntp = Some(now);
                local_pts
            }
            Some(_) => {
                if !self.anchored.insert(stream_id) {
                    return local_pts;
                }
                let elapsed_micros = now
                    .duration_since(self.start_ntp.expect("leading track anchored first"))
                    .as_micros() as i64;
                let lead_term = checked_scale(self.start_pts_lead, clock_rate as i64, self.rate_lead as i64);
                let elapsed_term = checked_scale(elapsed_micros, clock_rate as i64, 1_000_000);
                lead_term + elapsed_term
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    #[test]
    fn accumulates_forward_delta() {
        let mut d = TimestampDecoder::new(NonZeroU32::new(90_000).unwrap());
        assert_eq!(d.decode(1000).timestamp(), 0);
        assert_eq!(d.decode(1500).timestamp(), 500);
        assert_eq!(d.decode(3000).timestamp(), 2000);
    }

    #[test]
    fn handles_forward_wraparound() {
        let mut d = TimestampDecoder::new(NonZeroU32::new(90_000).unwrap());
        d.decode(u32::MAX - 10);
        let t = d.decode(9); // wraps past u32::MAX
        assert_eq!(t.timestamp(), 20);
    }

    #[test]
    fn handles_backward_jump_as_negative_delta() {
        let mut d = TimestampDecoder::new(NonZeroU32::new(90_000).unwrap());
        d.decode(5000);
        let t = d.decode(4000);
        assert_eq!(t.timestamp(), -1000);
    }

    #[test]
    fn checked_scale_matches_naive_multiplication_when_safe() {
        assert_eq!(checked_scale(1000, 3, 7), (1000 * 3) / 7);
    }

    #[test]
    fn leading_track_anchors_at_zero_offset() {
        let mut tl = Timeline::new();
        let now = Instant::now();
        let pts = tl.anchor(0, 90_000, 12345, now);
        assert_eq!(pts, 12345);
    }

    #[test]
    fn follower_track_scales_elapsed_time_by_its_own_rate() {
        let mut tl = Timeline::new();
        let t0 = Instant::now();
        tl.anchor(0, 90_000, 0, t0);
        let t1 = t0 + std::time::Duration::from_millis(100);
        // 100ms at 8000Hz should synthesize to roughly 800 ticks.
        let pts = tl.anchor(1, 8_000, 0, t1);
        assert!((790..=810).contains(&pts), "pts={}", pts);
    }

    #[test]
    fn second_call_for_already_anchored_track_is_a_no_op() {
        let mut tl = Timeline::new();
        let t0 = Instant::now();
        tl.anchor(0, 90_000, 0, t0);
        tl.anchor(1, 8_000, 0, t0 + std::time::Duration::from_millis(50));
        let pts = tl.anchor(1, 8_000, 999, t0 + std::time::Duration::from_secs(1));
        assert_eq!(pts, 999);
    }
}
