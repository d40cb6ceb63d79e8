// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A bounded per-SSRC reordering window for RTP packets (spec
//! `§4.C RTP reorderer and timestamp decoder`, invariant 3, scenario 6).
//!
//! Unlike the teacher's `StrictSequenceChecker` (which errors on any
//! out-of-order or duplicate sequence number), this buffers a configurable
//! number of out-of-order packets and emits them back in ascending sequence
//! order, matching the behavior real IP cameras require.

use std::collections::VecDeque;

use super::packet::Packet;

/// Default ring size, in packets. Must be a power of two.
pub const DEFAULT_BUFFER_SIZE: usize = 64;

/// The outcome of feeding one packet to a [`Reorderer`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Emitted {
    /// Packets to deliver now, in ascending sequence-number order.
    pub sequence_numbers: Vec<u16>,
    /// Count of sequence numbers skipped over by this emission (0 unless a
    /// gap closed or the buffer overflowed).
    pub missing: u32,
}

/// Reorders RTP packets from a single SSRC within a bounded window.
pub struct Reorderer {
    buffer_size: usize,
    mask: u64,
    ring: Vec<Option<Packet>>,
    /// Absolute (non-wrapping) position corresponding to `expected`'s ring slot.
    base: u64,
    expected: Option<u16>,
}

impl Reorderer {
    pub fn new(buffer_size: usize) -> Self {
        assert!(
            buffer_size.is_power_of_two() && buffer_size > 0,
            "reorderer buffer_size must be a nonzero power of two, got {}",
            buffer_size
        );
        Self {
            buffer_size,
            mask: (buffer_size - 1) as u64,
            ring: (0..buffer_size).map(|_| None).collect(),
            base: 0,
            expected: None,
        }
    }

    fn slot(&self, abs: u64) -> usize {
        (abs & self.mask) as usize
    }

    /// Feeds one packet through the window, returning the packets (if any)
    /// that are now ready for delivery.
    pub fn push(&mut self, packet: Packet) -> Emitted {
        let seq = packet.sequence_number;
        let expected = match self.expected {
            None => {
                self.expected = Some(seq.wrapping_add(1));
                return Emitted {
                    sequence_numbers: vec![seq],
                    missing: 0,
                };
            }
            Some(e) => e,
        };
        let rel = seq.wrapping_sub(expected);
        if rel > 0x7FFF {
            // Duplicate or arrived too late to reorder; drop silently.
            return Emitted::default();
        }
        if rel == 0 {
            let mut out = vec![seq];
            self.base += 1;
            self.expected = Some(expected.wrapping_add(1));
            // Flush any contiguous buffered successors.
            loop {
                let idx = self.slot(self.base);
                match self.ring[idx].take() {
                    Some(p) => {
                        out.push(p.sequence_number);
                        self.base += 1;
                        self.expected = Some(self.expected.unwrap().wrapping_add(1));
                    }
                    None => break,
                }
            }
            return Emitted {
                sequence_numbers: out,
                missing: 0,
            };
        }
        let rel = rel as usize;
        if rel < self.buffer_size {
            let idx = self.slot(self.base + rel as u64);
            if self.ring[idx].is_none() {
                self.ring[idx] = Some(packet);
            }
            // Slot occupied: a true duplicate of an already-buffered seq; drop.
            return Emitted::default();
        }

        // The buffer can't hold this packet without first making room: flush
        // everything currently buffered (skipping gaps), then this packet,
        // and report how many sequence numbers were never received.
        let mut out = Vec::new();
        let mut missing = 0u32;
        let gap_len = rel; // number of sequence numbers strictly between old `expected` and `seq`.
        for i in 0..gap_len {
            let idx = self.slot(self.base + i as u64);
            match self.ring[idx].take() {
                Some(p) => out.push(p.sequence_number),
                None => missing += 1,
            }
        }
        out.push(seq);
        self.base += gap_len as u64 + 1;
        self.expected = Some(seq.wrapping_add(1));
        Emitted {
            sequence_numbers: out,
            missing,
        }
    }
}

/// Convenience queue used by tests and by [`super::timestamp`] fixtures to
/// drive a [`Reorderer`] from bare sequence numbers without constructing
/// full [`Packet`]s.
pub fn feed_sequence_numbers(buffer_size: usize, seqs: &[u16]) -> Vec<Emitted> {
    let mut r = Reorderer::new(buffer_size);
    let mut out = Vec::new();
    let mut pending: VecDeque<u16> = seqs.iter().copied().collect();
    while let Some(seq) = pending.pop_front() {
        out.push(r.push(test_packet(seq)));
    }
    out
}

#[cfg(test)]
fn test_packet(seq: u16) -> Packet {
    use crate::RtspMessageContext;
    Packet {
        ctx: RtspMessageContext {
            pos: 0,
            received_at: std::time::Instant::now(),
        },
        stream_id: 0,
        ssrc: 1,
        sequence_number: seq,
        rtp_timestamp: 0,
        mark: false,
        payload: bytes::Bytes::new(),
    }
}

#[cfg(not(test))]
fn test_packet(_seq: u16) -> Packet {
    unreachable!("feed_sequence_numbers is test-only tooling")
}
