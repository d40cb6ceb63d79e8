// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps interleaved-TCP channel ids to the media stream they carry, for a
//! single RTSP connection (spec `§4.D Transport multiplexing`).
//!
//! A server allocates an RTP/RTCP channel id pair per `SETUP` only when the
//! client didn't request specific ids; a client remembers the pair the
//! server chose so it can route incoming `$`-framed data back to the right
//! stream.

use crate::{Error, ErrorInt};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelPair {
    pub rtp_channel: u8,
    pub rtcp_channel: u8,
    pub stream_id: usize,
}

/// The interleaved channel ids in use on one connection, keyed by channel id
/// for O(1) dispatch when a `$`-framed packet arrives.
#[derive(Default, Debug)]
pub struct ChannelTable {
    slots: Vec<Option<usize>>, // index: channel id, value: stream_id
    pairs: Vec<ChannelPair>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self {
            slots: vec![None; 256],
            pairs: Vec::new(),
        }
    }

    /// Reserves the next pair of unused, consecutive even/odd channel ids for
    /// `stream_id`. Used by a server that allocates ids because the client
    /// omitted them from its `Transport` request.
    pub fn allocate(&mut self, stream_id: usize) -> Result<ChannelPair, Error> {
        let mut channel = 0u8;
        loop {
            let rtcp = channel.checked_add(1).ok_or_else(|| {
                wrap!(ErrorInt::TransportHeaderInvalid {
                    description: "no interleaved channel ids remain".into(),
                })
            })?;
            if self.slots[channel as usize].is_none() && self.slots[rtcp as usize].is_none() {
                return self.reserve(channel, rtcp, stream_id);
            }
            channel = rtcp.checked_add(1).ok_or_else(|| {
                wrap!(ErrorInt::TransportHeaderInvalid {
                    description: "no interleaved channel ids remain".into(),
                })
            })?;
        }
    }

    /// Reserves a specific pair requested by a client's `Transport` header
    /// (`interleaved=<rtp>-<rtcp>`).
    pub fn reserve(&mut self, rtp_channel: u8, rtcp_channel: u8, stream_id: usize) -> Result<ChannelPair, Error> {
        if self.slots[rtp_channel as usize].is_some() || self.slots[rtcp_channel as usize].is_some() {
            bail!(ErrorInt::InterleavedIdsAlreadyUsed {
                ids: vec![rtp_channel, rtcp_channel],
            });
        }
        self.slots[rtp_channel as usize] = Some(stream_id);
        self.slots[rtcp_channel as usize] = Some(stream_id);
        let pair = ChannelPair { rtp_channel, rtcp_channel, stream_id };
        self.pairs.push(pair);
        Ok(pair)
    }

    pub fn stream_for_channel(&self, channel_id: u8) -> Option<usize> {
        self.slots[channel_id as usize]
    }

    pub fn pairs(&self) -> &[ChannelPair] {
        &self.pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_consecutive_even_odd_pairs() {
        let mut table = ChannelTable::new();
        let first = table.allocate(0).unwrap();
        assert_eq!((first.rtp_channel, first.rtcp_channel), (0, 1));
        let second = table.allocate(1).unwrap();
        assert_eq!((second.rtp_channel, second.rtcp_channel), (2, 3));
    }

    #[test]
    fn reserve_rejects_already_used_ids() {
        let mut table = ChannelTable::new();
        table.reserve(4, 5, 0).unwrap();
        assert!(table.reserve(5, 6, 1).is_err());
    }

    #[test]
    fn stream_for_channel_resolves_both_sides_of_a_pair() {
        let mut table = ChannelTable::new();
        table.reserve(10, 11, 7).unwrap();
        assert_eq!(table.stream_for_channel(10), Some(7));
        assert_eq!(table.stream_for_channel(11), Some(7));
        assert_eq!(table.stream_for_channel(12), None);
    }
}
