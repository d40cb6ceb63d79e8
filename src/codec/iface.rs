// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The depacketization seam: a unit of decoded media, and the traits a
//! caller's codec-specific plugin implements on either side of it.

use bytes::Bytes;

use crate::{Error, Timestamp};

/// One decoded access unit: a complete, presentable frame (video) or sample
/// group (audio), assembled from one or more RTP packets.
#[derive(Clone, Debug)]
pub struct AccessUnit {
    pub stream_id: usize,
    pub timestamp: Timestamp,
    /// True for a video key frame or any audio frame (every audio frame is
    /// independently decodable).
    pub is_random_access_point: bool,
    pub data: Bytes,
}

/// Depacketizes RTP packets for one media stream during `PLAY`.
///
/// A caller supplies one implementation per negotiated format (H.264, AAC,
/// ...); this crate only calls `consume` with packets already reordered and
/// timestamp-decoded by [`crate::rtp`].
pub trait RtpConsumer: Send {
    /// Feeds one packet, returning zero or more completed access units. Most
    /// packets contribute to an in-progress access unit and return nothing;
    /// the packet that completes one (typically the RTP marker bit) returns
    /// it.
    fn consume(&mut self, packet: &crate::rtp::Packet) -> Result<Vec<AccessUnit>, Error>;
}

/// Packetizes access units into RTP payloads for one media stream during
/// `RECORD`.
pub trait RtpProducer: Send {
    /// Splits `unit` into one or more RTP payloads (fragmentation, if the
    /// format requires it, is the implementation's responsibility). The
    /// caller attaches sequence number, SSRC, and RTP timestamp framing.
    fn produce(&mut self, unit: AccessUnit) -> Result<Vec<Bytes>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    struct PassThrough;

    impl RtpConsumer for PassThrough {
        fn consume(&mut self, packet: &crate::rtp::Packet) -> Result<Vec<AccessUnit>, Error> {
            Ok(vec![AccessUnit {
                stream_id: packet.stream_id,
                timestamp: Timestamp::new(packet.rtp_timestamp as i64, NonZeroU32::new(90_000).unwrap(), packet.rtp_timestamp),
                is_random_access_point: packet.mark,
                data: packet.payload.clone(),
            }])
        }
    }

    #[test]
    fn a_consumer_can_emit_one_access_unit_per_marked_packet() {
        let packet = crate::rtp::Packet {
            ctx: crate::RtspMessageContext { pos: 0, received_at: std::time::Instant::now() },
            stream_id: 1,
            ssrc: 0xAABB,
            sequence_number: 7,
            rtp_timestamp: 1000,
            mark: true,
            payload: Bytes::from_static(b"frame"),
        };
        let mut consumer = PassThrough;
        let units = consumer.consume(&packet).unwrap();
        assert_eq!(units.len(), 1);
        assert!(units[0].is_random_access_point);
        assert_eq!(&units[0].data[..], b"frame");
    }
}
