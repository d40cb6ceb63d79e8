// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interleaved binary data frames: a 4-byte header (`$`, channel id, 16-bit
//! big-endian length) followed by that many bytes of RTP/RTCP payload,
//! multiplexed onto the same TCP connection as RTSP messages (spec
//! `§4.A Interleaved frame`).

use bytes::Bytes;

pub const MAGIC: u8 = 0x24; // '$'
pub const HEADER_LEN: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterleavedFrame {
    pub channel_id: u8,
    pub payload: Bytes,
}

/// Parses one interleaved frame from the front of `buf`.
///
/// `buf[0]` must already be known to equal [`MAGIC`]; callers peek at it to
/// decide whether to route here or to [`super::message::try_parse_request`]
/// (spec `§4.A Multiplex read`). Returns `Ok(None)` if `buf` doesn't yet hold
/// the full 4-byte header plus payload.
pub fn try_parse(buf: &[u8]) -> Option<(InterleavedFrame, usize)> {
    if buf.len() < HEADER_LEN {
        return None;
    }
    debug_assert_eq!(buf[0], MAGIC);
    let channel_id = buf[1];
    let len = u16::from_be_bytes([buf[2], buf[3]]) as usize;
    if buf.len() < HEADER_LEN + len {
        return None;
    }
    let payload = Bytes::copy_from_slice(&buf[HEADER_LEN..HEADER_LEN + len]);
    Some((InterleavedFrame { channel_id, payload }, HEADER_LEN + len))
}

impl InterleavedFrame {
    pub fn serialize(&self) -> Bytes {
        assert!(
            self.payload.len() <= u16::MAX as usize,
            "interleaved payload of {} bytes exceeds the 16-bit length field",
            self.payload.len()
        );
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.push(MAGIC);
        out.push(self.channel_id);
        out.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.payload);
        Bytes::from(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_spec_example_frame() {
        let raw = [0x24, 0x06, 0x00, 0x04, 0x01, 0x02, 0x03, 0x04];
        let (frame, consumed) = try_parse(&raw).unwrap();
        assert_eq!(consumed, raw.len());
        assert_eq!(frame.channel_id, 6);
        assert_eq!(&frame.payload[..], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn incomplete_payload_yields_none() {
        let raw = [0x24, 0x06, 0x00, 0x04, 0x01, 0x02];
        assert!(try_parse(&raw).is_none());
    }

    #[test]
    fn incomplete_header_yields_none() {
        let raw = [0x24, 0x06];
        assert!(try_parse(&raw).is_none());
    }

    #[test]
    fn serialize_round_trips() {
        let frame = InterleavedFrame {
            channel_id: 1,
            payload: Bytes::from_static(&[9, 9, 9]),
        };
        let wire = frame.serialize();
        let (parsed, consumed) = try_parse(&wire).unwrap();
        assert_eq!(consumed, wire.len());
        assert_eq!(parsed, frame);
    }
}
