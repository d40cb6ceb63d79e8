// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A single received RTP packet, decoded from an interleaved frame or UDP
//! datagram (spec `§4.C RTP reorderer and timestamp decoder`).

use bytes::{Buf, Bytes};
use pretty_hex::PrettyHex;

use crate::{ConnectionContext, Error, ErrorInt, RtspMessageContext};

/// A received RTP packet, with its header fields already parsed out and its
/// payload sliced to exactly the RTP payload (no padding, no header
/// extension bytes).
#[derive(Clone)]
pub struct Packet {
    pub ctx: RtspMessageContext,
    pub stream_id: usize,
    pub ssrc: u32,
    pub sequence_number: u16,
    /// The packet's 32-bit RTP timestamp, not yet unwrapped to 64 bits; see
    /// [`super::timestamp::TimestampDecoder`].
    pub rtp_timestamp: u32,
    pub mark: bool,
    pub payload: Bytes,
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("ctx", &self.ctx)
            .field("stream_id", &self.stream_id)
            .field("ssrc", &self.ssrc)
            .field("sequence_number", &self.sequence_number)
            .field("rtp_timestamp", &self.rtp_timestamp)
            .field("mark", &self.mark)
            .field("payload", &self.payload.hex_dump())
            .finish()
    }
}

/// Parses one RTP packet out of `data`, which is exactly the payload of one
/// interleaved frame or UDP datagram (never more than one packet).
pub fn decode(
    conn_ctx: &ConnectionContext,
    msg_ctx: &RtspMessageContext,
    stream_id: usize,
    mut data: Bytes,
) -> Result<Packet, Error> {
    let reader = rtp_rs::RtpReader::new(&data[..]).map_err(|e| {
        wrap!(ErrorInt::RtpPacketError {
            conn_ctx: *conn_ctx,
            msg_ctx: *msg_ctx,
            channel_id: 0,
            stream_id,
            ssrc: 0,
            sequence_number: 0,
            description: format!("corrupt RTP header: {:?}\n{:#?}", e, data.hex_dump()),
        })
    })?;
    let sequence_number = u16::from_be_bytes([data[2], data[3]]);
    let ssrc = reader.ssrc();
    let rtp_timestamp = reader.timestamp();
    let mark = reader.mark();
    let payload_range = crate::as_range(&data, reader.payload()).ok_or_else(|| {
        wrap!(ErrorInt::RtpPacketError {
            conn_ctx: *conn_ctx,
            msg_ctx: *msg_ctx,
            channel_id: 0,
            stream_id,
            ssrc,
            sequence_number,
            description: "empty RTP payload".into(),
        })
    })?;
    data.truncate(payload_range.end);
    data.advance(payload_range.start);
    Ok(Packet {
        ctx: *msg_ctx,
        stream_id,
        ssrc,
        sequence_number,
        rtp_timestamp,
        mark,
        payload: data,
    })
}
