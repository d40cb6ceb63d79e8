// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The multiplexed `tokio_util::codec::Decoder`/`Encoder` that turns a byte
//! stream into a sequence of [`RtspMessage`]s, peeking at the leading bytes
//! to decide whether each buffered message is a request, a response, or an
//! interleaved binary frame (spec `§4.A Multiplex read`).

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::interleaved::{self, InterleavedFrame, MAGIC};
use super::message::{self, Request, Response};
use crate::{ConnectionContext, Error, RtspMessageContext};

/// A single demultiplexed unit read off an RTSP connection.
#[derive(Clone, Debug)]
pub enum RtspMessage {
    Request(Request),
    Response(Response),
    Frame(InterleavedFrame),
}

/// How many leading garbage bytes [`RtspCodec::decode`] will discard in a
/// single call before giving up and waiting for more data. Bounds the work
/// done per `decode` call on a connection that never resyncs; the caller
/// sees a steady trickle of discarded bytes rather than a hang.
const MAX_RESYNC_DISCARD: usize = 4096;

pub struct RtspCodec {
    conn_ctx: ConnectionContext,
    pos: u64,
}

impl RtspCodec {
    pub fn new(conn_ctx: ConnectionContext) -> Self {
        Self { conn_ctx, pos: 0 }
    }

    pub fn conn_ctx(&self) -> &ConnectionContext {
        &self.conn_ctx
    }

    pub(crate) fn msg_ctx(&self, clock: &dyn crate::Clock) -> RtspMessageContext {
        RtspMessageContext {
            pos: self.pos,
            received_at: clock.now_instant(),
        }
    }

    /// Returns `true` if `buf`'s leading bytes could be the start of
    /// `"RTSP/"`, the only prefix a response line can have.
    fn looks_like_response(buf: &[u8]) -> Classification {
        const RESPONSE_PREFIX: &[u8] = b"RTSP/";
        let n = buf.len().min(RESPONSE_PREFIX.len());
        if buf[..n] == RESPONSE_PREFIX[..n] {
            if n == RESPONSE_PREFIX.len() {
                Classification::Yes
            } else {
                Classification::NeedMoreData
            }
        } else {
            Classification::No
        }
    }

    fn looks_like_request(buf: &[u8]) -> Classification {
        if buf.len() < 2 {
            return Classification::NeedMoreData;
        }
        let prefix = match std::str::from_utf8(&buf[..2]) {
            Ok(p) => p,
            Err(_) => return Classification::No,
        };
        if Method::two_byte_prefixes().contains(&prefix) {
            Classification::Yes
        } else {
            Classification::No
        }
    }
}

use super::method::Method;

enum Classification {
    Yes,
    No,
    NeedMoreData,
}

impl Decoder for RtspCodec {
    type Item = RtspMessage;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<RtspMessage>, Error> {
        let mut discarded = 0usize;
        loop {
            if buf.is_empty() {
                return Ok(None);
            }
            if buf[0] == MAGIC {
                return match interleaved::try_parse(buf) {
                    Some((frame, consumed)) => {
                        buf.advance(consumed);
                        self.pos += consumed as u64;
                        Ok(Some(RtspMessage::Frame(frame)))
                    }
                    None => Ok(None),
                };
            }
            match Self::looks_like_response(buf) {
                Classification::Yes => {
                    return match message::try_parse_response(buf, &self.conn_ctx)? {
                        Some((resp, consumed)) => {
                            buf.advance(consumed);
                            self.pos += consumed as u64;
                            Ok(Some(RtspMessage::Response(resp)))
                        }
                        None => Ok(None),
                    };
                }
                Classification::NeedMoreData => return Ok(None),
                Classification::No => {}
            }
            match Self::looks_like_request(buf) {
                Classification::Yes => {
                    return match message::try_parse_request(buf, &self.conn_ctx)? {
                        Some((req, consumed)) => {
                            buf.advance(consumed);
                            self.pos += consumed as u64;
                            Ok(Some(RtspMessage::Request(req)))
                        }
                        None => Ok(None),
                    };
                }
                Classification::NeedMoreData => return Ok(None),
                Classification::No => {}
            }
            // Neither a recognized method prefix, "RTSP/", nor the interleaved
            // magic byte: the stream is desynchronized (or a peer sent noise).
            // Discard one byte and retry, tolerating it rather than treating
            // it as a fatal framing error, per spec §4.A's discard-and-retry
            // note.
            buf.advance(1);
            self.pos += 1;
            discarded += 1;
            if discarded >= MAX_RESYNC_DISCARD {
                return Ok(None);
            }
        }
    }
}

impl Encoder<Request> for RtspCodec {
    type Error = Error;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), Error> {
        dst.extend_from_slice(&item.serialize());
        Ok(())
    }
}

impl Encoder<Response> for RtspCodec {
    type Error = Error;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Error> {
        dst.extend_from_slice(&item.serialize());
        Ok(())
    }
}

impl Encoder<InterleavedFrame> for RtspCodec {
    type Error = Error;

    fn encode(&mut self, item: InterleavedFrame, dst: &mut BytesMut) -> Result<(), Error> {
        dst.extend_from_slice(&item.serialize());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    fn codec() -> RtspCodec {
        RtspCodec::new(ConnectionContext::dummy())
    }

    #[test]
    fn decodes_a_request() {
        let mut codec = codec();
        let mut buf = BytesMut::from(&b"OPTIONS rtsp://x/y RTSP/1.0\r\nCSeq: 1\r\n\r\n"[..]);
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(msg, RtspMessage::Request(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn decodes_a_response() {
        let mut codec = codec();
        let mut buf = BytesMut::from(&b"RTSP/1.0 200 OK\r\nCSeq: 1\r\n\r\n"[..]);
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(msg, RtspMessage::Response(_)));
    }

    #[test]
    fn decodes_an_interleaved_frame() {
        let mut codec = codec();
        let mut buf = BytesMut::from(&[0x24u8, 0x00, 0x00, 0x02, 0xAA, 0xBB][..]);
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        match msg {
            RtspMessage::Frame(f) => {
                assert_eq!(f.channel_id, 0);
                assert_eq!(&f.payload[..], &[0xAA, 0xBB]);
            }
            _ => panic!("expected a frame"),
        }
    }

    #[test]
    fn waits_for_more_data_on_partial_message() {
        let mut codec = codec();
        let mut buf = BytesMut::from(&b"OPTIONS rtsp://x/y RTSP"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), "OPTIONS rtsp://x/y RTSP".len());
    }

    #[test]
    fn discards_leading_garbage_and_resyncs() {
        let mut codec = codec();
        let mut buf = BytesMut::from(&b"\x00\x00RTSP/1.0 200 OK\r\nCSeq: 1\r\n\r\n"[..]);
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(msg, RtspMessage::Response(_)));
    }

    #[test]
    fn advances_message_context_position() {
        let mut codec = codec();
        let raw = b"OPTIONS rtsp://x/y RTSP/1.0\r\nCSeq: 1\r\n\r\n";
        let mut buf = BytesMut::from(&raw[..]);
        codec.decode(&mut buf).unwrap().unwrap();
        let ctx = codec.msg_ctx(&SystemClock);
        assert_eq!(ctx.pos, raw.len() as u64);
    }
}
