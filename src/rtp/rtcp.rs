// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal RTCP parsing: just enough of a Sender Report to correlate an
//! RTP timestamp with wall-clock NTP time, per
//! [RFC 3550 §6.4.1](https://datatracker.ietf.org/doc/html/rfc3550#section-6.4.1).
//! Other packet types are recognized but not decoded further.

use crate::NtpTimestamp;

const PT_SENDER_REPORT: u8 = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SenderReport {
    pub ssrc: u32,
    pub ntp_timestamp: NtpTimestamp,
    pub rtp_timestamp: u32,
    pub sender_packet_count: u32,
    pub sender_octet_count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Unknown {
    pub payload_type: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Packet {
    SenderReport(SenderReport),
    Unknown(Unknown),
}

/// Parses one RTCP packet off the front of `data`, which may be a "compound"
/// packet holding several back-to-back RTCP packets; returns the unparsed
/// remainder so the caller can loop.
pub fn parse(data: &[u8]) -> Result<(Packet, &[u8]), String> {
    if data.len() < 8 {
        return Err(format!("RTCP packet of {} bytes is shorter than a header", data.len()));
    }
    let payload_type = data[1];
    let length_words = u16::from_be_bytes([data[2], data[3]]) as usize;
    let total_len = (length_words + 1) * 4;
    if data.len() < total_len {
        return Err(format!(
            "RTCP packet declares length {} but only {} bytes remain",
            total_len,
            data.len()
        ));
    }
    let (this, rest) = data.split_at(total_len);
    let pkt = match payload_type {
        PT_SENDER_REPORT => {
            if this.len() < 28 {
                return Err("RTCP SR shorter than the fixed sender-info block".into());
            }
            Packet::SenderReport(SenderReport {
                ssrc: u32::from_be_bytes([this[4], this[5], this[6], this[7]]),
                ntp_timestamp: NtpTimestamp(u64::from_be_bytes([
                    this[8], this[9], this[10], this[11], this[12], this[13], this[14], this[15],
                ])),
                rtp_timestamp: u32::from_be_bytes([this[16], this[17], this[18], this[19]]),
                sender_packet_count: u32::from_be_bytes([this[20], this[21], this[22], this[23]]),
                sender_octet_count: u32::from_be_bytes([this[24], this[25], this[26], this[27]]),
            })
        }
        other => Packet::Unknown(Unknown { payload_type: other }),
    };
    Ok((pkt, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sr() -> Vec<u8> {
        let mut buf = vec![0x80, PT_SENDER_REPORT, 0x00, 0x06]; // RC=0, length=6 words -> 28 bytes
        buf.extend_from_slice(&0xAABBCCDDu32.to_be_bytes()); // ssrc
        buf.extend_from_slice(&0x00000001_80000000u64.to_be_bytes()); // ntp
        buf.extend_from_slice(&12345u32.to_be_bytes()); // rtp timestamp
        buf.extend_from_slice(&10u32.to_be_bytes()); // packet count
        buf.extend_from_slice(&2000u32.to_be_bytes()); // octet count
        buf
    }

    #[test]
    fn parses_sender_report() {
        let buf = sample_sr();
        let (pkt, rest) = parse(&buf).unwrap();
        assert!(rest.is_empty());
        match pkt {
            Packet::SenderReport(sr) => {
                assert_eq!(sr.ssrc, 0xAABBCCDD);
                assert_eq!(sr.rtp_timestamp, 12345);
                assert_eq!(sr.sender_packet_count, 10);
                assert_eq!(sr.sender_octet_count, 2000);
            }
            _ => panic!("expected a sender report"),
        }
    }

    #[test]
    fn parses_compound_packet_and_returns_remainder() {
        let mut buf = sample_sr();
        // Append a minimal "unknown" RTCP packet (SDES, PT=202) with length=1 word.
        buf.extend_from_slice(&[0x80, 202, 0x00, 0x01, 0, 0, 0, 0]);
        let (first, rest) = parse(&buf).unwrap();
        assert!(matches!(first, Packet::SenderReport(_)));
        let (second, rest2) = parse(rest).unwrap();
        assert!(rest2.is_empty());
        match second {
            Packet::Unknown(u) => assert_eq!(u.payload_type, 202),
            _ => panic!("expected unknown packet"),
        }
    }

    #[test]
    fn rejects_truncated_packet() {
        let buf = [0x80, PT_SENDER_REPORT, 0x00, 0x06, 0, 0, 0, 0];
        assert!(parse(&buf).is_err());
    }
}
