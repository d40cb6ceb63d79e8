// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `RTP-Info` header: one entry per track naming the `url`, the RTP
//! sequence number and RTP timestamp of the first packet the server will
//! send after `PLAY` (spec `§4.D RTP-Info`).

use super::kv;
use crate::ErrorInt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RtpInfoEntry {
    pub url: String,
    pub seq: Option<u16>,
    pub rtptime: Option<u32>,
}

/// Parses a comma-separated `RTP-Info` header value into one entry per track.
pub fn parse(value: &str) -> Result<Vec<RtpInfoEntry>, crate::Error> {
    let mut entries = Vec::new();
    for entry in value.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let items = kv::parse(entry, ';').map_err(|description| {
            wrap!(ErrorInt::MalformedHeader {
                conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                description: description.to_owned(),
            })
        })?;
        let mut url = None;
        let mut seq = None;
        let mut rtptime = None;
        for item in items {
            match item.key {
                "url" => url = item.value.map(str::to_owned),
                "seq" => {
                    seq = Some(item.value.unwrap_or("").parse::<u16>().map_err(|_| {
                        wrap!(ErrorInt::MalformedHeader {
                            conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                            description: "invalid RTP-Info seq".into(),
                        })
                    })?);
                }
                "rtptime" => {
                    rtptime = Some(item.value.unwrap_or("").parse::<u32>().map_err(|_| {
                        wrap!(ErrorInt::MalformedHeader {
                            conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                            description: "invalid RTP-Info rtptime".into(),
                        })
                    })?);
                }
                _ => {}
            }
        }
        let url = url.ok_or_else(|| {
            wrap!(ErrorInt::MalformedHeader {
                conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                description: "RTP-Info entry is missing url".into(),
            })
        })?;
        entries.push(RtpInfoEntry { url, seq, rtptime });
    }
    Ok(entries)
}

pub fn serialize(entries: &[RtpInfoEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            let mut s = format!("url={}", e.url);
            if let Some(seq) = e.seq {
                s.push_str(&format!(";seq={}", seq));
            }
            if let Some(rtptime) = e.rtptime {
                s.push_str(&format!(";rtptime={}", rtptime));
            }
            s
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_entry() {
        let entries =
            parse("url=rtsp://example.com/media.mp4/trackID=1;seq=9810;rtptime=3450012").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].seq, Some(9810));
        assert_eq!(entries[0].rtptime, Some(3450012));
    }

    #[test]
    fn parses_multiple_tracks() {
        let entries = parse(
            "url=rtsp://example.com/media.mp4/trackID=1;seq=1,url=rtsp://example.com/media.mp4/trackID=2;seq=2",
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn rejects_entry_without_url() {
        assert!(parse("seq=1").is_err());
    }

    #[test]
    fn serialize_round_trips() {
        let entries = vec![RtpInfoEntry {
            url: "rtsp://example.com/trackID=1".into(),
            seq: Some(1),
            rtptime: Some(2),
        }];
        let s = serialize(&entries);
        let parsed = parse(&s).unwrap();
        assert_eq!(parsed, entries);
    }
}
