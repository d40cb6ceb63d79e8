// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `Transport` header: profile, lower-layer protocol, delivery mode,
//! ports, and SSRC (spec `§4.D Transport`).

use super::kv;
use crate::ErrorInt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Udp,
    Tcp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Unicast,
    Multicast,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Play,
    Record,
}

/// One parsed `Transport:` header entry. RTSP allows a comma-separated list
/// of candidate transports; this crate only ever sends/accepts a single
/// entry, matching how real servers and cameras behave in practice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transport {
    pub protocol: Protocol,
    /// Whether the negotiated profile was `RTP/SAVP[/TCP]` rather than
    /// `RTP/AVP[/TCP]`; secure profiles are the ones that carry a
    /// `KeyMgmt` blob (spec `§4.D`, `§4.G`).
    pub secure: bool,
    pub delivery: Delivery,
    /// `client_port`/`port` range for UDP, `None` for TCP.
    pub client_port_range: Option<(u16, u16)>,
    pub server_port_range: Option<(u16, u16)>,
    /// `interleaved=` channel ids for TCP, `None` for UDP.
    pub interleaved_channels: Option<(u8, u8)>,
    pub ssrc: Option<u32>,
    pub mode: Option<Mode>,
}

impl Transport {
    /// Parses the first (and in practice only) entry of a `Transport` header
    /// value. `RTP/AVP` and `RTP/AVP/UDP` are treated as synonyms for UDP;
    /// `RTP/SAVP` and `RTP/SAVP/TCP` are their secure counterparts (spec
    /// `§4.D`'s profile set).
    pub fn parse(value: &str) -> Result<Self, crate::Error> {
        let entry = value.split(',').next().unwrap_or("");
        let items = kv::parse(entry, ';').map_err(|description| {
            wrap!(ErrorInt::TransportHeaderInvalid {
                description: description.to_owned(),
            })
        })?;
        let mut items = items.into_iter();
        let profile_item = items.next().ok_or_else(|| {
            wrap!(ErrorInt::TransportHeaderInvalid {
                description: "empty Transport header".into(),
            })
        })?;
        let (protocol, secure) = match profile_item.key {
            "RTP/AVP" | "RTP/AVP/UDP" => (Protocol::Udp, false),
            "RTP/AVP/TCP" => (Protocol::Tcp, false),
            "RTP/SAVP" | "RTP/SAVP/UDP" => (Protocol::Udp, true),
            "RTP/SAVP/TCP" => (Protocol::Tcp, true),
            other => bail!(ErrorInt::UnsupportedProtocol {
                conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                literal: other.to_owned(),
            }),
        };

        let mut delivery = Delivery::Unicast;
        let mut client_port_range = None;
        let mut server_port_range = None;
        let mut interleaved_channels = None;
        let mut ssrc = None;
        let mut mode = None;

        for item in items {
            match item.key {
                "unicast" => delivery = Delivery::Unicast,
                "multicast" => delivery = Delivery::Multicast,
                "client_port" => client_port_range = Some(parse_port_range(item.value)?),
                "server_port" => server_port_range = Some(parse_port_range(item.value)?),
                "interleaved" => interleaved_channels = Some(parse_channel_range(item.value)?),
                "ssrc" => ssrc = Some(parse_ssrc(item.value)?),
                "mode" => {
                    let v = item.value.unwrap_or("").trim_matches('"');
                    mode = Some(match v.to_ascii_uppercase().as_str() {
                        "PLAY" => Mode::Play,
                        "RECORD" => Mode::Record,
                        other => bail!(ErrorInt::TransportHeaderInvalid {
                            description: format!("unknown mode {:?}", other),
                        }),
                    });
                }
                _ => {} // unknown parameters are ignored, per §4.D.
            }
        }

        Ok(Transport {
            protocol,
            secure,
            delivery,
            client_port_range,
            server_port_range,
            interleaved_channels,
            ssrc,
            mode,
        })
    }

    pub fn serialize(&self) -> String {
        let mut s = match (self.protocol, self.secure) {
            (Protocol::Udp, false) => "RTP/AVP/UDP".to_string(),
            (Protocol::Tcp, false) => "RTP/AVP/TCP".to_string(),
            (Protocol::Udp, true) => "RTP/SAVP/UDP".to_string(),
            (Protocol::Tcp, true) => "RTP/SAVP/TCP".to_string(),
        };
        s.push(';');
        s.push_str(match self.delivery {
            Delivery::Unicast => "unicast",
            Delivery::Multicast => "multicast",
        });
        if let Some((a, b)) = self.client_port_range {
            s.push_str(&format!(";client_port={}-{}", a, b));
        }
        if let Some((a, b)) = self.server_port_range {
            s.push_str(&format!(";server_port={}-{}", a, b));
        }
        if let Some((a, b)) = self.interleaved_channels {
            s.push_str(&format!(";interleaved={}-{}", a, b));
        }
        if let Some(ssrc) = self.ssrc {
            s.push_str(&format!(";ssrc={:08x}", ssrc));
        }
        if let Some(mode) = self.mode {
            s.push_str(match mode {
                Mode::Play => ";mode=PLAY",
                Mode::Record => ";mode=RECORD",
            });
        }
        s
    }
}

fn parse_port_range(value: Option<&str>) -> Result<(u16, u16), crate::Error> {
    let v = value.ok_or_else(|| {
        wrap!(ErrorInt::TransportHeaderInvalid {
            description: "port parameter with no value".into(),
        })
    })?;
    let (a, b) = v.split_once('-').unwrap_or((v, v));
    let parse = |s: &str| {
        s.parse::<u16>().map_err(|_| {
            wrap!(ErrorInt::TransportHeaderInvalid {
                description: format!("invalid port {:?}", s),
            })
        })
    };
    Ok((parse(a)?, parse(b)?))
}

fn parse_channel_range(value: Option<&str>) -> Result<(u8, u8), crate::Error> {
    let v = value.ok_or_else(|| {
        wrap!(ErrorInt::TransportHeaderInvalid {
            description: "interleaved parameter with no value".into(),
        })
    })?;
    let (a, b) = v.split_once('-').unwrap_or((v, v));
    let parse = |s: &str| {
        s.parse::<u8>().map_err(|_| {
            wrap!(ErrorInt::TransportHeaderInvalid {
                description: format!("invalid channel id {:?}", s),
            })
        })
    };
    Ok((parse(a)?, parse(b)?))
}

/// Parses `ssrc=<hex>`. Some servers emit a leading space after the `=`
/// (observed from at least one real camera); tolerate it.
fn parse_ssrc(value: Option<&str>) -> Result<u32, crate::Error> {
    let v = value
        .ok_or_else(|| {
            wrap!(ErrorInt::TransportHeaderInvalid {
                description: "ssrc parameter with no value".into(),
            })
        })?
        .trim()
        .trim_matches('"');
    u32::from_str_radix(v, 16).map_err(|_| {
        wrap!(ErrorInt::TransportHeaderInvalid {
            description: format!("invalid ssrc {:?}", v),
        })
    })
}
