// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `KeyMgmt` header: a MIKEY key-management blob carried as
//! `prot=mikey;uri=<url>;data=<base64>` (spec `§4.D KeyMgmt`). This crate
//! treats the MIKEY payload itself as opaque bytes; interpreting it is a
//! caller concern.

use super::kv;
use crate::ErrorInt;
use bytes::Bytes;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyMgmt {
    pub prot: String,
    pub uri: Option<String>,
    pub data: Bytes,
}

impl KeyMgmt {
    pub fn parse(value: &str) -> Result<Self, crate::Error> {
        let items = kv::parse(value, ';').map_err(|description| {
            wrap!(ErrorInt::MalformedHeader {
                conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                description: description.to_owned(),
            })
        })?;

        let mut prot = None;
        let mut uri = None;
        let mut data = None;
        for item in items {
            match item.key {
                "prot" => prot = item.value,
                "uri" => uri = item.value,
                "data" => data = item.value,
                _ => {} // unknown parameters are ignored.
            }
        }

        let prot = prot
            .ok_or_else(|| {
                wrap!(ErrorInt::MalformedHeader {
                    conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                    description: "KeyMgmt value is missing prot=".into(),
                })
            })?
            .to_owned();
        let data = base64::decode(data.ok_or_else(|| {
            wrap!(ErrorInt::MalformedHeader {
                conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                description: "KeyMgmt value is missing data=".into(),
            })
        })?)
        .map_err(|e| {
            wrap!(ErrorInt::MalformedHeader {
                conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                description: format!("invalid base64 in KeyMgmt: {}", e),
            })
        })?;

        Ok(KeyMgmt {
            prot,
            uri: uri.map(|s| s.to_owned()),
            data: Bytes::from(data),
        })
    }

    pub fn serialize(&self) -> String {
        let mut s = format!("prot={}", self.prot);
        if let Some(uri) = &self.uri {
            s.push_str(&format!(";uri={}", uri));
        }
        s.push_str(&format!(";data={}", base64::encode(&self.data)));
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_spec_grammar() {
        let k = KeyMgmt::parse("prot=mikey;uri=rtsp://x;data=QUJD").unwrap();
        assert_eq!(k.prot, "mikey");
        assert_eq!(k.uri.as_deref(), Some("rtsp://x"));
        assert_eq!(&k.data[..], b"ABC");
    }

    #[test]
    fn uri_is_optional() {
        let k = KeyMgmt::parse("prot=mikey;data=QUJD").unwrap();
        assert_eq!(k.prot, "mikey");
        assert_eq!(k.uri, None);
    }

    #[test]
    fn rejects_missing_data() {
        assert!(KeyMgmt::parse("prot=mikey;uri=rtsp://x").is_err());
    }

    #[test]
    fn rejects_missing_prot() {
        assert!(KeyMgmt::parse("uri=rtsp://x;data=QUJD").is_err());
    }

    #[test]
    fn serialize_round_trips() {
        let k = KeyMgmt {
            prot: "mikey".into(),
            uri: Some("rtsp://x".into()),
            data: Bytes::from_static(b"hello"),
        };
        assert_eq!(KeyMgmt::parse(&k.serialize()).unwrap(), k);
    }
}
