// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `Session` header: `<id>` or `<id>;timeout=<seconds>` (spec `§4.D Session`).

use crate::ErrorInt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionHeader {
    pub id: String,
    pub timeout: Option<u32>,
}

impl SessionHeader {
    pub fn parse(value: &str) -> Result<Self, crate::Error> {
        let (id, rest) = match value.split_once(';') {
            Some((id, rest)) => (id.trim(), Some(rest)),
            None => (value.trim(), None),
        };
        if id.is_empty() {
            bail!(ErrorInt::MalformedHeader {
                conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                description: "Session header has an empty id".into(),
            });
        }
        let timeout = match rest {
            None => None,
            Some(rest) => {
                let rest = rest.trim();
                let value = rest.strip_prefix("timeout=").ok_or_else(|| {
                    wrap!(ErrorInt::MalformedHeader {
                        conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                        description: format!("unexpected Session parameter {:?}", rest),
                    })
                })?;
                Some(value.parse::<u32>().map_err(|_| {
                    wrap!(ErrorInt::MalformedHeader {
                        conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                        description: format!("invalid Session timeout {:?}", value),
                    })
                })?)
            }
        };
        Ok(SessionHeader { id: id.to_owned(), timeout })
    }

    pub fn serialize(&self) -> String {
        match self.timeout {
            Some(t) => format!("{};timeout={}", self.id, t),
            None => self.id.clone(),
        }
    }
}
