// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP-tunneled RTSP (spec `§4.D HTTP tunnel (optional)`): pairs a GET
//! (downstream, server→client) and a POST (uplink, client→server) HTTP
//! request sharing an `x-sessioncookie` header value into one logical
//! bidirectional byte stream.
//!
//! Parsing the surrounding HTTP request/response framing is left to the
//! caller (an HTTP library or hand-rolled listener); this module only owns
//! the correlation and the base64 body encoding RFC 2326's tunneling
//! extension specifies.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::transport::ring::{self, RingReceiver, RingSender};
use crate::{Error, ErrorInt};

pub const SESSION_COOKIE_HEADER: &str = "x-sessioncookie";

/// Decodes one base64-encoded HTTP body chunk into raw RTSP bytes.
pub fn decode_chunk(conn_ctx: crate::ConnectionContext, body: &[u8]) -> Result<Bytes, Error> {
    let decoded = base64::decode(body).map_err(|e| {
        wrap!(ErrorInt::MalformedHeader {
            conn_ctx,
            description: format!("invalid base64 in HTTP tunnel body: {}", e),
        })
    })?;
    Ok(Bytes::from(decoded))
}

/// Encodes raw RTSP bytes into a base64 HTTP body chunk.
pub fn encode_chunk(data: &[u8]) -> String {
    base64::encode(data)
}

/// Tracks GET legs awaiting their paired POST, keyed by session cookie.
#[derive(Default)]
pub struct TunnelRegistry {
    pending: Mutex<HashMap<String, RingSender>>,
}

impl TunnelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the downstream leg (the GET request) for `cookie`, and
    /// returns the receiver its handler pulls from to stream the HTTP
    /// response body.
    pub fn register_downstream(&self, cookie: &str, capacity: usize) -> RingReceiver {
        let (tx, rx) = ring::channel(capacity);
        self.pending.lock().insert(cookie.to_owned(), tx);
        rx
    }

    /// Called when the POST leg for `cookie` arrives: claims the downstream
    /// sender so the connection driving RTSP can write responses back
    /// through it, completing the pairing. Returns `None` if no GET for
    /// this cookie has registered yet.
    pub fn pair_uplink(&self, cookie: &str) -> Option<RingSender> {
        self.pending.lock().remove(cookie)
    }
}
