// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SDP session descriptions as an opaque wire blob (spec `§6 External
//! interfaces`: "the core treats it as an opaque blob on the wire").
//!
//! This crate does not parse SDP; `DESCRIBE` responses carry an
//! [`OpaqueSdp`] body supplied by the caller, and `ANNOUNCE` request bodies
//! are handed to the caller unparsed.

use bytes::Bytes;

/// An unparsed SDP session description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpaqueSdp(Bytes);

impl OpaqueSdp {
    pub fn new(body: Bytes) -> Self {
        Self(body)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn content_type(&self) -> &'static str {
        "application/sdp"
    }

    /// Finds the first line starting with `prefix` (e.g. `"m="`, `"a=control:"`)
    /// and returns the remainder of that line. A minimal accessor; anything
    /// beyond "does this blob contain a line I recognize" is the caller's
    /// job.
    pub fn find_format(&self, prefix: &str) -> Option<&str> {
        let text = std::str::from_utf8(&self.0).ok()?;
        for line in text.split("\r\n") {
            if let Some(rest) = line.strip_prefix(prefix) {
                return Some(rest);
            }
        }
        None
    }

    /// The `o=` line's session id/address, used by callers that need
    /// `base_url` when the SDP has no explicit `a=control:` URL. Not parsed
    /// here; callers that need this resolve it from [`Self::find_format`].
    pub fn base_url(&self) -> Option<&str> {
        self.find_format("a=control:")
    }
}

impl From<Bytes> for OpaqueSdp {
    fn from(body: Bytes) -> Self {
        Self::new(body)
    }
}
