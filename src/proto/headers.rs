// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RTSP header maps: case-insensitive keys normalized to a canonical spelling,
//! an ordered sequence of values per key, and deterministic serialization in
//! sorted key order (spec `§3 Header map`).

use crate::ErrorInt;

pub const MAX_ENTRIES: usize = 255;
pub const MAX_KEY_LEN: usize = 512;
pub const MAX_VALUE_LEN: usize = 2048;

/// Canonicalizes a header name the way this crate always writes it on the
/// wire: a handful of well-known names get their conventional mixed case
/// (`RTP-Info`, `WWW-Authenticate`, `CSeq`), everything else gets ordinary
/// HTTP-style Title-Case-With-Dashes.
pub fn canonicalize(name: &str) -> String {
    match_known(name).map(str::to_owned).unwrap_or_else(|| {
        name.split('-')
            .map(title_case_word)
            .collect::<Vec<_>>()
            .join("-")
    })
}

fn title_case_word(w: &str) -> String {
    let mut chars = w.chars();
    match chars.next() {
        Some(c) => c.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
        None => String::new(),
    }
}

fn match_known(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    Some(match lower.as_str() {
        "rtp-info" => "RTP-Info",
        "www-authenticate" => "WWW-Authenticate",
        "cseq" => "CSeq",
        "keymgmt" => "KeyMgmt",
        _ => return None,
    })
}

/// A single header name, normalized for case-insensitive comparison and
/// hashing while retaining its canonical spelling for display.
#[derive(Clone, Debug, Eq)]
pub struct HeaderName {
    canonical: String,
}

impl HeaderName {
    pub fn new(raw: &str) -> Self {
        Self {
            canonical: canonicalize(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

impl PartialEq for HeaderName {
    fn eq(&self, other: &Self) -> bool {
        self.canonical.eq_ignore_ascii_case(&other.canonical)
    }
}

impl std::hash::Hash for HeaderName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical.to_ascii_lowercase().hash(state);
    }
}

impl std::fmt::Display for HeaderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// An ordered multi-map from canonical header name to a sequence of values.
///
/// Entries preserve insertion order for iteration, but [`HeaderMap::serialize`]
/// always emits keys in sorted order so that two maps with the same entries
/// in different insertion orders produce byte-identical output (spec `§8`
/// invariant 4).
#[derive(Clone, Debug, Default)]
pub struct HeaderMap {
    entries: Vec<(HeaderName, Vec<String>)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, name: &str) -> Option<usize> {
        let key = HeaderName::new(name);
        self.entries.iter().position(|(k, _)| *k == key)
    }

    /// Appends `value` under `name`, creating the entry if absent.
    ///
    /// Returns an error once the map would exceed `§3`'s limits.
    pub fn append(&mut self, name: &str, value: impl Into<String>) -> Result<(), crate::Error> {
        let value = value.into();
        if name.len() > MAX_KEY_LEN {
            bail!(ErrorInt::MalformedHeader {
                conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                description: format!("header name {:?} exceeds {} bytes", name, MAX_KEY_LEN),
            });
        }
        if value.len() > MAX_VALUE_LEN {
            bail!(ErrorInt::MalformedHeader {
                conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                description: format!("header value for {:?} exceeds {} bytes", name, MAX_VALUE_LEN),
            });
        }
        match self.find(name) {
            Some(idx) => self.entries[idx].1.push(value),
            None => {
                if self.entries.len() >= MAX_ENTRIES {
                    bail!(ErrorInt::MalformedHeader {
                        conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                        description: format!("more than {} header entries", MAX_ENTRIES),
                    });
                }
                self.entries.push((HeaderName::new(name), vec![value]));
            }
        }
        Ok(())
    }

    /// Sets `name` to exactly `value`, discarding any previous values.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.find(name) {
            Some(idx) => self.entries[idx].1 = vec![value],
            None => self.entries.push((HeaderName::new(name), vec![value])),
        }
    }

    pub fn remove(&mut self, name: &str) {
        if let Some(idx) = self.find(name) {
            self.entries.remove(idx);
        }
    }

    /// Returns the first value for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.find(name)
            .and_then(|idx| self.entries[idx].1.first())
            .map(String::as_str)
    }

    /// Returns all values for `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.find(name).map(|idx| self.entries[idx].1.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &[String])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Serializes in sorted-by-key order, one `Name: value\r\n` line per value.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        let mut sorted: Vec<&(HeaderName, Vec<String>)> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        for (name, values) in sorted {
            for value in values {
                out.extend_from_slice(name.as_str().as_bytes());
                out.extend_from_slice(b": ");
                out.extend_from_slice(value.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
        }
    }
}

impl crate::ConnectionContext {
    /// A placeholder context used when a header-map limit is violated before
    /// any connection context is available to the caller (e.g. constructing a
    /// request to send). Real parse errors always carry the real context.
    pub(crate) fn dummy_for_limits() -> Self {
        Self {
            local_addr: "0.0.0.0:0".parse().unwrap(),
            peer_addr: "0.0.0.0:0".parse().unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_known_headers() {
        assert_eq!(canonicalize("rtp-info"), "RTP-Info");
        assert_eq!(canonicalize("WWW-AUTHENTICATE"), "WWW-Authenticate");
        assert_eq!(canonicalize("cseq"), "CSeq");
        assert_eq!(canonicalize("content-length"), "Content-Length");
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut h = HeaderMap::new();
        h.set("Content-Length", "5");
        assert_eq!(h.get("content-length"), Some("5"));
        assert_eq!(h.get("CONTENT-LENGTH"), Some("5"));
    }

    #[test]
    fn serialize_is_order_independent() {
        let mut a = HeaderMap::new();
        a.append("CSeq", "1").unwrap();
        a.append("Content-Length", "0").unwrap();

        let mut b = HeaderMap::new();
        b.append("Content-Length", "0").unwrap();
        b.append("CSeq", "1").unwrap();

        let mut out_a = Vec::new();
        let mut out_b = Vec::new();
        a.serialize(&mut out_a);
        b.serialize(&mut out_b);
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn append_preserves_multiple_values() {
        let mut h = HeaderMap::new();
        h.append("Via", "a").unwrap();
        h.append("Via", "b").unwrap();
        assert_eq!(h.get_all("Via"), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn rejects_oversized_value() {
        let mut h = HeaderMap::new();
        let huge = "x".repeat(MAX_VALUE_LEN + 1);
        assert!(h.append("X-Custom", huge).is_err());
    }
}
