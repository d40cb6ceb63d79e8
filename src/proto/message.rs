// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request/response framing: parsing a head-plus-body message out of a
//! buffer that may not yet hold the whole thing, and serializing one back
//! onto the wire (spec `§4.A Parsing algorithm (request/response)`).
//!
//! Parsing here is sans-IO: every function takes a `&[u8]` slice already in
//! memory and returns `Ok(None)` when the buffer doesn't yet hold a complete
//! message, rather than doing any reading itself. [`super::codec::RtspCodec`]
//! drives these functions from a `tokio_util::codec::Decoder` impl.

use bytes::Bytes;

use super::headers::HeaderMap;
use super::method::Method;
use super::url::Url;
use crate::{ConnectionContext, Error, ErrorInt};

/// The 128 KiB body-size ceiling named in spec `§8 invariant 3`.
pub const MAX_BODY_LEN: usize = 128 * 1024;

#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub cseq: u32,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone, Debug)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub cseq: Option<u32>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    /// Builds a bare response with `reason` filled in from [`reason_phrase`]
    /// when not otherwise specified.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            reason: reason_phrase(status).to_owned(),
            cseq: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_cseq(mut self, cseq: u32) -> Self {
        self.cseq = Some(cseq);
        self
    }
}

/// Returns the conventional reason phrase for a status code this crate emits
/// or expects, falling back to a generic phrase for anything else.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        415 => "Unsupported Media Type",
        454 => "Session Not Found",
        455 => "Method Not Valid In This State",
        459 => "Aggregate Operation Not Allowed",
        460 => "Only Aggregate Operation Allowed",
        461 => "Unsupported Transport",
        462 => "Destination Unreachable",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        505 => "RTSP Version Not Supported",
        _ if (200..300).contains(&status) => "OK",
        _ if (400..500).contains(&status) => "Bad Request",
        _ => "Internal Server Error",
    }
}

/// Finds the end of the header block (the byte just after the blank line's
/// trailing `\n`), or `None` if `buf` doesn't contain one yet.
fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

struct Head<'a> {
    first_line: &'a str,
    headers: HeaderMap,
}

fn parse_head<'a>(buf: &'a [u8], conn_ctx: &ConnectionContext) -> Result<Option<(Head<'a>, usize)>, Error> {
    let head_end = match find_head_end(buf) {
        Some(i) => i,
        None => {
            if buf.len() > 64 * 1024 {
                bail!(ErrorInt::MalformedHeader {
                    conn_ctx: conn_ctx.clone(),
                    description: "header block exceeds 64 KiB without a terminating blank line"
                        .into(),
                });
            }
            return Ok(None);
        }
    };
    let text = std::str::from_utf8(&buf[..head_end]).map_err(|_| {
        wrap!(ErrorInt::MalformedHeader {
            conn_ctx: conn_ctx.clone(),
            description: "header block is not valid UTF-8".into(),
        })
    })?;
    let mut lines = text.split("\r\n");
    let first_line = lines.next().unwrap_or("");
    let mut headers = HeaderMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let colon = line.find(':').ok_or_else(|| {
            wrap!(ErrorInt::MalformedHeader {
                conn_ctx: conn_ctx.clone(),
                description: format!("header line {:?} has no colon", line),
            })
        })?;
        let name = line[..colon].trim();
        let value = line[colon + 1..].trim();
        headers.append(name, value)?;
    }
    Ok(Some((Head { first_line, headers }, head_end)))
}

fn body_len(headers: &HeaderMap, conn_ctx: &ConnectionContext) -> Result<usize, Error> {
    match headers.get("Content-Length") {
        None => Ok(0),
        Some(v) => {
            let len: usize = v.trim().parse().map_err(|_| {
                wrap!(ErrorInt::MalformedHeader {
                    conn_ctx: conn_ctx.clone(),
                    description: format!("invalid Content-Length {:?}", v),
                })
            })?;
            if len > MAX_BODY_LEN {
                bail!(ErrorInt::ContentLengthTooLarge {
                    conn_ctx: conn_ctx.clone(),
                    len,
                });
            }
            Ok(len)
        }
    }
}

fn cseq(headers: &HeaderMap, conn_ctx: &ConnectionContext) -> Result<Option<u32>, Error> {
    match headers.get("CSeq") {
        None => Ok(None),
        Some(v) => v.trim().parse().map(Some).map_err(|_| {
            wrap!(ErrorInt::MalformedHeader {
                conn_ctx: conn_ctx.clone(),
                description: format!("invalid CSeq {:?}", v),
            })
        }),
    }
}

/// Attempts to parse a request out of the front of `buf`.
///
/// Returns `Ok(None)` if `buf` doesn't yet hold the complete head (and, once
/// `Content-Length` is known, body). On success, the second element of the
/// tuple is the number of bytes of `buf` the message occupied.
pub fn try_parse_request(
    buf: &[u8],
    conn_ctx: &ConnectionContext,
) -> Result<Option<(Request, usize)>, Error> {
    let (head, head_end) = match parse_head(buf, conn_ctx)? {
        Some(v) => v,
        None => return Ok(None),
    };
    let mut parts = head.first_line.splitn(3, ' ');
    let method_str = parts.next().unwrap_or("");
    let url_str = parts.next().unwrap_or("");
    let version = parts.next().unwrap_or("");
    let method: Method = method_str.parse().map_err(|_| {
        wrap!(ErrorInt::MalformedHeader {
            conn_ctx: conn_ctx.clone(),
            description: format!("unknown method {:?}", method_str),
        })
    })?;
    if !version.starts_with("RTSP/") {
        bail!(ErrorInt::MalformedHeader {
            conn_ctx: conn_ctx.clone(),
            description: format!("expected RTSP/1.0, got {:?}", version),
        });
    }
    let url = Url::parse(url_str)?;
    let len = body_len(&head.headers, conn_ctx)?;
    if buf.len() < head_end + len {
        return Ok(None);
    }
    let cseq = cseq(&head.headers, conn_ctx)?.ok_or_else(|| {
        wrap!(ErrorInt::MalformedHeader {
            conn_ctx: conn_ctx.clone(),
            description: "request is missing required CSeq header".into(),
        })
    })?;
    let body = Bytes::copy_from_slice(&buf[head_end..head_end + len]);
    Ok(Some((
        Request {
            method,
            url,
            cseq,
            headers: head.headers,
            body,
        },
        head_end + len,
    )))
}

/// Attempts to parse a response out of the front of `buf`. See
/// [`try_parse_request`] for the incomplete-buffer contract.
pub fn try_parse_response(
    buf: &[u8],
    conn_ctx: &ConnectionContext,
) -> Result<Option<(Response, usize)>, Error> {
    let (head, head_end) = match parse_head(buf, conn_ctx)? {
        Some(v) => v,
        None => return Ok(None),
    };
    let mut parts = head.first_line.splitn(3, ' ');
    let version = parts.next().unwrap_or("");
    let status_str = parts.next().unwrap_or("");
    let reason = parts.next().unwrap_or("").to_owned();
    if !version.starts_with("RTSP/") {
        bail!(ErrorInt::MalformedHeader {
            conn_ctx: conn_ctx.clone(),
            description: format!("expected RTSP/1.0, got {:?}", version),
        });
    }
    let status: u16 = status_str.parse().map_err(|_| {
        wrap!(ErrorInt::MalformedHeader {
            conn_ctx: conn_ctx.clone(),
            description: format!("invalid status code {:?}", status_str),
        })
    })?;
    let len = body_len(&head.headers, conn_ctx)?;
    if buf.len() < head_end + len {
        return Ok(None);
    }
    let cseq = cseq(&head.headers, conn_ctx)?;
    let body = Bytes::copy_from_slice(&buf[head_end..head_end + len]);
    Ok(Some((
        Response {
            status,
            reason,
            cseq,
            headers: head.headers,
            body,
        },
        head_end + len,
    )))
}

impl Request {
    pub fn serialize(&self) -> Bytes {
        let mut out = Vec::with_capacity(256 + self.body.len());
        out.extend_from_slice(self.method.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.url.as_str().as_bytes());
        out.extend_from_slice(b" RTSP/1.0\r\n");
        out.extend_from_slice(format!("CSeq: {}\r\n", self.cseq).as_bytes());
        self.headers.serialize(&mut out);
        if !self.body.is_empty() {
            out.extend_from_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        Bytes::from(out)
    }
}

impl Response {
    pub fn serialize(&self) -> Bytes {
        let mut out = Vec::with_capacity(256 + self.body.len());
        out.extend_from_slice(format!("RTSP/1.0 {} {}\r\n", self.status, self.reason).as_bytes());
        if let Some(cseq) = self.cseq {
            out.extend_from_slice(format!("CSeq: {}\r\n", cseq).as_bytes());
        }
        self.headers.serialize(&mut out);
        if !self.body.is_empty() {
            out.extend_from_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        Bytes::from(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ConnectionContext {
        ConnectionContext::dummy()
    }

    #[test]
    fn round_trips_describe_request() {
        let raw = b"DESCRIBE rtsp://example.com/media.mp4 RTSP/1.0\r\nCSeq: 2\r\nAccept: application/sdp\r\n\r\n";
        let (req, consumed) = try_parse_request(raw, &ctx()).unwrap().unwrap();
        assert_eq!(consumed, raw.len());
        assert_eq!(req.method, Method::Describe);
        assert_eq!(req.cseq, 2);
        assert_eq!(req.headers.get("Accept"), Some("application/sdp"));
        assert!(req.body.is_empty());
    }

    #[test]
    fn incomplete_head_yields_none() {
        let raw = b"DESCRIBE rtsp://example.com/media.mp4 RTSP/1.0\r\nCSeq: 2\r\n";
        assert!(try_parse_request(raw, &ctx()).unwrap().is_none());
    }

    #[test]
    fn waits_for_full_body_per_content_length() {
        let raw = b"RTSP/1.0 200 OK\r\nCSeq: 2\r\nContent-Length: 10\r\n\r\nabc";
        assert!(try_parse_response(raw, &ctx()).unwrap().is_none());
    }

    #[test]
    fn parses_response_with_body() {
        let raw = b"RTSP/1.0 200 OK\r\nCSeq: 3\r\nContent-Type: application/sdp\r\nContent-Length: 5\r\n\r\nv=0\r\n";
        let (resp, consumed) = try_parse_response(raw, &ctx()).unwrap().unwrap();
        assert_eq!(consumed, raw.len());
        assert_eq!(resp.status, 200);
        assert_eq!(resp.cseq, Some(3));
        assert_eq!(&resp.body[..], b"v=0\r\n");
    }

    #[test]
    fn rejects_oversized_content_length() {
        let raw = format!(
            "RTSP/1.0 200 OK\r\nCSeq: 1\r\nContent-Length: {}\r\n\r\n",
            MAX_BODY_LEN + 1
        );
        assert!(try_parse_response(raw.as_bytes(), &ctx()).is_err());
    }

    #[test]
    fn request_missing_cseq_is_rejected() {
        let raw = b"OPTIONS rtsp://example.com/ RTSP/1.0\r\n\r\n";
        assert!(try_parse_request(raw, &ctx()).is_err());
    }

    #[test]
    fn serialize_then_parse_round_trips() {
        let mut headers = HeaderMap::new();
        headers.set("User-Agent", "rtsp-core-test");
        let req = Request {
            method: Method::Options,
            url: Url::parse("rtsp://example.com/stream").unwrap(),
            cseq: 7,
            headers,
            body: Bytes::new(),
        };
        let wire = req.serialize();
        let (parsed, consumed) = try_parse_request(&wire, &ctx()).unwrap().unwrap();
        assert_eq!(consumed, wire.len());
        assert_eq!(parsed.cseq, 7);
        assert_eq!(parsed.headers.get("User-Agent"), Some("rtsp-core-test"));
    }
}
