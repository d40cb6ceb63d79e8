// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connection request dispatch (spec Design Notes §9's scheduling
//! model: one reader task per connection, handler callbacks run on that
//! task). This module turns a parsed [`Request`] into a [`Response`] by
//! driving a [`Server`]; it owns no socket itself, so it can be exercised
//! without any I/O (see the tests below) and reused across the plain-TCP,
//! HTTP-tunnel, and UDP-signalling transports.

use bytes::Bytes;

use crate::proto::{Method, Request, Response};
use crate::server::{RequestContext, Server, ServerHandler};
use crate::ErrorInt;

const SESSION_HEADER: &str = "Session";

fn session_id_of(req: &Request) -> Option<&str> {
    req.headers.get(SESSION_HEADER).map(|v| v.split(';').next().unwrap_or(v).trim())
}

fn error_response(cseq: u32, err: &crate::Error) -> Response {
    let status = crate::error::status_code_for(&err.0).unwrap_or(500);
    Response::new(status).with_cseq(cseq)
}

/// Dispatches one request against `server`, returning the response to send
/// back. `peer_ip` is the connection's observed peer address, used for
/// session IP pinning.
pub fn dispatch<H: ServerHandler>(
    server: &Server<H>,
    req: &Request,
    peer_ip: std::net::IpAddr,
) -> Response {
    let path = req.url.path().to_owned();
    let query = req.url.query().unwrap_or("").to_owned();

    match req.method {
        Method::Options => Response::new(200).with_cseq(req.cseq),

        Method::Describe => {
            let session_id = String::new();
            let ctx = RequestContext {
                session_id: &session_id,
                path: &path,
                query: &query,
                peer_ip,
            };
            match server.describe(&ctx) {
                Ok(sdp) => {
                    let mut resp = Response::new(200).with_cseq(req.cseq);
                    resp.headers.set("Content-Type", sdp.content_type());
                    resp.body = Bytes::copy_from_slice(sdp.as_bytes());
                    resp
                }
                Err(e) => error_response(req.cseq, &e),
            }
        }

        Method::Announce => {
            let session_id = match session_id_of(req) {
                Some(id) => id.to_owned(),
                None => server.create_session(peer_ip),
            };
            let sdp = crate::sdp::OpaqueSdp::new(req.body.clone());
            let media_count = count_media_sections(&sdp);
            let ctx = RequestContext {
                session_id: &session_id,
                path: &path,
                query: &query,
                peer_ip,
            };
            match server.announce(&ctx, &sdp, media_count) {
                Ok(()) => {
                    let mut resp = Response::new(200).with_cseq(req.cseq);
                    resp.headers.set(SESSION_HEADER, session_id);
                    resp
                }
                Err(e) => error_response(req.cseq, &e),
            }
        }

        Method::Setup => {
            let session_id = match session_id_of(req) {
                Some(id) => id.to_owned(),
                None => server.create_session(peer_ip),
            };
            let transport_header = match req.headers.get("Transport") {
                Some(v) => v,
                None => return Response::new(400).with_cseq(req.cseq),
            };
            let transport = match crate::proto::Transport::parse(transport_header) {
                Ok(t) => t,
                Err(e) => return error_response(req.cseq, &e),
            };
            let record = transport.mode == Some(crate::proto::Mode::Record);
            let media_index = media_index_from_url(&req.url);
            let ctx = RequestContext {
                session_id: &session_id,
                path: &path,
                query: &query,
                peer_ip,
            };
            match server.setup(&ctx, req.url.as_str(), media_index, transport, record) {
                Ok(negotiated) => {
                    let mut resp = Response::new(200).with_cseq(req.cseq);
                    resp.headers.set(SESSION_HEADER, session_id);
                    resp.headers.set("Transport", negotiated.serialize());
                    resp
                }
                Err(e) => error_response(req.cseq, &e),
            }
        }

        Method::Play => with_session_ctx(req, &path, &query, peer_ip, |ctx| server.play(ctx)),
        Method::Record => with_session_ctx(req, &path, &query, peer_ip, |ctx| server.record(ctx)),

        Method::Pause | Method::GetParameter | Method::SetParameter => Response::new(200).with_cseq(req.cseq),

        Method::Teardown => {
            let session_id = match session_id_of(req) {
                Some(id) => id.to_owned(),
                None => return Response::new(454).with_cseq(req.cseq),
            };
            match server.teardown(&session_id, peer_ip) {
                Ok(()) => Response::new(200).with_cseq(req.cseq),
                Err(e) => error_response(req.cseq, &e),
            }
        }
    }
}

fn with_session_ctx(
    req: &Request,
    path: &str,
    query: &str,
    peer_ip: std::net::IpAddr,
    f: impl FnOnce(&RequestContext) -> Result<(), crate::Error>,
) -> Response {
    let session_id = match session_id_of(req) {
        Some(id) => id.to_owned(),
        None => return error_response(req.cseq, &wrap!(ErrorInt::SessionNotFound { id: String::new() })),
    };
    let ctx = RequestContext {
        session_id: &session_id,
        path,
        query,
        peer_ip,
    };
    match f(&ctx) {
        Ok(()) => Response::new(200).with_cseq(req.cseq),
        Err(e) => error_response(req.cseq, &e),
    }
}

/// Reads the `/trackID=<N>` suffix SETUP uses to pick which media a
/// request targets, defaulting to `0` when absent (single-media streams
/// omit it entirely).
fn media_index_from_url(url: &crate::proto::Url) -> usize {
    let s = url.as_str();
    match s.rfind("/trackID=") {
        Some(idx) => s[idx + "/trackID=".len()..]
            .split(|c: char| !c.is_ascii_digit())
            .next()
            .and_then(|digits| digits.parse().ok())
            .unwrap_or(0),
        None => 0,
    }
}

/// Counts `m=` lines in an `ANNOUNCE` body, used to know how many media a
/// publisher must `SETUP` before `RECORD` is accepted.
fn count_media_sections(sdp: &crate::sdp::OpaqueSdp) -> usize {
    std::str::from_utf8(sdp.as_bytes())
        .map(|text| text.lines().filter(|l| l.starts_with("m=")).count())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{HeaderMap, Url};
    use crate::sdp::OpaqueSdp;
    use crate::FixedRandom;

    struct NullHandler;
    impl ServerHandler for NullHandler {
        fn on_describe(&self, _ctx: &RequestContext) -> Result<OpaqueSdp, crate::Error> {
            Ok(OpaqueSdp::new(Bytes::from_static(
                b"v=0\r\nm=video 0 RTP/AVP 96\r\n",
            )))
        }
        fn on_announce(&self, _ctx: &RequestContext, _sdp: &OpaqueSdp) -> Result<(), crate::Error> {
            Ok(())
        }
        fn on_setup(&self, _ctx: &RequestContext, _media_index: usize) -> Result<(), crate::Error> {
            Ok(())
        }
        fn on_play(&self, _ctx: &RequestContext) -> Result<(), crate::Error> {
            Ok(())
        }
        fn on_record(&self, _ctx: &RequestContext) -> Result<(), crate::Error> {
            Ok(())
        }
        fn on_packet_rtp(&self, _ctx: &RequestContext, _packet: &crate::rtp::Packet) -> Result<(), crate::Error> {
            Ok(())
        }
        fn on_session_close(&self, _session_id: &str) {}
    }

    fn request(method: Method, url: &str, cseq: u32) -> Request {
        Request {
            method,
            url: Url::parse(url).unwrap(),
            cseq,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    fn peer() -> std::net::IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    #[test]
    fn describe_returns_the_handlers_sdp() {
        let server = Server::new(NullHandler, Box::new(FixedRandom::constant(1)));
        let resp = dispatch(&server, &request(Method::Describe, "rtsp://h/cam", 1), peer());
        assert_eq!(resp.status, 200);
        assert!(resp.body.starts_with(b"v=0"));
    }

    #[test]
    fn setup_without_a_session_header_creates_one_and_echoes_it() {
        let server = Server::new(NullHandler, Box::new(FixedRandom::constant(2)));
        let mut req = request(Method::Setup, "rtsp://h/cam", 2);
        req.headers.set("Transport", "RTP/AVP;unicast;client_port=3456-3457");
        let resp = dispatch(&server, &req, peer());
        assert_eq!(resp.status, 200);
        assert!(resp.headers.get(SESSION_HEADER).is_some());
    }

    #[test]
    fn play_without_a_setup_session_fails() {
        let server = Server::new(NullHandler, Box::new(FixedRandom::constant(3)));
        let mut req = request(Method::Play, "rtsp://h/cam", 3);
        req.headers.set(SESSION_HEADER, "deadbeef");
        let resp = dispatch(&server, &req, peer());
        assert_eq!(resp.status, 454);
    }

    #[test]
    fn teardown_twice_reports_session_not_found_on_the_second_call() {
        let server = Server::new(NullHandler, Box::new(FixedRandom::constant(4)));
        let mut setup_req = request(Method::Setup, "rtsp://h/cam", 1);
        setup_req.headers.set("Transport", "RTP/AVP;unicast;client_port=3456-3457");
        let setup_resp = dispatch(&server, &setup_req, peer());
        let session_id = setup_resp.headers.get(SESSION_HEADER).unwrap().to_owned();

        let mut teardown_req = request(Method::Teardown, "rtsp://h/cam", 2);
        teardown_req.headers.set(SESSION_HEADER, session_id.clone());
        assert_eq!(dispatch(&server, &teardown_req, peer()).status, 200);

        let mut teardown_again = request(Method::Teardown, "rtsp://h/cam", 3);
        teardown_again.headers.set(SESSION_HEADER, session_id);
        assert_eq!(dispatch(&server, &teardown_again, peer()).status, 454);
    }
}
