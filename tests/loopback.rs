// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drives a `Server`/client pair over a real loopback TCP connection
//! through `OPTIONS -> DESCRIBE -> SETUP -> PLAY -> TEARDOWN`, exercising
//! the wire codec, server dispatch, and client request construction
//! together rather than any one of them in isolation.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use rtsp_core::client::RequestBuilder;
use rtsp_core::proto::{Method, Request, Response, RtspCodec, RtspMessage, Url};
use rtsp_core::sdp::OpaqueSdp;
use rtsp_core::server::{conn::dispatch, RequestContext, Server, ServerHandler};
use rtsp_core::ConnectionContext;
use rtsp_core::{Error, FixedRandom};

struct OneMediaHandler;

impl ServerHandler for OneMediaHandler {
    fn on_describe(&self, _ctx: &RequestContext) -> Result<OpaqueSdp, Error> {
        Ok(OpaqueSdp::new(Bytes::from_static(
            b"v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\nm=video 0 RTP/AVP 96\r\na=control:trackID=0\r\n",
        )))
    }
    fn on_announce(&self, _ctx: &RequestContext, _sdp: &OpaqueSdp) -> Result<(), Error> {
        Ok(())
    }
    fn on_setup(&self, _ctx: &RequestContext, _media_index: usize) -> Result<(), Error> {
        Ok(())
    }
    fn on_play(&self, _ctx: &RequestContext) -> Result<(), Error> {
        Ok(())
    }
    fn on_record(&self, _ctx: &RequestContext) -> Result<(), Error> {
        Ok(())
    }
    fn on_packet_rtp(&self, _ctx: &RequestContext, _packet: &rtsp_core::rtp::Packet) -> Result<(), Error> {
        Ok(())
    }
    fn on_session_close(&self, _session_id: &str) {}
}

async fn next_response(framed: &mut Framed<TcpStream, RtspCodec>) -> Response {
    match framed.next().await.expect("connection closed").expect("decode error") {
        RtspMessage::Response(r) => r,
        other => panic!("expected a response, got {other:?}"),
    }
}

async fn run_server_one_request(listener: &TcpListener, server: &Server<OneMediaHandler>) {
    let (stream, peer_addr) = listener.accept().await.unwrap();
    let local_addr = stream.local_addr().unwrap();
    let mut framed = Framed::new(stream, RtspCodec::new(ConnectionContext::new(local_addr, peer_addr)));
    let req = match framed.next().await.unwrap().unwrap() {
        RtspMessage::Request(r) => r,
        other => panic!("expected a request, got {other:?}"),
    };
    let resp = dispatch(server, &req, peer_addr.ip());
    framed.send(resp).await.unwrap();
}

#[tokio::test]
async fn options_describe_setup_play_teardown_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server_addr = listener.local_addr().unwrap();
    let server = Server::new(OneMediaHandler, Box::new(FixedRandom::constant(0x42)));

    let url = Url::parse(&format!("rtsp://{server_addr}/cam")).unwrap();
    let mut builder = RequestBuilder::new();

    // OPTIONS
    let client = TcpStream::connect(server_addr).await.unwrap();
    let local_addr = client.local_addr().unwrap();
    let mut client_framed =
        Framed::new(client, RtspCodec::new(ConnectionContext::new(local_addr, server_addr)));
    let options_req = builder.build(Method::Options, &url, Bytes::new());

    // Run the server's accept+dispatch concurrently with the client's send for each step.
    let serve = run_server_one_request(&listener, &server);
    let send = async {
        client_framed.send(options_req.clone()).await.unwrap();
    };
    tokio::join!(serve, send);
    let resp = next_response(&mut client_framed).await;
    assert_eq!(resp.status, 200);

    // DESCRIBE
    let describe_req = builder.build(Method::Describe, &url, Bytes::new());
    let serve = run_server_one_request(&listener, &server);
    let send = async {
        client_framed.send(describe_req).await.unwrap();
    };
    tokio::join!(serve, send);
    let resp = next_response(&mut client_framed).await;
    assert_eq!(resp.status, 200);
    assert!(resp.body.starts_with(b"v=0"));

    // SETUP
    let mut setup_req: Request = builder.build(Method::Setup, &url, Bytes::new());
    setup_req
        .headers
        .set("Transport", "RTP/AVP;unicast;client_port=3456-3457");
    let serve = run_server_one_request(&listener, &server);
    let send = async {
        client_framed.send(setup_req).await.unwrap();
    };
    tokio::join!(serve, send);
    let resp = next_response(&mut client_framed).await;
    assert_eq!(resp.status, 200);
    let session_id = resp.headers.get("Session").unwrap().to_owned();

    // PLAY
    let mut play_req = builder.build(Method::Play, &url, Bytes::new());
    play_req.headers.set("Session", session_id.clone());
    let serve = run_server_one_request(&listener, &server);
    let send = async {
        client_framed.send(play_req).await.unwrap();
    };
    tokio::join!(serve, send);
    let resp = next_response(&mut client_framed).await;
    assert_eq!(resp.status, 200);

    // TEARDOWN
    let mut teardown_req = builder.build(Method::Teardown, &url, Bytes::new());
    teardown_req.headers.set("Session", session_id);
    let serve = run_server_one_request(&listener, &server);
    let send = async {
        client_framed.send(teardown_req).await.unwrap();
    };
    tokio::join!(serve, send);
    let resp = next_response(&mut client_framed).await;
    assert_eq!(resp.status, 200);
}
