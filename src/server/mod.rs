// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-side core: session state machine, publisher fan-out, and the
//! [`ServerHandler`] capability an embedding binary implements to answer
//! `DESCRIBE`/`ANNOUNCE`/`SETUP`/`PLAY`/`RECORD` and receive packets.
//!
//! This module is transport-agnostic: it has no socket of its own. A
//! per-connection reader task (`conn.rs`) drives it from parsed requests.

pub mod conn;
pub mod session;
pub mod stream;

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::proto::Transport;
use crate::rtp::Packet;
use crate::sdp::OpaqueSdp;
use crate::{Error, ErrorInt, RandomSource};

pub use session::{Session, SessionState, SetupMedia};
pub use stream::ServerStream;

/// Everything a [`ServerHandler`] callback needs about the request that
/// triggered it.
pub struct RequestContext<'a> {
    pub session_id: &'a str,
    pub path: &'a str,
    pub query: &'a str,
    pub peer_ip: IpAddr,
}

/// The inversion-of-control surface an embedding application implements.
///
/// Every method is required; there are no optional/default-no-op callbacks.
/// Handlers run synchronously on the connection's reader task (Design Notes
/// §9's scheduling model) and must not block indefinitely.
pub trait ServerHandler: Send + Sync {
    /// Answers `DESCRIBE`: produce the SDP for `ctx.path`.
    fn on_describe(&self, ctx: &RequestContext) -> Result<OpaqueSdp, Error>;

    /// Answers `ANNOUNCE`: accept or reject a publisher's offered SDP.
    fn on_announce(&self, ctx: &RequestContext, sdp: &OpaqueSdp) -> Result<(), Error>;

    /// Answers `SETUP` for one media index, after the core's own transport
    /// and state-machine validation has already passed.
    fn on_setup(&self, ctx: &RequestContext, media_index: usize) -> Result<(), Error>;

    /// Answers `PLAY`, after the core's own state-machine validation.
    fn on_play(&self, ctx: &RequestContext) -> Result<(), Error>;

    /// Answers `RECORD`, after the core's own state-machine validation.
    fn on_record(&self, ctx: &RequestContext) -> Result<(), Error>;

    /// Delivers one received RTP packet from a publisher session.
    fn on_packet_rtp(&self, ctx: &RequestContext, packet: &Packet) -> Result<(), Error>;

    /// Fires exactly once when a session is torn down, for any reason
    /// (explicit `TEARDOWN`, transport timeout, or server shutdown).
    fn on_session_close(&self, session_id: &str);
}

/// Owns every session and published stream for one server instance (the
/// arena Design Notes §9 calls for: sessions and streams are looked up by
/// id/path rather than held by direct reference, so `Session`,
/// `ServerStream`, and the owning `Server` can reference each other without
/// a reference cycle).
pub struct Server<H> {
    handler: H,
    random: Box<dyn RandomSource>,
    sessions: RwLock<HashMap<String, Mutex<Session>>>,
    streams: RwLock<HashMap<String, Arc<ServerStream>>>,
}

impl<H: ServerHandler> Server<H> {
    pub fn new(handler: H, random: Box<dyn RandomSource>) -> Self {
        Self {
            handler,
            random,
            sessions: RwLock::new(HashMap::new()),
            streams: RwLock::new(HashMap::new()),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Creates a new session owned by `peer_ip`, returning its id.
    pub fn create_session(&self, peer_ip: IpAddr) -> String {
        let id = self.random.hex16();
        self.sessions
            .write()
            .insert(id.clone(), Mutex::new(Session::new(id.clone(), peer_ip)));
        id
    }

    fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> Result<R, Error>) -> Result<R, Error> {
        let sessions = self.sessions.read();
        let session = sessions
            .get(id)
            .ok_or_else(|| wrap!(ErrorInt::SessionNotFound { id: id.to_owned() }))?;
        let result = f(&mut session.lock());
        result
    }

    /// Looks up or creates the stream published at `path`, used by both the
    /// `ANNOUNCE`r (as owner) and later readers (as subscribers).
    pub fn stream_for_path(&self, path: &str, media_count: usize) -> Arc<ServerStream> {
        if let Some(existing) = self.streams.read().get(path) {
            return existing.clone();
        }
        self.streams
            .write()
            .entry(path.to_owned())
            .or_insert_with(|| Arc::new(ServerStream::new(path.to_owned(), media_count)))
            .clone()
    }

    pub fn describe(&self, ctx: &RequestContext) -> Result<OpaqueSdp, Error> {
        self.handler.on_describe(ctx)
    }

    /// `ANNOUNCE`: registers the publisher's session and creates (or
    /// reattaches to) the path's [`ServerStream`], sized to the SDP's media
    /// count, so a reader's later `SETUP`/`PLAY` has something to subscribe
    /// to.
    pub fn announce(&self, ctx: &RequestContext, sdp: &OpaqueSdp, media_count: usize) -> Result<(), Error> {
        self.with_session(ctx.session_id, |s| s.announce(ctx.peer_ip, ctx.path, media_count))?;
        self.stream_for_path(ctx.path, media_count);
        self.handler.on_announce(ctx, sdp)
    }

    /// `SETUP`: validates and records one media's transport (reserving
    /// interleaved channel ids for TCP delivery), ensures the path has a
    /// registered stream, and returns the negotiated [`Transport`] to echo
    /// back to the caller.
    pub fn setup(
        &self,
        ctx: &RequestContext,
        url: &str,
        media_index: usize,
        transport: Transport,
        record: bool,
    ) -> Result<Transport, Error> {
        let negotiated = self.with_session(ctx.session_id, |s| {
            s.setup(ctx.peer_ip, ctx.path, url, media_index, transport, record)
        })?;
        self.stream_for_path(ctx.path, media_index + 1);
        self.handler.on_setup(ctx, media_index)?;
        Ok(negotiated)
    }

    pub fn play(&self, ctx: &RequestContext) -> Result<(), Error> {
        self.with_session(ctx.session_id, |s| s.play(ctx.peer_ip))?;
        self.handler.on_play(ctx)?;
        if let Some(stream) = self.streams.read().get(ctx.path) {
            stream.subscribe(ctx.session_id);
        }
        Ok(())
    }

    pub fn record(&self, ctx: &RequestContext) -> Result<(), Error> {
        self.with_session(ctx.session_id, |s| s.record(ctx.peer_ip))?;
        self.handler.on_record(ctx)
    }

    /// Delivers one received RTP packet: fans it out to every session
    /// subscribed to `ctx.path` (spec `§3` `ServerStream` ownership), or
    /// falls back to notifying `ctx`'s own session when the path has no
    /// registered stream (e.g. a handler that doesn't publish through
    /// `ANNOUNCE`/`SETUP`).
    pub fn packet_rtp(&self, ctx: &RequestContext, packet: &Packet) -> Result<(), Error> {
        let stream = self.streams.read().get(ctx.path).cloned();
        match stream {
            Some(stream) => {
                let readers = stream.readers();
                for reader_id in readers.iter() {
                    let reader_ctx = RequestContext {
                        session_id: reader_id,
                        path: ctx.path,
                        query: ctx.query,
                        peer_ip: ctx.peer_ip,
                    };
                    self.handler.on_packet_rtp(&reader_ctx, packet)?;
                }
                Ok(())
            }
            None => self.handler.on_packet_rtp(ctx, packet),
        }
    }

    /// Tears down a session: idempotent at the `Session` layer (repeat calls
    /// report `SessionNotFound`), and always unsubscribes from every stream,
    /// drops the session from the table so it can't be reused, and fires
    /// `OnSessionClose` exactly once on the first successful call.
    pub fn teardown(&self, session_id: &str, peer_ip: IpAddr) -> Result<(), Error> {
        self.with_session(session_id, |s| s.teardown(peer_ip))?;
        for stream in self.streams.read().values() {
            stream.unsubscribe(session_id);
        }
        self.sessions.write().remove(session_id);
        self.handler.on_session_close(session_id);
        Ok(())
    }
}
