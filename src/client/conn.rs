// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound request construction: CSeq sequencing and the 401 challenge/
//! retry cycle (spec `§4.F`: "on 401, the client parses WWW-Authenticate,
//! constructs an Authorization header, and re-sends the same request with
//! an incremented CSeq; subsequent requests in the session attach the
//! Authorization preemptively").
//!
//! This module owns no socket; it builds [`Request`]s and interprets
//! [`Response`]s, leaving the actual I/O to the transport the embedding
//! application chooses (TCP, HTTP-tunnel, ...).

use bytes::Bytes;

use crate::auth::Sender as AuthSender;
use crate::proto::{HeaderMap, Method, Request, Response, Url};
use crate::{Error, ErrorInt};

/// Builds requests for one client connection, tracking the CSeq counter and
/// the auth challenge (if any) offered by the server.
pub struct RequestBuilder {
    next_cseq: u32,
    user: Option<(String, String)>,
    auth: AuthSender,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            next_cseq: 1,
            user: None,
            auth: AuthSender::new(),
        }
    }

    /// Sets the credentials used once the server issues a challenge. A
    /// connection with no credentials set simply fails with `AuthFailed`
    /// on the first 401, same as the reference's "caller didn't configure
    /// a username/password" case.
    pub fn set_credentials(&mut self, user: impl Into<String>, pass: impl Into<String>) {
        self.user = Some((user.into(), pass.into()));
    }

    /// Builds the next request for `method`/`url`, attaching an
    /// `Authorization` header preemptively if a challenge has already been
    /// accepted on this connection.
    pub fn build(&mut self, method: Method, url: &Url, body: Bytes) -> Request {
        let cseq = self.next_cseq;
        self.next_cseq += 1;
        let mut headers = HeaderMap::new();
        if self.auth.has_challenge() {
            if let Some((user, pass)) = &self.user {
                if let Some(value) = self.auth.authorize(method, url.as_str(), user, pass) {
                    headers.set("Authorization", value);
                }
            }
        }
        Request {
            method,
            url: url.clone(),
            cseq,
            headers,
            body,
        }
    }

    /// Handles a `401` response: parses the challenge(s) and returns a
    /// re-sendable request with an `Authorization` header and a fresh
    /// CSeq, or an error if no credentials were configured or the server
    /// sent no recognizable challenge.
    pub fn retry_after_401(&mut self, req: &Request, resp: &Response) -> Result<Request, Error> {
        let (user, pass) = self.user.as_ref().ok_or_else(|| wrap!(ErrorInt::AuthFailed))?;
        let challenges = resp.headers.get_all("WWW-Authenticate");
        if challenges.is_empty() {
            bail!(ErrorInt::AuthFailed);
        }
        self.auth.accept_challenges(challenges)?;
        let value = self
            .auth
            .authorize(req.method, req.url.as_str(), user, pass)
            .ok_or_else(|| wrap!(ErrorInt::AuthFailed))?;

        let cseq = self.next_cseq;
        self.next_cseq += 1;
        let mut headers = req.headers.clone();
        headers.set("Authorization", value);
        Ok(Request {
            method: req.method,
            url: req.url.clone(),
            cseq,
            headers,
            body: req.body.clone(),
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
