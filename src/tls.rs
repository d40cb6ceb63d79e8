// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TLS configuration seam for RTSPS (spec `§6 External interfaces`: "a
//! standard TLS configuration object; the core passes it to the underlying
//! TLS library").
//!
//! Left unimplemented by design: picking a TLS stack (`rustls`, `native-tls`,
//! ...) is a decision for the binary embedding this crate, not the core.
//! `ServerOptions`/`ClientOptions` carry an optional value behind these
//! marker traits; when absent, the connection is plain RTSP.

use std::io;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

/// An owned, boxable bidirectional byte stream: the common shape of a TCP
/// connection before and after TLS wraps it.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for T {}

/// Wraps an accepted plaintext connection in a server-side TLS session.
#[async_trait::async_trait]
pub trait TlsAcceptor: Send + Sync {
    async fn accept(&self, stream: Pin<Box<dyn AsyncStream>>) -> io::Result<Pin<Box<dyn AsyncStream>>>;
}

/// Wraps an outbound plaintext connection in a client-side TLS session.
#[async_trait::async_trait]
pub trait TlsConnector: Send + Sync {
    async fn connect(&self, domain: &str, stream: Pin<Box<dyn AsyncStream>>) -> io::Result<Pin<Box<dyn AsyncStream>>>;
}
