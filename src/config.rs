// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Constructor-time configuration for [`crate::server`] and [`crate::client`]
//! (spec `§6 External interfaces`, Configuration options list): plain
//! structs with a `::builder()` entry point and `Default` impls matching
//! the documented timeout/ring-size defaults, validated at construction
//! rather than left to panic on first use.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::AcceptedMethods;
use crate::client::TransportPreference;
use crate::tls::{TlsAcceptor, TlsConnector};
use crate::transport::{DEFAULT_CAPACITY, DEFAULT_TCP_TIMEOUT, DEFAULT_UDP_TIMEOUT};

/// A configuration value failed validation at build time.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be a non-zero power of two, got {value}")]
    NotAPowerOfTwo { field: &'static str, value: usize },
}

fn validate_ring_size(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 || !value.is_power_of_two() {
        return Err(ConfigError::NotAPowerOfTwo { field, value });
    }
    Ok(())
}

/// How the client should tunnel RTSP over an HTTP connection (spec `§4.D`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TunnelPreference {
    #[default]
    None,
    Http,
}

/// Constructor-time options for a [`crate::server::Server`].
pub struct ServerOptions {
    pub rtsp_address: SocketAddr,
    pub udp_rtp_address: Option<SocketAddr>,
    pub udp_rtcp_address: Option<SocketAddr>,
    pub multicast_ip_range: Option<String>,
    pub multicast_rtp_port: Option<u16>,
    pub multicast_rtcp_port: Option<u16>,
    pub tls: Option<Arc<dyn TlsAcceptor>>,
    pub realm: String,
    pub accepted_auth: AcceptedMethods,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub session_timeout: Duration,
    pub udp_timeout: Duration,
    pub read_buffer_count: usize,
    pub write_buffer_count: usize,
}

impl std::fmt::Debug for ServerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerOptions")
            .field("rtsp_address", &self.rtsp_address)
            .field("udp_rtp_address", &self.udp_rtp_address)
            .field("udp_rtcp_address", &self.udp_rtcp_address)
            .field("multicast_ip_range", &self.multicast_ip_range)
            .field("multicast_rtp_port", &self.multicast_rtp_port)
            .field("multicast_rtcp_port", &self.multicast_rtcp_port)
            .field("tls", &self.tls.is_some())
            .field("realm", &self.realm)
            .field("accepted_auth", &self.accepted_auth)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("session_timeout", &self.session_timeout)
            .field("udp_timeout", &self.udp_timeout)
            .field("read_buffer_count", &self.read_buffer_count)
            .field("write_buffer_count", &self.write_buffer_count)
            .finish()
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            rtsp_address: "0.0.0.0:554".parse().unwrap(),
            udp_rtp_address: None,
            udp_rtcp_address: None,
            multicast_ip_range: None,
            multicast_rtp_port: None,
            multicast_rtcp_port: None,
            tls: None,
            realm: "rtsp".to_owned(),
            accepted_auth: AcceptedMethods::default(),
            read_timeout: DEFAULT_TCP_TIMEOUT,
            write_timeout: DEFAULT_TCP_TIMEOUT,
            session_timeout: Duration::from_secs(60),
            udp_timeout: DEFAULT_UDP_TIMEOUT,
            read_buffer_count: DEFAULT_CAPACITY,
            write_buffer_count: DEFAULT_CAPACITY,
        }
    }
}

impl ServerOptions {
    pub fn builder() -> ServerOptionsBuilder {
        ServerOptionsBuilder(Self::default())
    }
}

/// Chainable builder for [`ServerOptions`]; [`ServerOptionsBuilder::build`]
/// is the only place ring sizes are checked.
pub struct ServerOptionsBuilder(ServerOptions);

impl ServerOptionsBuilder {
    pub fn rtsp_address(mut self, addr: SocketAddr) -> Self {
        self.0.rtsp_address = addr;
        self
    }

    pub fn udp_ports(mut self, rtp: SocketAddr, rtcp: SocketAddr) -> Self {
        self.0.udp_rtp_address = Some(rtp);
        self.0.udp_rtcp_address = Some(rtcp);
        self
    }

    pub fn multicast(mut self, ip_range: impl Into<String>, rtp_port: u16, rtcp_port: u16) -> Self {
        self.0.multicast_ip_range = Some(ip_range.into());
        self.0.multicast_rtp_port = Some(rtp_port);
        self.0.multicast_rtcp_port = Some(rtcp_port);
        self
    }

    pub fn tls(mut self, tls: Arc<dyn TlsAcceptor>) -> Self {
        self.0.tls = Some(tls);
        self
    }

    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.0.realm = realm.into();
        self
    }

    pub fn accepted_auth(mut self, accepted: AcceptedMethods) -> Self {
        self.0.accepted_auth = accepted;
        self
    }

    pub fn read_buffer_count(mut self, count: usize) -> Self {
        self.0.read_buffer_count = count;
        self
    }

    pub fn write_buffer_count(mut self, count: usize) -> Self {
        self.0.write_buffer_count = count;
        self
    }

    pub fn build(self) -> Result<ServerOptions, ConfigError> {
        validate_ring_size("read_buffer_count", self.0.read_buffer_count)?;
        validate_ring_size("write_buffer_count", self.0.write_buffer_count)?;
        log::debug!(
            "server options built: rtsp_address={}, realm={:?}",
            self.0.rtsp_address,
            self.0.realm
        );
        Ok(self.0)
    }
}

/// Constructor-time options for a [`crate::client::ClientSession`]-driving
/// connection.
pub struct ClientOptions {
    pub transport: TransportPreference,
    pub tunnel: TunnelPreference,
    pub tls: Option<Arc<dyn TlsConnector>>,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub session_timeout: Duration,
    pub udp_timeout: Duration,
    pub read_buffer_count: usize,
    pub write_buffer_count: usize,
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("transport", &self.transport)
            .field("tunnel", &self.tunnel)
            .field("tls", &self.tls.is_some())
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("session_timeout", &self.session_timeout)
            .field("udp_timeout", &self.udp_timeout)
            .field("read_buffer_count", &self.read_buffer_count)
            .field("write_buffer_count", &self.write_buffer_count)
            .finish()
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            transport: TransportPreference::AutoDetect,
            tunnel: TunnelPreference::None,
            tls: None,
            read_timeout: DEFAULT_TCP_TIMEOUT,
            write_timeout: DEFAULT_TCP_TIMEOUT,
            session_timeout: Duration::from_secs(60),
            udp_timeout: DEFAULT_UDP_TIMEOUT,
            read_buffer_count: DEFAULT_CAPACITY,
            write_buffer_count: DEFAULT_CAPACITY,
        }
    }
}

impl ClientOptions {
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder(Self::default())
    }
}

pub struct ClientOptionsBuilder(ClientOptions);

impl ClientOptionsBuilder {
    pub fn transport(mut self, transport: TransportPreference) -> Self {
        self.0.transport = transport;
        self
    }

    pub fn tunnel(mut self, tunnel: TunnelPreference) -> Self {
        self.0.tunnel = tunnel;
        self
    }

    pub fn tls(mut self, tls: Arc<dyn TlsConnector>) -> Self {
        self.0.tls = Some(tls);
        self
    }

    pub fn read_buffer_count(mut self, count: usize) -> Self {
        self.0.read_buffer_count = count;
        self
    }

    pub fn write_buffer_count(mut self, count: usize) -> Self {
        self.0.write_buffer_count = count;
        self
    }

    pub fn build(self) -> Result<ClientOptions, ConfigError> {
        validate_ring_size("read_buffer_count", self.0.read_buffer_count)?;
        validate_ring_size("write_buffer_count", self.0.write_buffer_count)?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_without_error() {
        ServerOptions::builder().build().unwrap();
        ClientOptions::builder().build().unwrap();
    }

    #[test]
    fn non_power_of_two_ring_size_is_rejected() {
        let err = ServerOptions::builder()
            .read_buffer_count(100)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::NotAPowerOfTwo { field: "read_buffer_count", value: 100 }
        );
    }

    #[test]
    fn zero_ring_size_is_rejected() {
        let err = ClientOptions::builder()
            .write_buffer_count(0)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::NotAPowerOfTwo { field: "write_buffer_count", value: 0 }
        );
    }
}
