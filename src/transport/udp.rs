// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! UDP transport: the injectable `UdpSocket` capability, its `tokio`
//! adapter, and the demux table a server/client uses to route inbound
//! datagrams to a stream by source address (spec `§4.D Transport
//! multiplexing`, UDP path, and `§6 External interfaces`).

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use crate::Error;

/// A bound UDP endpoint, injected the same way [`crate::Clock`] and
/// [`crate::RandomSource`] are, so tests can substitute a socket that never
/// touches the network. Production code uses [`TokioUdpSocket`].
#[async_trait]
pub trait UdpSocket: Send + Sync {
    async fn read_from(&self, buf: &mut [u8]) -> std::io::Result<(usize, SocketAddr)>;
    async fn write_to(&self, buf: &[u8], dst: SocketAddr) -> std::io::Result<usize>;
    fn local_addr(&self) -> std::io::Result<SocketAddr>;

    /// Joins an IPv4 multicast group on the interface with address `iface`.
    fn join_group(&self, group: Ipv4Addr, iface: Ipv4Addr) -> std::io::Result<()>;
    fn set_ttl(&self, ttl: u32) -> std::io::Result<()>;
}

/// Production [`UdpSocket`] backed by `tokio::net::UdpSocket`.
pub struct TokioUdpSocket(tokio::net::UdpSocket);

impl TokioUdpSocket {
    pub async fn bind(addr: SocketAddr) -> Result<Self, Error> {
        Ok(Self(tokio::net::UdpSocket::bind(addr).await?))
    }
}

#[async_trait]
impl UdpSocket for TokioUdpSocket {
    async fn read_from(&self, buf: &mut [u8]) -> std::io::Result<(usize, SocketAddr)> {
        self.0.recv_from(buf).await
    }

    async fn write_to(&self, buf: &[u8], dst: SocketAddr) -> std::io::Result<usize> {
        self.0.send_to(buf, dst).await
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.0.local_addr()
    }

    fn join_group(&self, group: Ipv4Addr, iface: Ipv4Addr) -> std::io::Result<()> {
        self.0.join_multicast_v4(group, iface)
    }

    fn set_ttl(&self, ttl: u32) -> std::io::Result<()> {
        self.0.set_multicast_ttl_v4(ttl)
    }
}

/// One bound UDP socket pair (RTP + RTCP) for a single media stream.
pub struct UdpPair {
    pub rtp: TokioUdpSocket,
    pub rtcp: TokioUdpSocket,
    pub stream_id: usize,
}

impl UdpPair {
    /// Binds a consecutive even/odd local port pair starting from an
    /// ephemeral port chosen by the OS, as RFC 2326 §10.7 recommends.
    pub async fn bind(local_ip: std::net::IpAddr, stream_id: usize) -> Result<Self, Error> {
        loop {
            let rtp = TokioUdpSocket::bind(SocketAddr::new(local_ip, 0)).await?;
            let port = rtp.local_addr()?.port();
            if port % 2 != 0 {
                continue;
            }
            match TokioUdpSocket::bind(SocketAddr::new(local_ip, port + 1)).await {
                Ok(rtcp) => return Ok(UdpPair { rtp, rtcp, stream_id }),
                Err(_) => continue,
            }
        }
    }

    pub fn local_rtp_port(&self) -> Result<u16, Error> {
        Ok(self.rtp.local_addr()?.port())
    }

    pub fn local_rtcp_port(&self) -> Result<u16, Error> {
        Ok(self.rtcp.local_addr()?.port())
    }
}

/// Keys inbound datagrams to the stream that should receive them.
///
/// A server learns the client's source address from the first datagram it
/// receives on a given local port (since client_port in the `Transport`
/// header isn't authoritative until confirmed by a real packet); a client
/// trusts `server_port` from the `SETUP` response directly.
#[derive(Default)]
pub struct UdpDemuxTable {
    by_addr: HashMap<SocketAddr, usize>,
}

impl UdpDemuxTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, addr: SocketAddr, stream_id: usize) {
        self.by_addr.insert(addr, stream_id);
    }

    pub fn stream_for(&self, addr: SocketAddr) -> Option<usize> {
        self.by_addr.get(&addr).copied()
    }
}

/// Reads one datagram through the `UdpSocket` capability, returning its
/// payload and source address.
pub async fn recv(socket: &dyn UdpSocket, max_len: usize) -> Result<(Bytes, SocketAddr), Error> {
    let mut buf = BytesMut::zeroed(max_len);
    let (len, addr) = socket.read_from(&mut buf).await?;
    buf.truncate(len);
    Ok((buf.freeze(), addr))
}
