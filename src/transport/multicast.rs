// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multicast group membership for shared-subscriber RTP delivery (spec
//! `§4.D Transport multiplexing`, multicast path).
//!
//! Concrete per-interface socket binding is a platform abstraction this
//! crate leaves to its caller (see the Out-of-scope list); this module only
//! tracks which group a media stream uses and applies the TTL default.

use std::net::Ipv4Addr;

use crate::Error;
use crate::transport::udp::UdpSocket;

pub const DEFAULT_TTL: u32 = 16;

/// A multicast group shared by every reader session of one media stream.
pub struct MulticastGroup {
    pub group: Ipv4Addr,
    pub rtp_port: u16,
    pub rtcp_port: u16,
    pub ttl: u32,
}

impl MulticastGroup {
    pub fn new(group: Ipv4Addr, rtp_port: u16, rtcp_port: u16) -> Self {
        Self { group, rtp_port, rtcp_port, ttl: DEFAULT_TTL }
    }

    /// Joins `self.group` on `socket` via `iface`, applying the configured
    /// TTL for sends.
    pub fn join(&self, socket: &dyn UdpSocket, iface: Ipv4Addr) -> Result<(), Error> {
        socket.join_group(self.group, iface)?;
        socket.set_ttl(self.ttl)?;
        Ok(())
    }

    /// Filters an inbound packet by destination address: kernels sometimes
    /// deliver packets for other joined groups on the same socket, so a
    /// packet not addressed to this group is ignored rather than dispatched.
    pub fn accepts(&self, destination: Ipv4Addr) -> bool {
        destination == self.group
    }
}
