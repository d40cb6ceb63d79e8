// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport multiplexing: UDP unicast/multicast, TCP interleaved channels,
//! HTTP-tunneled TCP, the per-connection outbound backpressure ring, and
//! liveness enforcement (spec `§4.D Transport multiplexer`).

pub mod channel_table;
pub mod liveness;
pub mod multicast;
pub mod ring;
pub mod tunnel;
pub mod udp;

pub use channel_table::{ChannelPair, ChannelTable};
pub use liveness::{TcpLiveness, UdpLiveness, DEFAULT_TCP_TIMEOUT, DEFAULT_UDP_TIMEOUT};
pub use multicast::MulticastGroup;
pub use ring::{RingReceiver, RingSender, DEFAULT_CAPACITY};
pub use tunnel::TunnelRegistry;
pub use udp::{TokioUdpSocket, UdpDemuxTable, UdpPair, UdpSocket};
