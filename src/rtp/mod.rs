// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RTP/RTCP packet decoding, bounded reordering, and timestamp handling; see
//! [RFC 3550](https://datatracker.ietf.org/doc/html/rfc3550) (spec
//! `§4.C RTP reorderer and timestamp decoder`).

mod packet;
mod reorderer;
pub mod rtcp;
mod timestamp;

pub use packet::{decode, Packet};
pub use reorderer::{Emitted, Reorderer, DEFAULT_BUFFER_SIZE};
pub use timestamp::{Timeline, TimestampDecoder};
