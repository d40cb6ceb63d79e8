// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload-format (de)packetization interfaces.
//!
//! This crate does not implement any concrete codec; H.264, AAC, and every
//! other media format are external collaborators (spec §1 Out of scope).
//! What lives here is the seam a caller's depacketizer plugs into: the
//! [`iface::RtpConsumer`] / [`iface::RtpProducer`] traits.

pub mod iface;

pub use iface::{AccessUnit, RtpConsumer, RtpProducer};
