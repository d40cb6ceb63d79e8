// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The RTSP wire protocol: URLs, header maps, the request/response/frame
//! sum type, and the header-value grammars built on top of the header map
//! (spec `§4.A Wire protocol`).

mod codec;
mod headers;
mod interleaved;
mod keymgmt;
mod kv;
mod message;
mod method;
mod range;
mod rtp_info;
mod session_header;
mod transport_header;
mod url;

pub use codec::{RtspCodec, RtspMessage};
pub use headers::HeaderMap;
pub(crate) use kv::parse as kv_parse;
pub use interleaved::InterleavedFrame;
pub use keymgmt::KeyMgmt;
pub use message::{reason_phrase, Request, Response};
pub use method::Method;
pub use range::{Range, RangeEnd, RangeStart};
pub use rtp_info::RtpInfoEntry;
pub use session_header::SessionHeader;
pub use transport_header::{Delivery, Mode, Protocol, Transport};
pub use url::Url;
