// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side connection state machine (spec `§4.F Client connection
//! state machine`): `Initial -> Prepared -> PrePlay/PreRecord ->
//! Play/Record`, transitions mirroring the server's but driven by the
//! client's own outbound method calls rather than incoming requests.

use std::collections::HashMap;

use crate::client::{TransportPreference, DEFAULT_UDP_SWITCHOVER};
use crate::proto::{Protocol, Transport};
use crate::transport::liveness::UdpLiveness;
use crate::{Clock, Error, ErrorInt};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    Initial,
    Prepared,
    PrePlay,
    Play,
    PreRecord,
    Record,
}

impl ClientState {
    fn name(self) -> &'static str {
        match self {
            ClientState::Initial => "Initial",
            ClientState::Prepared => "Prepared",
            ClientState::PrePlay => "PrePlay",
            ClientState::Play => "Play",
            ClientState::PreRecord => "PreRecord",
            ClientState::Record => "Record",
        }
    }
}

/// One media's negotiated transport, kept for `WritePacketRTP` destination
/// resolution and the UDP-to-TCP auto-detect fallback.
#[derive(Clone, Debug)]
pub struct SetupMedia {
    pub media_index: usize,
    pub transport: Transport,
}

pub struct ClientSession {
    state: ClientState,
    setup_media: Vec<SetupMedia>,
    /// Media currently on UDP under auto-detect, watched for the switchover
    /// timeout (spec `§4.F`). Removed once a media switches to TCP or is
    /// torn down.
    udp_watch: HashMap<usize, UdpLiveness>,
}

impl ClientSession {
    pub fn new() -> Self {
        Self {
            state: ClientState::Initial,
            setup_media: Vec::new(),
            udp_watch: HashMap::new(),
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn setup_media(&self) -> &[SetupMedia] {
        &self.setup_media
    }

    fn check_state(&self, allowed: &'static [&'static str]) -> Result<(), Error> {
        if !allowed.contains(&self.state.name()) {
            bail!(ErrorInt::WrongState { allowed, actual: self.state.name() });
        }
        Ok(())
    }

    /// `OPTIONS`/`DESCRIBE`: `Initial -> Prepared`. Idempotent: calling it
    /// again from `Prepared` is a no-op, matching repeated DESCRIBEs on the
    /// same connection.
    pub fn prepare(&mut self) -> Result<(), Error> {
        self.check_state(&["Initial", "Prepared"])?;
        self.state = ClientState::Prepared;
        Ok(())
    }

    /// `SETUP`: `Prepared -> PrePlay`/`PreRecord`, or adds another media
    /// entry while already in one of those states. `preference` selects
    /// whether a UDP transport is watched for the auto-detect switchover
    /// (spec `§4.F`); `clock` starts that watch's liveness timer.
    pub fn setup(
        &mut self,
        media_index: usize,
        transport: Transport,
        record: bool,
        preference: TransportPreference,
        clock: &dyn Clock,
    ) -> Result<(), Error> {
        let allowed: &'static [&'static str] = if record {
            &["Prepared", "PreRecord"]
        } else {
            &["Prepared", "PrePlay"]
        };
        self.check_state(allowed)?;
        if self.setup_media.iter().any(|m| m.media_index == media_index) {
            bail!(ErrorInt::TrackAlreadySetup { index: media_index });
        }
        if transport.protocol == Protocol::Udp && preference == TransportPreference::AutoDetect {
            self.udp_watch.insert(media_index, UdpLiveness::new(DEFAULT_UDP_SWITCHOVER, clock));
        }
        self.setup_media.push(SetupMedia { media_index, transport });
        self.state = if record { ClientState::PreRecord } else { ClientState::PrePlay };
        Ok(())
    }

    /// Records an inbound UDP packet for `media_index`, resetting its
    /// switchover timer.
    pub fn record_udp_packet(&mut self, media_index: usize, clock: &dyn Clock) {
        if let Some(liveness) = self.udp_watch.get_mut(&media_index) {
            liveness.record_packet(clock);
        }
    }

    /// Checks every UDP media still under auto-detect watch; any whose
    /// switchover timeout has elapsed without a packet falls back to TCP
    /// (clearing the UDP port ranges via [`Self::replace_transport`],
    /// spec `§4.F`'s "re-issues SETUP over TCP" outcome) and stops being
    /// watched. Returns the media indices that switched, so the caller can
    /// actually perform the TCP `SETUP` and feed the server's negotiated
    /// channel ids back through another `replace_transport` call.
    pub fn poll_udp_switchover(&mut self, clock: &dyn Clock) -> Vec<usize> {
        let expired: Vec<usize> = self
            .udp_watch
            .iter()
            .filter(|(_, liveness)| liveness.check(clock).is_err())
            .map(|(&media_index, _)| media_index)
            .collect();
        for &media_index in &expired {
            self.udp_watch.remove(&media_index);
            if let Some(current) = self.setup_media.iter().find(|m| m.media_index == media_index) {
                let mut tcp = current.transport.clone();
                tcp.protocol = Protocol::Tcp;
                tcp.client_port_range = None;
                tcp.server_port_range = None;
                tcp.interleaved_channels = None;
                let _ = self.replace_transport(media_index, tcp);
            }
        }
        expired
    }

    /// `PLAY`: `PrePlay -> Play`.
    pub fn play(&mut self) -> Result<(), Error> {
        self.check_state(&["PrePlay"])?;
        if self.setup_media.is_empty() {
            bail!(ErrorInt::NoTracksSetup);
        }
        self.state = ClientState::Play;
        Ok(())
    }

    /// `RECORD`: `PreRecord -> Record`.
    pub fn record(&mut self) -> Result<(), Error> {
        self.check_state(&["PreRecord"])?;
        if self.setup_media.is_empty() {
            bail!(ErrorInt::NoTracksSetup);
        }
        self.state = ClientState::Record;
        Ok(())
    }

    /// `PAUSE`: `Play -> PrePlay` or `Record -> PreRecord`.
    pub fn pause(&mut self) -> Result<(), Error> {
        self.check_state(&["Play", "Record"])?;
        self.state = match self.state {
            ClientState::Play => ClientState::PrePlay,
            ClientState::Record => ClientState::PreRecord,
            _ => unreachable!("checked above"),
        };
        Ok(())
    }

    /// Replaces the transport of an already set-up media, used when
    /// auto-detect falls back from UDP to TCP after a switchover timeout.
    pub fn replace_transport(&mut self, media_index: usize, transport: Transport) -> Result<(), Error> {
        let entry = self
            .setup_media
            .iter_mut()
            .find(|m| m.media_index == media_index)
            .ok_or_else(|| wrap!(ErrorInt::TransportHeaderInvalid {
                description: format!("media {media_index} was never set up"),
            }))?;
        entry.transport = transport;
        Ok(())
    }
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new()
    }
}
