// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-side session state machine (spec `§4.E Server session state
//! machine`): `Initial -> PrePlay/PreRecord -> Play/Record`.

use std::net::IpAddr;

use crate::proto::{Protocol, Transport};
use crate::transport::channel_table::ChannelTable;
use crate::{Error, ErrorInt};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Initial,
    PrePlay,
    Play,
    PreRecord,
    Record,
}

impl SessionState {
    fn name(self) -> &'static str {
        match self {
            SessionState::Initial => "Initial",
            SessionState::PrePlay => "PrePlay",
            SessionState::Play => "Play",
            SessionState::PreRecord => "PreRecord",
            SessionState::Record => "Record",
        }
    }
}

/// One `SETUP`'d media entry.
#[derive(Clone, Debug)]
pub struct SetupMedia {
    pub media_index: usize,
    pub transport: Transport,
}

/// A server-side RTSP session: created at `ANNOUNCE` (publisher) or the
/// first `SETUP` (reader), destroyed at `TEARDOWN`.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    state: SessionState,
    owner_ip: IpAddr,
    path: Option<String>,
    setup_url: Option<String>,
    announced_media_count: Option<usize>,
    setup_media: Vec<SetupMedia>,
    channels: ChannelTable,
    torn_down: bool,
}

impl Session {
    /// Creates a session owned by `owner_ip`, in `Initial` state.
    pub fn new(id: String, owner_ip: IpAddr) -> Self {
        Self {
            id,
            state: SessionState::Initial,
            owner_ip,
            path: None,
            setup_url: None,
            announced_media_count: None,
            setup_media: Vec::new(),
            channels: ChannelTable::new(),
            torn_down: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn setup_media(&self) -> &[SetupMedia] {
        &self.setup_media
    }

    fn check_owner(&self, peer_ip: IpAddr) -> Result<(), Error> {
        if self.owner_ip != peer_ip {
            bail!(ErrorInt::CannotUseSessionCreatedByOtherIp { id: self.id.clone() });
        }
        Ok(())
    }

    fn check_state(&self, allowed: &'static [&'static str]) -> Result<(), Error> {
        if !allowed.contains(&self.state.name()) {
            bail!(ErrorInt::WrongState { allowed, actual: self.state.name() });
        }
        Ok(())
    }

    fn check_path(&mut self, path: &str) -> Result<(), Error> {
        match &self.path {
            Some(existing) if existing != path => {
                bail!(ErrorInt::PathHasChanged {
                    id: self.id.clone(),
                    old: existing.clone(),
                    new: path.to_owned(),
                });
            }
            Some(_) => Ok(()),
            None => {
                self.path = Some(path.to_owned());
                Ok(())
            }
        }
    }

    /// `ANNOUNCE`: creates a publisher session (`Initial -> PreRecord`).
    pub fn announce(&mut self, peer_ip: IpAddr, path: &str, media_count: usize) -> Result<(), Error> {
        self.check_owner(peer_ip)?;
        self.check_state(&["Initial"])?;
        self.check_path(path)?;
        self.announced_media_count = Some(media_count);
        self.state = SessionState::PreRecord;
        Ok(())
    }

    /// `SETUP`: adds one media entry. `record` selects the publisher role
    /// (only meaningful on the first call, which also picks `Initial ->
    /// PrePlay` for a reader if `record` is false). Returns the negotiated
    /// `Transport`, which for TCP delivery carries the channel ids this
    /// session actually reserved (spec `§4.D Transport multiplexing`) rather
    /// than necessarily the ones the client asked for.
    pub fn setup(
        &mut self,
        peer_ip: IpAddr,
        path: &str,
        url: &str,
        media_index: usize,
        mut transport: Transport,
        record: bool,
    ) -> Result<Transport, Error> {
        self.check_owner(peer_ip)?;
        let allowed: &'static [&'static str] = if record {
            &["PreRecord"]
        } else {
            &["Initial", "PrePlay"]
        };
        self.check_state(allowed)?;
        self.check_path(path)?;

        if self.setup_media.iter().any(|m| m.media_index == media_index) {
            bail!(ErrorInt::TrackAlreadySetup { index: media_index });
        }
        if let Some(existing) = self.setup_media.first() {
            if existing.transport.protocol != transport.protocol {
                bail!(ErrorInt::TracksDifferentProtocols);
            }
        }
        match &self.setup_url {
            Some(existing) if existing != url => {
                bail!(ErrorInt::CannotSetupTracksDifferentUrls);
            }
            Some(_) => {}
            None => self.setup_url = Some(url.to_owned()),
        }

        if transport.protocol == Protocol::Tcp {
            let pair = match transport.interleaved_channels {
                Some((rtp, rtcp)) => self.channels.reserve(rtp, rtcp, media_index)?,
                None => self.channels.allocate(media_index)?,
            };
            transport.interleaved_channels = Some((pair.rtp_channel, pair.rtcp_channel));
        }

        self.setup_media.push(SetupMedia { media_index, transport: transport.clone() });
        if !record {
            self.state = SessionState::PrePlay;
        }
        Ok(transport)
    }

    /// `PLAY`: `PrePlay -> Play`.
    pub fn play(&mut self, peer_ip: IpAddr) -> Result<(), Error> {
        self.check_owner(peer_ip)?;
        self.check_state(&["PrePlay"])?;
        if self.setup_media.is_empty() {
            bail!(ErrorInt::NoTracksSetup);
        }
        self.state = SessionState::Play;
        Ok(())
    }

    /// `RECORD`: `PreRecord -> Record`.
    pub fn record(&mut self, peer_ip: IpAddr) -> Result<(), Error> {
        self.check_owner(peer_ip)?;
        self.check_state(&["PreRecord"])?;
        let announced = self.announced_media_count.unwrap_or(0);
        if self.setup_media.len() != announced {
            bail!(ErrorInt::NotAllAnnouncedTracksSetup {
                setup: self.setup_media.len(),
                announced,
            });
        }
        self.state = SessionState::Record;
        Ok(())
    }

    /// `PAUSE`: `Play -> PrePlay` or `Record -> PreRecord`.
    pub fn pause(&mut self, peer_ip: IpAddr) -> Result<(), Error> {
        self.check_owner(peer_ip)?;
        self.check_state(&["Play", "Record"])?;
        self.state = match self.state {
            SessionState::Play => SessionState::PrePlay,
            SessionState::Record => SessionState::PreRecord,
            _ => unreachable!("checked above"),
        };
        Ok(())
    }

    /// `TEARDOWN`: terminal from any state. Idempotent: a second call fails
    /// with `SessionNotFound` (454), matching the spec's "404-equivalent on
    /// repeat" semantics.
    pub fn teardown(&mut self, peer_ip: IpAddr) -> Result<(), Error> {
        if self.torn_down {
            bail!(ErrorInt::SessionNotFound { id: self.id.clone() });
        }
        self.check_owner(peer_ip)?;
        self.torn_down = true;
        Ok(())
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{Delivery, Mode};

    fn ip() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    fn other_ip() -> IpAddr {
        "127.0.0.2".parse().unwrap()
    }

    fn udp_transport() -> Transport {
        Transport {
            protocol: Protocol::Udp,
            secure: false,
            delivery: Delivery::Unicast,
            client_port_range: Some((3456, 3457)),
            server_port_range: None,
            interleaved_channels: None,
            ssrc: None,
            mode: Some(Mode::Play),
        }
    }

    #[test]
    fn play_requires_at_least_one_setup_media() {
        let mut s = Session::new("s1".into(), ip());
        s.setup(ip(), "/a", "rtsp://h/a", 0, udp_transport(), false).unwrap();
        assert!(s.play(ip()).is_ok());
        assert_eq!(s.state(), SessionState::Play);

        let mut empty = Session::new("s2".into(), ip());
        // force into PrePlay without any setup media by going through setup then removing is not
        // possible via the public API, so exercise via state check directly: PLAY from Initial fails.
        assert!(empty.play(ip()).is_err());
    }

    #[test]
    fn duplicate_media_index_is_rejected() {
        let mut s = Session::new("s1".into(), ip());
        s.setup(ip(), "/a", "rtsp://h/a", 0, udp_transport(), false).unwrap();
        assert!(matches!(
            s.setup(ip(), "/a", "rtsp://h/a", 0, udp_transport(), false),
            Err(e) if matches!(*e.0, ErrorInt::TrackAlreadySetup { index: 0 })
        ));
    }

    #[test]
    fn mixing_transport_protocols_across_setups_is_rejected() {
        let mut s = Session::new("s1".into(), ip());
        s.setup(ip(), "/a", "rtsp://h/a", 0, udp_transport(), false).unwrap();
        let mut tcp = udp_transport();
        tcp.protocol = Protocol::Tcp;
        tcp.interleaved_channels = Some((0, 1));
        assert!(matches!(
            s.setup(ip(), "/a", "rtsp://h/a", 1, tcp, false),
            Err(e) if matches!(*e.0, ErrorInt::TracksDifferentProtocols)
        ));
    }

    #[test]
    fn setup_allocates_interleaved_channels_when_the_client_omits_them() {
        let mut s = Session::new("s1".into(), ip());
        let mut tcp = udp_transport();
        tcp.protocol = Protocol::Tcp;
        tcp.interleaved_channels = None;
        let negotiated = s.setup(ip(), "/a", "rtsp://h/a", 0, tcp, false).unwrap();
        assert_eq!(negotiated.interleaved_channels, Some((0, 1)));
    }

    #[test]
    fn setup_rejects_a_requested_interleaved_pair_already_in_use() {
        let mut s = Session::new("s1".into(), ip());
        let mut tcp = udp_transport();
        tcp.protocol = Protocol::Tcp;
        tcp.interleaved_channels = Some((0, 1));
        s.setup(ip(), "/a", "rtsp://h/a", 0, tcp.clone(), false).unwrap();

        let mut other = udp_transport();
        other.protocol = Protocol::Tcp;
        other.interleaved_channels = Some((1, 2));
        assert!(matches!(
            s.setup(ip(), "/a", "rtsp://h/a", 1, other, false),
            Err(e) if matches!(*e.0, ErrorInt::InterleavedIdsAlreadyUsed { .. })
        ));
    }

    #[test]
    fn setups_with_different_urls_are_rejected() {
        let mut s = Session::new("s1".into(), ip());
        s.setup(ip(), "/a", "rtsp://h/a", 0, udp_transport(), false).unwrap();
        assert!(matches!(
            s.setup(ip(), "/a", "rtsp://h/b", 1, udp_transport(), false),
            Err(e) if matches!(*e.0, ErrorInt::CannotSetupTracksDifferentUrls)
        ));
    }

    #[test]
    fn record_requires_every_announced_media_set_up() {
        let mut s = Session::new("s1".into(), ip());
        s.announce(ip(), "/a", 2).unwrap();
        s.setup(ip(), "/a", "rtsp://h/a", 0, udp_transport(), true).unwrap();
        assert!(matches!(
            s.record(ip()),
            Err(e) if matches!(*e.0, ErrorInt::NotAllAnnouncedTracksSetup { setup: 1, announced: 2 })
        ));
        s.setup(ip(), "/a", "rtsp://h/a", 1, udp_transport(), true).unwrap();
        assert!(s.record(ip()).is_ok());
    }

    #[test]
    fn path_change_between_announce_and_setup_is_rejected() {
        let mut s = Session::new("s1".into(), ip());
        s.announce(ip(), "/a", 1).unwrap();
        assert!(matches!(
            s.setup(ip(), "/b", "rtsp://h/b", 0, udp_transport(), true),
            Err(e) if matches!(*e.0, ErrorInt::PathHasChanged { .. })
        ));
    }

    #[test]
    fn session_is_pinned_to_its_creating_ip() {
        let mut s = Session::new("s1".into(), ip());
        s.setup(ip(), "/a", "rtsp://h/a", 0, udp_transport(), false).unwrap();
        assert!(matches!(
            s.play(other_ip()),
            Err(e) if matches!(*e.0, ErrorInt::CannotUseSessionCreatedByOtherIp { .. })
        ));
    }

    #[test]
    fn teardown_is_idempotent_and_second_call_reports_not_found() {
        let mut s = Session::new("s1".into(), ip());
        s.setup(ip(), "/a", "rtsp://h/a", 0, udp_transport(), false).unwrap();
        s.teardown(ip()).unwrap();
        assert!(matches!(
            s.teardown(ip()),
            Err(e) if matches!(*e.0, ErrorInt::SessionNotFound { .. })
        ));
    }

    #[test]
    fn pause_returns_to_the_matching_pre_state() {
        let mut s = Session::new("s1".into(), ip());
        s.setup(ip(), "/a", "rtsp://h/a", 0, udp_transport(), false).unwrap();
        s.play(ip()).unwrap();
        s.pause(ip()).unwrap();
        assert_eq!(s.state(), SessionState::PrePlay);
    }
}
