// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RTSP authentication: server-side challenge generation and verification,
//! client-side response computation (spec `§4.B Auth core`).

mod basic;
mod digest;

pub use basic::Credentials as BasicCredentials;
pub use digest::{Algorithm, Challenge as DigestChallenge, Credentials as DigestCredentials};

use crate::proto::Method;
use crate::{ErrorInt, RandomSource};

/// Which authentication schemes a server is willing to accept, and how it
/// challenges for them.
#[derive(Clone, Debug)]
pub struct AcceptedMethods {
    pub digest_md5: bool,
    pub digest_sha256: bool,
    pub basic: bool,
}

impl Default for AcceptedMethods {
    /// Digest-MD5 and Basic, matching the spec's default: SHA-256 is opt-in
    /// because some widely-deployed clients fail against it.
    fn default() -> Self {
        Self {
            digest_md5: true,
            digest_sha256: false,
            basic: true,
        }
    }
}

/// Builds the one-or-more `WWW-Authenticate` header values for a 401
/// response (`GenerateWWWAuthenticate`).
pub fn generate_www_authenticate(
    accepted: &AcceptedMethods,
    realm: &str,
    random: &dyn RandomSource,
) -> Vec<String> {
    let mut values = Vec::new();
    if accepted.digest_md5 {
        values.push(DigestChallenge::generate(realm, Algorithm::Md5, random).serialize());
    }
    if accepted.digest_sha256 {
        values.push(DigestChallenge::generate(realm, Algorithm::Sha256, random).serialize());
    }
    if accepted.basic {
        values.push(basic::challenge(realm));
    }
    values
}

/// Returns `true` if `received` matches `stored`, or (only for SETUP
/// requests) if `stored` ends in `/trackID=<N>` and `received` equals
/// `stored` with that suffix stripped — the VLC quirk covered by spec
/// scenario 3.
fn urls_match(stored: &str, received: &str, method: Method) -> bool {
    if stored == received {
        return true;
    }
    if method != Method::Setup {
        return false;
    }
    match stored.rfind("/trackID=") {
        Some(idx) => &stored[..idx + 1] == received,
        None => false,
    }
}

/// Verifies an `Authorization` header against the expected credentials and
/// the challenge that was issued (`Verify`).
///
/// `request_uri` is the URI exactly as the client sent it on the wire (not
/// normalized), since the matching quirk above depends on the raw bytes.
pub fn verify(
    header: &str,
    method: Method,
    request_uri: &str,
    user: &str,
    pass: &str,
    accepted: &AcceptedMethods,
    realm: &str,
    nonce: &str,
) -> Result<(), crate::Error> {
    let scheme = header.trim().split_whitespace().next().unwrap_or("");
    match scheme {
        "Digest" => {
            let creds = DigestCredentials::parse(header)?;
            let allowed = match creds.algorithm {
                Algorithm::Md5 => accepted.digest_md5,
                Algorithm::Sha256 => accepted.digest_sha256,
            };
            if !allowed {
                bail!(ErrorInt::AuthFailed);
            }
            if creds.nonce != nonce {
                bail!(ErrorInt::WrongNonce);
            }
            if creds.realm != realm {
                bail!(ErrorInt::WrongRealm);
            }
            if creds.username != user {
                bail!(ErrorInt::AuthFailed);
            }
            if !urls_match(request_uri, &creds.uri, method) {
                bail!(ErrorInt::WrongUrl { uri: creds.uri.clone() });
            }
            let challenge = DigestChallenge {
                realm: realm.to_owned(),
                nonce: nonce.to_owned(),
                algorithm: creds.algorithm,
            };
            let expected = challenge.compute_response(user, pass, method.as_str(), &creds.uri);
            if expected != creds.response {
                bail!(ErrorInt::AuthFailed);
            }
            Ok(())
        }
        "Basic" => {
            if !accepted.basic {
                bail!(ErrorInt::AuthFailed);
            }
            let creds = BasicCredentials::parse(header)?;
            if creds.username != user || creds.password != pass {
                bail!(ErrorInt::AuthFailed);
            }
            Ok(())
        }
        _ => bail!(ErrorInt::MalformedAuth {
            description: format!("unsupported Authorization scheme {:?}", scheme),
        }),
    }
}

/// Client-side sender state: remembers the challenge(s) a server issued so
/// later requests on the same connection can attach an `Authorization`
/// header preemptively rather than round-tripping a 401 every time.
#[derive(Clone, Debug, Default)]
pub struct Sender {
    digest: Option<DigestChallenge>,
    basic: bool,
}

impl Sender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses one or more comma-unrelated `WWW-Authenticate` header values
    /// (servers send one header line per scheme, not comma-joined), keeping
    /// a Digest challenge if any was offered, else falling back to Basic.
    pub fn accept_challenges(&mut self, values: &[String]) -> Result<(), crate::Error> {
        for value in values {
            let scheme = value.trim().split_whitespace().next().unwrap_or("");
            match scheme {
                "Digest" => self.digest = Some(DigestChallenge::parse(value)?),
                "Basic" => self.basic = true,
                _ => {}
            }
        }
        Ok(())
    }

    pub fn has_challenge(&self) -> bool {
        self.digest.is_some() || self.basic
    }

    /// Computes the `Authorization` header value to send for `method`/`uri`
    /// with `user`/`pass`, preferring Digest over Basic when both were
    /// offered.
    pub fn authorize(&self, method: Method, uri: &str, user: &str, pass: &str) -> Option<String> {
        if let Some(challenge) = &self.digest {
            let response = challenge.compute_response(user, pass, method.as_str(), uri);
            let creds = DigestCredentials {
                username: user.to_owned(),
                realm: challenge.realm.clone(),
                nonce: challenge.nonce.clone(),
                uri: uri.to_owned(),
                response,
                algorithm: challenge.algorithm,
            };
            return Some(creds.serialize());
        }
        if self.basic {
            let creds = BasicCredentials {
                username: user.to_owned(),
                password: pass.to_owned(),
            };
            return Some(creds.serialize());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixedRandom;

    #[test]
    fn generate_emits_one_value_per_accepted_method() {
        let accepted = AcceptedMethods::default();
        let random = FixedRandom::constant(0xAB);
        let values = generate_www_authenticate(&accepted, "myrealm", &random);
        assert_eq!(values.len(), 2); // digest_md5 + basic, by default.
        assert!(values[0].starts_with("Digest"));
        assert!(values[1].starts_with("Basic"));
    }

    #[test]
    fn verifies_the_documented_scenario() {
        // Scenario 2: a real Digest-MD5 exchange.
        let header = format!(
            r#"Digest username="myuser", realm="myrealm", nonce="f49ac6dd0ba708d4becddc9692d1f2ce", uri="rtsp://myhost/mypath?key=val/trackID=3", response="ba6e9cccbfeb38db775378a0a9067ba5", algorithm="MD5""#,
        );
        let accepted = AcceptedMethods::default();
        verify(
            &header,
            Method::Setup,
            "rtsp://myhost/mypath?key=val/trackID=3",
            "myuser",
            "mypass",
            &accepted,
            "myrealm",
            "f49ac6dd0ba708d4becddc9692d1f2ce",
        )
        .unwrap();
    }

    #[test]
    fn vlc_quirk_accepts_track_id_stripped_url() {
        // Scenario 3: client's Authorization omits the /trackID=3 suffix.
        assert!(urls_match(
            "rtsp://myhost/mypath?key=val/trackID=3",
            "rtsp://myhost/mypath?key=val/",
            Method::Setup,
        ));
        assert!(!urls_match(
            "rtsp://myhost/mypath?key=val/trackID=3",
            "rtsp://myhost/mypath?key=val/",
            Method::Describe,
        ));
    }

    #[test]
    fn rejects_wrong_nonce() {
        let header = r#"Digest username="u", realm="r", nonce="wrong", uri="rtsp://x/y", response="00000000000000000000000000000000""#;
        let accepted = AcceptedMethods::default();
        assert!(verify(header, Method::Options, "rtsp://x/y", "u", "p", &accepted, "r", "right").is_err());
    }

    #[test]
    fn client_sender_attaches_digest_after_challenge() {
        let mut sender = Sender::new();
        sender
            .accept_challenges(&[r#"Digest realm="r", nonce="n", algorithm="MD5""#.to_owned()])
            .unwrap();
        let header = sender.authorize(Method::Describe, "rtsp://x/y", "u", "p").unwrap();
        assert!(header.starts_with("Digest"));
        assert!(header.contains("username=\"u\""));
    }

    #[test]
    fn basic_round_trip_through_verify() {
        let creds = BasicCredentials { username: "u".into(), password: "p".into() };
        let header = creds.serialize();
        let accepted = AcceptedMethods::default();
        verify(&header, Method::Options, "*", "u", "p", &accepted, "r", "n").unwrap();
        assert!(verify(&header, Method::Options, "*", "u", "wrong", &accepted, "r", "n").is_err());
    }
}
