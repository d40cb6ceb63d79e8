// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RFC 2617 Digest authentication: challenge generation, response
//! computation, and verification, in MD5 or SHA-256 (spec `§4.B Authentication`).
//!
//! The teacher crate depends on `digest_auth` for its client-only needs;
//! this crate must both compute (client) and verify (server) challenges, so
//! the hash math is implemented directly against `md-5`/`sha2` instead.

use md5::Md5;
use sha2::{Digest as ShaDigest, Sha256};

use crate::{ErrorInt, RandomSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Sha256,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Sha256 => "SHA-256",
        }
    }

    fn hash_hex(&self, data: &str) -> String {
        match self {
            Algorithm::Md5 => {
                let mut h = Md5::new();
                h.update(data.as_bytes());
                hex::encode(h.finalize())
            }
            Algorithm::Sha256 => {
                let mut h = Sha256::new();
                h.update(data.as_bytes());
                hex::encode(h.finalize())
            }
        }
    }
}

/// A `WWW-Authenticate: Digest ...` challenge, as sent by a server or parsed
/// by a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Challenge {
    pub realm: String,
    pub nonce: String,
    pub algorithm: Algorithm,
}

impl Challenge {
    /// Generates a fresh challenge for `realm`, with a random nonce.
    ///
    /// Per the Open Question resolved in this crate's design notes, the
    /// algorithm is always emitted explicitly rather than relying on the
    /// RFC 2617 default.
    pub fn generate(realm: &str, algorithm: Algorithm, random: &dyn RandomSource) -> Self {
        Self {
            realm: realm.to_owned(),
            nonce: random.hex16(),
            algorithm,
        }
    }

    pub fn parse(header: &str) -> Result<Self, crate::Error> {
        let rest = header.trim().strip_prefix("Digest").ok_or_else(|| {
            wrap!(ErrorInt::MalformedAuth {
                description: format!("WWW-Authenticate value {:?} is not a Digest challenge", header),
            })
        })?;
        let mut realm = None;
        let mut nonce = None;
        let mut algorithm = Algorithm::Md5;
        let items = crate::proto::kv_parse(rest, ',').map_err(|description| {
            wrap!(ErrorInt::MalformedAuth {
                description: description.to_owned(),
            })
        })?;
        for item in items {
            let value = item.value.unwrap_or("").trim_matches('"');
            match item.key.trim() {
                "realm" => realm = Some(value.to_owned()),
                "nonce" => nonce = Some(value.to_owned()),
                "algorithm" => {
                    algorithm = match value.to_ascii_uppercase().as_str() {
                        "MD5" => Algorithm::Md5,
                        "SHA-256" => Algorithm::Sha256,
                        other => bail!(ErrorInt::MalformedAuth {
                            description: format!("unsupported Digest algorithm {:?}", other),
                        }),
                    }
                }
                _ => {}
            }
        }
        Ok(Challenge {
            realm: realm.ok_or_else(|| {
                wrap!(ErrorInt::MalformedAuth {
                    description: "Digest challenge is missing realm".into(),
                })
            })?,
            nonce: nonce.ok_or_else(|| {
                wrap!(ErrorInt::MalformedAuth {
                    description: "Digest challenge is missing nonce".into(),
                })
            })?,
            algorithm,
        })
    }

    pub fn serialize(&self) -> String {
        format!(
            "Digest realm=\"{}\", nonce=\"{}\", algorithm=\"{}\"",
            self.realm,
            self.nonce,
            self.algorithm.as_str()
        )
    }

    /// Computes the `response` field a correct client would send for this
    /// challenge (spec `§4.B`: `H(H(user:realm:pass) : nonce : H(method:uri))`).
    pub fn compute_response(&self, user: &str, pass: &str, method: &str, uri: &str) -> String {
        let ha1 = self.algorithm.hash_hex(&format!("{}:{}:{}", user, self.realm, pass));
        let ha2 = self.algorithm.hash_hex(&format!("{}:{}", method, uri));
        self.algorithm.hash_hex(&format!("{}:{}:{}", ha1, self.nonce, ha2))
    }
}

/// A parsed `Authorization: Digest ...` header, as sent by a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub realm: String,
    pub nonce: String,
    pub uri: String,
    pub response: String,
    pub algorithm: Algorithm,
}

impl Credentials {
    pub fn parse(header: &str) -> Result<Self, crate::Error> {
        let rest = header.trim().strip_prefix("Digest").ok_or_else(|| {
            wrap!(ErrorInt::MalformedAuth {
                description: format!("Authorization value {:?} is not Digest", header),
            })
        })?;
        let mut username = None;
        let mut realm = None;
        let mut nonce = None;
        let mut uri = None;
        let mut response = None;
        let mut algorithm = Algorithm::Md5;
        let items = crate::proto::kv_parse(rest, ',').map_err(|description| {
            wrap!(ErrorInt::MalformedAuth {
                description: description.to_owned(),
            })
        })?;
        for item in items {
            let value = item.value.unwrap_or("").trim_matches('"');
            match item.key.trim() {
                "username" => username = Some(value.to_owned()),
                "realm" => realm = Some(value.to_owned()),
                "nonce" => nonce = Some(value.to_owned()),
                "uri" => uri = Some(value.to_owned()),
                "response" => response = Some(value.to_owned()),
                "algorithm" => {
                    algorithm = match value.to_ascii_uppercase().as_str() {
                        "MD5" => Algorithm::Md5,
                        "SHA-256" => Algorithm::Sha256,
                        other => bail!(ErrorInt::MalformedAuth {
                            description: format!("unsupported Digest algorithm {:?}", other),
                        }),
                    }
                }
                _ => {}
            }
        }
        macro_rules! require {
            ($opt:expr, $field:literal) => {
                $opt.ok_or_else(|| {
                    wrap!(ErrorInt::MalformedAuth {
                        description: concat!("Authorization header is missing ", $field).into(),
                    })
                })?
            };
        }
        Ok(Credentials {
            username: require!(username, "username"),
            realm: require!(realm, "realm"),
            nonce: require!(nonce, "nonce"),
            uri: require!(uri, "uri"),
            response: require!(response, "response"),
            algorithm,
        })
    }

    pub fn serialize(&self) -> String {
        format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", response=\"{}\", algorithm=\"{}\"",
            self.username, self.realm, self.nonce, self.uri, self.response, self.algorithm.as_str()
        )
    }
}
