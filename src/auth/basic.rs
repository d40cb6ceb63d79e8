// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RFC 2617 Basic authentication (spec `§4.B Authentication`, Basic path).

use crate::ErrorInt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn parse(header: &str) -> Result<Self, crate::Error> {
        let b64 = header.trim().strip_prefix("Basic").ok_or_else(|| {
            wrap!(ErrorInt::MalformedAuth {
                description: format!("Authorization value {:?} is not Basic", header),
            })
        })?;
        let decoded = base64::decode(b64.trim()).map_err(|e| {
            wrap!(ErrorInt::MalformedAuth {
                description: format!("invalid base64 in Basic credentials: {}", e),
            })
        })?;
        let decoded = String::from_utf8(decoded).map_err(|_| {
            wrap!(ErrorInt::MalformedAuth {
                description: "Basic credentials are not valid UTF-8".into(),
            })
        })?;
        let (username, password) = decoded.split_once(':').ok_or_else(|| {
            wrap!(ErrorInt::MalformedAuth {
                description: "Basic credentials have no ':' separator".into(),
            })
        })?;
        Ok(Credentials {
            username: username.to_owned(),
            password: password.to_owned(),
        })
    }

    pub fn serialize(&self) -> String {
        format!(
            "Basic {}",
            base64::encode(format!("{}:{}", self.username, self.password))
        )
    }
}

pub fn challenge(realm: &str) -> String {
    format!("Basic realm=\"{}\"", realm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_credentials() {
        let c = Credentials {
            username: "myuser".into(),
            password: "mypass".into(),
        };
        let header = c.serialize();
        assert_eq!(Credentials::parse(&header).unwrap(), c);
    }

    #[test]
    fn rejects_non_basic_scheme() {
        assert!(Credentials::parse("Digest foo").is_err());
    }

    #[test]
    fn rejects_missing_colon() {
        let encoded = format!("Basic {}", base64::encode("nocolonhere"));
        assert!(Credentials::parse(&encoded).is_err());
    }
}
