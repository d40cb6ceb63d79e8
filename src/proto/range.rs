// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `Range` header: `npt=`, `smpte=`, and `clock=` forms (spec
//! `§4.D Range`). This crate only needs to round-trip these, not compute
//! durations from them, so `smpte`'s frame component is kept as text.

use crate::ErrorInt;

#[derive(Clone, Debug, PartialEq)]
pub enum RangeStart {
    Now,
    Seconds(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub enum RangeEnd {
    Unbounded,
    Seconds(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Range {
    Npt { start: RangeStart, end: RangeEnd, time: Option<String> },
    Smpte { start: String, end: Option<String>, time: Option<String> },
    Clock { start: String, end: Option<String>, time: Option<String> },
}

/// Splits off an optional trailing `;time=<UTCTIME>` parameter (spec
/// `§4.D Range`), which can follow any of the three unit forms.
fn split_time_param(rest: &str) -> (&str, Option<String>) {
    match rest.find(";time=") {
        Some(idx) => (&rest[..idx], Some(rest[idx + ";time=".len()..].to_owned())),
        None => (rest, None),
    }
}

impl Range {
    pub fn parse(value: &str) -> Result<Self, crate::Error> {
        let (unit, rest) = value.split_once('=').ok_or_else(|| {
            wrap!(ErrorInt::MalformedHeader {
                conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                description: format!("Range value {:?} has no '='", value),
            })
        })?;
        let (rest, time) = split_time_param(rest);
        let (start, end) = rest.split_once('-').unwrap_or((rest, ""));
        match unit {
            "npt" => {
                let start = if start == "now" || start.is_empty() {
                    RangeStart::Now
                } else {
                    RangeStart::Seconds(parse_npt_time(start)?)
                };
                let end = if end.is_empty() {
                    RangeEnd::Unbounded
                } else {
                    RangeEnd::Seconds(parse_npt_time(end)?)
                };
                Ok(Range::Npt { start, end, time })
            }
            "smpte" | "smpte-30-drop" | "smpte-25" => Ok(Range::Smpte {
                start: start.to_owned(),
                end: if end.is_empty() { None } else { Some(end.to_owned()) },
                time,
            }),
            "clock" => Ok(Range::Clock {
                start: start.to_owned(),
                end: if end.is_empty() { None } else { Some(end.to_owned()) },
                time,
            }),
            other => bail!(ErrorInt::MalformedHeader {
                conn_ctx: crate::ConnectionContext::dummy_for_limits(),
                description: format!("unsupported Range unit {:?}", other),
            }),
        }
    }

    pub fn serialize(&self) -> String {
        let (mut s, time) = match self {
            Range::Npt { start, end, time } => {
                let start = match start {
                    RangeStart::Now => "now".to_string(),
                    RangeStart::Seconds(s) => format!("{}", s),
                };
                let s = match end {
                    RangeEnd::Unbounded => format!("npt={}-", start),
                    RangeEnd::Seconds(e) => format!("npt={}-{}", start, e),
                };
                (s, time)
            }
            Range::Smpte { start, end, time } => {
                let s = match end {
                    None => format!("smpte={}-", start),
                    Some(e) => format!("smpte={}-{}", start, e),
                };
                (s, time)
            }
            Range::Clock { start, end, time } => {
                let s = match end {
                    None => format!("clock={}-", start),
                    Some(e) => format!("clock={}-{}", start, e),
                };
                (s, time)
            }
        };
        if let Some(time) = time {
            s.push_str(";time=");
            s.push_str(time);
        }
        s
    }
}

/// Parses `npt-time` as either `sec.frac` or `hh:mm:ss.frac`.
fn parse_npt_time(s: &str) -> Result<f64, crate::Error> {
    let malformed = || {
        wrap!(ErrorInt::MalformedHeader {
            conn_ctx: crate::ConnectionContext::dummy_for_limits(),
            description: format!("invalid npt-time {:?}", s),
        })
    };
    if let Some(idx) = s.rfind(':') {
        let (hms, secs) = s.split_at(idx);
        let secs: f64 = secs[1..].parse().map_err(|_| malformed())?;
        let mut parts = hms.split(':');
        let h: f64 = parts.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
        let m: f64 = parts.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
        Ok(h * 3600.0 + m * 60.0 + secs)
    } else {
        s.parse().map_err(|_| malformed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_npt_now_unbounded() {
        let r = Range::parse("npt=now-").unwrap();
        assert_eq!(r, Range::Npt { start: RangeStart::Now, end: RangeEnd::Unbounded, time: None });
    }

    #[test]
    fn parses_npt_bounded_seconds() {
        let r = Range::parse("npt=0-30.5").unwrap();
        assert_eq!(
            r,
            Range::Npt {
                start: RangeStart::Seconds(0.0),
                end: RangeEnd::Seconds(30.5),
                time: None,
            }
        );
    }

    #[test]
    fn parses_npt_hms_form() {
        let r = Range::parse("npt=00:00:10-00:01:00").unwrap();
        assert_eq!(
            r,
            Range::Npt {
                start: RangeStart::Seconds(10.0),
                end: RangeEnd::Seconds(60.0),
                time: None,
            }
        );
    }

    #[test]
    fn parses_clock_range() {
        let r = Range::parse("clock=19961108T143720.25Z-").unwrap();
        assert!(matches!(r, Range::Clock { .. }));
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(Range::parse("frobs=1-2").is_err());
    }

    #[test]
    fn parses_npt_with_trailing_time_param() {
        let r = Range::parse("npt=0-30.5;time=19961108T143720.25Z").unwrap();
        assert_eq!(
            r,
            Range::Npt {
                start: RangeStart::Seconds(0.0),
                end: RangeEnd::Seconds(30.5),
                time: Some("19961108T143720.25Z".to_owned()),
            }
        );
    }

    #[test]
    fn parses_smpte_with_trailing_time_param() {
        let r = Range::parse("smpte=10:00:00-;time=19961108T143720.25Z").unwrap();
        assert_eq!(
            r,
            Range::Smpte {
                start: "10:00:00".to_owned(),
                end: None,
                time: Some("19961108T143720.25Z".to_owned()),
            }
        );
    }

    #[test]
    fn serialize_round_trips_npt() {
        let r = Range::Npt {
            start: RangeStart::Seconds(0.0),
            end: RangeEnd::Unbounded,
            time: None,
        };
        let s = r.serialize();
        assert_eq!(Range::parse(&s).unwrap(), r);
    }

    #[test]
    fn serialize_round_trips_npt_with_time() {
        let r = Range::Npt {
            start: RangeStart::Seconds(0.0),
            end: RangeEnd::Seconds(30.5),
            time: Some("19961108T143720.25Z".to_owned()),
        };
        let s = r.serialize();
        assert_eq!(Range::parse(&s).unwrap(), r);
    }
}
