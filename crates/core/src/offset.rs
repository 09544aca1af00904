//! Compact text form for signed window offsets.
//!
//! Offsets are written as an optional leading `-` followed by unit
//! components: `Nw` (weeks), `Nd` (days), `Nh` (hours), `Nm` (minutes),
//! `Ns` (seconds). Components can be combined: `"6w"`, `"1d12h"`, `"-2d"`.
//! A bare integer is read as seconds.

use chrono::Duration;

use crate::error::{CoreError, Result};

const WEEK: i64 = 7 * DAY;
const DAY: i64 = 86_400;
const HOUR: i64 = 3_600;
const MINUTE: i64 = 60;

/// Parse a compact offset string into a signed [`Duration`].
pub fn parse_offset(s: &str) -> Result<Duration> {
    let trimmed = s.trim();
    let invalid = |message: &str| CoreError::InvalidDuration {
        input: s.to_string(),
        message: message.to_string(),
    };

    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };
    if body.is_empty() {
        return Err(invalid("empty duration"));
    }

    let mut total_secs: i64 = 0;
    let mut num_buf = String::new();
    let mut found_unit = false;

    for ch in body.chars() {
        if ch.is_ascii_digit() {
            num_buf.push(ch);
            continue;
        }
        if num_buf.is_empty() {
            return Err(invalid("unit without a number"));
        }
        let n: i64 = num_buf.parse().map_err(|_| invalid("number too large"))?;
        num_buf.clear();
        let unit = match ch {
            'w' => WEEK,
            'd' => DAY,
            'h' => HOUR,
            'm' => MINUTE,
            's' => 1,
            other => return Err(invalid(&format!("unknown unit '{}'", other))),
        };
        total_secs = n
            .checked_mul(unit)
            .and_then(|secs| total_secs.checked_add(secs))
            .ok_or_else(|| invalid("duration overflows"))?;
        found_unit = true;
    }

    // Trailing digits after a unit ("30m15") are ambiguous.
    if !num_buf.is_empty() {
        if found_unit {
            return Err(invalid("trailing number without a unit"));
        }
        total_secs = num_buf.parse().map_err(|_| invalid("number too large"))?;
    }

    let signed = if negative { -total_secs } else { total_secs };
    Duration::try_seconds(signed).ok_or_else(|| invalid("duration out of range"))
}

/// Format a [`Duration`] in the canonical compact form, largest units first.
///
/// Sub-second precision is dropped.
pub fn format_offset(d: &Duration) -> String {
    let secs = d.num_seconds();
    if secs == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    if secs < 0 {
        out.push('-');
    }
    let mut rest = secs.unsigned_abs();
    for (unit, suffix) in [
        (WEEK as u64, 'w'),
        (DAY as u64, 'd'),
        (HOUR as u64, 'h'),
        (MINUTE as u64, 'm'),
        (1, 's'),
    ] {
        let n = rest / unit;
        if n > 0 {
            out.push_str(&n.to_string());
            out.push(suffix);
            rest -= n * unit;
        }
    }
    out
}

/// `#[serde(with = "cadence_core::offset::serde_offset")]` adapter.
///
/// Accepts either the compact string form or an integer number of seconds.
pub mod serde_offset {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_offset(d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Seconds(n) => Duration::try_seconds(n)
                .ok_or_else(|| serde::de::Error::custom("duration out of range")),
            Raw::Text(s) => super::parse_offset(&s).map_err(serde::de::Error::custom),
        }
    }
}
