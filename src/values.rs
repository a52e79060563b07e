//! Flag value types that parse themselves from human-friendly text.

use std::fmt;
use std::str::FromStr;
use std::time;

use serde::{Deserialize, Deserializer};

use crate::errors::ValueError;

/// Implemented by values that can be set from the text of a command-line flag.
///
/// `FromStr` covers the common case; this exists for the in-place form, where a
/// failed parse may still leave a value behind (see [`ByteSize`]).
pub trait UnmarshalFlag {
    fn unmarshal_flag(&mut self, text: &str) -> Result<(), ValueError>;
}

/// A time duration flag such as `"3h"` or `"1m30s"`.
///
/// Bare integers are accepted too and are read as whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub time::Duration);

impl Duration {
    pub fn as_std(self) -> time::Duration {
        self.0
    }

    pub fn unmarshal_text(&mut self, text: &[u8]) -> Result<(), ValueError> {
        let text = std::str::from_utf8(text).map_err(|e| ValueError::Duration {
            text: String::from_utf8_lossy(text).into_owned(),
            reason: e.to_string(),
        })?;
        self.unmarshal_flag(text)
    }
}

impl UnmarshalFlag for Duration {
    fn unmarshal_flag(&mut self, text: &str) -> Result<(), ValueError> {
        match parse_duration(text) {
            Ok(d) => {
                *self = Duration(d);
                Ok(())
            }
            Err(reason) => {
                // Older configs give plain seconds without a unit.
                if let Ok(secs) = text.parse::<u64>() {
                    *self = Duration(time::Duration::from_secs(secs));
                    return Ok(());
                }
                Err(ValueError::Duration {
                    text: text.to_string(),
                    reason,
                })
            }
        }
    }
}

impl FromStr for Duration {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut d = Duration::default();
        d.unmarshal_flag(s)?;
        Ok(d)
    }
}

impl From<Duration> for time::Duration {
    fn from(d: Duration) -> Self {
        d.0
    }
}

impl From<time::Duration> for Duration {
    fn from(d: time::Duration) -> Self {
        Duration(d)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();
        let nanos = self.0.subsec_nanos();
        if secs == 0 {
            return match nanos {
                0 => f.write_str("0s"),
                n if n % 1_000_000 == 0 => write!(f, "{}ms", n / 1_000_000),
                n if n % 1_000 == 0 => write!(f, "{}us", n / 1_000),
                n => write!(f, "{}ns", n),
            };
        }
        let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
        if h > 0 {
            write!(f, "{}h", h)?;
        }
        if h > 0 || m > 0 {
            write!(f, "{}m", m)?;
        }
        write!(f, "{}", s)?;
        if nanos > 0 {
            let frac = format!("{:09}", nanos);
            write!(f, ".{}", frac.trim_end_matches('0'))?;
        }
        f.write_str("s")
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

const NANOS_PER_UNIT: [(&str, u128); 8] = [
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),  // U+00B5 micro sign
    ("μs", 1_000),  // U+03BC greek mu
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 3600 * 1_000_000_000),
];

/// Parses a sequence of `<number><unit>` terms, e.g. `"1h30m"` or `"1.5s"`.
fn parse_duration(text: &str) -> Result<time::Duration, String> {
    let mut s = text;
    if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    } else if s.starts_with('-') {
        return Err("negative durations are not supported".into());
    }
    if s == "0" {
        return Ok(time::Duration::ZERO);
    }
    if s.is_empty() {
        return Err("empty duration".into());
    }

    let mut total: u128 = 0;
    while !s.is_empty() {
        let int_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (int_part, rest) = s.split_at(int_end);
        s = rest;

        let mut frac_part = "";
        if let Some(rest) = s.strip_prefix('.') {
            let frac_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            frac_part = &rest[..frac_end];
            s = &rest[frac_end..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err("expected a number".into());
        }

        let unit_end = s
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(s.len());
        let (unit, rest) = s.split_at(unit_end);
        s = rest;
        if unit.is_empty() {
            return Err("missing unit".into());
        }
        let scale = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| format!("unknown unit {:?}", unit))?;

        let whole = if int_part.is_empty() {
            0
        } else {
            int_part.parse::<u128>().map_err(|_| "overflow".to_string())?
        };
        let mut term = whole.checked_mul(scale).ok_or("overflow")?;
        let mut place = scale;
        for digit in frac_part.bytes() {
            place /= 10;
            if place == 0 {
                break;
            }
            term += u128::from(digit - b'0') * place;
        }
        total = total.checked_add(term).ok_or("overflow")?;
    }

    let nanos = u64::try_from(total).map_err(|_| "overflow".to_string())?;
    Ok(time::Duration::from_nanos(nanos))
}

/// A quantity of bytes given in human-readable form, e.g. `"10G"`.
///
/// Unit prefixes are decimal (`M` is 1,000,000); the `i` forms (`MiB`) are binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl UnmarshalFlag for ByteSize {
    // The partial result is stored before the error is checked, so a failed
    // parse leaves zero behind rather than the previous value.
    fn unmarshal_flag(&mut self, text: &str) -> Result<(), ValueError> {
        let (bytes, result) = match parse_bytes(text) {
            Ok(n) => (n, Ok(())),
            Err(reason) => (
                0,
                Err(ValueError::ByteSize {
                    text: text.to_string(),
                    reason,
                }),
            ),
        };
        *self = ByteSize(bytes);
        result
    }
}

impl FromStr for ByteSize {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut b = ByteSize::default();
        b.unmarshal_flag(s)?;
        Ok(b)
    }
}

impl From<ByteSize> for u64 {
    fn from(b: ByteSize) -> Self {
        b.0
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [(&str, u64); 6] = [
            ("EB", 1_000_000_000_000_000_000),
            ("PB", 1_000_000_000_000_000),
            ("TB", 1_000_000_000_000),
            ("GB", 1_000_000_000),
            ("MB", 1_000_000),
            ("kB", 1_000),
        ];
        for (name, size) in UNITS {
            if self.0 >= size && self.0 % size == 0 {
                return write!(f, "{}{}", self.0 / size, name);
            }
        }
        write!(f, "{}B", self.0)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    const KB: u64 = 1_000;
    const KIB: u64 = 1_024;
    let m = match unit {
        "" | "b" => 1,
        "k" | "kb" => KB,
        "ki" | "kib" => KIB,
        "m" | "mb" => KB.pow(2),
        "mi" | "mib" => KIB.pow(2),
        "g" | "gb" => KB.pow(3),
        "gi" | "gib" => KIB.pow(3),
        "t" | "tb" => KB.pow(4),
        "ti" | "tib" => KIB.pow(4),
        "p" | "pb" => KB.pow(5),
        "pi" | "pib" => KIB.pow(5),
        "e" | "eb" => KB.pow(6),
        "ei" | "eib" => KIB.pow(6),
        _ => return None,
    };
    Some(m)
}

fn parse_bytes(text: &str) -> Result<u64, String> {
    let num_end = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(text.len());
    let (num, unit) = text.split_at(num_end);
    let num = num.replace(',', "");
    let value: f64 = num
        .parse()
        .map_err(|_| format!("expected a number, got {:?}", num))?;

    let unit = unit.trim().to_lowercase();
    let multiplier = unit_multiplier(&unit).ok_or_else(|| format!("unhandled size name {:?}", unit))?;

    let bytes = value * multiplier as f64;
    if bytes >= u64::MAX as f64 {
        return Err("too large".into());
    }
    Ok(bytes as u64)
}
