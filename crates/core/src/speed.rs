//! Package speed labels and the rate limits derived from them.
//!
//! Packages carry a human label such as `"30 Mbps"` or `"10/2 Mbps"`
//! (download/upload). Providers need a machine rate; both RouterOS queues
//! and the `Mikrotik-Rate-Limit` RADIUS attribute use the `upload/download`
//! form with `k`/`M` suffixes.

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;

const KILO: u64 = 1_000;
const MEGA: u64 = 1_000_000;
const GIGA: u64 = 1_000_000_000;

/// A symmetric or asymmetric bandwidth limit in bits per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimit {
    pub download_bps: u64,
    pub upload_bps: u64,
}

impl RateLimit {
    /// Parse a package speed label.
    ///
    /// Accepts an optional `download/upload` pair, decimal values, and the
    /// units `k`/`kbps`, `m`/`mbps`, `g`/`gbps` (case-insensitive, `bit` and
    /// `b` spellings included). A bare number is rejected because the unit is
    /// ambiguous.
    pub fn from_speed_label(label: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::Validation(format!("Unrecognised speed label '{label}'"));

        let normalized = label.trim().to_ascii_lowercase().replace(' ', "");
        let split_at = normalized
            .find(|c: char| c.is_ascii_alphabetic())
            .ok_or_else(invalid)?;
        let (numbers, unit) = normalized.split_at(split_at);

        let multiplier = match unit {
            "k" | "kb" | "kbps" | "kbit" | "kbit/s" | "kb/s" => KILO,
            "m" | "mb" | "mbps" | "mbit" | "mbit/s" | "mb/s" => MEGA,
            "g" | "gb" | "gbps" | "gbit" | "gbit/s" | "gb/s" => GIGA,
            _ => return Err(invalid()),
        };

        let mut parts = numbers.split('/');
        let download = parse_amount(parts.next().ok_or_else(invalid)?, multiplier).ok_or_else(invalid)?;
        let upload = match parts.next() {
            Some(up) => parse_amount(up, multiplier).ok_or_else(invalid)?,
            None => download,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            download_bps: download,
            upload_bps: upload,
        })
    }

    /// RouterOS `max-limit` / `Mikrotik-Rate-Limit` form: `upload/download`.
    pub fn to_routeros(&self) -> String {
        format!("{}/{}", format_bps(self.upload_bps), format_bps(self.download_bps))
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_routeros())
    }
}

fn parse_amount(raw: &str, multiplier: u64) -> Option<u64> {
    let value: f64 = raw.parse().ok()?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    let bps = (value * multiplier as f64).round() as u64;
    (bps > 0).then_some(bps)
}

fn format_bps(bps: u64) -> String {
    if bps % MEGA == 0 {
        format!("{}M", bps / MEGA)
    } else if bps % KILO == 0 {
        format!("{}k", bps / KILO)
    } else {
        bps.to_string()
    }
}
