//! Byte-scale unit handling: base-1024 conversion, human-readable formatting
//! and lenient coercion of raw numeric input.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

pub const BYTES_PER_KB: u64 = 1024;
pub const BYTES_PER_MB: u64 = 1024 * BYTES_PER_KB;
pub const BYTES_PER_GB: u64 = 1024 * BYTES_PER_MB;

const FORMAT_LABELS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("unknown unit '{0}' (expected B, KB, MB or GB)")]
    UnknownUnit(String),
    #[error("cannot parse size '{0}'")]
    InvalidSize(String),
}

/// Unit a value is entered and displayed in. Carries no weight in the math:
/// stored values are always bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayUnit {
    #[serde(rename = "B")]
    Byte,
    #[serde(rename = "KB")]
    Kilobyte,
    #[serde(rename = "MB")]
    Megabyte,
    #[serde(rename = "GB")]
    Gigabyte,
}

impl DisplayUnit {
    pub const ALL: [DisplayUnit; 4] =
        [DisplayUnit::Byte, DisplayUnit::Kilobyte, DisplayUnit::Megabyte, DisplayUnit::Gigabyte];

    pub fn multiplier(self) -> u64 {
        match self {
            DisplayUnit::Byte => 1,
            DisplayUnit::Kilobyte => BYTES_PER_KB,
            DisplayUnit::Megabyte => BYTES_PER_MB,
            DisplayUnit::Gigabyte => BYTES_PER_GB,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DisplayUnit::Byte => "B",
            DisplayUnit::Kilobyte => "KB",
            DisplayUnit::Megabyte => "MB",
            DisplayUnit::Gigabyte => "GB",
        }
    }
}

impl fmt::Display for DisplayUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DisplayUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        // "MiB" and friends are accepted as aliases; the table is base-1024 either way.
        let norm = match upper.strip_suffix("IB") {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}B"),
            _ => upper.clone(),
        };
        match norm.as_str() {
            "B" | "BYTE" | "BYTES" => Ok(DisplayUnit::Byte),
            "K" | "KB" => Ok(DisplayUnit::Kilobyte),
            "M" | "MB" => Ok(DisplayUnit::Megabyte),
            "G" | "GB" => Ok(DisplayUnit::Gigabyte),
            _ => Err(UnitError::UnknownUnit(s.trim().to_string())),
        }
    }
}

pub fn to_bytes(value: f64, unit: DisplayUnit) -> f64 {
    value * unit.multiplier() as f64
}

pub fn from_bytes(bytes: f64, unit: DisplayUnit) -> f64 {
    bytes / unit.multiplier() as f64
}

/// Renders a byte count as e.g. `"1.5 KB"` or `"128 MB"`.
///
/// The unit index is `floor(log1024(bytes))`, clamped to the label table, so
/// anything past a terabyte still prints with the `TB` label (`1024 TB`,
/// `1048576 TB`, ...). Zero, negative and non-finite input render as `"0 B"`.
pub fn format_bytes(bytes: f64) -> String {
    if !bytes.is_finite() || bytes <= 0.0 {
        return "0 B".to_string();
    }
    // log2 is exact on powers of two, so 1 MiB lands on index 2 rather than 1.99999.
    let raw_index = (bytes.log2() / 10.0).floor();
    let index = raw_index.clamp(0.0, (FORMAT_LABELS.len() - 1) as f64) as usize;
    let scaled = bytes / 1024f64.powi(index as i32);
    let rounded = (scaled * 100.0).round() / 100.0;
    format!("{} {}", rounded, FORMAT_LABELS[index])
}

fn decimal_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").expect("valid decimal regex")
    })
}

fn integer_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([+-]?\d+)").expect("valid integer regex"))
}

fn size_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*((?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)\s*([A-Za-z]*)\s*$")
            .expect("valid size regex")
    })
}

/// Lenient float parse of a form field. Reads the longest leading decimal
/// number and ignores the rest; yields 0 for anything unusable.
pub fn coerce_number(raw: &str) -> f64 {
    decimal_prefix_re()
        .captures(raw)
        .and_then(|c| c[1].parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(0.0)
}

/// Lenient integer parse for counts (`"151.7"` -> 151, `"abc"` -> 0).
pub fn coerce_count(raw: &str) -> u64 {
    integer_prefix_re()
        .captures(raw)
        .and_then(|c| c[1].parse::<i128>().ok())
        .map(|v| v.clamp(0, u64::MAX as i128) as u64)
        .unwrap_or(0)
}

pub fn round_bytes(bytes: f64) -> u64 {
    if !bytes.is_finite() || bytes <= 0.0 {
        return 0;
    }
    // `as` saturates at u64::MAX for out-of-range floats.
    bytes.round() as u64
}

/// A size typed as `"<number>[ ]<unit>"`, e.g. `"128MB"`, `"1.5 gib"`, `"4096"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeInput {
    pub value: f64,
    pub unit: Option<DisplayUnit>,
}

impl SizeInput {
    pub fn to_bytes(self, default_unit: DisplayUnit) -> f64 {
        to_bytes(self.value, self.unit.unwrap_or(default_unit))
    }
}

pub fn parse_size(text: &str) -> Result<SizeInput, UnitError> {
    let caps = size_re().captures(text).ok_or_else(|| UnitError::InvalidSize(text.trim().to_string()))?;
    let value = caps[1].parse::<f64>().map_err(|_| UnitError::InvalidSize(text.trim().to_string()))?;
    if !value.is_finite() {
        return Err(UnitError::InvalidSize(text.trim().to_string()));
    }
    let unit = match &caps[2] {
        "" => None,
        u => Some(u.parse::<DisplayUnit>()?),
    };
    Ok(SizeInput { value, unit })
}
