//! Data model shared by every stage: one significant line, plus the
//! granularity and observing-run labels that classify it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Analysis window a measurement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Weekly,
    Monthly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        }
    }

    /// Parse the literal directory name used in the source tree.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "weekly" => Some(Granularity::Weekly),
            "monthly" => Some(Granularity::Monthly),
            _ => None,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observing campaign a measurement was taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Run {
    /// Engineering run preceding O3, March 2019
    Er14,
    /// First half of O3, April through October 2019
    O3a,
    /// Second half of O3, November 2019 onwards
    O3b,
}

impl Run {
    /// Map a calendar month onto its run. Anything past O3A is O3B.
    pub fn from_date(year: i32, month: u32) -> Self {
        match (year, month) {
            (2019, m) if m < 4 => Run::Er14,
            (2019, m) if m < 11 => Run::O3a,
            _ => Run::O3b,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Run::Er14 => "ER14",
            Run::O3a => "O3A",
            Run::O3b => "O3B",
        }
    }
}

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One significant frequency/coherence pair with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub granularity: Granularity,
    pub run: Run,
    pub observatory: String,
    /// Epoch seconds of the scan's start date
    pub timestamp: i64,
    pub channel: String,
    /// Hz, rounded to 6 decimal places
    pub frequency: f64,
    pub coherence: f64,
}
