//! classifier.rs
//!
//! Derives a scan file's metadata from where it sits in the source tree:
//!
//! `.../<granularity>/<observatory>/<run-dir>/<channel>/<file>`
//!
//! where `<run-dir>` looks like `fscans_2019_12_21_18_00_03_CST_Sat` and
//! carries the scan's start date in its 2nd..4th `_`-separated fields.

use crate::errors::IngestError;
use crate::record::{Granularity, Run};
use chrono::{Datelike, NaiveDate};
use std::path::{Component, Path};

/// Everything about a line that comes from its file's location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub granularity: Granularity,
    pub observatory: String,
    pub run: Run,
    pub channel: String,
    pub timestamp: i64,
}

/// Classify a scan file by its path. Any deviation from the directory
/// convention is a fatal `MalformedPath`.
pub fn classify_path(path: &Path) -> Result<FileMeta, IngestError> {
    let malformed =
        |reason: &str| IngestError::MalformedPath(path.to_path_buf(), reason.to_string());

    let mut segments: Vec<&str> = Vec::new();
    for component in path.components() {
        if let Component::Normal(s) = component {
            segments.push(s.to_str().ok_or_else(|| malformed("non-UTF-8 segment"))?);
        }
    }

    if segments.len() < 5 {
        return Err(malformed(
            "expected <granularity>/<observatory>/<run-dir>/<channel>/<file>",
        ));
    }
    let tail = &segments[segments.len() - 5..];
    let (granularity, observatory, run_dir, channel) = (tail[0], tail[1], tail[2], tail[3]);

    let granularity = Granularity::from_segment(granularity)
        .ok_or_else(|| malformed(&format!("unknown granularity {granularity:?}")))?;

    let date = run_dir_date(run_dir)
        .ok_or_else(|| malformed(&format!("no date in run directory {run_dir:?}")))?;
    let timestamp = date
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| malformed("date out of range"))?;

    Ok(FileMeta {
        granularity,
        observatory: observatory.to_string(),
        run: Run::from_date(date.year(), date.month()),
        channel: channel.to_string(),
        timestamp,
    })
}

fn run_dir_date(run_dir: &str) -> Option<NaiveDate> {
    let mut fields = run_dir.split('_').skip(1);
    let year = fields.next()?.parse().ok()?;
    let month = fields.next()?.parse().ok()?;
    let day = fields.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
