//! parser.rs
//!
//! Turns raw `<frequency> <coherence>` lines into records, keeping only
//! the significant ones.

use crate::classifier::FileMeta;
use crate::errors::IngestError;
use crate::record::Record;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// What a single line contributes.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Coherence passed the filter
    Keep(Record),
    /// Well-formed but not significant
    Discard,
    /// Blank line: no more data in this file
    End,
}

/// Parse a scientific-notation token (`<mantissa>e<exponent>`) and round
/// the result to 6 decimal places. Values that are not finite (NaN, or
/// overflowing to infinity) are rejected.
pub fn parse_frequency(token: &str) -> Result<f64, String> {
    let (mantissa, exponent) = token
        .split_once(['e', 'E'])
        .ok_or_else(|| format!("frequency {token:?} is not in scientific notation"))?;
    let mantissa: f64 = mantissa
        .parse()
        .map_err(|e| format!("bad mantissa in {token:?}: {e}"))?;
    let exponent: f64 = exponent
        .parse()
        .map_err(|e| format!("bad exponent in {token:?}: {e}"))?;

    let frequency = round6(mantissa * 10f64.powf(exponent));
    if !frequency.is_finite() {
        return Err(format!("frequency {token:?} is not a finite number"));
    }
    Ok(frequency)
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Significant means strictly between the threshold and 1.
pub fn is_significant(coherence: f64, threshold: f64) -> bool {
    threshold < coherence && coherence < 1.0
}

/// Parse one line. Errors carry a reason only; the caller knows the file
/// and line number.
pub fn parse_line(line: &str, meta: &FileMeta, threshold: f64) -> Result<LineOutcome, String> {
    let mut tokens = line.split_whitespace();
    let Some(freq_token) = tokens.next() else {
        return Ok(LineOutcome::End);
    };
    let coh_token = tokens
        .next()
        .ok_or_else(|| format!("missing coherence after {freq_token:?}"))?;

    let frequency = parse_frequency(freq_token)?;
    let coherence: f64 = coh_token
        .parse()
        .map_err(|e| format!("bad coherence {coh_token:?}: {e}"))?;
    if !coherence.is_finite() {
        return Err(format!("coherence {coh_token:?} is not a finite number"));
    }

    if !is_significant(coherence, threshold) {
        return Ok(LineOutcome::Discard);
    }

    Ok(LineOutcome::Keep(Record {
        granularity: meta.granularity,
        run: meta.run,
        observatory: meta.observatory.clone(),
        timestamp: meta.timestamp,
        channel: meta.channel.clone(),
        frequency,
        coherence,
    }))
}

/// Read lines from `reader` in order until EOF or the first blank line,
/// collecting significant records. Any malformed line aborts with its
/// 1-based line number.
pub fn parse_reader<R: BufRead>(
    reader: R,
    path: &Path,
    meta: &FileMeta,
    threshold: f64,
) -> Result<Vec<Record>, IngestError> {
    let mut records = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_line(&line, meta, threshold) {
            Ok(LineOutcome::Keep(record)) => records.push(record),
            Ok(LineOutcome::Discard) => {}
            Ok(LineOutcome::End) => break,
            Err(reason) => {
                return Err(IngestError::Parse {
                    file: path.to_path_buf(),
                    line: idx + 1,
                    reason,
                })
            }
        }
    }

    Ok(records)
}

/// Open `path` and parse it with [`parse_reader`].
pub fn parse_file(
    path: &Path,
    meta: &FileMeta,
    threshold: f64,
) -> Result<Vec<Record>, IngestError> {
    let file = File::open(path)?;
    parse_reader(BufReader::new(file), path, meta, threshold)
}
