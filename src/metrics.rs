//! Prometheus metrics registry and metric definitions.
//!
//! There is no exporter; the run summary dumps the text encoding.

use once_cell::sync::Lazy;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};

/// Global registry under crate namespace
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    Registry::new_custom(Some("line_finder".into()), None)
        .expect("failed to create Prometheus registry")
});

fn counter(name: &str, help: &str) -> IntCounter {
    let c = IntCounter::with_opts(Opts::new(name, help)).expect("counter opts");
    REGISTRY.register(Box::new(c.clone())).expect("register counter");
    c
}

/// Source files read during the skim
pub static FILES_SCANNED: Lazy<IntCounter> =
    Lazy::new(|| counter("files_scanned_total", "Source files parsed during the skim"));

/// Significant records buffered for staging
pub static RECORDS_STAGED: Lazy<IntCounter> =
    Lazy::new(|| counter("records_staged_total", "Significant records written to chunks"));

pub static CHUNKS_WRITTEN: Lazy<IntCounter> =
    Lazy::new(|| counter("chunks_written_total", "Chunks flushed to the staging area"));

pub static CHUNKS_COMMITTED: Lazy<IntCounter> =
    Lazy::new(|| counter("chunks_committed_total", "Chunks committed to the database"));

pub static RECORDS_COMMITTED: Lazy<IntCounter> =
    Lazy::new(|| counter("records_committed_total", "Records committed to the database"));

/// Histogram of per-chunk commit durations
pub static COMMIT_HISTOGRAM: Lazy<Histogram> = Lazy::new(|| {
    let opts = HistogramOpts::new(
        "chunk_commit_duration_seconds",
        "Duration of a single chunk transaction in seconds",
    );
    let h = Histogram::with_opts(opts).expect("histogram opts");
    REGISTRY.register(Box::new(h.clone())).expect("register histogram");
    h
});

/// Encode all metrics as text
pub fn gather_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let mf = REGISTRY.gather();
    encoder.encode(&mf, &mut buffer).expect("failed to encode");
    String::from_utf8(buffer).expect("invalid utf8")
}
