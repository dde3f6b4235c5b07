//! Entrypoint: ask about verbosity, set up tracing, open and migrate the
//! database, then skim (or resume) and populate.
//!
//! This application uses a strongly-typed configuration (`Settings`) defined in `config.rs`,
//! which provides:
//!  - `database_url`   – SQLite database to fill
//!  - `data_dir`       – root of the scan file tree
//!  - `staging_dir`    – where chunks wait between skim and populate
//!  - `threshold`      – minimum (exclusive) coherence worth keeping
//!  - `chunk_size`     – records buffered before a chunk is flushed

use std::io;

use anyhow::Context;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use line_finder::config::Settings;
use line_finder::db_utils;
use line_finder::metrics;
use line_finder::pipeline::{self, Start};
use line_finder::prompt::prompt_yes_no;

/// Application entrypoint for the line loader.
///
/// **Workflow**:
/// 1. Load `Config.toml` (and apply any `APP__…` env-var overrides).
/// 2. Ask whether to run verbosely (unless `verbose` is configured), then
///    initialise tracing from `RUST_LOG` or the chosen verbosity.
/// 3. Open the SQLite database and run any pending SQLx migrations.
/// 4. Skim the data tree into chunks, or resume a leftover staging area.
/// 5. Commit every chunk and report the total.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // ───────────────────────────────────────────────────────────────
    // 1. Load configuration
    // ───────────────────────────────────────────────────────────────
    let settings = Settings::new().context("loading configuration")?;

    // ───────────────────────────────────────────────────────────────
    // 2. Verbosity + tracing
    // ───────────────────────────────────────────────────────────────
    println!("Running...");
    let verbose = match settings.verbose {
        Some(v) => v,
        None => prompt_yes_no(
            "Run with extra verbosity? (Y/N): ",
            io::stdin().lock(),
            io::stdout(),
        )
        .context("reading verbosity answer")?,
    };

    let default_filter = if verbose { "line_finder=debug" } else { "line_finder=info" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
    info!(?settings, "Loaded configuration");

    // ───────────────────────────────────────────────────────────────
    // 3. Database pool & migrations
    // ───────────────────────────────────────────────────────────────
    let pool = db_utils::connect(&settings.database_url)
        .await
        .with_context(|| format!("opening database {}", settings.database_url))?;
    info!("Connected to SQLite");

    db_utils::migrate(&pool).await.context("running database migrations")?;
    info!("Migrations complete");

    // ───────────────────────────────────────────────────────────────
    // 4-5. Skim or resume, then populate
    // ───────────────────────────────────────────────────────────────
    let summary = pipeline::run(&settings, &pool).await.with_context(|| {
        format!(
            "line loading failed; any staged chunks remain in {}",
            settings.staging_dir.display()
        )
    })?;

    match summary.start {
        Start::Fresh(skim) => info!(
            files = skim.files,
            staged = skim.records,
            chunks = skim.chunks,
            "Fresh scan"
        ),
        Start::Resumed { pending } => info!(pending, "Resumed from existing staging area"),
    }
    info!(
        chunks = summary.populate.chunks,
        total_lines = summary.populate.records,
        staging_removed = summary.staging_removed,
        "Finished commitment of {} lines to the database",
        summary.populate.records
    );
    debug!("Run metrics:\n{}", metrics::gather_metrics());

    pool.close().await;
    Ok(())
}
