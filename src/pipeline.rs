//! pipeline.rs
//!
//! Ties the two phases together. A fresh run skims the source tree into a
//! new staging area and then drains it; if a staging area is already
//! present the skim is skipped and the leftover chunks are drained instead.
//!
//! Only one instance may run against a given staging area and database at
//! a time. Nothing here guards against a second concurrent run.

use crate::config::Settings;
use crate::errors::IngestError;
use crate::populate::{populate, PopulateReport};
use crate::skim::{skim, SkimReport};
use crate::staging::ChunkStore;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// How the run obtained its chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Start {
    /// Scanned the source tree
    Fresh(SkimReport),
    /// Picked up `pending` chunks left by an interrupted run
    Resumed { pending: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub start: Start,
    pub populate: PopulateReport,
    /// False when chunks were left behind after an early end of stream
    pub staging_removed: bool,
}

/// Obtain the staging area: reopen a leftover one, or skim into a new one.
pub fn stage(settings: &Settings) -> Result<(ChunkStore, Start), IngestError> {
    if ChunkStore::exists(&settings.staging_dir) {
        let store = ChunkStore::open(&settings.staging_dir)?;
        let pending = store.list_chunks()?.len();
        info!(
            staging_dir = %settings.staging_dir.display(),
            pending,
            "Resuming partial commitment"
        );
        return Ok((store, Start::Resumed { pending }));
    }

    let (store, report) = skim(settings)?;
    Ok((store, Start::Fresh(report)))
}

/// Run to completion against an already migrated database.
pub async fn run(settings: &Settings, pool: &SqlitePool) -> Result<RunSummary, IngestError> {
    let (store, start) = stage(settings)?;

    info!("Beginning commitment of significant lines to the database");
    let populate = populate(&store, pool).await?;

    let remaining = store.list_chunks()?.len();
    let staging_removed = if remaining == 0 {
        store.remove()?;
        true
    } else {
        warn!(
            staging_dir = %store.dir().display(),
            remaining,
            "Chunks left after end of line list; keeping staging area"
        );
        false
    };

    Ok(RunSummary {
        start,
        populate,
        staging_removed,
    })
}
