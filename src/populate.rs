//! populate.rs
//!
//! Second phase: drain the staging area into the database, one chunk per
//! transaction, oldest chunk first.
//!
//! A chunk is deleted only after its transaction commits. A crash between
//! the two replays that chunk on the next run, so delivery is at-least-once.

use crate::db_utils::commit_chunk;
use crate::errors::IngestError;
use crate::metrics::{CHUNKS_COMMITTED, COMMIT_HISTOGRAM, RECORDS_COMMITTED};
use crate::staging::ChunkStore;
use sqlx::SqlitePool;
use std::time::Instant;
use tracing::{debug, info};

/// Totals for one drain.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PopulateReport {
    pub chunks: usize,
    pub records: u64,
}

/// Commit every pending chunk in ascending order and delete each once it is
/// committed. An empty chunk marks the end of the stream: it is deleted and
/// draining stops there.
pub async fn populate(
    store: &ChunkStore,
    pool: &SqlitePool,
) -> Result<PopulateReport, IngestError> {
    let indices = store.list_chunks()?;
    let total_chunks = indices.len();
    info!(chunks = total_chunks, "{} chunk(s) will be used", total_chunks);

    let mut report = PopulateReport::default();

    for index in indices {
        let records = store.read_chunk(index)?;
        if records.is_empty() {
            info!(chunk = index, "End of line list reached");
            store.delete_chunk(index)?;
            break;
        }

        let start = Instant::now();
        let committed = commit_chunk(pool, &records).await?;
        COMMIT_HISTOGRAM.observe(start.elapsed().as_secs_f64());

        store.delete_chunk(index)?;

        report.chunks += 1;
        report.records += committed;
        CHUNKS_COMMITTED.inc();
        RECORDS_COMMITTED.inc_by(committed);

        debug!(
            chunk = index,
            of = total_chunks,
            committed_so_far = report.records,
            "{}/{}, {} lines so far",
            index,
            total_chunks,
            report.records
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_utils::{connect, count_lines, migrate};
    use crate::record::{Granularity, Record, Run};
    use tempfile::TempDir;

    fn record(frequency: f64) -> Record {
        Record {
            granularity: Granularity::Weekly,
            run: Run::Er14,
            observatory: "L1".into(),
            timestamp: 1_552_608_000,
            channel: "L1_CHAN".into(),
            frequency,
            coherence: 0.9,
        }
    }

    async fn setup() -> (TempDir, ChunkStore, SqlitePool) {
        let tmp = TempDir::new().unwrap();
        let store = ChunkStore::create(&tmp.path().join("temp")).unwrap();
        let pool = connect("sqlite::memory:").await.unwrap();
        migrate(&pool).await.unwrap();
        (tmp, store, pool)
    }

    #[tokio::test]
    async fn test_drains_chunks_in_order() {
        let (_tmp, mut store, pool) = setup().await;
        store.write_chunk(&[record(1.0), record(2.0)]).unwrap();
        store.write_chunk(&[record(3.0)]).unwrap();

        let report = populate(&store, &pool).await.unwrap();
        assert_eq!(report, PopulateReport { chunks: 2, records: 3 });
        assert!(store.list_chunks().unwrap().is_empty());

        let freqs: Vec<f64> = sqlx::query_scalar("SELECT frequency FROM lines ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(freqs, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_empty_chunk_stops_the_stream() {
        let (_tmp, mut store, pool) = setup().await;
        store.write_chunk(&[record(1.0)]).unwrap();
        store.write_chunk(&[]).unwrap();
        store.write_chunk(&[record(3.0)]).unwrap();

        let report = populate(&store, &pool).await.unwrap();
        assert_eq!(report.records, 1);
        assert_eq!(store.list_chunks().unwrap(), vec![3]);
        assert_eq!(count_lines(&pool, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_chunk_staged() {
        let (_tmp, mut store, pool) = setup().await;
        store.write_chunk(&[record(1.0)]).unwrap();
        sqlx::query("DROP TABLE lines").execute(&pool).await.unwrap();

        assert!(matches!(populate(&store, &pool).await, Err(IngestError::Db(_))));
        assert_eq!(store.list_chunks().unwrap(), vec![1]);
    }
}
