use crate::errors::IngestError;
use crate::record::{Granularity, Record};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Opens the SQLite database at `database_url`, creating the file if needed.
///
/// # Notes
///
/// The pool holds a single connection: the loader is strictly sequential,
/// and `sqlite::memory:` databases only live as long as their connection.
pub async fn connect(database_url: &str) -> Result<SqlitePool, IngestError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Applies the embedded migrations. Safe on an existing database: nothing
/// already committed is dropped.
pub async fn migrate(pool: &SqlitePool) -> Result<(), IngestError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Inserts `records` in order inside one transaction.
///
/// # Returns
///
/// * `Ok(n)` - Number of rows inserted, once the transaction is committed.
/// * `Err` - If any insert or the commit fails; nothing from this batch is kept.
pub async fn commit_chunk(pool: &SqlitePool, records: &[Record]) -> Result<u64, IngestError> {
    let mut tx = pool.begin().await?;

    for record in records {
        sqlx::query(
            r#"
            INSERT INTO lines
                (granularity, run, observatory, timestamp, channel, frequency, coherence)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.granularity.as_str())
        .bind(record.run.as_str())
        .bind(&record.observatory)
        .bind(record.timestamp)
        .bind(&record.channel)
        .bind(record.frequency)
        .bind(record.coherence)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(records.len() as u64)
}

/// Counts committed rows, optionally for one granularity only.
pub async fn count_lines(
    pool: &SqlitePool,
    granularity: Option<Granularity>,
) -> Result<i64, IngestError> {
    let count: i64 = match granularity {
        Some(g) => {
            sqlx::query_scalar("SELECT COUNT(*) FROM lines WHERE granularity = ?")
                .bind(g.as_str())
                .fetch_one(pool)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM lines")
                .fetch_one(pool)
                .await?
        }
    };

    Ok(count)
}
