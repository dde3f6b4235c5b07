//! staging.rs
//!
//! File-backed queue of pending record batches. Each chunk is one
//! newline-delimited JSON file named `chunk<N>.ndjson`, one record per line,
//! numbered from 1 in creation order.
//!
//! The store assumes it is the only process touching its directory.

use crate::errors::IngestError;
use crate::record::Record;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CHUNK_PREFIX: &str = "chunk";
const CHUNK_EXT: &str = "ndjson";
const TMP_SUFFIX: &str = ".tmp";

/// Handle on a staging directory.
#[derive(Debug)]
pub struct ChunkStore {
    dir: PathBuf,
    next_index: u64,
}

impl ChunkStore {
    /// True if a staging directory is already present at `dir`.
    pub fn exists(dir: &Path) -> bool {
        dir.is_dir()
    }

    /// Create a fresh, empty staging area. Fails with `StagingExists` when
    /// one is already there, so a previous partial run is never clobbered.
    pub fn create(dir: &Path) -> Result<Self, IngestError> {
        match fs::create_dir(dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(IngestError::StagingExists(dir.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        }
        debug!(dir = %dir.display(), "Created staging area");

        Ok(ChunkStore {
            dir: dir.to_path_buf(),
            next_index: 1,
        })
    }

    /// Reopen an existing staging area left by an earlier run. Half-written
    /// temporary files are discarded.
    pub fn open(dir: &Path) -> Result<Self, IngestError> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_tmp = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(TMP_SUFFIX));
            if is_tmp {
                warn!(file = %path.display(), "Discarding incomplete chunk file");
                fs::remove_file(&path)?;
            }
        }

        let mut store = ChunkStore {
            dir: dir.to_path_buf(),
            next_index: 1,
        };
        store.next_index = store.list_chunks()?.last().map_or(1, |last| last + 1);
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn chunk_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{CHUNK_PREFIX}{index}.{CHUNK_EXT}"))
    }

    /// Durably write `records` as the next chunk and return its index.
    ///
    /// The chunk is written under a temporary name, synced, then renamed,
    /// so a valid chunk name never refers to a partial file.
    pub fn write_chunk(&mut self, records: &[Record]) -> Result<u64, IngestError> {
        let index = self.next_index;
        let path = self.chunk_path(index);
        let tmp = path.with_extension(format!("{CHUNK_EXT}{TMP_SUFFIX}"));

        let file = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
        let mut writer = BufWriter::new(file);
        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        fs::rename(&tmp, &path)?;

        self.next_index += 1;
        debug!(chunk = index, records = records.len(), "Wrote chunk");
        Ok(index)
    }

    /// Indices of all pending chunks, ascending.
    pub fn list_chunks(&self) -> Result<Vec<u64>, IngestError> {
        let mut indices = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(index) = name.to_str().and_then(parse_chunk_name) {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }

    /// Records of chunk `index`, in the order they were written.
    pub fn read_chunk(&self, index: u64) -> Result<Vec<Record>, IngestError> {
        let reader = BufReader::new(File::open(self.chunk_path(index))?);
        let mut records = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|source| IngestError::Decode {
                chunk: index,
                line: idx + 1,
                source,
            })?;
            records.push(record);
        }

        Ok(records)
    }

    /// Remove chunk `index`. Only call once its records are committed.
    pub fn delete_chunk(&self, index: u64) -> Result<(), IngestError> {
        fs::remove_file(self.chunk_path(index))?;
        debug!(chunk = index, "Deleted chunk");
        Ok(())
    }

    /// Remove the staging directory. Refuses while chunks remain.
    pub fn remove(self) -> Result<(), IngestError> {
        let pending = self.list_chunks()?.len();
        if pending > 0 {
            return Err(IngestError::StagingNotEmpty(self.dir, pending));
        }
        fs::remove_dir(&self.dir)?;
        debug!(dir = %self.dir.display(), "Removed staging area");
        Ok(())
    }
}

fn parse_chunk_name(name: &str) -> Option<u64> {
    name.strip_prefix(CHUNK_PREFIX)?
        .strip_suffix(CHUNK_EXT)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Granularity, Run};
    use tempfile::TempDir;

    fn record(frequency: f64, coherence: f64) -> Record {
        Record {
            granularity: Granularity::Monthly,
            run: Run::Er14,
            observatory: "H1".into(),
            timestamp: 1_552_608_000,
            channel: "H1_PEM-EY_MAG_EBAY_SEIRACK_X_DQ".into(),
            frequency,
            coherence,
        }
    }

    fn staging() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("temp");
        (tmp, dir)
    }

    #[test]
    fn create_refuses_existing_area() {
        let (_tmp, dir) = staging();
        ChunkStore::create(&dir).unwrap();
        let err = ChunkStore::create(&dir).unwrap_err();
        assert!(matches!(err, IngestError::StagingExists(p) if p == dir));
    }

    #[test]
    fn chunks_round_trip_exactly() {
        let (_tmp, dir) = staging();
        let mut store = ChunkStore::create(&dir).unwrap();
        let records = vec![
            record(1500.0, 0.75),
            record(12.345679, 0.1 + 0.2),
            record(0.000001, 0.999999),
        ];

        let index = store.write_chunk(&records).unwrap();
        assert_eq!(index, 1);
        assert_eq!(store.read_chunk(1).unwrap(), records);
    }

    #[test]
    fn chunks_are_listed_numerically() {
        let (_tmp, dir) = staging();
        let mut store = ChunkStore::create(&dir).unwrap();
        for i in 0..11 {
            store.write_chunk(&[record(i as f64, 0.5)]).unwrap();
        }
        // a stray file is ignored
        fs::write(dir.join("notes.txt"), "hi").unwrap();

        let listed = store.list_chunks().unwrap();
        assert_eq!(listed, (1..=11).collect::<Vec<_>>());
    }

    #[test]
    fn reopen_continues_numbering_and_drops_temp_files() {
        let (_tmp, dir) = staging();
        let mut store = ChunkStore::create(&dir).unwrap();
        store.write_chunk(&[record(1.0, 0.5)]).unwrap();
        store.write_chunk(&[record(2.0, 0.5)]).unwrap();
        fs::write(dir.join("chunk3.ndjson.tmp"), "{\"partial").unwrap();

        let mut reopened = ChunkStore::open(&dir).unwrap();
        assert!(!dir.join("chunk3.ndjson.tmp").exists());
        assert_eq!(reopened.write_chunk(&[record(3.0, 0.5)]).unwrap(), 3);
    }

    #[test]
    fn remove_requires_drained_area() {
        let (_tmp, dir) = staging();
        let mut store = ChunkStore::create(&dir).unwrap();
        store.write_chunk(&[record(1.0, 0.5)]).unwrap();

        let err = ChunkStore::open(&dir).unwrap().remove().unwrap_err();
        assert!(matches!(err, IngestError::StagingNotEmpty(_, 1)));

        store.delete_chunk(1).unwrap();
        store.remove().unwrap();
        assert!(!ChunkStore::exists(&dir));
    }

    #[test]
    fn corrupt_chunk_reports_location() {
        let (_tmp, dir) = staging();
        let mut store = ChunkStore::create(&dir).unwrap();
        store.write_chunk(&[record(1.0, 0.5)]).unwrap();
        fs::write(dir.join("chunk2.ndjson"), "{\"granularity\":\"weekly\"}\n").unwrap();

        let err = store.read_chunk(2).unwrap_err();
        assert!(matches!(err, IngestError::Decode { chunk: 2, line: 1, .. }));
    }
}
