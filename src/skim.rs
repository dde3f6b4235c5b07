//! skim.rs
//!
//! First phase: walk the source tree, parse every scan file and stage the
//! significant records as chunks.

use crate::classifier::classify_path;
use crate::config::Settings;
use crate::errors::IngestError;
use crate::metrics::{CHUNKS_WRITTEN, FILES_SCANNED, RECORDS_STAGED};
use crate::parser::parse_file;
use crate::record::Record;
use crate::staging::ChunkStore;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Totals for one skim.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SkimReport {
    pub files: usize,
    pub records: usize,
    pub chunks: usize,
}

/// In-memory buffer in front of a [`ChunkStore`]. Flushes a chunk as soon
/// as it holds more than `chunk_size` records.
pub struct ChunkBuffer<'a> {
    store: &'a mut ChunkStore,
    chunk_size: usize,
    pending: Vec<Record>,
    report: SkimReport,
}

impl<'a> ChunkBuffer<'a> {
    pub fn new(store: &'a mut ChunkStore, chunk_size: usize) -> Self {
        ChunkBuffer {
            store,
            chunk_size,
            pending: Vec::with_capacity(chunk_size + 1),
            report: SkimReport::default(),
        }
    }

    pub fn push(&mut self, record: Record) -> Result<(), IngestError> {
        self.pending.push(record);
        if self.pending.len() > self.chunk_size {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), IngestError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let index = self.store.write_chunk(&self.pending)?;
        debug!(
            chunk = index,
            records = self.pending.len(),
            "Moved buffered lines into a chunk"
        );

        self.report.records += self.pending.len();
        self.report.chunks += 1;
        RECORDS_STAGED.inc_by(self.pending.len() as u64);
        CHUNKS_WRITTEN.inc();
        self.pending.clear();
        Ok(())
    }

    /// Flush any remainder and return the totals.
    pub fn finish(mut self) -> Result<SkimReport, IngestError> {
        self.flush()?;
        Ok(self.report)
    }
}

/// All files under `root` with the given extension, sorted by path.
pub fn find_source_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>, IngestError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        let matches = entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == extension);
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Parse `files` in order and feed their significant records into `buffer`.
pub fn scan_files(
    files: &[PathBuf],
    threshold: f64,
    buffer: &mut ChunkBuffer<'_>,
) -> Result<usize, IngestError> {
    for path in files {
        let meta = classify_path(path)?;
        debug!(
            file = %path.display(),
            channel = %meta.channel,
            run = %meta.run,
            "Reading scan file"
        );

        let records = parse_file(path, &meta, threshold)?;
        debug!(file = %path.display(), significant = records.len(), "Finished file");
        FILES_SCANNED.inc();

        for record in records {
            buffer.push(record)?;
        }
    }
    Ok(files.len())
}

/// Run the whole skim: find source files, create the staging area, parse
/// everything into chunks. Fails with `StagingExists` if a staging area is
/// already present.
pub fn skim(settings: &Settings) -> Result<(ChunkStore, SkimReport), IngestError> {
    let files = find_source_files(&settings.data_dir, &settings.file_extension)?;
    let mut store = ChunkStore::create(&settings.staging_dir)?;

    info!(
        files = files.len(),
        data_dir = %settings.data_dir.display(),
        "Beginning file reading"
    );

    let mut buffer = ChunkBuffer::new(&mut store, settings.chunk_size);
    let files_scanned = scan_files(&files, settings.threshold, &mut buffer)?;
    let report = SkimReport {
        files: files_scanned,
        ..buffer.finish()?
    };

    info!(
        files = report.files,
        records = report.records,
        chunks = report.chunks,
        "Skim complete"
    );
    Ok((store, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Granularity, Run};
    use std::fs;
    use tempfile::TempDir;

    fn record(n: usize) -> Record {
        Record {
            granularity: Granularity::Weekly,
            run: Run::O3b,
            observatory: "L1".into(),
            timestamp: 1_576_886_400,
            channel: "L1_CHAN".into(),
            frequency: n as f64,
            coherence: 0.5,
        }
    }

    fn chunk_sizes(store: &ChunkStore) -> Vec<usize> {
        store
            .list_chunks()
            .unwrap()
            .into_iter()
            .map(|i| store.read_chunk(i).unwrap().len())
            .collect()
    }

    #[test]
    fn flushes_once_size_is_exceeded() {
        let tmp = TempDir::new().unwrap();
        let mut store = ChunkStore::create(&tmp.path().join("temp")).unwrap();

        let mut buffer = ChunkBuffer::new(&mut store, 50);
        for n in 0..130 {
            buffer.push(record(n)).unwrap();
        }
        let report = buffer.finish().unwrap();

        assert_eq!(report.chunks, 3);
        assert_eq!(report.records, 130);
        assert_eq!(store.list_chunks().unwrap(), vec![1, 2, 3]);
        assert_eq!(chunk_sizes(&store), vec![51, 51, 28]);
    }

    #[test]
    fn exactly_chunk_size_is_not_flushed_early() {
        let tmp = TempDir::new().unwrap();
        let mut store = ChunkStore::create(&tmp.path().join("temp")).unwrap();

        let mut buffer = ChunkBuffer::new(&mut store, 50);
        for n in 0..50 {
            buffer.push(record(n)).unwrap();
        }
        assert!(buffer.store.list_chunks().unwrap().is_empty());

        let report = buffer.finish().unwrap();
        assert_eq!(report.chunks, 1);
        assert_eq!(chunk_sizes(&store), vec![50]);
    }

    #[test]
    fn empty_buffer_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut store = ChunkStore::create(&tmp.path().join("temp")).unwrap();
        let report = ChunkBuffer::new(&mut store, 50).finish().unwrap();
        assert_eq!(report, SkimReport::default());
        assert!(store.list_chunks().unwrap().is_empty());
    }

    #[test]
    fn finds_only_matching_files() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("weekly/L1/fscans_2019_06_01/CHAN");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("b.txt"), "").unwrap();
        fs::write(nested.join("a.txt"), "").unwrap();
        fs::write(nested.join("plot.png"), "").unwrap();

        let files = find_source_files(tmp.path(), "txt").unwrap();
        assert_eq!(files, vec![nested.join("a.txt"), nested.join("b.txt")]);
    }

    #[test]
    fn skim_refuses_existing_staging_area() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings {
            data_dir: tmp.path().join("data"),
            staging_dir: tmp.path().join("temp"),
            ..Settings::default()
        };
        fs::create_dir_all(&settings.data_dir).unwrap();
        fs::create_dir_all(&settings.staging_dir).unwrap();

        let err = skim(&settings).unwrap_err();
        assert!(matches!(err, IngestError::StagingExists(_)));
    }
}
