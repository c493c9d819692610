use crate::config::WRITER_BUFFER_SIZE;
use crate::error::{RekeyError, Result};
use crate::models::Replacement;
use crate::stats::RunStats;
use rayon::prelude::*;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// Creates `dir`, removing any previous contents first when `clean` is set.
pub fn prepare_output_dir(dir: &Path, clean: bool) -> Result<()> {
    let create_err = |source| RekeyError::Create {
        path: dir.to_path_buf(),
        source,
    };
    if clean && dir.exists() {
        info!(path = %dir.display(), "Cleaning output directory");
        fs::remove_dir_all(dir).map_err(create_err)?;
    }
    fs::create_dir_all(dir).map_err(create_err)
}

/// Opens `path` for appending, creating it if needed. A file that already
/// holds data is refused.
fn open_empty_destination(path: &Path) -> Result<File> {
    if let Ok(meta) = fs::metadata(path) {
        if meta.len() > 0 {
            return Err(RekeyError::DestinationNotEmpty {
                path: path.to_path_buf(),
            });
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| RekeyError::Create {
            path: path.to_path_buf(),
            source,
        })?;
    info!(path = %path.display(), "Created output file");
    Ok(file)
}

struct Writers {
    ids: BufWriter<File>,
    events: BufWriter<File>,
}

/// Row-aligned writer for new identifiers and rewritten events.
pub struct ResultSink {
    writers: Mutex<Writers>,
    ids_path: PathBuf,
    events_path: PathBuf,
}

impl ResultSink {
    /// Creates both destinations; fails before anything is written if either
    /// already holds data.
    pub fn create(ids_path: impl Into<PathBuf>, events_path: impl Into<PathBuf>) -> Result<Self> {
        let ids_path = ids_path.into();
        let events_path = events_path.into();
        let ids = open_empty_destination(&ids_path)?;
        let events = open_empty_destination(&events_path)?;
        Ok(Self {
            writers: Mutex::new(Writers {
                ids: BufWriter::with_capacity(WRITER_BUFFER_SIZE, ids),
                events: BufWriter::with_capacity(WRITER_BUFFER_SIZE, events),
            }),
            ids_path,
            events_path,
        })
    }

    /// Appends one row to both destinations under a single lock.
    pub fn write(&self, replacement: &Replacement) -> Result<()> {
        let mut guard = self.writers.lock().unwrap_or_else(|e| e.into_inner());
        let w = &mut *guard;
        writeln!(w.ids, "{}", replacement.new_id).map_err(|source| RekeyError::Write {
            path: self.ids_path.clone(),
            source,
        })?;
        writeln!(w.events, "{}", replacement.record).map_err(|source| RekeyError::Write {
            path: self.events_path.clone(),
            source,
        })
    }

    /// Drains `results`, writing each row as soon as it is produced and
    /// calling `on_progress` with the running row count after every write.
    ///
    /// The first error stops the drain and is returned; rows already written
    /// stay on disk.
    pub fn write_all<I, F>(&self, results: I, stats: &RunStats, on_progress: F) -> Result<u64>
    where
        I: ParallelIterator<Item = Result<Replacement>>,
        F: Fn(u64) + Sync + Send,
    {
        results.try_for_each(|result| {
            let replacement = result?;
            self.write(&replacement)?;
            on_progress(stats.inc_written());
            Ok(())
        })?;
        Ok(stats.written())
    }

    /// Flushes both destinations.
    pub fn finish(self) -> Result<()> {
        let Writers {
            mut ids,
            mut events,
        } = self
            .writers
            .into_inner()
            .unwrap_or_else(|e| e.into_inner());
        ids.flush().map_err(|source| RekeyError::Write {
            path: self.ids_path,
            source,
        })?;
        events.flush().map_err(|source| RekeyError::Write {
            path: self.events_path,
            source,
        })
    }
}
