//! The orchestrator: holds the active buffer and the ordered list of
//! on-disk segments, and performs segment rollover, directory scan, and
//! compaction.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::compactor;
use crate::error::Result;
use crate::memtable::InMemorySegment;
use crate::segment::OnDiskSegment;

/// Default buffer entry count at which a flush triggers.
pub const DEFAULT_SEGMENT_SIZE_LIMIT: usize = 1024;

/// Configuration for opening a [`Store`].
///
/// Exposes the two recognized options explicitly, rather than as
/// positional constructor parameters, so call sites read as
/// `StoreConfig::new(path).with_segment_size_limit(n)` instead of a bare
/// `Store::open(path, n)` whose second argument is meaningless without
/// looking it up.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    data_path: PathBuf,
    segment_size_limit: usize,
}

impl StoreConfig {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            data_path: data_path.into(),
            segment_size_limit: DEFAULT_SEGMENT_SIZE_LIMIT,
        }
    }

    pub fn with_segment_size_limit(mut self, segment_size_limit: usize) -> Self {
        self.segment_size_limit = segment_size_limit;
        self
    }
}

struct StoreState {
    buffer: InMemorySegment,
    /// Oldest-first; the last element is the newest segment.
    segments: Vec<Arc<OnDiskSegment>>,
}

/// A persistent, ordered key-value store backed by an append-only
/// sequence of immutable SSTable-style segment files.
///
/// `put`, `get`, and `merge` are mutually exclusive on a given `Store`:
/// all mutable state lives behind a single [`parking_lot::Mutex`], held
/// across the blocking disk I/O each operation performs, per the
/// single-writer discipline this store is built around.
pub struct Store {
    data_path: PathBuf,
    segment_size_limit: usize,
    state: Mutex<StoreState>,
}

impl Store {
    /// Opens (creating if necessary) a store at `data_path` with the
    /// default segment size limit.
    pub fn open(data_path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_config(StoreConfig::new(data_path))
    }

    /// Opens (creating if necessary) a store with an explicit
    /// [`StoreConfig`].
    pub fn open_with_config(config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_path)?;

        let mut numbered = scan_segment_files(&config.data_path)?;
        numbered.sort_by_key(|(n, _)| *n);
        let segments = numbered
            .into_iter()
            .map(|(_, segment)| Arc::new(segment))
            .collect();

        info!(
            path = %config.data_path.display(),
            segment_size_limit = config.segment_size_limit,
            "opened store"
        );

        Ok(Store {
            data_path: config.data_path,
            segment_size_limit: config.segment_size_limit,
            state: Mutex::new(StoreState {
                buffer: InMemorySegment::new(),
                segments,
            }),
        })
    }

    /// Inserts or overwrites `key`, flushing the buffer to a new segment
    /// if this put brings its size to the configured limit.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let mut state = self.state.lock();
        state.buffer.put(key.into(), value.into());
        if state.buffer.size() >= self.segment_size_limit {
            self.flush_locked(&mut state)?;
        }
        Ok(())
    }

    fn flush_locked(&self, state: &mut StoreState) -> Result<()> {
        let next = state.segments.len() + 1;
        let path = self.data_path.join(format!("seg-{next}.sst"));
        let segment = state.buffer.flush(&path)?;
        state.segments.push(Arc::new(segment));
        state.buffer = InMemorySegment::new();
        Ok(())
    }

    /// Looks up `key`: the buffer first, then segments newest to oldest.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let state = self.state.lock();
        if let Some(value) = state.buffer.get(key) {
            return Ok(Some(value.clone()));
        }
        for segment in state.segments.iter().rev() {
            if let Some(value) = segment.get(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Collapses every on-disk segment into one, resolving duplicate
    /// keys newest-wins, and atomically swaps it in.
    ///
    /// The store lock is held for the whole operation, so a concurrent
    /// `put`/`get` on another thread blocks until the merge completes.
    /// The in-memory buffer is untouched: it still holds whatever was
    /// written since the last flush and is not folded into the merge.
    pub fn merge(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.segments.len() <= 1 {
            return Ok(());
        }

        let newest_first: Vec<Arc<OnDiskSegment>> = state.segments.iter().rev().cloned().collect();
        let merged_buffer = compactor::merge(&newest_first)?;

        let tmp_path = self.data_path.join("tmp.sst");
        // `flush` already fsyncs tmp_path; deleting the originals before
        // the rename below is not crash-safe (a crash in between loses
        // data) but matches the compaction algorithm as specified. The
        // `OnDiskSegment` this returns points at `tmp_path`, which is
        // about to be renamed away, so it's discarded in favor of
        // reopening from the final path below.
        let _ = merged_buffer.flush(&tmp_path)?;

        for segment in state.segments.iter() {
            fs::remove_file(segment.path())?;
        }

        let final_path = self.data_path.join("seg-1.sst");
        fs::rename(&tmp_path, &final_path)?;

        let reopened = OnDiskSegment::open(&final_path)?;
        info!(
            path = %final_path.display(),
            entries_before = newest_first.len(),
            "merged segments"
        );
        state.segments.clear();
        state.segments.push(Arc::new(reopened));
        Ok(())
    }

    /// A stable, point-in-time snapshot of the current on-disk segment
    /// list, oldest to newest. The store lock is held only long enough
    /// to clone the list of `Arc`s, not while the caller inspects it.
    pub fn list_on_disk_segments(&self) -> Vec<Arc<OnDiskSegment>> {
        self.state.lock().segments.clone()
    }
}

fn scan_segment_files(data_path: &Path) -> Result<Vec<(u64, OnDiskSegment)>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(data_path)? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(number) = parse_segment_number(name) else {
            continue;
        };
        match OnDiskSegment::open(&path) {
            Ok(segment) => found.push((number, segment)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "rejecting malformed segment on open");
                return Err(e);
            }
        }
    }
    Ok(found)
}

fn parse_segment_number(name: &str) -> Option<u64> {
    name.strip_prefix("seg-")?.strip_suffix(".sst")?.parse().ok()
}
