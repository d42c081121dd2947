//! Immutable, sorted, sparse-indexed on-disk segment files.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::codec::{read_count, DataRecord, IndexRecord, SIZE_LEN};
use crate::error::Result;

/// An immutable, sorted, sparse-indexed segment file on disk.
///
/// Holds only the sparse index and a few offsets in memory; every lookup
/// and every iteration opens its own read handle, so a segment can be
/// read from concurrently by multiple callers.
#[derive(Debug)]
pub struct OnDiskSegment {
    path: PathBuf,
    file_size: u64,
    sparse_index: BTreeMap<String, u64>,
    /// Position of the `data_count` header: `4 + Σ(4 + keylen + 8)` over
    /// sampled keys. `data_section_offset + SIZE_LEN` is where the first
    /// `DataRecord` begins.
    data_section_offset: u64,
}

impl OnDiskSegment {
    /// Opens an existing segment file, reading its header and sparse
    /// index into memory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let file_size = file.metadata()?.len();

        let mut reader = BufReader::new(file);
        let index_count = read_count(&mut reader, &path)?;
        let mut sparse_index = BTreeMap::new();
        for _ in 0..index_count {
            let record = IndexRecord::read(&mut reader, &path)?;
            sparse_index.insert(record.key, record.offset);
        }
        let data_section_offset = reader.stream_position()?;

        debug!(
            path = %path.display(),
            file_size,
            samples = sparse_index.len(),
            "opened on-disk segment"
        );

        Ok(OnDiskSegment {
            path,
            file_size,
            sparse_index,
            data_section_offset,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Exact point lookup. Bracket the key between the nearest sampled
    /// keys and linearly scan the data records in that window.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(&offset) = self.sparse_index.get(key) {
            let mut reader = self.reader_at(offset)?;
            let record = DataRecord::read(&mut reader, &self.path)?;
            return Ok(Some(record.value));
        }

        let floor = self
            .sparse_index
            .range::<str, _>(..=key)
            .next_back()
            .map(|(_, &offset)| offset);
        let ceiling = self
            .sparse_index
            .range::<str, _>(key..)
            .next()
            .map(|(_, &offset)| offset);

        if floor.is_none() && ceiling.is_none() {
            return Ok(None);
        }

        let from = floor.unwrap_or(self.data_section_offset + SIZE_LEN);
        let to = ceiling.unwrap_or(self.file_size);

        let mut reader = self.reader_at(from)?;
        let mut pos = from;
        while pos <= to && pos < self.file_size {
            let record = DataRecord::read(&mut reader, &self.path)?;
            pos += record.encoded_len();
            if record.key == key {
                return Ok(Some(record.value));
            }
            if record.key.as_str() > key {
                return Ok(None);
            }
        }
        Ok(None)
    }

    /// A lazy, ascending-key iterator over every `(key, value)` pair in
    /// the data section, positioned with its own read handle.
    pub fn iterate(&self) -> Result<SegmentIterator> {
        let mut reader = self.reader_at(self.data_section_offset)?;
        let _data_count = read_count(&mut reader, &self.path)?;
        let pos = reader.stream_position()?;
        Ok(SegmentIterator {
            reader,
            path: self.path.clone(),
            pos,
            file_size: self.file_size,
        })
    }

    fn reader_at(&self, offset: u64) -> Result<BufReader<File>> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(offset))?;
        Ok(reader)
    }
}

/// Forward iterator over a segment's data section, in file (ascending
/// key) order. Owns an independent read handle, released on drop.
pub struct SegmentIterator {
    reader: BufReader<File>,
    path: PathBuf,
    pos: u64,
    file_size: u64,
}

impl SegmentIterator {
    pub fn has_next(&self) -> bool {
        self.pos < self.file_size
    }
}

impl Iterator for SegmentIterator {
    type Item = Result<(String, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_next() {
            return None;
        }
        match DataRecord::read(&mut self.reader, &self.path) {
            Ok(record) => {
                self.pos += record.encoded_len();
                Some(Ok((record.key, record.value)))
            }
            Err(e) => {
                // Force has_next() to false so a caller iterating after
                // an error doesn't loop on a handle stuck mid-record.
                self.pos = self.file_size;
                Some(Err(e))
            }
        }
    }
}
