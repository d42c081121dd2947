//! The mutable, in-memory sorted buffer that absorbs writes before they
//! are flushed to an [`OnDiskSegment`](crate::segment::OnDiskSegment).

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::codec::{DataRecord, IndexRecord, SAMPLE_FACTOR, SIZE_LEN};
use crate::error::Result;
use crate::segment::OnDiskSegment;

/// An ordered, in-memory buffer of the latest value written for each key.
///
/// Duplicate `put`s overwrite; there is no tombstone for deletion, since
/// this store does not support removing keys.
#[derive(Debug, Default)]
pub struct InMemorySegment {
    data: BTreeMap<String, String>,
}

impl InMemorySegment {
    pub fn new() -> Self {
        InMemorySegment {
            data: BTreeMap::new(),
        }
    }

    /// Insert or overwrite the value for `key`. O(log n).
    pub fn put(&mut self, key: String, value: String) {
        self.data.insert(key, value);
    }

    /// Exact lookup; `None` means absent, not an error.
    pub fn get(&self, key: &str) -> Option<&String> {
        self.data.get(key)
    }

    /// Number of distinct keys currently held.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Writes this buffer out as a new on-disk segment at `path` and
    /// returns it opened.
    ///
    /// The sparse index is built in two passes: the first walks the
    /// sorted entries once to record, for every `SAMPLE_FACTOR`th entry,
    /// its key and the cumulative size of all `DataRecord`s written
    /// before it (a *data-local* offset, since the absolute position of
    /// the data section isn't known until the index section's size is).
    /// The second pass resolves those data-local offsets into absolute
    /// file offsets once the index section's total size is known, then
    /// writes the whole file in one pass: `index_count`, index records,
    /// `data_count`, data records.
    pub fn flush<P: AsRef<Path>>(&self, path: P) -> Result<OnDiskSegment> {
        let path = path.as_ref();

        let mut samples: Vec<(String, u64)> = Vec::new();
        let mut data_local_offset: u64 = 0;
        for (i, (key, value)) in self.data.iter().enumerate() {
            if i % SAMPLE_FACTOR == 0 {
                samples.push((key.clone(), data_local_offset));
            }
            data_local_offset += DataRecord {
                key: key.clone(),
                value: value.clone(),
            }
            .encoded_len();
        }

        let index_section_size: u64 = SIZE_LEN
            + samples
                .iter()
                .map(|(key, _)| SIZE_LEN + key.len() as u64 + crate::codec::OFFSET_LEN)
                .sum::<u64>();
        let first_data_record_offset = index_section_size + SIZE_LEN;

        let index_records: Vec<IndexRecord> = samples
            .into_iter()
            .map(|(key, local_offset)| IndexRecord {
                key,
                offset: first_data_record_offset + local_offset,
            })
            .collect();

        write_segment_file(path, &index_records, &self.data)?;

        debug!(
            path = %path.display(),
            entries = self.data.len(),
            samples = index_records.len(),
            "flushed memtable to segment"
        );

        OnDiskSegment::open(path)
    }
}

fn write_segment_file(
    path: &Path,
    index_records: &[IndexRecord],
    data: &BTreeMap<String, String>,
) -> Result<()> {
    use std::fs::File;
    use std::io::{BufWriter, Write};

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    crate::codec::write_count(&mut writer, index_records.len() as u32)?;
    for record in index_records {
        record.write(&mut writer)?;
    }

    crate::codec::write_count(&mut writer, data.len() as u32)?;
    for (key, value) in data.iter() {
        DataRecord {
            key: key.clone(),
            value: value.clone(),
        }
        .write(&mut writer)?;
    }

    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}
