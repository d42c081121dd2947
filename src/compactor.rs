//! Compaction: collapsing every on-disk segment into one, newest-wins.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::memtable::InMemorySegment;
use crate::segment::OnDiskSegment;

/// Merges `segments_newest_first` into a single in-memory buffer,
/// resolving duplicate keys newest-wins.
///
/// Callers are responsible for ordering `segments_newest_first` from the
/// most recently flushed segment to the oldest; this function does not
/// look at file names or any other recency signal.
pub fn merge(segments_newest_first: &[Arc<OnDiskSegment>]) -> Result<InMemorySegment> {
    let mut seen = HashSet::new();
    let mut buffer = InMemorySegment::new();

    for segment in segments_newest_first {
        let mut kept = 0usize;
        for pair in segment.iterate()? {
            let (key, value) = pair?;
            if seen.insert(key.clone()) {
                buffer.put(key, value);
                kept += 1;
            }
        }
        debug!(
            path = %segment.path().display(),
            kept,
            "folded segment into merge buffer"
        );
    }

    Ok(buffer)
}
