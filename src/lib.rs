//! A persistent, ordered key-value store built on the log-structured
//! sorted-string-table (SSTable) pattern.
//!
//! Writes land in an in-memory sorted buffer ([`memtable::InMemorySegment`]).
//! Once the buffer reaches [`StoreConfig`]'s configured size limit it is
//! flushed to an immutable, sparse-indexed on-disk segment
//! ([`segment::OnDiskSegment`]). Reads consult the buffer, then segments
//! newest to oldest. [`Store::merge`] compacts every on-disk segment into
//! one, newest value wins.

pub mod codec;
pub mod compactor;
pub mod error;
pub mod memtable;
pub mod segment;
pub mod store;

pub use error::{Result, StoreError};
pub use store::{Store, StoreConfig, DEFAULT_SEGMENT_SIZE_LIMIT};
