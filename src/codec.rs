//! Fixed-width framing for the two record kinds that make up a segment file.
//!
//! ```text
//! IndexRecord: | keysize:u32 | key:bytes | offset:u64 |
//! DataRecord:  | keysize:u32 | valuesize:u32 | key:bytes | value:bytes |
//! ```
//!
//! Both kinds share one encoding discipline: sizes are big-endian `u32`,
//! offsets are big-endian `u64`, and `key`/`value` are the exact UTF-8 bytes
//! of the corresponding string with no padding or terminator.

use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::{Result, StoreError};

/// Byte width of a size field (`keysize`, `valuesize`, `index_count`, `data_count`).
pub const SIZE_LEN: u64 = 4;
/// Byte width of an offset field.
pub const OFFSET_LEN: u64 = 8;

/// Every Kth entry of a flushed segment becomes a sparse-index sample.
pub const SAMPLE_FACTOR: usize = 10;

fn read_exact_or_malformed<R: Read>(r: &mut R, buf: &mut [u8], path: &Path) -> Result<()> {
    match r.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(StoreError::malformed(
            path.display().to_string(),
            "size field requires reading past end of file",
        )),
        Err(e) => Err(StoreError::Io(e)),
    }
}

fn read_u32<R: Read>(r: &mut R, path: &Path) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact_or_malformed(r, &mut buf, path)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R, path: &Path) -> Result<u64> {
    let mut buf = [0u8; 8];
    read_exact_or_malformed(r, &mut buf, path)?;
    Ok(u64::from_be_bytes(buf))
}

fn read_utf8<R: Read>(r: &mut R, len: usize, path: &Path) -> Result<String> {
    let mut buf = vec![0u8; len];
    read_exact_or_malformed(r, &mut buf, path)?;
    String::from_utf8(buf).map_err(|e| {
        StoreError::malformed(path.display().to_string(), format!("key/value not valid utf-8: {e}"))
    })
}

/// Reads the `index_count` / `data_count` header that precedes each
/// record section.
pub fn read_count<R: Read>(r: &mut R, path: &Path) -> Result<u32> {
    read_u32(r, path)
}

pub fn write_count<W: Write>(w: &mut W, count: u32) -> io::Result<()> {
    w.write_all(&count.to_be_bytes())
}

/// One entry of the sparse index: a sampled key and the absolute file
/// offset of its `DataRecord`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub key: String,
    pub offset: u64,
}

impl IndexRecord {
    /// Total encoded size in bytes: `keysize` + key + `offset`.
    pub fn encoded_len(&self) -> u64 {
        SIZE_LEN + self.key.len() as u64 + OFFSET_LEN
    }

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&(self.key.len() as u32).to_be_bytes())?;
        w.write_all(self.key.as_bytes())?;
        w.write_all(&self.offset.to_be_bytes())
    }

    pub fn read<R: Read>(r: &mut R, path: &Path) -> Result<IndexRecord> {
        let key_len = read_u32(r, path)? as usize;
        let key = read_utf8(r, key_len, path)?;
        let offset = read_u64(r, path)?;
        Ok(IndexRecord { key, offset })
    }
}

/// A stored key/value pair, framed with both its sizes up front so it can
/// be decoded without looking past its own bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRecord {
    pub key: String,
    pub value: String,
}

impl DataRecord {
    /// Total encoded size in bytes: `keysize` + `valuesize` + key + value.
    pub fn encoded_len(&self) -> u64 {
        SIZE_LEN + SIZE_LEN + self.key.len() as u64 + self.value.len() as u64
    }

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&(self.key.len() as u32).to_be_bytes())?;
        w.write_all(&(self.value.len() as u32).to_be_bytes())?;
        w.write_all(self.key.as_bytes())?;
        w.write_all(self.value.as_bytes())
    }

    pub fn read<R: Read>(r: &mut R, path: &Path) -> Result<DataRecord> {
        let key_len = read_u32(r, path)? as usize;
        let value_len = read_u32(r, path)? as usize;
        let key = read_utf8(r, key_len, path)?;
        let value = read_utf8(r, value_len, path)?;
        Ok(DataRecord { key, value })
    }
}
