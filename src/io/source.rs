// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Random-access byte sources.
//!
//! The playback pipeline never streams a bag front to back; it reads the
//! header region, the trailing index, and individual chunk byte ranges on
//! demand. [`RandomAccessSource`] is that contract. [`MmapSource`] is the
//! file-backed implementation; [`MemorySource`] serves in-memory bags.

use std::fs::File;
use std::path::Path;

use crate::core::{BagError, Result};

/// A byte source supporting length queries and positioned reads.
///
/// Implementations must be cheap to read from concurrently; chunk prefetch
/// issues overlapping reads from worker threads.
pub trait RandomAccessSource: Send + Sync {
    /// Total length of the source in bytes.
    fn len(&self) -> u64;

    /// Read `length` bytes starting at `offset`.
    ///
    /// A range reaching past the end of the source is an error, not a short
    /// read.
    fn read_at(&self, offset: u64, length: u64) -> Result<Vec<u8>>;

    /// Check whether the source is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Memory-mapped file source.
pub struct MmapSource {
    /// Path the file was opened from
    path: String,
    /// Memory-mapped file contents
    mmap: memmap2::Mmap,
}

impl MmapSource {
    /// Open a file and memory-map it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let file = File::open(path.as_ref())
            .map_err(|e| BagError::io_failure(format!("open {path_str}"), e))?;

        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .map_err(|e| BagError::io_failure(format!("mmap {path_str}"), e))?;

        Ok(Self {
            path: path_str,
            mmap,
        })
    }

    /// Get the file path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl RandomAccessSource for MmapSource {
    fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn read_at(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        range_of(&self.mmap, offset, length).map(|s| s.to_vec())
    }
}

/// In-memory byte source.
pub struct MemorySource {
    bytes: Vec<u8>,
}

impl MemorySource {
    /// Wrap a byte buffer as a source.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl RandomAccessSource for MemorySource {
    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_at(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        range_of(&self.bytes, offset, length).map(|s| s.to_vec())
    }
}

/// Bounds-checked slice of a backing buffer.
fn range_of(buf: &[u8], offset: u64, length: u64) -> Result<&[u8]> {
    let end = offset
        .checked_add(length)
        .ok_or_else(|| BagError::io_failure("read_at", "range overflows u64"))?;
    if end > buf.len() as u64 {
        return Err(BagError::io_failure(
            "read_at",
            format!(
                "range [{offset}, {end}) beyond end of source ({} bytes)",
                buf.len()
            ),
        ));
    }
    Ok(&buf[offset as usize..end as usize])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_source_reads() {
        let src = MemorySource::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(src.len(), 5);
        assert_eq!(src.read_at(1, 3).unwrap(), vec![2, 3, 4]);
        assert_eq!(src.read_at(0, 0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_memory_source_rejects_out_of_range() {
        let src = MemorySource::new(vec![0; 8]);
        assert!(src.read_at(4, 8).is_err());
        assert!(src.read_at(9, 1).is_err());
        assert!(src.read_at(u64::MAX, 2).is_err());
    }

    #[test]
    fn test_mmap_source_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"#ROSBAG V2.0\nhello").unwrap();
        file.flush().unwrap();

        let src = MmapSource::open(file.path()).unwrap();
        assert_eq!(src.len(), 18);
        assert_eq!(src.read_at(13, 5).unwrap(), b"hello".to_vec());
        assert!(src.read_at(13, 6).is_err());
    }
}
