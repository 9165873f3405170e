// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Chunk fetch/decode pipeline with caching and cancellation.
//!
//! The reader owns the chunk cache and the schema intern table; both are
//! mutex-guarded and held only briefly, so prefetch workers can decode
//! chunks concurrently. Cancellation is checked before the byte-range
//! read and again before cache insertion; a cancelled read leaves no
//! trace in the cache and returns `None`.

use std::sync::{Arc, Mutex};

use crate::core::{BagError, Result, RosbagMessage};
use crate::format::chunk::{decode_chunk_messages, parse_chunk_record, parse_index_pointers};
use crate::format::compression::decompress;
use crate::format::inspector::{BagMetadata, ChunkInfo};
use crate::io::RandomAccessSource;
use crate::schema::SchemaDecoder;

use super::cache::ChunkCache;

/// Chunk reader: byte range -> decompress -> sort -> decode -> cache.
pub struct ChunkReader {
    cache: Mutex<ChunkCache>,
    decoder: SchemaDecoder,
}

impl ChunkReader {
    /// Create a reader with the default cache budget.
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(ChunkCache::new()),
            decoder: SchemaDecoder::new(),
        }
    }

    /// Create a reader with an explicit cache budget.
    pub fn with_cache_budget(max_bytes: u64) -> Self {
        Self {
            cache: Mutex::new(ChunkCache::with_budget(max_bytes)),
            decoder: SchemaDecoder::new(),
        }
    }

    /// Look up a cached chunk without reading.
    pub fn cached(&self, idx: usize) -> Option<Arc<Vec<RosbagMessage>>> {
        self.lock_cache().ok()?.get(idx)
    }

    /// Check whether a chunk is cached.
    pub fn is_cached(&self, idx: usize) -> bool {
        self.lock_cache().map(|c| c.contains(idx)).unwrap_or(false)
    }

    /// Billed bytes currently cached.
    pub fn cached_bytes(&self) -> u64 {
        self.lock_cache().map(|c| c.current_bytes()).unwrap_or(0)
    }

    /// Drop the cache and every interned schema. Called on every file
    /// load so schemas never leak across bags.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.lock_cache() {
            cache.clear();
        }
        self.decoder.clear();
    }

    /// Read, decode and cache one chunk.
    ///
    /// Returns the cached message list, or `None` when `cancelled`
    /// reported true at a checkpoint; cancellation is not an error.
    /// Messages are sorted ascending by received time before decoding,
    /// so the cached list is time-ordered.
    pub fn read_chunk(
        &self,
        source: &dyn RandomAccessSource,
        info: &ChunkInfo,
        metadata: &BagMetadata,
        cancelled: &dyn Fn() -> bool,
    ) -> Result<Option<Arc<Vec<RosbagMessage>>>> {
        if let Some(messages) = self.cached(info.idx) {
            return Ok(Some(messages));
        }
        if cancelled() {
            return Ok(None);
        }

        let span = source.read_at(info.chunk_position, info.span_bytes())?;
        if cancelled() {
            return Ok(None);
        }

        let chunk = parse_chunk_record(&span, info.chunk_position)?;
        let decompressed = decompress(
            &chunk.compression,
            chunk.record.data,
            chunk.uncompressed_size as usize,
        )?;

        let index_start = chunk.record.record_offset + chunk.record.record_length;
        let mut pointers =
            parse_index_pointers(&span, info.chunk_position, index_start, info.count as usize)?;
        pointers.sort_by(|a, b| a.received_time.cmp(&b.received_time));

        let messages = Arc::new(decode_chunk_messages(
            decompressed.as_ref(),
            &pointers,
            &metadata.connections,
            &self.decoder,
        ));

        if cancelled() {
            return Ok(None);
        }

        let mut cache = self.lock_cache()?;
        cache.insert(info.idx, Arc::clone(&messages), info.span_bytes());
        Ok(Some(messages))
    }

    fn lock_cache(&self) -> Result<std::sync::MutexGuard<'_, ChunkCache>> {
        self.cache
            .lock()
            .map_err(|e| BagError::io_failure("chunk cache", format!("lock poisoned: {e}")))
    }
}

impl Default for ChunkReader {
    fn default() -> Self {
        Self::new()
    }
}
