// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Byte-budgeted chunk cache.
//!
//! Decoded chunks are cached by their position in the time-sorted chunk
//! list. Entries are billed at the chunk's on-disk span (predictable,
//! available before decoding) rather than decoded size. Eviction is FIFO
//! over insertion order; since prefetch inserts chunks in timeline order,
//! the oldest entry is also the one the play head left behind longest ago.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::core::RosbagMessage;

/// Default cache budget: 50 MiB of on-disk chunk span.
pub const MAX_CACHE_BYTES: u64 = 50 * 1024 * 1024;

/// One cached chunk: its decoded messages and billed size.
struct CacheEntry {
    messages: Arc<Vec<RosbagMessage>>,
    size_bytes: u64,
}

/// Insertion-ordered chunk cache with a byte budget.
pub struct ChunkCache {
    entries: HashMap<usize, CacheEntry>,
    /// Chunk indices in insertion order; front is next to evict
    order: VecDeque<usize>,
    current_bytes: u64,
    max_bytes: u64,
}

impl ChunkCache {
    /// Create a cache with the default budget.
    pub fn new() -> Self {
        Self::with_budget(MAX_CACHE_BYTES)
    }

    /// Create a cache with an explicit byte budget.
    pub fn with_budget(max_bytes: u64) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            current_bytes: 0,
            max_bytes,
        }
    }

    /// Look up a cached chunk by index.
    pub fn get(&self, idx: usize) -> Option<Arc<Vec<RosbagMessage>>> {
        self.entries.get(&idx).map(|e| Arc::clone(&e.messages))
    }

    /// Check whether a chunk is cached.
    pub fn contains(&self, idx: usize) -> bool {
        self.entries.contains_key(&idx)
    }

    /// Insert a decoded chunk, then evict until back under budget.
    ///
    /// Re-inserting an index replaces the entry and refreshes its
    /// insertion-order position.
    pub fn insert(&mut self, idx: usize, messages: Arc<Vec<RosbagMessage>>, size_bytes: u64) {
        if let Some(old) = self.entries.remove(&idx) {
            self.current_bytes -= old.size_bytes;
            self.order.retain(|&i| i != idx);
        }
        self.entries.insert(
            idx,
            CacheEntry {
                messages,
                size_bytes,
            },
        );
        self.order.push_back(idx);
        self.current_bytes += size_bytes;
        self.evict_to_budget();
    }

    /// Drop oldest entries while over budget.
    fn evict_to_budget(&mut self) {
        while self.current_bytes > self.max_bytes {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&oldest) {
                self.current_bytes -= entry.size_bytes;
            }
        }
    }

    /// Total billed bytes currently held.
    pub fn current_bytes(&self) -> u64 {
        self.current_bytes
    }

    /// Number of cached chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.current_bytes = 0;
    }
}

impl Default for ChunkCache {
    fn default() -> Self {
        Self::new()
    }
}
