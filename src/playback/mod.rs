// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Playback layer: chunk cache, chunk reader and the player itself.

pub mod cache;
pub mod chunk_reader;
pub mod options;
pub mod player;

pub use cache::{ChunkCache, MAX_CACHE_BYTES};
pub use chunk_reader::ChunkReader;
pub use options::{PlaybackOptions, PlaybackOptionsUpdate};
pub use player::{BagPlayer, PlayerSnapshot, PREFETCH_CONCURRENCY, TICK_INTERVAL, TICK_SECONDS};
