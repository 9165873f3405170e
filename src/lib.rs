// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Bagplay
//!
//! Timeline-oriented playback for ROS bag v2.0 files.
//!
//! The library reads a bag's trailing index once, then decodes chunks on
//! demand while a virtual clock drives message emission:
//! - **[`BagPlayer`]** - load a file, then play/pause/seek with prefetch,
//!   loop-at-end and variable speed
//! - **[`BagMetadata`]** - connections and the time-sorted chunk index
//! - **[`SchemaDecoder`]** - message-definition text compiled into cached
//!   schemas, payloads decoded into [`MessageValue`] trees
//!
//! ## Example: Inspecting a file
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bagplay::{read_metadata, MmapSource};
//!
//! let source = MmapSource::open("drive.bag")?;
//! let metadata = read_metadata(&source)?;
//! println!("topics: {:?}", metadata.topics());
//! println!("chunks: {}", metadata.chunks_info.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: Playback
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bagplay::BagPlayer;
//!
//! let player = BagPlayer::new()?;
//! let messages = player.messages_stream();
//! player.load_path("drive.bag")?;
//! player.play();
//! for batch in messages.iter() {
//!     for message in batch {
//!         println!("{} @ {}", message.topic, message.time);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use core::{BagError, BagTime, DecodedMessage, MessageValue, Result, RosbagMessage};

// Container parsing
pub mod format;

pub use format::{read_metadata, BagMetadata, ChunkInfo, Connection};

// Schema compilation and message decoding
pub mod schema;

pub use schema::{MsgField, MsgSchema, SchemaDecoder};

// Byte sources
pub mod io;

pub use io::{MemorySource, MmapSource, RandomAccessSource};

// Playback orchestration
pub mod playback;

pub use playback::{
    BagPlayer, ChunkReader, PlaybackOptions, PlaybackOptionsUpdate, PlayerSnapshot,
};
