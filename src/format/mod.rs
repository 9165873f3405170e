// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS bag v2.0 container parsing.
//!
//! Everything here is pure over byte buffers:
//! - [`record`] - the universal length-prefixed record envelope
//! - [`compression`] - chunk decompression registry (`none`, `lz4`)
//! - [`inspector`] - file header + trailing index -> [`BagMetadata`]
//! - [`chunk`] - chunk records, embedded index pointers, message records

pub mod chunk;
pub mod compression;
pub mod inspector;
pub mod record;

pub use chunk::{decode_chunk_messages, parse_chunk_record, parse_index_pointers, ChunkPointer};
pub use compression::decompress;
pub use inspector::{read_metadata, BagMetadata, ChunkInfo, Connection, BAG_MAGIC, HEADER_PADDING};
pub use record::{extract_fields, retrieve_records, shallow_read, RecordFields, ShallowRecord};
