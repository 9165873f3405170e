// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Bag inspector: file header validation and trailing index extraction.
//!
//! A v2.0 bag starts with a 13-byte magic, followed by the bag header
//! record padded out to 4096 bytes. The header names the absolute offset
//! of the index region at the file tail, which holds every connection
//! record followed by one chunk-info record per chunk. The inspector reads
//! those two regions only; chunk payloads are fetched lazily during
//! playback.

use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::core::{BagError, BagTime, Result};
use crate::io::RandomAccessSource;

use super::record::{
    extract_fields, field_str, field_str_or_empty, field_time, field_u32, field_u64, field_i32,
    retrieve_records,
};

/// The 13-byte v2.0 magic at offset 0.
pub const BAG_MAGIC: &[u8] = b"#ROSBAG V2.0\n";

/// Offset of the bag header record (directly after the magic).
pub const MAGIC_LEN: usize = 13;

/// The file header region is padded to this many bytes.
pub const HEADER_PADDING: u64 = 4096;

/// A logical stream: one topic, one message type, one schema text.
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    /// Connection id, referenced by chunk index entries and message records
    pub conn: u32,
    /// Topic name
    pub topic: String,
    /// Message type (e.g. `std_msgs/Header`)
    pub message_type: String,
    /// md5sum of the definition text (carried, never validated)
    pub md5sum: String,
    /// Full message-definition text, compiled lazily into a schema
    pub message_definition: String,
}

/// Index metadata for one chunk, normalized after time-sorting.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkInfo {
    /// Chunk-info record version
    pub version: u32,
    /// Absolute file offset of the chunk record
    pub chunk_position: u64,
    /// Earliest message time in the chunk
    pub start_time: BagTime,
    /// Latest message time in the chunk
    pub end_time: BagTime,
    /// Number of `(conn, count)` entries, and of index-data records
    /// trailing the chunk record
    pub count: u32,
    /// Per-connection message counts
    pub per_conn_counts: Vec<(u32, u32)>,
    /// Position in the time-sorted chunk list
    pub idx: usize,
    /// `chunk_position` of the next chunk in sort order, or the file
    /// length for the last chunk
    pub next_chunk_position: u64,
}

impl ChunkInfo {
    /// Total number of messages in the chunk.
    pub fn message_count(&self) -> u64 {
        self.per_conn_counts
            .iter()
            .map(|&(_, count)| count as u64)
            .sum()
    }

    /// On-disk span of the chunk record plus its index-data records.
    ///
    /// This is also the cache billing unit for the chunk.
    pub fn span_bytes(&self) -> u64 {
        self.next_chunk_position - self.chunk_position
    }
}

/// Everything playback needs to know about a loaded bag.
#[derive(Debug, Clone, Serialize)]
pub struct BagMetadata {
    /// Connections by id
    pub connections: HashMap<u32, Connection>,
    /// Chunk metadata sorted by `start_time`, `idx` assigned in order
    pub chunks_info: Vec<ChunkInfo>,
    /// `start_time` of the earliest chunk
    pub start_time: BagTime,
    /// `end_time` of the last chunk in sort order
    pub end_time: BagTime,
}

impl BagMetadata {
    /// Timeline length in seconds.
    pub fn duration_seconds(&self) -> f64 {
        (self.end_time.as_secs_f64() - self.start_time.as_secs_f64()).max(0.0)
    }

    /// Total message count across all chunks.
    pub fn message_count(&self) -> u64 {
        self.chunks_info.iter().map(|c| c.message_count()).sum()
    }

    /// Message count per connection id, summed over all chunks.
    pub fn connection_message_counts(&self) -> HashMap<u32, u64> {
        let mut counts: HashMap<u32, u64> = HashMap::new();
        for chunk in &self.chunks_info {
            for &(conn, count) in &chunk.per_conn_counts {
                *counts.entry(conn).or_default() += count as u64;
            }
        }
        counts
    }

    /// Topic names, sorted and deduplicated.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self
            .connections
            .values()
            .map(|c| c.topic.as_str())
            .collect();
        topics.sort_unstable();
        topics.dedup();
        topics
    }
}

/// Read and validate the file header, then parse the trailing index region
/// into [`BagMetadata`].
///
/// A structurally valid bag with zero chunks is rejected with
/// [`BagError::EmptyBag`]; every other consumer can then rely on
/// `chunks_info` being non-empty.
pub fn read_metadata(source: &dyn RandomAccessSource) -> Result<BagMetadata> {
    let file_length = source.len();
    let head_len = file_length.min(HEADER_PADDING);
    let head = source.read_at(0, head_len)?;

    if head.len() < MAGIC_LEN || &head[..MAGIC_LEN] != BAG_MAGIC {
        let found = String::from_utf8_lossy(&head[..head.len().min(MAGIC_LEN)]).to_string();
        return Err(BagError::invalid_magic(found));
    }
    if head.len() < MAGIC_LEN + 8 {
        return Err(BagError::truncated_header(MAGIC_LEN + 8, head.len()));
    }

    let header_length = LittleEndian::read_u32(&head[MAGIC_LEN..MAGIC_LEN + 4]) as usize;
    if MAGIC_LEN + 8 + header_length > head.len() {
        return Err(BagError::header_too_large(header_length, head.len()));
    }

    let header_fields = extract_fields(&head[MAGIC_LEN + 4..MAGIC_LEN + 4 + header_length])?;
    let index_pos = field_u64(&header_fields, "bag header", "index_pos")?;
    let conn_count = field_i32(&header_fields, "bag header", "conn_count")?.max(0) as usize;
    let chunk_count = field_i32(&header_fields, "bag header", "chunk_count")?.max(0) as usize;

    if chunk_count == 0 {
        return Err(BagError::EmptyBag);
    }
    if index_pos >= file_length {
        return Err(BagError::io_failure(
            "bag header",
            format!("index_pos {index_pos} beyond file length {file_length}"),
        ));
    }

    let index = source.read_at(index_pos, file_length - index_pos)?;

    // Chunk-info records start directly after the last connection record.
    let mut chunks_start = index_pos;
    let connections = retrieve_records(&index, index_pos, conn_count, index_pos, |rec| {
        chunks_start = rec.record_offset + rec.record_length;
        let conn = field_u32(&rec.fields, "connection", "conn")?;
        let topic = field_str(&rec.fields, "connection", "topic")?;
        let data_fields = extract_fields(rec.data)?;
        Ok(Connection {
            conn,
            topic,
            message_type: field_str_or_empty(&data_fields, "type"),
            md5sum: field_str_or_empty(&data_fields, "md5sum"),
            message_definition: field_str_or_empty(&data_fields, "message_definition"),
        })
    })?;

    let mut chunks = retrieve_records(&index, index_pos, chunk_count, chunks_start, |rec| {
        let count = field_u32(&rec.fields, "chunk info", "count")?;
        let mut per_conn_counts = Vec::with_capacity(count as usize);
        for entry in 0..count as usize {
            let at = entry * 8;
            if at + 8 > rec.data.len() {
                return Err(BagError::truncated_record(
                    "chunk info counts",
                    (count as usize) * 8,
                    rec.data.len(),
                ));
            }
            per_conn_counts.push((
                LittleEndian::read_u32(&rec.data[at..at + 4]),
                LittleEndian::read_u32(&rec.data[at + 4..at + 8]),
            ));
        }
        Ok(ChunkInfo {
            version: field_u32(&rec.fields, "chunk info", "ver")?,
            chunk_position: field_u64(&rec.fields, "chunk info", "chunk_pos")?,
            start_time: field_time(&rec.fields, "chunk info", "start_time")?,
            end_time: field_time(&rec.fields, "chunk info", "end_time")?,
            count,
            per_conn_counts,
            idx: 0,
            next_chunk_position: 0,
        })
    })?;

    chunks.sort_by(|a, b| a.start_time.cmp(&b.start_time));
    for i in 0..chunks.len() {
        chunks[i].idx = i;
        chunks[i].next_chunk_position = if i + 1 < chunks.len() {
            chunks[i + 1].chunk_position
        } else {
            file_length
        };
    }

    let start_time = chunks[0].start_time;
    let end_time = chunks[chunks.len() - 1].end_time;

    Ok(BagMetadata {
        connections: connections.into_iter().map(|c| (c.conn, c)).collect(),
        chunks_info: chunks,
        start_time,
        end_time,
    })
}
