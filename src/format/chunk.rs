// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Chunk record parsing.
//!
//! A chunk's on-disk span holds the chunk record (compressed message data)
//! followed by one index-data record per connection, each listing the
//! received time and decompressed-data offset of every message. Message
//! records inside the decompressed data use the ordinary record envelope
//! with `conn` and `time` header fields.

use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};
use tracing::warn;

use crate::core::{BagError, BagTime, Result, RosbagMessage};
use crate::schema::SchemaDecoder;

use super::inspector::Connection;
use super::record::{field_str, field_time, field_u32, retrieve_records, shallow_read, ShallowRecord};

/// One message pointer from a chunk's embedded index: where the message
/// record starts in the decompressed data, and when it was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPointer {
    /// Received time, the per-chunk sort key
    pub received_time: BagTime,
    /// Offset of the message record in the decompressed chunk data
    pub msg_data_offset: u32,
}

/// Parsed chunk record header: the compression tag and declared
/// decompressed size, plus the record itself for payload access.
pub struct ChunkRecord<'a> {
    /// Compression tag (`none`, `lz4`, ...)
    pub compression: String,
    /// Decompressed payload size from the `size` field
    pub uncompressed_size: u32,
    /// The underlying record; `data` is the compressed payload
    pub record: ShallowRecord<'a>,
}

/// Read the chunk record at the start of a fetched chunk span.
pub fn parse_chunk_record(region: &[u8], chunk_position: u64) -> Result<ChunkRecord<'_>> {
    let record = shallow_read(region, chunk_position, chunk_position)?;
    let compression = field_str(&record.fields, "chunk", "compression")?;
    let uncompressed_size = field_u32(&record.fields, "chunk", "size")?;
    Ok(ChunkRecord {
        compression,
        uncompressed_size,
        record,
    })
}

/// Parse the `count` index-data records following the chunk record and
/// flatten their message pointers into one list.
///
/// Each record's data is `count * (received_time:8 | msg_offset:u32 LE)`,
/// 12 bytes per entry. The returned list is in record order; the caller
/// sorts by received time.
pub fn parse_index_pointers(
    region: &[u8],
    region_base: u64,
    start: u64,
    count: usize,
) -> Result<Vec<ChunkPointer>> {
    let per_record = retrieve_records(region, region_base, count, start, |rec| {
        let entries = field_u32(&rec.fields, "index data", "count")? as usize;
        if entries * 12 > rec.data.len() {
            return Err(BagError::truncated_record(
                "index data entries",
                entries * 12,
                rec.data.len(),
            ));
        }
        let mut pointers = Vec::with_capacity(entries);
        for entry in 0..entries {
            let at = entry * 12;
            let mut raw_time = [0u8; 8];
            raw_time.copy_from_slice(&rec.data[at..at + 8]);
            pointers.push(ChunkPointer {
                received_time: BagTime::from_le_bytes(raw_time),
                msg_data_offset: LittleEndian::read_u32(&rec.data[at + 8..at + 12]),
            });
        }
        Ok(pointers)
    })?;

    Ok(per_record.into_iter().flatten().collect())
}

/// Decode the messages a sorted pointer list refers to.
///
/// Pointers to unknown connections are skipped silently (the index may
/// reference filtered or truncated streams). A message that fails to
/// decode is logged and skipped; the rest of the chunk still decodes.
pub fn decode_chunk_messages(
    decompressed: &[u8],
    pointers: &[ChunkPointer],
    connections: &HashMap<u32, Connection>,
    decoder: &SchemaDecoder,
) -> Vec<RosbagMessage> {
    let mut messages = Vec::with_capacity(pointers.len());

    for pointer in pointers {
        let record = match shallow_read(decompressed, 0, pointer.msg_data_offset as u64) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    offset = pointer.msg_data_offset,
                    error = %e,
                    "skipping unreadable message record"
                );
                continue;
            }
        };

        let conn = match field_u32(&record.fields, "message", "conn") {
            Ok(conn) => conn,
            Err(e) => {
                warn!(offset = pointer.msg_data_offset, error = %e, "message record without conn");
                continue;
            }
        };
        let Some(connection) = connections.get(&conn) else {
            continue;
        };
        let time = match field_time(&record.fields, "message", "time") {
            Ok(time) => time,
            Err(e) => {
                warn!(topic = %connection.topic, error = %e, "message record without time");
                continue;
            }
        };

        match decoder.decode(
            &connection.message_type,
            &connection.message_definition,
            record.data,
        ) {
            Ok(data) => messages.push(RosbagMessage {
                topic: connection.topic.clone(),
                time,
                data,
            }),
            Err(e) => {
                warn!(topic = %connection.topic, time = %time, error = %e, "skipping undecodable message");
            }
        }
    }

    messages
}
