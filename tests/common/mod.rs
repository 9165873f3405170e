// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.
//!
//! The centerpiece is [`BagBuilder`], a bit-exact v2.0 bag serializer used
//! to synthesize fixtures in memory: magic, padded file header, chunks with
//! embedded index-data records, and the trailing index region with
//! connection and chunk-info records.

#![allow(dead_code)]

use bagplay::BagTime;

/// Record op codes, carried for realism; the parser keys on header fields.
const OP_MSG_DATA: u8 = 0x02;
const OP_BAG_HEADER: u8 = 0x03;
const OP_INDEX_DATA: u8 = 0x04;
const OP_CHUNK: u8 = 0x05;
const OP_CHUNK_INFO: u8 = 0x06;
const OP_CONNECTION: u8 = 0x07;

/// The file header region is padded to this size.
const HEADER_PADDING: usize = 4096;

/// One `name=value` header field entry.
fn field(name: &str, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let len = (name.len() + 1 + value.len()) as u32;
    out.extend(&len.to_le_bytes());
    out.extend(name.as_bytes());
    out.push(b'=');
    out.extend(value);
    out
}

/// A full record envelope from pre-built header fields.
fn record(header_fields: &[Vec<u8>], data: &[u8]) -> Vec<u8> {
    let header = header_fields.concat();
    let mut out = Vec::new();
    out.extend(&(header.len() as u32).to_le_bytes());
    out.extend(&header);
    out.extend(&(data.len() as u32).to_le_bytes());
    out.extend(data);
    out
}

/// A connection declaration for the builder.
#[derive(Clone)]
pub struct TestConnection {
    pub conn: u32,
    pub topic: String,
    pub message_type: String,
    pub definition: String,
}

/// One message inside a chunk.
#[derive(Clone)]
pub struct TestMessage {
    pub conn: u32,
    pub time: BagTime,
    pub payload: Vec<u8>,
}

struct TestChunk {
    messages: Vec<TestMessage>,
    /// Explicit time range for empty chunks
    times: Option<(BagTime, BagTime)>,
}

/// In-memory bag serializer for tests.
pub struct BagBuilder {
    connections: Vec<TestConnection>,
    chunks: Vec<TestChunk>,
    compression: String,
    /// When set, this tag is written to chunk headers while the payload
    /// stays uncompressed; used to exercise unsupported-compression paths.
    declared_compression: Option<String>,
}

impl BagBuilder {
    pub fn new() -> Self {
        Self {
            connections: Vec::new(),
            chunks: Vec::new(),
            compression: "none".to_string(),
            declared_compression: None,
        }
    }

    /// Compress chunk payloads with the given tag (`none` or `lz4`).
    pub fn compression(mut self, tag: &str) -> Self {
        self.compression = tag.to_string();
        self
    }

    /// Write `tag` into chunk headers without actually compressing.
    pub fn declared_compression(mut self, tag: &str) -> Self {
        self.declared_compression = Some(tag.to_string());
        self
    }

    /// Declare a connection.
    pub fn connection(
        mut self,
        conn: u32,
        topic: &str,
        message_type: &str,
        definition: &str,
    ) -> Self {
        self.connections.push(TestConnection {
            conn,
            topic: topic.to_string(),
            message_type: message_type.to_string(),
            definition: definition.to_string(),
        });
        self
    }

    /// Add a chunk holding the given messages. The chunk-info time range
    /// is derived from the messages, which must be non-empty.
    pub fn chunk(mut self, messages: Vec<TestMessage>) -> Self {
        assert!(!messages.is_empty(), "use empty_chunk for empty chunks");
        self.chunks.push(TestChunk {
            messages,
            times: None,
        });
        self
    }

    /// Add a chunk with no messages and an explicit time range.
    pub fn empty_chunk(mut self, start: BagTime, end: BagTime) -> Self {
        self.chunks.push(TestChunk {
            messages: Vec::new(),
            times: Some((start, end)),
        });
        self
    }

    /// Serialize the bag to bytes.
    pub fn build(self) -> Vec<u8> {
        // Chunk section first; the file header needs index_pos.
        let mut chunk_section = Vec::new();
        let mut chunk_summaries = Vec::new();

        for chunk in &self.chunks {
            let chunk_pos = (HEADER_PADDING + chunk_section.len()) as u64;

            // Decompressed chunk data: message records back to back.
            let mut decompressed = Vec::new();
            // Index entries per connection, in order of first appearance.
            let mut conn_order: Vec<u32> = Vec::new();
            let mut entries: Vec<(u32, Vec<(BagTime, u32)>)> = Vec::new();

            for message in &chunk.messages {
                let offset = decompressed.len() as u32;
                decompressed.extend(record(
                    &[
                        field("op", &[OP_MSG_DATA]),
                        field("conn", &message.conn.to_le_bytes()),
                        field("time", &message.time.to_le_bytes()),
                    ],
                    &message.payload,
                ));
                match conn_order.iter().position(|&c| c == message.conn) {
                    Some(at) => entries[at].1.push((message.time, offset)),
                    None => {
                        conn_order.push(message.conn);
                        entries.push((message.conn, vec![(message.time, offset)]));
                    }
                }
            }

            let payload = match self.compression.as_str() {
                "lz4" => lz4_flex::block::compress(&decompressed),
                _ => decompressed.clone(),
            };
            let tag = self
                .declared_compression
                .clone()
                .unwrap_or_else(|| self.compression.clone());

            chunk_section.extend(record(
                &[
                    field("op", &[OP_CHUNK]),
                    field("compression", tag.as_bytes()),
                    field("size", &(decompressed.len() as u32).to_le_bytes()),
                ],
                &payload,
            ));

            for (conn, conn_entries) in &entries {
                let mut data = Vec::new();
                for &(time, offset) in conn_entries {
                    data.extend(&time.to_le_bytes());
                    data.extend(&offset.to_le_bytes());
                }
                chunk_section.extend(record(
                    &[
                        field("op", &[OP_INDEX_DATA]),
                        field("ver", &1u32.to_le_bytes()),
                        field("conn", &conn.to_le_bytes()),
                        field("count", &(conn_entries.len() as u32).to_le_bytes()),
                    ],
                    &data,
                ));
            }

            let (start, end) = chunk.times.unwrap_or_else(|| {
                let mut times: Vec<BagTime> = chunk.messages.iter().map(|m| m.time).collect();
                times.sort();
                (times[0], times[times.len() - 1])
            });
            let counts: Vec<(u32, u32)> = entries
                .iter()
                .map(|(conn, conn_entries)| (*conn, conn_entries.len() as u32))
                .collect();
            chunk_summaries.push((chunk_pos, start, end, counts));
        }

        let index_pos = (HEADER_PADDING + chunk_section.len()) as u64;

        // Trailing index: connections, then chunk infos.
        let mut index_section = Vec::new();
        for connection in &self.connections {
            let data = [
                field("type", connection.message_type.as_bytes()),
                field("md5sum", b"0123456789abcdef0123456789abcdef"),
                field("message_definition", connection.definition.as_bytes()),
            ]
            .concat();
            index_section.extend(record(
                &[
                    field("op", &[OP_CONNECTION]),
                    field("conn", &connection.conn.to_le_bytes()),
                    field("topic", connection.topic.as_bytes()),
                ],
                &data,
            ));
        }
        for (chunk_pos, start, end, counts) in &chunk_summaries {
            let mut data = Vec::new();
            for &(conn, count) in counts {
                data.extend(&conn.to_le_bytes());
                data.extend(&count.to_le_bytes());
            }
            index_section.extend(record(
                &[
                    field("op", &[OP_CHUNK_INFO]),
                    field("ver", &1u32.to_le_bytes()),
                    field("chunk_pos", &chunk_pos.to_le_bytes()),
                    field("start_time", &start.to_le_bytes()),
                    field("end_time", &end.to_le_bytes()),
                    field("count", &(counts.len() as u32).to_le_bytes()),
                ],
                &data,
            ));
        }

        // File header record, padded so magic + record fill 4096 bytes.
        let header = [
            field("op", &[OP_BAG_HEADER]),
            field("index_pos", &index_pos.to_le_bytes()),
            field("conn_count", &(self.connections.len() as i32).to_le_bytes()),
            field("chunk_count", &(self.chunks.len() as i32).to_le_bytes()),
        ]
        .concat();
        let padding_len = HEADER_PADDING - 13 - 4 - header.len() - 4;
        let padding = vec![b' '; padding_len];

        let mut out = Vec::new();
        out.extend(b"#ROSBAG V2.0\n");
        out.extend(&(header.len() as u32).to_le_bytes());
        out.extend(&header);
        out.extend(&(padding.len() as u32).to_le_bytes());
        out.extend(&padding);
        assert_eq!(out.len(), HEADER_PADDING);
        out.extend(&chunk_section);
        out.extend(&index_section);
        out
    }
}

impl Default for BagBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for a message carrying a single `uint32 value` payload.
pub fn counter_message(conn: u32, time: BagTime, value: u32) -> TestMessage {
    TestMessage {
        conn,
        time,
        payload: value.to_le_bytes().to_vec(),
    }
}

/// A two-connection bag with one chunk per second over `[start, start+chunks)`.
///
/// Connection 0 is `uint32 value` on `/counter`; connection 1 is
/// `float64 x` on `/signal`. Each chunk holds one message per connection.
pub fn simple_bag(start_sec: u32, chunks: usize) -> Vec<u8> {
    let mut builder = BagBuilder::new()
        .connection(0, "/counter", "test_msgs/Counter", "uint32 value")
        .connection(1, "/signal", "test_msgs/Signal", "float64 x");
    for i in 0..chunks {
        let sec = start_sec + i as u32;
        builder = builder.chunk(vec![
            counter_message(0, BagTime::new(sec, 100_000_000), i as u32),
            TestMessage {
                conn: 1,
                time: BagTime::new(sec, 600_000_000),
                payload: (i as f64).to_le_bytes().to_vec(),
            },
        ]);
    }
    builder.build()
}
