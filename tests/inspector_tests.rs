// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Inspector integration tests against synthetic bags.

mod common;

use bagplay::{read_metadata, BagError, BagTime, MemorySource};
use common::{counter_message, BagBuilder};

#[test]
fn test_metadata_from_simple_bag() {
    let bytes = common::simple_bag(100, 3);
    let file_length = bytes.len() as u64;
    let source = MemorySource::new(bytes);
    let metadata = read_metadata(&source).unwrap();

    assert_eq!(metadata.connections.len(), 2);
    assert_eq!(metadata.connections[&0].topic, "/counter");
    assert_eq!(metadata.connections[&0].message_type, "test_msgs/Counter");
    assert_eq!(metadata.connections[&0].message_definition, "uint32 value");
    assert_eq!(metadata.connections[&1].topic, "/signal");

    assert_eq!(metadata.chunks_info.len(), 3);
    assert_eq!(metadata.start_time, BagTime::new(100, 100_000_000));
    assert_eq!(metadata.end_time, BagTime::new(102, 600_000_000));
    assert_eq!(metadata.message_count(), 6);

    // Chunks sorted by start time, idx assigned in order, positions linked
    // forward with the file length closing the last chunk.
    for (i, chunk) in metadata.chunks_info.iter().enumerate() {
        assert_eq!(chunk.idx, i);
        assert!(chunk.start_time <= chunk.end_time);
        if i + 1 < metadata.chunks_info.len() {
            assert!(chunk.start_time <= metadata.chunks_info[i + 1].start_time);
            assert_eq!(
                chunk.next_chunk_position,
                metadata.chunks_info[i + 1].chunk_position
            );
        } else {
            assert_eq!(chunk.next_chunk_position, file_length);
        }
    }
}

#[test]
fn test_topics_and_per_connection_counts() {
    let source = MemorySource::new(common::simple_bag(10, 2));
    let metadata = read_metadata(&source).unwrap();

    assert_eq!(metadata.topics(), vec!["/counter", "/signal"]);
    let counts = metadata.connection_message_counts();
    assert_eq!(counts[&0], 2);
    assert_eq!(counts[&1], 2);
}

#[test]
fn test_corrupted_magic_rejected() {
    let mut bytes = common::simple_bag(10, 1);
    bytes[0] = b'$';
    let err = read_metadata(&MemorySource::new(bytes)).unwrap_err();
    assert!(matches!(err, BagError::InvalidMagic { .. }));
}

#[test]
fn test_magic_only_file_is_truncated() {
    let err = read_metadata(&MemorySource::new(b"#ROSBAG V2.0\n".to_vec())).unwrap_err();
    assert!(matches!(err, BagError::TruncatedHeader { .. }));
}

#[test]
fn test_oversized_header_length_rejected() {
    let mut bytes = b"#ROSBAG V2.0\n".to_vec();
    bytes.extend(&1_000_000u32.to_le_bytes());
    bytes.extend([0u8; 64]);
    let err = read_metadata(&MemorySource::new(bytes)).unwrap_err();
    assert!(matches!(err, BagError::HeaderTooLarge { .. }));
}

#[test]
fn test_header_field_without_equals_rejected() {
    let mut header = Vec::new();
    header.extend(&5u32.to_le_bytes());
    header.extend(b"nosep");

    let mut bytes = b"#ROSBAG V2.0\n".to_vec();
    bytes.extend(&(header.len() as u32).to_le_bytes());
    bytes.extend(&header);
    bytes.extend(&0u32.to_le_bytes());

    let err = read_metadata(&MemorySource::new(bytes)).unwrap_err();
    assert!(matches!(err, BagError::MissingEquals { .. }));
}

#[test]
fn test_zero_chunk_bag_rejected() {
    let bytes = BagBuilder::new()
        .connection(0, "/counter", "test_msgs/Counter", "uint32 value")
        .build();
    let err = read_metadata(&MemorySource::new(bytes)).unwrap_err();
    assert!(matches!(err, BagError::EmptyBag));
}

#[test]
fn test_equal_start_times_keep_encounter_order() {
    let t = BagTime::new(50, 0);
    let bytes = BagBuilder::new()
        .connection(0, "/counter", "test_msgs/Counter", "uint32 value")
        .chunk(vec![counter_message(0, t, 1)])
        .chunk(vec![counter_message(0, t, 2)])
        .build();
    let metadata = read_metadata(&MemorySource::new(bytes)).unwrap();

    // Stable sort: equal start times stay in file order, so positions are
    // strictly increasing.
    assert_eq!(metadata.chunks_info.len(), 2);
    assert!(metadata.chunks_info[0].chunk_position < metadata.chunks_info[1].chunk_position);
}

#[test]
fn test_empty_chunk_listed_with_zero_count() {
    let bytes = BagBuilder::new()
        .connection(0, "/counter", "test_msgs/Counter", "uint32 value")
        .chunk(vec![counter_message(0, BagTime::new(10, 0), 1)])
        .empty_chunk(BagTime::new(11, 0), BagTime::new(11, 0))
        .build();
    let metadata = read_metadata(&MemorySource::new(bytes)).unwrap();

    assert_eq!(metadata.chunks_info.len(), 2);
    assert_eq!(metadata.chunks_info[1].count, 0);
    assert_eq!(metadata.chunks_info[1].message_count(), 0);
}
