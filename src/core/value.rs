// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Decoded value type system.
//!
//! Provides a unified value representation for messages decoded from the
//! ROS1 binary serialization. All variants are serde-serializable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::time::BagTime;

/// Type alias for a decoded message as field name -> value mapping.
pub type DecodedMessage = HashMap<String, MessageValue>;

/// Unified value type for decoded bag messages.
///
/// This enum represents every value a schema-driven decode can produce.
/// 64-bit integers are stored natively, so the full `i64`/`u64` range is
/// preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageValue {
    // Boolean
    Bool(bool),

    // Signed integers
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),

    // Unsigned integers
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),

    // Floating point
    Float32(f32),
    Float64(f64),

    // String (length-prefixed ASCII on the wire)
    String(String),

    // ROS time
    Time(BagTime),

    // ROS duration (same wire layout as time)
    Duration(BagTime),

    // Array of values
    Array(Vec<MessageValue>),

    // Nested message
    Struct(DecodedMessage),

    // Placeholder for fields that consume no bytes (`json` typed fields)
    Null,
}

impl MessageValue {
    /// Get the nested message, if this is a struct value.
    pub fn as_struct(&self) -> Option<&DecodedMessage> {
        match self {
            MessageValue::Struct(m) => Some(m),
            _ => None,
        }
    }

    /// Get the element list, if this is an array value.
    pub fn as_array(&self) -> Option<&[MessageValue]> {
        match self {
            MessageValue::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// A fully decoded message positioned on the bag timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosbagMessage {
    /// Topic name of the connection the message arrived on
    pub topic: String,
    /// Record time from the message record header
    pub time: BagTime,
    /// Decoded field values
    pub data: DecodedMessage,
}
