// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema-driven message decoder.
//!
//! Decodes serialized ROS1 payloads using a compiled [`MsgSchema`].
//! Schemas are compiled once per message type and interned; the intern
//! table is scoped to the loaded file (the owner clears it on every load)
//! so identically named types from different bags cannot collide.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::{BagError, DecodedMessage, MessageValue, Result};

use super::ast::{MsgField, MsgSchema};
use super::cursor::ByteCursor;
use super::parser::parse_definition;

/// Maximum allowed array length to prevent OOM on corrupt payloads.
const MAX_ARRAY_LENGTH: usize = 10_000_000;

/// Message decoder with per-type schema interning.
pub struct SchemaDecoder {
    /// Compiled schemas keyed by `message_type` string
    schemas: Mutex<HashMap<String, Arc<MsgSchema>>>,
}

impl SchemaDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self {
            schemas: Mutex::new(HashMap::new()),
        }
    }

    /// Drop every interned schema.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.schemas.lock() {
            cache.clear();
        }
    }

    /// Get the compiled schema for a message type, compiling the
    /// definition text on first use.
    pub fn schema_for(&self, message_type: &str, definition: &str) -> Result<Arc<MsgSchema>> {
        {
            let cache = self.lock_cache()?;
            if let Some(schema) = cache.get(message_type) {
                return Ok(Arc::clone(schema));
            }
        }

        let schema = Arc::new(parse_definition(message_type, definition)?);

        let mut cache = self.lock_cache()?;
        // Another thread may have compiled the same type in the gap;
        // keep the first insertion.
        Ok(Arc::clone(
            cache
                .entry(message_type.to_string())
                .or_insert_with(|| Arc::clone(&schema)),
        ))
    }

    /// Decode one message payload.
    ///
    /// Every invocation allocates a fresh result map, including for nested
    /// types, so recursive decodes never share an accumulator.
    pub fn decode(
        &self,
        message_type: &str,
        definition: &str,
        data: &[u8],
    ) -> Result<DecodedMessage> {
        let schema = self.schema_for(message_type, definition)?;
        let mut cursor = ByteCursor::new(data);
        decode_fields(&schema.top_level_keys, &schema, &mut cursor)
    }

    fn lock_cache(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<MsgSchema>>>> {
        self.schemas
            .lock()
            .map_err(|e| BagError::io_failure("schema cache", format!("lock poisoned: {e}")))
    }
}

impl Default for SchemaDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode an ordered field list into a fresh map.
fn decode_fields(
    fields: &[MsgField],
    schema: &MsgSchema,
    cursor: &mut ByteCursor<'_>,
) -> Result<DecodedMessage> {
    let mut out = DecodedMessage::with_capacity(fields.len());
    for field in fields {
        let value = decode_field(field, schema, cursor)
            .map_err(|e| BagError::decode_field(&field.key, e))?;
        out.insert(field.key.clone(), value);
    }
    Ok(out)
}

/// Decode one field: constant, array, primitive, or nested type.
fn decode_field(
    field: &MsgField,
    schema: &MsgSchema,
    cursor: &mut ByteCursor<'_>,
) -> Result<MessageValue> {
    if let Some(constant) = &field.constant_value {
        return Ok(MessageValue::String(constant.clone()));
    }

    if field.is_array {
        let length = match field.array_length {
            Some(fixed) => fixed,
            None => cursor.read_u32()? as usize,
        };
        if length > MAX_ARRAY_LENGTH {
            return Err(BagError::decode_field(
                &field.key,
                format!("array length {length} exceeds limit {MAX_ARRAY_LENGTH}"),
            ));
        }
        let mut items = Vec::with_capacity(length.min(cursor.remaining()));
        for _ in 0..length {
            items.push(decode_scalar(field, schema, cursor)?);
        }
        return Ok(MessageValue::Array(items));
    }

    decode_scalar(field, schema, cursor)
}

/// Decode a single element of the field's type.
fn decode_scalar(
    field: &MsgField,
    schema: &MsgSchema,
    cursor: &mut ByteCursor<'_>,
) -> Result<MessageValue> {
    match field.key_type.as_str() {
        "bool" => cursor.read_bool().map(MessageValue::Bool),
        "int8" | "byte" => cursor.read_i8().map(MessageValue::Int8),
        "uint8" | "char" => cursor.read_u8().map(MessageValue::UInt8),
        "int16" => cursor.read_i16().map(MessageValue::Int16),
        "uint16" => cursor.read_u16().map(MessageValue::UInt16),
        "int32" => cursor.read_i32().map(MessageValue::Int32),
        "uint32" => cursor.read_u32().map(MessageValue::UInt32),
        "int64" => cursor.read_i64().map(MessageValue::Int64),
        "uint64" => cursor.read_u64().map(MessageValue::UInt64),
        "float32" => cursor.read_f32().map(MessageValue::Float32),
        "float64" => cursor.read_f64().map(MessageValue::Float64),
        "string" => cursor.read_string().map(MessageValue::String),
        "time" => cursor.read_time().map(MessageValue::Time),
        "duration" => cursor.read_time().map(MessageValue::Duration),
        // `json` fields occupy no bytes in the payload
        "json" => Ok(MessageValue::Null),
        other => {
            let nested = schema
                .nested(other)
                .ok_or_else(|| BagError::unknown_type(other))?;
            decode_fields(&nested.nested_keys, schema, cursor).map(MessageValue::Struct)
        }
    }
}
