// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Compiled schema tree for ROS message-definition text.

use std::collections::HashMap;

/// One node of a compiled schema: a field declaration, or a nested type
/// definition whose fields live in `nested_keys`.
#[derive(Debug, Clone, PartialEq)]
pub struct MsgField {
    /// Field name, or the full type name for a `MSG:` section
    pub key: String,
    /// Normalized type name: last `/` segment, lowercased
    pub key_type: String,
    /// Whether the declaration carried an array suffix
    pub is_array: bool,
    /// Fixed array length; `None` means the length is read from the stream
    pub array_length: Option<usize>,
    /// Constant declarations decode to this string without consuming bytes
    pub constant_value: Option<String>,
    /// Fields of a nested type definition
    pub nested_keys: Vec<MsgField>,
}

impl MsgField {
    /// Create a plain field node.
    pub fn new(key: impl Into<String>, key_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            key_type: key_type.into(),
            is_array: false,
            array_length: None,
            constant_value: None,
            nested_keys: Vec::new(),
        }
    }
}

/// A compiled message schema: the top-level field list plus every nested
/// type definition appended to the same definition text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MsgSchema {
    /// Fields of the message type itself, in declaration order
    pub top_level_keys: Vec<MsgField>,
    /// Nested type definitions, keyed by normalized type name
    pub nested_types: HashMap<String, MsgField>,
}

impl MsgSchema {
    /// Look up a nested type definition by normalized name.
    pub fn nested(&self, key_type: &str) -> Option<&MsgField> {
        self.nested_types.get(key_type)
    }
}

/// Reduce a type name to its comparison form: the last `/` segment,
/// lowercased. `pkg/Type` and `Type` both normalize to `type`.
pub fn normalize_type_name(name: &str) -> String {
    name.rsplit('/').next().unwrap_or(name).to_lowercase()
}
