// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Message-definition text parser.
//!
//! A connection's definition text holds the top-level type's fields, one
//! per line, followed by the definitions of every complex type it
//! references. Each appended definition starts with a `MSG: <type-name>`
//! line. Comment lines (`#`), separator lines (`==…`) and blank lines are
//! ignored.
//!
//! The scan is a small state machine: lines before the first `MSG:` marker
//! belong to the top-level type; after a marker they accumulate into that
//! nested type until the next marker or the end of the text.

use regex::Regex;
use std::sync::OnceLock;

use crate::core::{BagError, Result};

use super::ast::{normalize_type_name, MsgField, MsgSchema};

/// Array suffix on a type token: `T[]` (unbounded) or `T[n]` (fixed).
fn array_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+)\[(\d*)\]$").expect("array suffix pattern is valid"))
}

/// Compile a message-definition text into a [`MsgSchema`].
///
/// `message_type` is only used for error context; the definition itself
/// carries no name for the top-level type.
pub fn parse_definition(message_type: &str, definition: &str) -> Result<MsgSchema> {
    let mut schema = MsgSchema::default();
    let mut pending: Option<MsgField> = None;

    for raw_line in definition.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("==") {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else { continue };

        if first.to_lowercase() == "msg:" {
            let name = tokens.next().ok_or_else(|| {
                BagError::schema_parse(message_type, "MSG: line without a type name")
            })?;
            if let Some(done) = pending.take() {
                finalize_nested(&mut schema, done);
            }
            pending = Some(MsgField::new(name, ""));
            continue;
        }

        let Some(field) = parse_field_line(line) else {
            continue;
        };
        match pending.as_mut() {
            Some(section) => section.nested_keys.push(field),
            None => schema.top_level_keys.push(field),
        }
    }

    if let Some(done) = pending.take() {
        finalize_nested(&mut schema, done);
    }

    Ok(schema)
}

/// Register a finished `MSG:` section under its normalized type name.
fn finalize_nested(schema: &mut MsgSchema, mut section: MsgField) {
    if section.key.is_empty() {
        return;
    }
    let name = normalize_type_name(&section.key);
    section.key_type = name.clone();
    schema.nested_types.insert(name, section);
}

/// Parse one retained line into a field node.
///
/// Grammar: `key_type key [= value]` where `key_type` may carry an array
/// suffix and a constant's `=` may instead be glued to the key token.
/// Lines with fewer than two tokens carry no field and are dropped.
fn parse_field_line(line: &str) -> Option<MsgField> {
    let mut tokens = line.split_whitespace();
    let raw_type = tokens.next()?;
    let raw_key = tokens.next()?;
    let rest: Vec<&str> = tokens.collect();

    let (base_type, is_array, array_length) = match array_suffix().captures(raw_type) {
        Some(caps) => {
            let base = caps.get(1).map(|m| m.as_str()).unwrap_or(raw_type);
            let digits = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            let length = if digits.is_empty() {
                None
            } else {
                digits.parse::<usize>().ok()
            };
            (base, true, length)
        }
        None => (raw_type, false, None),
    };

    let (key, constant_value) = if rest.len() >= 2 && rest[0] == "=" {
        (raw_key.to_string(), Some(rest[1].to_string()))
    } else if let Some(eq) = raw_key.find('=') {
        (
            raw_key[..eq].to_string(),
            Some(raw_key[eq + 1..].to_string()),
        )
    } else {
        (raw_key.to_string(), None)
    };

    Some(MsgField {
        key,
        key_type: normalize_type_name(base_type),
        is_array,
        array_length,
        constant_value,
        nested_keys: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_fields() {
        let schema = parse_definition("Test", "int32 x\nfloat64 y").unwrap();
        assert_eq!(schema.top_level_keys.len(), 2);
        assert_eq!(schema.top_level_keys[0].key, "x");
        assert_eq!(schema.top_level_keys[0].key_type, "int32");
        assert_eq!(schema.top_level_keys[1].key, "y");
        assert_eq!(schema.top_level_keys[1].key_type, "float64");
    }

    #[test]
    fn test_comments_and_separators_ignored() {
        let text = "# leading comment\n\nint32 value\n===\n# trailing";
        let schema = parse_definition("Test", text).unwrap();
        assert_eq!(schema.top_level_keys.len(), 1);
        assert!(schema.nested_types.is_empty());
    }

    #[test]
    fn test_fixed_array() {
        let schema = parse_definition("Test", "uint8[3] rgb").unwrap();
        let field = &schema.top_level_keys[0];
        assert_eq!(field.key, "rgb");
        assert_eq!(field.key_type, "uint8");
        assert!(field.is_array);
        assert_eq!(field.array_length, Some(3));
    }

    #[test]
    fn test_unbounded_array() {
        let schema = parse_definition("Test", "string[] names").unwrap();
        let field = &schema.top_level_keys[0];
        assert!(field.is_array);
        assert_eq!(field.array_length, None);
    }

    #[test]
    fn test_constant_with_spaced_equals() {
        let schema = parse_definition("Test", "uint8 MAX = 255").unwrap();
        let field = &schema.top_level_keys[0];
        assert_eq!(field.key, "MAX");
        assert_eq!(field.constant_value.as_deref(), Some("255"));
    }

    #[test]
    fn test_constant_glued_to_key() {
        let schema = parse_definition("Test", "uint8 MAX=255").unwrap();
        let field = &schema.top_level_keys[0];
        assert_eq!(field.key, "MAX");
        assert_eq!(field.constant_value.as_deref(), Some("255"));
    }

    #[test]
    fn test_slashed_type_normalized() {
        let schema = parse_definition("Test", "std_msgs/Header header").unwrap();
        assert_eq!(schema.top_level_keys[0].key_type, "header");
    }

    #[test]
    fn test_nested_sections() {
        let text = "Header h\nuint8 v\n===\nMSG: Header\nuint32 seq\ntime stamp";
        let schema = parse_definition("Test", text).unwrap();

        assert_eq!(schema.top_level_keys.len(), 2);
        assert_eq!(schema.top_level_keys[0].key_type, "header");
        assert_eq!(schema.top_level_keys[1].key, "v");

        let header = schema.nested("header").expect("nested Header");
        assert_eq!(header.key, "Header");
        assert_eq!(header.nested_keys.len(), 2);
        assert_eq!(header.nested_keys[0].key, "seq");
        assert_eq!(header.nested_keys[1].key_type, "time");
    }

    #[test]
    fn test_multiple_nested_sections() {
        let text = "geometry_msgs/Twist twist\n\
                    ===\n\
                    MSG: geometry_msgs/Twist\n\
                    geometry_msgs/Vector3 linear\n\
                    geometry_msgs/Vector3 angular\n\
                    ===\n\
                    MSG: geometry_msgs/Vector3\n\
                    float64 x\n\
                    float64 y\n\
                    float64 z";
        let schema = parse_definition("Test", text).unwrap();
        assert_eq!(schema.nested_types.len(), 2);
        assert_eq!(schema.nested("twist").unwrap().nested_keys.len(), 2);
        assert_eq!(schema.nested("vector3").unwrap().nested_keys.len(), 3);
    }

    #[test]
    fn test_msg_marker_without_name_rejected() {
        let err = parse_definition("Test", "int8 a\nMSG:").unwrap_err();
        assert!(matches!(err, BagError::SchemaParseError { .. }));
    }

    #[test]
    fn test_nested_array_of_complex_type() {
        let text = "pkg/Point[] points\n===\nMSG: pkg/Point\nfloat32 x\nfloat32 y";
        let schema = parse_definition("Test", text).unwrap();
        let field = &schema.top_level_keys[0];
        assert_eq!(field.key_type, "point");
        assert!(field.is_array);
        assert!(schema.nested("point").is_some());
    }
}
