// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for bagplay.
//!
//! Provides error types for bag playback operations:
//! - Container and record framing
//! - Chunk decompression
//! - Schema parsing and message decoding
//! - File I/O

use std::fmt;

/// Errors that can occur while loading or playing a bag file.
#[derive(Debug, Clone)]
pub enum BagError {
    /// The file does not start with the ROS bag v2.0 magic bytes
    InvalidMagic {
        /// What was found at the start of the file
        found: String,
    },

    /// The file header region is shorter than the minimum record envelope
    TruncatedHeader {
        /// Bytes required
        needed: usize,
        /// Bytes available
        available: usize,
    },

    /// The declared header length exceeds the header buffer
    HeaderTooLarge {
        /// Declared header length
        header_length: usize,
        /// Length of the buffer the header must fit in
        buffer_length: usize,
    },

    /// A record header field entry has no `=` separator
    MissingEquals {
        /// What was being parsed
        context: String,
    },

    /// A record or field ends before its declared length
    TruncatedRecord {
        /// What was being parsed
        context: String,
        /// Bytes required
        needed: usize,
        /// Bytes available
        available: usize,
    },

    /// A required header field is absent from a record
    MissingField {
        /// Record kind (e.g. "bag header", "chunk info")
        record: String,
        /// Field name
        field: String,
    },

    /// Compression tag not in the registry
    UnsupportedCompression {
        /// The tag found in the chunk header
        compression: String,
    },

    /// The decompressor rejected the chunk payload
    DecompressionFailure {
        /// Compression tag
        compression: String,
        /// Underlying error
        cause: String,
    },

    /// Message-definition text could not be compiled into a schema
    SchemaParseError {
        /// Message type the definition belongs to
        message_type: String,
        /// What went wrong
        reason: String,
    },

    /// A field references a type with no definition in the schema
    UnknownType {
        /// Normalized type name
        type_name: String,
    },

    /// Buffer too short for requested read
    BufferTooShort {
        /// Requested bytes
        requested: usize,
        /// Available bytes
        available: usize,
        /// Cursor position when error occurred
        position: usize,
    },

    /// Field decode error with context
    MessageDecodeError {
        /// Field name
        field: String,
        /// Underlying error
        cause: String,
    },

    /// The bag index declares zero chunks
    EmptyBag,

    /// I/O error from the byte source
    IoFailure {
        /// What was being read
        context: String,
        /// Underlying error
        cause: String,
    },
}

impl BagError {
    /// Create an invalid-magic error.
    pub fn invalid_magic(found: impl Into<String>) -> Self {
        BagError::InvalidMagic {
            found: found.into(),
        }
    }

    /// Create a truncated-header error.
    pub fn truncated_header(needed: usize, available: usize) -> Self {
        BagError::TruncatedHeader { needed, available }
    }

    /// Create a header-too-large error.
    pub fn header_too_large(header_length: usize, buffer_length: usize) -> Self {
        BagError::HeaderTooLarge {
            header_length,
            buffer_length,
        }
    }

    /// Create a missing-equals error.
    pub fn missing_equals(context: impl Into<String>) -> Self {
        BagError::MissingEquals {
            context: context.into(),
        }
    }

    /// Create a truncated-record error.
    pub fn truncated_record(context: impl Into<String>, needed: usize, available: usize) -> Self {
        BagError::TruncatedRecord {
            context: context.into(),
            needed,
            available,
        }
    }

    /// Create a missing-field error.
    pub fn missing_field(record: impl Into<String>, field: impl Into<String>) -> Self {
        BagError::MissingField {
            record: record.into(),
            field: field.into(),
        }
    }

    /// Create an unsupported-compression error.
    pub fn unsupported_compression(compression: impl Into<String>) -> Self {
        BagError::UnsupportedCompression {
            compression: compression.into(),
        }
    }

    /// Create a decompression-failure error.
    pub fn decompression_failure(
        compression: impl Into<String>,
        cause: impl fmt::Display,
    ) -> Self {
        BagError::DecompressionFailure {
            compression: compression.into(),
            cause: cause.to_string(),
        }
    }

    /// Create a schema parse error.
    pub fn schema_parse(message_type: impl Into<String>, reason: impl Into<String>) -> Self {
        BagError::SchemaParseError {
            message_type: message_type.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown-type error.
    pub fn unknown_type(type_name: impl Into<String>) -> Self {
        BagError::UnknownType {
            type_name: type_name.into(),
        }
    }

    /// Create a buffer-too-short error.
    pub fn buffer_too_short(requested: usize, available: usize, position: usize) -> Self {
        BagError::BufferTooShort {
            requested,
            available,
            position,
        }
    }

    /// Create a message decode error wrapping a field name.
    pub fn decode_field(field: impl Into<String>, cause: impl fmt::Display) -> Self {
        BagError::MessageDecodeError {
            field: field.into(),
            cause: cause.to_string(),
        }
    }

    /// Create an I/O failure error.
    pub fn io_failure(context: impl Into<String>, cause: impl fmt::Display) -> Self {
        BagError::IoFailure {
            context: context.into(),
            cause: cause.to_string(),
        }
    }
}

impl fmt::Display for BagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BagError::InvalidMagic { found } => {
                write!(
                    f,
                    "Invalid bag magic: expected \"#ROSBAG V2.0\", found {found:?}"
                )
            }
            BagError::TruncatedHeader { needed, available } => {
                write!(
                    f,
                    "Truncated bag header: need {needed} bytes, only {available} available"
                )
            }
            BagError::HeaderTooLarge {
                header_length,
                buffer_length,
            } => write!(
                f,
                "Bag header length {header_length} does not fit in {buffer_length}-byte header region"
            ),
            BagError::MissingEquals { context } => {
                write!(f, "Header field without '=' separator in {context}")
            }
            BagError::TruncatedRecord {
                context,
                needed,
                available,
            } => write!(
                f,
                "Truncated record in {context}: need {needed} bytes, only {available} available"
            ),
            BagError::MissingField { record, field } => {
                write!(f, "Missing field '{field}' in {record} record")
            }
            BagError::UnsupportedCompression { compression } => {
                write!(f, "Unsupported chunk compression: '{compression}'")
            }
            BagError::DecompressionFailure { compression, cause } => {
                write!(f, "Failed to decompress '{compression}' chunk: {cause}")
            }
            BagError::SchemaParseError {
                message_type,
                reason,
            } => write!(f, "Failed to parse schema for '{message_type}': {reason}"),
            BagError::UnknownType { type_name } => {
                write!(f, "Unknown message type: '{type_name}'")
            }
            BagError::BufferTooShort {
                requested,
                available,
                position,
            } => write!(
                f,
                "Buffer too short: requested {requested} bytes at position {position}, but only {available} bytes available"
            ),
            BagError::MessageDecodeError { field, cause } => {
                write!(f, "Failed to decode field '{field}': {cause}")
            }
            BagError::EmptyBag => write!(f, "Bag index declares zero chunks"),
            BagError::IoFailure { context, cause } => {
                write!(f, "I/O failure in {context}: {cause}")
            }
        }
    }
}

impl std::error::Error for BagError {}

impl From<std::io::Error> for BagError {
    fn from(err: std::io::Error) -> Self {
        BagError::IoFailure {
            context: "io".to_string(),
            cause: err.to_string(),
        }
    }
}

/// Result type for bagplay operations.
pub type Result<T> = std::result::Result<T, BagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        let err = BagError::invalid_magic("$ROSBAG V2.0\n");
        assert!(err.to_string().contains("Invalid bag magic"));

        let err = BagError::unsupported_compression("bz2");
        assert!(err.to_string().contains("bz2"));

        let err = BagError::decode_field("position", BagError::buffer_too_short(8, 3, 12));
        assert!(err.to_string().contains("position"));
        assert!(err.to_string().contains("8 bytes"));
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: BagError = io.into();
        assert!(matches!(err, BagError::IoFailure { .. }));
    }
}
