// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout bagplay.
//!
//! This module provides the foundational types for the library:
//! - [`BagError`] - Comprehensive error handling
//! - [`BagTime`] - Bag timestamps and offset arithmetic
//! - [`MessageValue`] - Unified decoded value representation

pub mod error;
pub mod time;
pub mod value;

pub use error::{BagError, Result};
pub use time::BagTime;
pub use value::{DecodedMessage, MessageValue, RosbagMessage};
