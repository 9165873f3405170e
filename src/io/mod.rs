// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! I/O layer: random-access byte sources backing bag playback.

pub mod source;

pub use source::{MemorySource, MmapSource, RandomAccessSource};
