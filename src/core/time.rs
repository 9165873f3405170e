// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Bag timestamp type and arithmetic.
//!
//! Bag records carry time as two little-endian `u32` words: seconds and
//! nanoseconds. Ordering is lexicographic on `(sec, nsec)`. Offsets are
//! real-valued seconds; the fractional part converts to nanoseconds with
//! carry into the seconds word, Euclidean so that negative offsets carry
//! correctly.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Nanoseconds per second.
const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A bag timestamp: seconds plus nanoseconds since the Unix epoch.
///
/// The derived ordering compares `sec` first, then `nsec`, which is the
/// total order used everywhere (chunk sorting, window scans, seeks).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BagTime {
    /// Whole seconds
    pub sec: u32,
    /// Nanoseconds, always in `[0, 1e9)`
    pub nsec: u32,
}

impl BagTime {
    /// The zero timestamp.
    pub const ZERO: BagTime = BagTime { sec: 0, nsec: 0 };

    /// Create a timestamp from seconds and nanoseconds.
    pub fn new(sec: u32, nsec: u32) -> Self {
        Self { sec, nsec }
    }

    /// Parse the 8-byte wire layout: `sec:u32 LE | nsec:u32 LE`.
    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self {
            sec: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            nsec: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// Serialize to the 8-byte wire layout.
    pub fn to_le_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&self.sec.to_le_bytes());
        out[4..].copy_from_slice(&self.nsec.to_le_bytes());
        out
    }

    /// This timestamp as floating-point seconds.
    pub fn as_secs_f64(self) -> f64 {
        self.sec as f64 + self.nsec as f64 / NANOS_PER_SEC as f64
    }

    /// Add a real-valued seconds offset.
    ///
    /// The fractional part of `seconds` becomes nanoseconds, with Euclidean
    /// carry into the seconds word, so negative offsets land on the correct
    /// earlier timestamp. The result saturates at [`BagTime::ZERO`] when the
    /// offset reaches before the epoch.
    pub fn add_seconds(self, seconds: f64) -> BagTime {
        let whole = seconds.floor();
        let frac_ns = ((seconds - whole) * NANOS_PER_SEC as f64).floor() as i64;
        let total_ns = self.nsec as i64 + frac_ns;
        let carry = total_ns.div_euclid(NANOS_PER_SEC);
        let nsec = total_ns.rem_euclid(NANOS_PER_SEC) as u32;
        let sec = self.sec as i64 + whole as i64 + carry;
        if sec < 0 {
            return BagTime::ZERO;
        }
        BagTime {
            sec: sec as u32,
            nsec,
        }
    }
}

impl fmt::Display for BagTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.sec, self.nsec)
    }
}
