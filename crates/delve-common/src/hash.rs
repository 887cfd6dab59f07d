//! Stable hashing for seeds and GUIDs.
//!
//! These functions must produce the same output on every platform and
//! every build: generated worlds depend on them bit for bit. The algorithm
//! is FNV-1a 64 followed by a splitmix64 finalizer.

use std::fmt::{self, Write as _};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Offset for the second lane of 128-bit GUIDs.
const GUID_LANE_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Separator written between GUID parts so `("ab", "c")` and `("a", "bc")` differ.
const PART_SEPARATOR: u8 = b'|';

fn fnv1a(state: u64, bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(state, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

/// splitmix64 finalizer.
#[must_use]
pub const fn splitmix64(mut value: u64) -> u64 {
    value = value.wrapping_add(0x9e37_79b9_7f4a_7c15);
    value = (value ^ (value >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    value = (value ^ (value >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    value ^ (value >> 31)
}

/// Reduces a string to a well-distributed 64-bit value.
#[must_use]
pub fn stable_hash64(input: &str) -> u64 {
    splitmix64(fnv1a(FNV_OFFSET, input.as_bytes()))
}

/// Incremental builder for 128-bit GUIDs over stringified parts.
#[derive(Debug, Clone)]
pub struct GuidBuilder {
    lane_a: u64,
    lane_b: u64,
    scratch: String,
}

impl Default for GuidBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GuidBuilder {
    /// Starts an empty GUID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lane_a: FNV_OFFSET,
            lane_b: FNV_OFFSET ^ GUID_LANE_SALT,
            scratch: String::new(),
        }
    }

    /// Feeds one part, followed by a separator.
    #[must_use]
    pub fn part(mut self, part: impl fmt::Display) -> Self {
        self.scratch.clear();
        // Writing into a String cannot fail.
        let _ = write!(self.scratch, "{part}");
        self.lane_a = fnv1a(self.lane_a, self.scratch.as_bytes());
        self.lane_a = fnv1a(self.lane_a, &[PART_SEPARATOR]);
        self.lane_b = fnv1a(self.lane_b, self.scratch.as_bytes());
        self.lane_b = fnv1a(self.lane_b, &[PART_SEPARATOR]);
        self
    }

    /// Finishes as a 32-character lowercase hex string.
    #[must_use]
    pub fn finish(self) -> String {
        let a = splitmix64(self.lane_a);
        let b = splitmix64(self.lane_b ^ a);
        format!("{a:016x}{b:016x}")
    }
}
