//! Block time in Unix milliseconds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unix timestamp in milliseconds.
///
/// Consensus never reads a clock; every timestamp comes from the caller.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Sentinel for "never".
    pub const MAX: Self = Self(i64::MAX);

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Whole seconds, truncated toward zero.
    pub const fn as_seconds(self) -> i64 {
        self.0 / 1000
    }

    pub fn add_millis(self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// `self - earlier` in milliseconds.
    pub fn millis_since(self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::MAX {
            write!(f, "never")
        } else {
            write!(f, "{}ms", self.0)
        }
    }
}
