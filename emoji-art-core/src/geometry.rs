//! Floating point UI coordinates and their conversion to document space.

use serde::{Deserialize, Serialize};

/// A location in canvas coordinates, as reported by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A drag translation, as reported by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    /// Horizontal delta.
    pub width: f64,
    /// Vertical delta.
    pub height: f64,
}

impl Offset {
    /// Create a new offset.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Convert a UI coordinate to document space by truncating toward zero.
///
/// Out-of-range values saturate and NaN maps to zero.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn truncate(value: f64) -> i32 {
    value.trunc() as i32
}

/// Scale an integer size, rounding half to even.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn scale_rounded(size: i32, factor: f64) -> i32 {
    (f64::from(size) * factor).round_ties_even() as i32
}
