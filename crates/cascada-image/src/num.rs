//! Utilities for numerics.

use std::cmp::Ordering;

/// An `f32` that implements [`Ord`] according to the IEEE 754 totalOrder predicate.
#[derive(Debug, Clone, Copy)]
pub struct TotalF32(pub f32);

impl PartialEq for TotalF32 {
    fn eq(&self, other: &Self) -> bool {
        f32::total_cmp(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for TotalF32 {}

impl PartialOrd for TotalF32 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TotalF32 {
    fn cmp(&self, other: &Self) -> Ordering {
        f32::total_cmp(&self.0, &other.0)
    }
}

/// Truncates a non-negative `f32` to a `u32`, tolerating rounding error just below an integer.
///
/// Products like `24.0 * (256.0 / 24.0)` can land a hair below the integer they represent. Plain
/// `as u32` truncation would then lose a whole pixel.
#[inline]
pub fn floor_px(v: f32) -> u32 {
    const EPSILON: f32 = 1e-3;
    (v + EPSILON).max(0.0) as u32
}
