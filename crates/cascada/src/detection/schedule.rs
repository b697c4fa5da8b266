//! Scale schedules of the multi-scale search.

use crate::image::{num::floor_px, Resolution};

use super::ScalingMode;

/// Iterator over the scale factors of a multi-scale search.
///
/// A scale factor `f` corresponds to a window of `floor(base * f)` pixels per axis. The schedule
/// visits every window size between `min` and `max` (inclusive) that is reachable from its start
/// by repeatedly applying the scaling factor.
#[derive(Debug, Clone)]
pub struct ScaleSchedule {
    base: Resolution,
    min: Resolution,
    max: Resolution,
    factor: f32,
    mode: ScalingMode,
    next: Option<f32>,
}

impl ScaleSchedule {
    /// Creates a schedule for a cascade with window size `base`.
    ///
    /// # Panics
    ///
    /// This method will panic if `factor` is not finite or not greater than 1.
    pub fn new(
        base: Resolution,
        min: Resolution,
        max: Resolution,
        factor: f32,
        mode: ScalingMode,
    ) -> Self {
        assert!(
            factor.is_finite() && factor > 1.0,
            "invalid scaling factor {factor}"
        );
        let ratio = |size: u32, base: u32| size as f32 / base as f32;
        let start = match mode {
            ScalingMode::SmallerToGreater => ratio(min.width(), base.width())
                .max(ratio(min.height(), base.height())),
            ScalingMode::GreaterToSmaller => ratio(max.width(), base.width())
                .min(ratio(max.height(), base.height())),
        };

        Self {
            base,
            min,
            max,
            factor,
            mode,
            next: Some(start),
        }
    }

    /// Returns the window size at scale factor `scale`.
    pub fn window_size(&self, scale: f32) -> Resolution {
        Resolution::new(
            floor_px(self.base.width() as f32 * scale),
            floor_px(self.base.height() as f32 * scale),
        )
    }
}

impl Iterator for ScaleSchedule {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let scale = self.next?;
        let window = self.window_size(scale);
        if !(self.max.fits(window) && window.fits(self.min)) {
            self.next = None;
            return None;
        }

        self.next = Some(match self.mode {
            ScalingMode::SmallerToGreater => scale * self.factor,
            ScalingMode::GreaterToSmaller => scale / self.factor,
        });
        Some(scale)
    }
}
