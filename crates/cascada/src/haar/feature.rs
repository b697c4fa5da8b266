use crate::image::IntegralSource;

use super::HaarRectangle;

/// A Haar-like feature: 2 or 3 weighted rectangles, either axis-aligned or rotated by 45°.
#[derive(Debug, Clone, PartialEq)]
pub struct HaarFeature {
    pub(super) tilted: bool,
    pub(super) rects: Vec<HaarRectangle>,
}

impl HaarFeature {
    pub const MIN_RECTANGLES: usize = 2;
    pub const MAX_RECTANGLES: usize = 3;

    pub fn new(tilted: bool, rects: Vec<HaarRectangle>) -> anyhow::Result<Self> {
        anyhow::ensure!(
            (Self::MIN_RECTANGLES..=Self::MAX_RECTANGLES).contains(&rects.len()),
            "a feature needs {} to {} rectangles, got {}",
            Self::MIN_RECTANGLES,
            Self::MAX_RECTANGLES,
            rects.len(),
        );
        Ok(Self { tilted, rects })
    }

    /// Returns whether this feature uses 45° rotated rectangles.
    pub fn is_tilted(&self) -> bool {
        self.tilted
    }

    pub fn rectangles(&self) -> &[HaarRectangle] {
        &self.rects
    }

    /// Computes the feature value for the window whose top-left corner is at `x, y`.
    ///
    /// This is the sum of the scaled weights times the pixel sums of all rectangles.
    pub fn sum<I: IntegralSource + ?Sized>(&self, image: &I, x: u32, y: u32) -> f64 {
        self.rects
            .iter()
            .map(|rect| rect.weighted_sum(image, x, y, self.tilted))
            .sum()
    }

    /// Rescales all rectangles and recomputes their weights.
    ///
    /// Every rectangle except the first gets `weight * inv_area`. The first rectangle's weight is
    /// derived so that the weighted areas of all rectangles sum to zero, which makes the feature
    /// respond with 0 to a window of constant intensity at any scale.
    pub fn set_scale_and_weight(&mut self, scale: f32, inv_area: f32) {
        for rect in &mut self.rects {
            rect.scale_geometry(scale);
        }

        if let Some((reference, rest)) = self.rects.split_first_mut() {
            let mut weighted_area = 0.0;
            for rect in rest {
                rect.scaled_weight = rect.weight * f64::from(inv_area);
                weighted_area += rect.area() * rect.scaled_weight;
            }
            reference.scaled_weight = -weighted_area / reference.area();
        }
    }
}
