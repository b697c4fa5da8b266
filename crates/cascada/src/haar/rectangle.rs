use crate::image::IntegralSource;

/// A weighted rectangle of a Haar-like feature.
///
/// The rectangle is defined in the coordinate space of the cascade's base window. When the
/// classifier changes its scale, the rectangle caches its geometry and weight for that scale, so
/// evaluating a window needs no per-window arithmetic beyond the table lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct HaarRectangle {
    pub(super) x: u32,
    pub(super) y: u32,
    pub(super) width: u32,
    pub(super) height: u32,
    pub(super) weight: f64,

    pub(super) scaled_x: u32,
    pub(super) scaled_y: u32,
    pub(super) scaled_width: u32,
    pub(super) scaled_height: u32,
    pub(super) scaled_weight: f64,
}

impl HaarRectangle {
    /// Creates a rectangle at `x, y` of size `width x height` in base window coordinates.
    pub fn new(x: u32, y: u32, width: u32, height: u32, weight: f64) -> anyhow::Result<Self> {
        anyhow::ensure!(
            width > 0 && height > 0,
            "feature rectangle at ({x},{y}) has empty size {width}x{height}"
        );
        anyhow::ensure!(weight.is_finite(), "feature rectangle weight must be finite");

        Ok(Self {
            x,
            y,
            width,
            height,
            weight,
            scaled_x: x,
            scaled_y: y,
            scaled_width: width,
            scaled_height: height,
            scaled_weight: weight,
        })
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the weight this rectangle was defined with.
    ///
    /// The weight of a feature's first rectangle is ignored when scaling, see
    /// [`HaarFeature::set_scale_and_weight`](super::HaarFeature::set_scale_and_weight).
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn scaled_x(&self) -> u32 {
        self.scaled_x
    }

    pub fn scaled_y(&self) -> u32 {
        self.scaled_y
    }

    pub fn scaled_width(&self) -> u32 {
        self.scaled_width
    }

    pub fn scaled_height(&self) -> u32 {
        self.scaled_height
    }

    pub fn scaled_weight(&self) -> f64 {
        self.scaled_weight
    }

    /// Returns the area of the rectangle at the current scale.
    pub fn area(&self) -> f64 {
        f64::from(self.scaled_width) * f64::from(self.scaled_height)
    }

    /// Scales the geometry of this rectangle.
    ///
    /// Scaled coordinates are truncated, so a rectangle inside the base window stays inside of the
    /// scaled window. Sizes never collapse below 1 pixel.
    pub(super) fn scale_geometry(&mut self, scale: f32) {
        let scale_px = |v: u32| (v as f32 * scale) as u32;
        self.scaled_x = scale_px(self.x);
        self.scaled_y = scale_px(self.y);
        self.scaled_width = scale_px(self.width).max(1);
        self.scaled_height = scale_px(self.height).max(1);
    }

    /// Returns the weighted pixel sum covered by this rectangle in the window at `x, y`.
    #[inline]
    pub(super) fn weighted_sum<I: IntegralSource + ?Sized>(
        &self,
        image: &I,
        x: u32,
        y: u32,
        tilted: bool,
    ) -> f64 {
        let (rx, ry) = (x + self.scaled_x, y + self.scaled_y);
        let sum = if tilted {
            image.tilted_sum(rx, ry, self.scaled_width, self.scaled_height)
        } else {
            image.sum(rx, ry, self.scaled_width, self.scaled_height)
        };
        sum * self.scaled_weight
    }
}
