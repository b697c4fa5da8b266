use crate::image::{num::floor_px, IntegralSource, Rect, Resolution};

use super::HaarCascade;

/// Evaluates a [`HaarCascade`] on individual detection windows at a configurable scale.
///
/// The classifier owns its cascade. Changing the scale rewrites the cached geometry of every
/// feature rectangle, so a classifier can be used for a single scale at a time. Clone it to
/// evaluate several scales concurrently.
#[derive(Debug, Clone)]
pub struct HaarClassifier {
    cascade: HaarCascade,
    scale: f32,
    inv_area: f32,
}

impl HaarClassifier {
    /// Creates a classifier at scale 1.
    pub fn new(cascade: HaarCascade) -> Self {
        let mut this = Self {
            cascade,
            scale: 1.0,
            inv_area: 1.0,
        };
        this.rescale(1.0);
        this
    }

    pub fn cascade(&self) -> &HaarCascade {
        &self.cascade
    }

    /// Returns the current scale factor relative to the cascade's base window.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Returns the reciprocal of the scaled window area, `1 / (width * height * scale²)`.
    pub fn inv_area(&self) -> f32 {
        self.inv_area
    }

    /// Sets the scale factor, rescaling all features of the cascade.
    ///
    /// Setting the scale the classifier already has does nothing.
    pub fn set_scale(&mut self, scale: f32) {
        if scale == self.scale {
            return;
        }
        self.rescale(scale);
    }

    fn rescale(&mut self, scale: f32) {
        let (w, h) = (self.cascade.width() as f32, self.cascade.height() as f32);
        self.scale = scale;
        self.inv_area = 1.0 / (w * h * scale * scale);
        self.cascade.set_scale(scale, self.inv_area);
        log::trace!("rescaled cascade to {scale} ({})", self.window_size());
    }

    /// Returns the size of the detection window at the current scale.
    pub fn window_size(&self) -> Resolution {
        Resolution::new(
            floor_px(self.cascade.width() as f32 * self.scale),
            floor_px(self.cascade.height() as f32 * self.scale),
        )
    }

    /// Returns whether the cascade accepts `window`.
    ///
    /// The window should have the size returned by [`HaarClassifier::window_size`].
    pub fn compute<I: IntegralSource + ?Sized>(&self, image: &I, window: Rect) -> bool {
        self.rejecting_stage(image, window).is_none()
    }

    /// Runs the cascade on `window` and returns the index of the first stage that rejects it, or
    /// [`None`] if every stage accepts it.
    ///
    /// Stages after the rejecting one are not evaluated. Windows that do not lie entirely inside
    /// of the image, or that are smaller than [`HaarClassifier::window_size`], are rejected by the
    /// first stage.
    pub fn rejecting_stage<I: IntegralSource + ?Sized>(
        &self,
        image: &I,
        window: Rect,
    ) -> Option<usize> {
        let Some((x, y)) = window_origin(image.resolution(), self.window_size(), window) else {
            log::trace!("window {window:?} does not hold the scaled cascade, rejecting");
            return Some(0);
        };

        let std_dev = self.std_dev(image, window);
        self.cascade
            .stages()
            .iter()
            .position(|stage| !stage.classify(image, x, y, std_dev))
    }

    /// Computes the standard deviation of the pixel intensities inside of `window`.
    ///
    /// Returns 1 for windows of constant intensity, which makes stage thresholds absolute there.
    ///
    /// # Panics
    ///
    /// This method may panic if `window` is not inside of the image.
    pub fn std_dev<I: IntegralSource + ?Sized>(&self, image: &I, window: Rect) -> f64 {
        let (x, y) = (window.x() as u32, window.y() as u32);
        let (w, h) = (window.width(), window.height());
        let area = window.area() as f64;
        if area == 0.0 {
            return 1.0;
        }

        let mean = image.sum(x, y, w, h) / area;
        let variance = image.squared_sum(x, y, w, h) / area - mean * mean;
        if variance > 0.0 {
            variance.sqrt()
        } else {
            1.0
        }
    }
}

/// Returns the top-left corner of `window` if it lies entirely inside of an image of size `res`
/// and is at least as large as `min`.
fn window_origin(res: Resolution, min: Resolution, window: Rect) -> Option<(u32, u32)> {
    let x = u32::try_from(window.x()).ok()?;
    let y = u32::try_from(window.y()).ok()?;
    let inside =
        window.right() <= i64::from(res.width()) && window.bottom() <= i64::from(res.height());
    let large_enough = Resolution::new(window.width(), window.height()).fits(min);
    (inside && large_enough).then_some((x, y))
}
