//! Multi-scale sliding-window object detection.
//!
//! The [`HaarObjectDetector`] searches an image for objects by moving a detection window across
//! it at a number of window sizes, and asking its [`HaarClassifier`] about every window. Accepted
//! windows are then combined according to the configured [`SearchMode`].

mod merge;
mod options;
mod schedule;

use image::GrayImage;
use itertools::Itertools;
use rayon::prelude::*;

use crate::{
    cancel::CancellationToken,
    haar::{HaarCascade, HaarClassifier},
    image::{IntegralImage, IntegralSource, Rect, Resolution},
    timer::Timer,
};

pub use merge::{retain_non_overlapping, WindowGrouping};
pub use options::{DetectorOptions, ScalingMode, SearchMode};
pub use schedule::ScaleSchedule;

/// A detected object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    rect: Rect,
    scale: f32,
    neighbors: u32,
}

impl Detection {
    /// Creates a detection for a single accepted window.
    pub fn new(rect: Rect, scale: f32) -> Self {
        Self::with_neighbors(rect, scale, 1)
    }

    pub fn with_neighbors(rect: Rect, scale: f32, neighbors: u32) -> Self {
        Self {
            rect,
            scale,
            neighbors,
        }
    }

    /// Returns the rectangle enclosing the detected object, in image coordinates.
    pub fn bounding_rect(&self) -> Rect {
        self.rect
    }

    pub fn set_bounding_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    /// Returns the scale factor (relative to the cascade's base window) of the detection.
    ///
    /// For merged detections, this is the average scale of the merged windows.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Returns the number of accepted windows this detection was merged from.
    pub fn neighbors(&self) -> u32 {
        self.neighbors
    }
}

/// Detects objects in images using a Haar cascade.
///
/// The detector holds its own copy of the cascade, which it rescales while searching. To search
/// several images concurrently, clone the detector.
#[derive(Clone)]
pub struct HaarObjectDetector {
    classifier: HaarClassifier,
    options: DetectorOptions,
    grouping: WindowGrouping,
    t_integral: Timer,
    t_search: Timer,
    t_merge: Timer,
}

impl HaarObjectDetector {
    /// Creates a detector using [`DetectorOptions::default`].
    pub fn new(cascade: HaarCascade) -> Self {
        let options = DetectorOptions::default();
        Self {
            grouping: grouping_for(&options),
            classifier: HaarClassifier::new(cascade),
            options,
            t_integral: Timer::new("integral"),
            t_search: Timer::new("search"),
            t_merge: Timer::new("merge"),
        }
    }

    /// Creates a detector with the given options.
    ///
    /// Returns an error if the options are invalid.
    pub fn with_options(cascade: HaarCascade, options: DetectorOptions) -> anyhow::Result<Self> {
        let mut this = Self::new(cascade);
        this.set_options(options)?;
        Ok(this)
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }

    /// Replaces the search options.
    ///
    /// Returns an error (and keeps the previous options) if `options` are invalid.
    pub fn set_options(&mut self, options: DetectorOptions) -> anyhow::Result<()> {
        options.validate()?;
        self.grouping = grouping_for(&options);
        self.options = options;
        Ok(())
    }

    pub fn classifier(&self) -> &HaarClassifier {
        &self.classifier
    }

    pub fn cascade(&self) -> &HaarCascade {
        self.classifier.cascade()
    }

    /// Returns the scale factors a search on an image of size `image` visits, in search order.
    ///
    /// Returns an error if the options are inconsistent with the image size.
    pub fn scales(&self, image: Resolution) -> anyhow::Result<Vec<f32>> {
        let base = self.cascade().window_size();

        let limits = [("minimum", self.options.min_size), ("maximum", self.options.max_size)];
        for (name, size) in limits {
            if let Some(size) = size {
                anyhow::ensure!(
                    image.fits(size),
                    "{name} window size {size} exceeds the image size {image}"
                );
            }
        }
        let min = self.options.min_size.map_or(base, |min| min.max(base));
        let max = self.options.max_size.unwrap_or(image);

        Ok(ScaleSchedule::new(
            base,
            min,
            max,
            self.options.scaling_factor,
            self.options.scaling_mode,
        )
        .collect())
    }

    /// Computes the integral image of `image` and searches it for objects.
    pub fn detect_image(&mut self, image: &GrayImage) -> anyhow::Result<Vec<Detection>> {
        let integral = self.t_integral.time(|| IntegralImage::new(image));
        self.detect(&integral)
    }

    /// Searches an integral image for objects.
    pub fn detect<I: IntegralSource + Sync + ?Sized>(
        &mut self,
        image: &I,
    ) -> anyhow::Result<Vec<Detection>> {
        self.detect_with_cancel(image, &CancellationToken::new())
    }

    /// Searches an integral image for objects, stopping early if `cancel` is triggered.
    ///
    /// The token is checked before each scale. A cancelled search returns an error.
    pub fn detect_with_cancel<I: IntegralSource + Sync + ?Sized>(
        &mut self,
        image: &I,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<Detection>> {
        let res = image.resolution();
        let scales = self.scales(res)?;
        log::trace!("searching {res} image at {} scales: {scales:?}", scales.len());

        let single = self.options.search_mode == SearchMode::Single;
        let mut candidates = Vec::new();
        {
            let _guard = self.t_search.start();
            for scale in scales {
                if cancel.is_cancelled() {
                    anyhow::bail!("detection was cancelled");
                }

                self.classifier.set_scale(scale);
                let found = search_scale(&self.classifier, &self.options, image, single);
                log::trace!(
                    "scale {scale}: {} window(s) accepted at {}",
                    found.len(),
                    self.classifier.window_size(),
                );
                candidates.extend(found);

                if single && !candidates.is_empty() {
                    break;
                }
            }
        }

        let raw = candidates.len();
        self.t_merge.time(|| match self.options.search_mode {
            SearchMode::Default | SearchMode::Single => {}
            SearchMode::NoOverlap => retain_non_overlapping(&mut candidates),
            SearchMode::Average => {
                let merged = self.grouping.process(&mut candidates).collect::<Vec<_>>();
                candidates = merged;
            }
        });

        log::debug!(
            "{} detection(s) from {raw} accepted window(s) ({:?})",
            candidates.len(),
            self.options.search_mode,
        );
        Ok(candidates)
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_integral, &self.t_search, &self.t_merge].into_iter()
    }
}

fn grouping_for(options: &DetectorOptions) -> WindowGrouping {
    let mut grouping = WindowGrouping::new();
    grouping.set_iou_thresh(options.group_iou);
    grouping.set_min_neighbors(options.min_neighbors);
    grouping
}

/// Scans all windows at the classifier's current scale in raster order.
///
/// With `stop_at_first`, the scan ends at the first accepted window.
fn search_scale<I: IntegralSource + Sync + ?Sized>(
    classifier: &HaarClassifier,
    options: &DetectorOptions,
    image: &I,
    stop_at_first: bool,
) -> Vec<Detection> {
    let res = image.resolution();
    let window = classifier.window_size();
    if !res.fits(window) {
        return Vec::new();
    }

    let scale = classifier.scale();
    let step = ((options.step_ratio * scale) as usize).max(1);
    let xs = (0..=res.width() - window.width()).step_by(step);
    let ys = (0..=res.height() - window.height()).step_by(step);

    let check = |x: u32, y: u32| {
        let rect = Rect::from_top_left(x as i32, y as i32, window.width(), window.height());
        classifier
            .compute(image, rect)
            .then(|| Detection::new(rect, scale))
    };

    if stop_at_first {
        ys.cartesian_product(xs)
            .find_map(|(y, x)| check(x, y))
            .into_iter()
            .collect()
    } else if options.parallel {
        ys.collect::<Vec<_>>()
            .into_par_iter()
            .flat_map_iter(|y| xs.clone().filter_map(move |x| check(x, y)))
            .collect()
    } else {
        ys.cartesian_product(xs)
            .filter_map(|(y, x)| check(x, y))
            .collect()
    }
}

#[cfg(test)]
mod tests;
