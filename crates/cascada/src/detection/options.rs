use std::path::Path;

use serde::Deserialize;

use crate::image::Resolution;

/// Describes how candidate windows are combined into the final detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Return every accepted window, in search order.
    Default,

    /// Stop at the first accepted window and return only that.
    Single,

    /// Return accepted windows in search order, dropping any window that intersects one that was
    /// already returned.
    #[default]
    NoOverlap,

    /// Cluster overlapping windows and return one averaged detection per cluster.
    Average,
}

/// The order in which window sizes are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    SmallerToGreater,
    #[default]
    GreaterToSmaller,
}

/// Search configuration of a [`HaarObjectDetector`](super::HaarObjectDetector).
///
/// Options can be assembled with the builder methods, or deserialized from JSON:
///
/// ```json
/// { "search_mode": "average", "scaling_factor": 1.25, "min_size": { "width": 48, "height": 48 } }
/// ```
///
/// Missing fields take their default values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorOptions {
    pub(super) search_mode: SearchMode,
    pub(super) scaling_mode: ScalingMode,
    pub(super) scaling_factor: f32,
    pub(super) min_size: Option<Resolution>,
    pub(super) max_size: Option<Resolution>,
    pub(super) step_ratio: f32,
    pub(super) parallel: bool,
    pub(super) group_iou: f32,
    pub(super) min_neighbors: u32,
}

impl DetectorOptions {
    pub const DEFAULT_SCALING_FACTOR: f32 = 1.2;
    pub const DEFAULT_STEP_RATIO: f32 = 2.0;
    pub const DEFAULT_GROUP_IOU: f32 = 0.3;

    /// Loads options from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let options = Self::from_json(&text)?;
        log::debug!("loaded detector options from '{}': {options:?}", path.display());
        Ok(options)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    #[inline]
    pub fn search_mode(mut self, search_mode: SearchMode) -> Self {
        self.search_mode = search_mode;
        self
    }

    #[inline]
    pub fn scaling_mode(mut self, scaling_mode: ScalingMode) -> Self {
        self.scaling_mode = scaling_mode;
        self
    }

    /// Sets the factor between consecutive window sizes. Must be greater than 1.
    #[inline]
    pub fn scaling_factor(mut self, scaling_factor: f32) -> Self {
        self.scaling_factor = scaling_factor;
        self
    }

    /// Sets the smallest window size to search.
    ///
    /// By default, the cascade's base window size is used. Sizes smaller than the base window are
    /// raised to it.
    #[inline]
    pub fn min_size(mut self, min_size: Resolution) -> Self {
        self.min_size = Some(min_size);
        self
    }

    /// Sets the largest window size to search.
    ///
    /// By default, windows up to the size of the image are searched. Searching an image smaller
    /// than an explicit maximum size is an error.
    #[inline]
    pub fn max_size(mut self, max_size: Resolution) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Sets the distance between neighboring windows, in pixels at the cascade's base scale.
    ///
    /// At scale `f`, windows are `max(1, floor(step_ratio * f))` pixels apart.
    #[inline]
    pub fn step_ratio(mut self, step_ratio: f32) -> Self {
        self.step_ratio = step_ratio;
        self
    }

    /// Enables or disables scanning rows of windows in parallel.
    #[inline]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the intersection-over-union threshold at which [`SearchMode::Average`] puts two
    /// windows into the same cluster.
    #[inline]
    pub fn group_iou(mut self, group_iou: f32) -> Self {
        self.group_iou = group_iou;
        self
    }

    /// Sets the number of windows a cluster needs in [`SearchMode::Average`] to be reported.
    #[inline]
    pub fn min_neighbors(mut self, min_neighbors: u32) -> Self {
        self.min_neighbors = min_neighbors;
        self
    }

    /// Checks the options for consistency.
    ///
    /// Constraints involving the image size are checked when a search starts.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.scaling_factor.is_finite() && self.scaling_factor > 1.0,
            "scaling factor must be a finite number greater than 1 (got {})",
            self.scaling_factor
        );
        anyhow::ensure!(
            self.step_ratio.is_finite() && self.step_ratio > 0.0,
            "step ratio must be a finite positive number (got {})",
            self.step_ratio
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.group_iou),
            "grouping IoU threshold must be between 0 and 1 (got {})",
            self.group_iou
        );
        for (name, size) in [("minimum", self.min_size), ("maximum", self.max_size)] {
            if let Some(size) = size {
                anyhow::ensure!(
                    size.num_pixels() > 0,
                    "{name} window size must not be empty (got {size})"
                );
            }
        }
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            anyhow::ensure!(
                max.fits(min),
                "minimum window size {min} exceeds maximum window size {max}"
            );
        }
        Ok(())
    }
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            search_mode: SearchMode::default(),
            scaling_mode: ScalingMode::default(),
            scaling_factor: Self::DEFAULT_SCALING_FACTOR,
            min_size: None,
            max_size: None,
            step_ratio: Self::DEFAULT_STEP_RATIO,
            parallel: true,
            group_iou: Self::DEFAULT_GROUP_IOU,
            min_neighbors: 1,
        }
    }
}
