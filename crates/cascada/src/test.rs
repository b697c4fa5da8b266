//! Shared test fixtures.

use std::cell::Cell;

use image::{GrayImage, Luma};

use crate::{
    haar::{HaarCascade, HaarCascadeStage, HaarFeature, HaarFeatureNode, HaarRectangle},
    image::{IntegralImage, IntegralSource, Resolution},
};

pub fn flat_integral(width: u32, height: u32, value: u8) -> IntegralImage {
    IntegralImage::new(&GrayImage::from_pixel(width, height, Luma([value])))
}

/// Left half against right half of a 24x24 window.
pub fn symmetric_feature() -> HaarFeature {
    HaarFeature::new(
        false,
        vec![
            HaarRectangle::new(0, 0, 12, 24, -1.0).unwrap(),
            HaarRectangle::new(12, 0, 12, 24, 1.0).unwrap(),
        ],
    )
    .unwrap()
}

/// A node using [`symmetric_feature`] with threshold 0.
///
/// On flat images the feature responds with 0, so the node produces `right`.
pub fn stump(left: f64, right: f64) -> HaarFeatureNode {
    HaarFeatureNode::new(0.0, left, right, symmetric_feature())
}

/// A single-tree stage that sums to 0 on flat images.
pub fn stage(threshold: f64) -> HaarCascadeStage {
    HaarCascadeStage::new(threshold, vec![vec![stump(-1.0, 0.0)]]).unwrap()
}

/// A 24x24 cascade with one [`stage`] per threshold.
pub fn cascade(thresholds: &[f64]) -> HaarCascade {
    HaarCascade::new(24, 24, thresholds.iter().copied().map(stage).collect()).unwrap()
}

/// Wraps an [`IntegralSource`] and counts the queries made to it.
pub struct CountingSource<'a> {
    inner: &'a IntegralImage,
    queries: Cell<usize>,
}

impl<'a> CountingSource<'a> {
    pub fn new(inner: &'a IntegralImage) -> Self {
        Self {
            inner,
            queries: Cell::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.get()
    }

    fn count(&self) {
        self.queries.set(self.queries.get() + 1);
    }
}

impl IntegralSource for CountingSource<'_> {
    fn resolution(&self) -> Resolution {
        self.inner.resolution()
    }

    fn sum(&self, x: u32, y: u32, width: u32, height: u32) -> f64 {
        self.count();
        self.inner.sum(x, y, width, height)
    }

    fn squared_sum(&self, x: u32, y: u32, width: u32, height: u32) -> f64 {
        self.count();
        self.inner.squared_sum(x, y, width, height)
    }

    fn tilted_sum(&self, x: u32, y: u32, width: u32, height: u32) -> f64 {
        self.count();
        self.inner.tilted_sum(x, y, width, height)
    }
}
