use crate::image::IntegralSource;

use super::{
    node::{evaluate_tree, validate_tree},
    HaarFeature, HaarFeatureNode,
};

/// A boosted stage of a cascade.
///
/// A stage sums the outputs of all of its trees and accepts the window if that sum reaches the
/// stage threshold (scaled by the window's standard deviation).
#[derive(Debug, Clone, PartialEq)]
pub struct HaarCascadeStage {
    pub(super) threshold: f64,
    pub(super) parent: Option<usize>,
    pub(super) next: Option<usize>,
    pub(super) trees: Vec<Vec<HaarFeatureNode>>,
}

impl HaarCascadeStage {
    /// Creates a stage from its trees.
    ///
    /// Returns an error if the stage has no trees, if any tree is empty, or if a node references
    /// a child that does not come after it in the same tree.
    pub fn new(threshold: f64, trees: Vec<Vec<HaarFeatureNode>>) -> anyhow::Result<Self> {
        anyhow::ensure!(threshold.is_finite(), "stage threshold must be finite");
        anyhow::ensure!(!trees.is_empty(), "stage must contain at least one tree");
        for (i, tree) in trees.iter().enumerate() {
            validate_tree(tree).map_err(|e| e.context(format!("invalid tree {i}")))?;
        }

        Ok(Self {
            threshold,
            parent: None,
            next: None,
            trees,
        })
    }

    /// Sets the parent and next stage indices.
    ///
    /// These are carried along from cascade definitions that use them. Evaluation always runs the
    /// stages in sequence and ignores the links.
    #[must_use]
    pub fn with_links(mut self, parent: Option<usize>, next: Option<usize>) -> Self {
        self.parent = parent;
        self.next = next;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn next(&self) -> Option<usize> {
        self.next
    }

    pub fn trees(&self) -> &[Vec<HaarFeatureNode>] {
        &self.trees
    }

    /// Iterates over the features of all nodes of this stage.
    pub fn features(&self) -> impl Iterator<Item = &HaarFeature> {
        self.trees.iter().flatten().map(HaarFeatureNode::feature)
    }

    pub(super) fn features_mut(&mut self) -> impl Iterator<Item = &mut HaarFeature> {
        self.trees.iter_mut().flatten().map(HaarFeatureNode::feature_mut)
    }

    /// Returns the sum of the values produced by all trees for the window at `x, y`.
    pub fn sum<I: IntegralSource + ?Sized>(&self, image: &I, x: u32, y: u32) -> f64 {
        self.trees
            .iter()
            .map(|tree| evaluate_tree(tree, image, x, y))
            .sum()
    }

    /// Returns whether this stage accepts the window at `x, y`.
    ///
    /// `std_dev` is the standard deviation of the pixel intensities in the window. It normalizes
    /// the threshold so that the stage is insensitive to contrast.
    pub fn classify<I: IntegralSource + ?Sized>(
        &self,
        image: &I,
        x: u32,
        y: u32,
        std_dev: f64,
    ) -> bool {
        self.sum(image, x, y) >= self.threshold * std_dev
    }
}
