use crate::image::IntegralSource;

use super::HaarFeature;

/// A decision node of a boosted tree: a feature, a threshold, and the values (or child nodes)
/// selected depending on which side of the threshold the feature value falls.
#[derive(Debug, Clone, PartialEq)]
pub struct HaarFeatureNode {
    pub(super) threshold: f64,
    pub(super) left_value: f64,
    pub(super) right_value: f64,
    pub(super) left_node: Option<usize>,
    pub(super) right_node: Option<usize>,
    pub(super) feature: HaarFeature,
}

impl HaarFeatureNode {
    /// Creates a leaf node (a decision stump) without child nodes.
    pub fn new(threshold: f64, left_value: f64, right_value: f64, feature: HaarFeature) -> Self {
        Self {
            threshold,
            left_value,
            right_value,
            left_node: None,
            right_node: None,
            feature,
        }
    }

    /// Sets the indices of the child nodes within the same tree.
    ///
    /// If a child is set, evaluation continues at that child instead of producing the
    /// corresponding value.
    #[must_use]
    pub fn with_children(mut self, left_node: Option<usize>, right_node: Option<usize>) -> Self {
        self.left_node = left_node;
        self.right_node = right_node;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn left_value(&self) -> f64 {
        self.left_value
    }

    pub fn right_value(&self) -> f64 {
        self.right_value
    }

    pub fn left_node(&self) -> Option<usize> {
        self.left_node
    }

    pub fn right_node(&self) -> Option<usize> {
        self.right_node
    }

    pub fn feature(&self) -> &HaarFeature {
        &self.feature
    }

    pub(super) fn feature_mut(&mut self) -> &mut HaarFeature {
        &mut self.feature
    }

    /// Evaluates this node in isolation, ignoring its children.
    ///
    /// Returns [`Self::left_value`] if the feature value is below the threshold, and
    /// [`Self::right_value`] otherwise.
    pub fn classify<I: IntegralSource + ?Sized>(&self, image: &I, x: u32, y: u32) -> f64 {
        self.decide(image, x, y).0
    }

    fn decide<I: IntegralSource + ?Sized>(&self, image: &I, x: u32, y: u32) -> (f64, Option<usize>) {
        if self.feature.sum(image, x, y) < self.threshold {
            (self.left_value, self.left_node)
        } else {
            (self.right_value, self.right_node)
        }
    }
}

/// Walks a tree of nodes, starting at the root (index 0), and returns the value of the leaf it
/// ends at.
///
/// Child indices are validated to point strictly forward, so the walk always terminates.
pub(super) fn evaluate_tree<I: IntegralSource + ?Sized>(
    tree: &[HaarFeatureNode],
    image: &I,
    x: u32,
    y: u32,
) -> f64 {
    let mut current = 0;
    loop {
        let (value, next) = tree[current].decide(image, x, y);
        match next {
            Some(child) => current = child,
            None => return value,
        }
    }
}

/// Checks that all child references of `tree` point forward and stay inside of it.
pub(super) fn validate_tree(tree: &[HaarFeatureNode]) -> anyhow::Result<()> {
    anyhow::ensure!(!tree.is_empty(), "tree must contain at least one node");
    for (index, node) in tree.iter().enumerate() {
        for child in [node.left_node, node.right_node].into_iter().flatten() {
            anyhow::ensure!(
                child > index && child < tree.len(),
                "node {index} references invalid child node {child} (tree has {} nodes)",
                tree.len(),
            );
        }
    }
    Ok(())
}
