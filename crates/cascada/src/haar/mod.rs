//! Haar cascade model and window classification.
//!
//! A [`HaarCascade`] consists of [`HaarCascadeStage`]s. Each stage holds one or more trees of
//! [`HaarFeatureNode`]s, and every node thresholds the response of a [`HaarFeature`], the weighted
//! sum of 2 or 3 [`HaarRectangle`]s.
//!
//! Cascades are defined relative to a small base window (eg. 24x24 pixels). The
//! [`HaarClassifier`] rescales the features of its cascade to larger windows and decides whether a
//! given window of an image contains the object.
//!
//! Cascades can be constructed in code, or loaded from JSON via [`HaarCascade::load`] and
//! [`HaarCascade::from_json`].

mod cascade;
mod classifier;
mod definition;
mod feature;
mod node;
mod rectangle;
mod stage;

pub use cascade::HaarCascade;
pub use classifier::HaarClassifier;
pub use feature::HaarFeature;
pub use node::HaarFeatureNode;
pub use rectangle::HaarRectangle;
pub use stage::HaarCascadeStage;
