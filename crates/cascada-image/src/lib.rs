//! Image-side primitives for Haar cascade object detection.
//!
//! # Overview
//!
//! ## Integral Images
//!
//! Cascade classifiers never look at individual pixels. Every query they make is the sum (or sum
//! of squares) of the pixels inside some rectangle, so images are preprocessed into an
//! [`IntegralImage`] that answers each such query with a constant number of table lookups.
//!
//! The [`IntegralSource`] trait describes the queries a classifier is allowed to make. It is
//! implemented by [`IntegralImage`], but can also be implemented by wrappers (eg. to count or
//! restrict queries in tests).
//!
//! Besides the usual axis-aligned sums, [`IntegralImage`] also supports sums over rectangles that
//! are rotated by 45°, which are needed by cascades that use tilted features.
//!
//! ## Rectangles
//!
//! Detection windows and detection results are expressed as integer [`Rect`]s in pixel
//! coordinates of the source image.

pub mod num;
pub mod rect;

mod integral;
mod resolution;

pub use integral::{IntegralImage, IntegralSource};
pub use rect::Rect;
pub use resolution::Resolution;
