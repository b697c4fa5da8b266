//! Merging of overlapping candidate windows.
//!
//! A cascade usually accepts several neighboring windows around every object, often at several
//! adjacent scales. This module implements the two strategies that reduce those candidates:
//!
//! - [`retain_non_overlapping`] keeps candidates in search order and drops every candidate that
//!   intersects one that was already kept.
//! - [`WindowGrouping`] clusters candidates by intersection-over-union and replaces every
//!   cluster with its average rectangle. The size of a cluster is reported as the number of
//!   neighbors of the resulting detection, and clusters with too few members are discarded.

use crate::image::{num::TotalF32, Rect};

use super::Detection;

/// Keeps candidates in order, dropping any candidate that intersects an already kept one.
pub fn retain_non_overlapping(candidates: &mut Vec<Detection>) {
    let mut kept: Vec<Rect> = Vec::with_capacity(candidates.len());
    candidates.retain(|det| {
        let rect = det.bounding_rect();
        if kept.iter().any(|other| other.intersects(&rect)) {
            false
        } else {
            kept.push(rect);
            true
        }
    });
}

/// Clusters overlapping candidates and averages each cluster.
#[derive(Clone)]
pub struct WindowGrouping {
    iou_thresh: f32,
    min_neighbors: u32,
    group_buf: Vec<Detection>,
    out_buf: Vec<Detection>,
}

impl WindowGrouping {
    /// The default intersection-over-union threshold used to determine if two windows overlap.
    pub const DEFAULT_IOU_THRESH: f32 = 0.3;

    pub fn new() -> Self {
        Self {
            iou_thresh: Self::DEFAULT_IOU_THRESH,
            min_neighbors: 1,
            group_buf: Vec::new(),
            out_buf: Vec::new(),
        }
    }

    /// Sets the intersection-over-union threshold to consider two windows part of the same
    /// cluster.
    pub fn set_iou_thresh(&mut self, iou_thresh: f32) {
        self.iou_thresh = iou_thresh;
    }

    /// Sets the number of windows a cluster needs to produce a detection.
    pub fn set_min_neighbors(&mut self, min_neighbors: u32) {
        self.min_neighbors = min_neighbors;
    }

    /// Groups `candidates`.
    ///
    /// `candidates` will be emptied in the process. The merged detections are returned as an
    /// iterator, largest scale first.
    pub fn process(
        &mut self,
        candidates: &mut Vec<Detection>,
    ) -> impl Iterator<Item = Detection> + '_ {
        self.out_buf.clear();

        // Sort by ascending scale, seed clusters with the largest windows by starting at the back.
        // The sort is stable, so equal scales are seeded in search order.
        candidates.reverse();
        candidates.sort_by_key(|det| TotalF32(det.scale()));

        while let Some(seed) = candidates.pop() {
            self.group_buf.clear();
            self.group_buf.push(seed);
            candidates.retain(|other| {
                let iou = seed.bounding_rect().iou(&other.bounding_rect());
                if iou >= self.iou_thresh {
                    self.group_buf.push(*other);
                    false
                } else {
                    true
                }
            });

            let neighbors: u32 = self.group_buf.iter().map(Detection::neighbors).sum();
            if neighbors < self.min_neighbors {
                continue;
            }

            // every window is weighted with the number of raw windows it stands for
            let mut acc = [0.0f64; 5];
            for det in &self.group_buf {
                let rect = det.bounding_rect();
                let weight = f64::from(det.neighbors());
                acc[0] += f64::from(rect.x()) * weight;
                acc[1] += f64::from(rect.y()) * weight;
                acc[2] += f64::from(rect.width()) * weight;
                acc[3] += f64::from(rect.height()) * weight;
                acc[4] += f64::from(det.scale()) * weight;
            }
            let divisor = f64::from(neighbors);
            let [x, y, w, h, scale] = acc.map(|v| v / divisor);

            let rect = Rect::from_top_left(
                x.round() as i32,
                y.round() as i32,
                w.round() as u32,
                h.round() as u32,
            );
            self.out_buf
                .push(Detection::with_neighbors(rect, scale as f32, neighbors));
        }

        self.group_buf.clear();
        self.out_buf.drain(..)
    }
}

impl Default for WindowGrouping {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: i32, y: i32, size: u32, scale: f32) -> Detection {
        Detection::new(Rect::from_top_left(x, y, size, size), scale)
    }

    #[test]
    fn non_overlapping_keeps_first() {
        let mut candidates = vec![
            det(0, 0, 24, 1.0),
            det(10, 10, 24, 1.0),
            det(24, 0, 24, 1.0), // touches the first, doesn't intersect
            det(30, 5, 24, 1.0), // intersects the third
        ];
        retain_non_overlapping(&mut candidates);

        let rects = candidates
            .iter()
            .map(|d| (d.bounding_rect().x(), d.bounding_rect().y()))
            .collect::<Vec<_>>();
        assert_eq!(rects, [(0, 0), (24, 0)]);
    }

    #[test]
    fn averages_clusters() {
        let mut grouping = WindowGrouping::new();
        let mut candidates = vec![
            det(10, 10, 24, 1.0),
            det(12, 10, 24, 1.0),
            det(100, 100, 24, 1.0),
            det(11, 13, 24, 1.0),
        ];
        let merged = grouping.process(&mut candidates).collect::<Vec<_>>();
        assert!(candidates.is_empty());
        assert_eq!(merged.len(), 2);

        let cluster = merged
            .iter()
            .find(|d| d.neighbors() == 3)
            .expect("missing cluster");
        assert_eq!(cluster.bounding_rect(), Rect::from_top_left(11, 11, 24, 24));

        let lonely = merged.iter().find(|d| d.neighbors() == 1).unwrap();
        assert_eq!(lonely.bounding_rect(), Rect::from_top_left(100, 100, 24, 24));
    }

    #[test]
    fn seeds_with_largest_scale() {
        let mut grouping = WindowGrouping::new();
        grouping.set_iou_thresh(0.5);

        // the first window overlaps the third enough, but lies inside the larger second window,
        // which claims the third first
        let mut candidates = vec![
            det(0, 0, 20, 1.0),
            det(0, 0, 30, 1.5),
            det(-4, -4, 28, 1.4),
        ];
        let merged = grouping.process(&mut candidates).collect::<Vec<_>>();
        assert_eq!(merged[0].neighbors(), 2);
        assert!(merged[0].scale() > 1.4);
    }

    #[test]
    fn discards_small_clusters() {
        let mut grouping = WindowGrouping::new();
        grouping.set_min_neighbors(2);

        let mut candidates = vec![det(0, 0, 24, 1.0), det(1, 0, 24, 1.0), det(200, 0, 24, 1.0)];
        let merged = grouping.process(&mut candidates).collect::<Vec<_>>();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].neighbors(), 2);
        assert_eq!(merged[0].bounding_rect().y(), 0);
        assert_eq!(merged[0].bounding_rect().width(), 24);
    }
}
