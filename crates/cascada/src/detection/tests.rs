use image::{GrayImage, Luma};

use crate::{
    haar::{HaarCascadeStage, HaarFeature, HaarFeatureNode, HaarRectangle},
    image::num::floor_px,
    test::{cascade, flat_integral},
};

use super::*;

fn detector(thresholds: &[f64], options: DetectorOptions) -> HaarObjectDetector {
    HaarObjectDetector::with_options(cascade(thresholds), options).unwrap()
}

fn positions(detections: &[Detection]) -> Vec<(i32, i32, u32)> {
    detections
        .iter()
        .map(|d| {
            let r = d.bounding_rect();
            (r.x(), r.y(), r.width())
        })
        .collect()
}

/// Accepts windows whose right half is brighter than their left half.
fn edge_cascade() -> HaarCascade {
    let feature = HaarFeature::new(
        false,
        vec![
            HaarRectangle::new(0, 0, 24, 24, -1.0).unwrap(),
            HaarRectangle::new(12, 0, 12, 24, 2.0).unwrap(),
        ],
    )
    .unwrap();
    let stage =
        HaarCascadeStage::new(0.0, vec![vec![HaarFeatureNode::new(10.0, -1.0, 1.0, feature)]])
            .unwrap();
    HaarCascade::new(24, 24, vec![stage]).unwrap()
}

/// Accepts 12x12 windows whose central diamond is much brighter than the diamond spanning the
/// whole window.
fn diamond_cascade() -> HaarCascade {
    let feature = HaarFeature::new(
        true,
        vec![
            HaarRectangle::new(6, 0, 6, 6, -1.0).unwrap(),
            HaarRectangle::new(6, 3, 3, 3, 4.0).unwrap(),
        ],
    )
    .unwrap();
    let stage =
        HaarCascadeStage::new(0.0, vec![vec![HaarFeatureNode::new(50.0, -1.0, 1.0, feature)]])
            .unwrap();
    HaarCascade::new(12, 12, vec![stage]).unwrap()
}

/// Dark left half, bright right half.
fn edge_image() -> IntegralImage {
    IntegralImage::new(&GrayImage::from_fn(48, 24, |x, _| {
        Luma([if x < 24 { 0 } else { 200 }])
    }))
}

#[test]
fn uniform_image_of_window_size() {
    let image = flat_integral(24, 24, 128);
    let options = DetectorOptions::default().search_mode(SearchMode::Default);

    let detections = detector(&[0.0], options.clone()).detect(&image).unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].bounding_rect(), Rect::from_top_left(0, 0, 24, 24));
    assert_eq!(detections[0].scale(), 1.0);
    assert_eq!(detections[0].neighbors(), 1);

    let detections = detector(&[1.0], options).detect(&image).unwrap();
    assert!(detections.is_empty());
}

#[test]
fn visits_six_scales_in_both_directions() {
    let image = Resolution::new(256, 256);
    for mode in [ScalingMode::SmallerToGreater, ScalingMode::GreaterToSmaller] {
        let options = DetectorOptions::default()
            .scaling_factor(1.5)
            .scaling_mode(mode);
        let scales = detector(&[0.0], options).scales(image).unwrap();
        assert_eq!(scales.len(), 6, "{mode:?}: {scales:?}");
    }
}

#[test]
fn default_mode_reports_all_windows_in_search_order() {
    let image = flat_integral(30, 30, 10);
    let options = DetectorOptions::default().search_mode(SearchMode::Default);
    let detections = detector(&[0.0], options.clone()).detect(&image).unwrap();

    // one 30x30 window, then 25x25 windows 2 pixels apart
    let mut expected = vec![(0, 0, 30)];
    for y in [0, 2, 4] {
        for x in [0, 2, 4] {
            expected.push((x, y, 25));
        }
    }
    assert_eq!(positions(&detections), expected);

    let sequential = detector(&[0.0], options.parallel(false))
        .detect(&image)
        .unwrap();
    assert_eq!(sequential, detections);
}

#[test]
fn smaller_to_greater_order() {
    let image = flat_integral(30, 30, 10);
    let options = DetectorOptions::default()
        .search_mode(SearchMode::Default)
        .scaling_mode(ScalingMode::SmallerToGreater)
        .step_ratio(6.0);
    let detections = detector(&[0.0], options).detect(&image).unwrap();
    // 24x24 windows 6 pixels apart, then 28x28 windows 7 pixels apart
    assert_eq!(
        positions(&detections),
        [(0, 0, 24), (6, 0, 24), (0, 6, 24), (6, 6, 24), (0, 0, 28)]
    );
}

#[test]
fn single_returns_first_hit() {
    let image = flat_integral(30, 30, 10);
    let options = DetectorOptions::default().search_mode(SearchMode::Single);
    let detections = detector(&[0.0], options).detect(&image).unwrap();
    assert_eq!(positions(&detections), [(0, 0, 30)]);

    let options = DetectorOptions::default().search_mode(SearchMode::Single);
    assert!(detector(&[1.0], options).detect(&image).unwrap().is_empty());
}

#[test]
fn no_overlap_drops_intersecting_windows() {
    let image = flat_integral(30, 30, 10);
    let detections = detector(&[0.0], DetectorOptions::default())
        .detect(&image)
        .unwrap();
    assert_eq!(positions(&detections), [(0, 0, 30)]);
}

#[test]
fn average_merges_clusters() {
    let image = flat_integral(30, 30, 10);
    let options = DetectorOptions::default().search_mode(SearchMode::Average);
    let detections = detector(&[0.0], options.clone()).detect(&image).unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].neighbors(), 10);
    // x: (0 + 3 * (0 + 2 + 4)) / 10, width: (30 + 9 * 25) / 10
    assert_eq!(detections[0].bounding_rect(), Rect::from_top_left(2, 2, 26, 26));

    let strict = detector(&[0.0], options.min_neighbors(11))
        .detect(&image)
        .unwrap();
    assert!(strict.is_empty());
}

#[test]
fn finds_edges() {
    let image = edge_image();
    let options = DetectorOptions::default().search_mode(SearchMode::Default);
    let mut detector = HaarObjectDetector::with_options(edge_cascade(), options).unwrap();

    let detections = detector.detect(&image).unwrap();
    let xs = detections
        .iter()
        .map(|d| d.bounding_rect().x())
        .collect::<Vec<_>>();
    assert_eq!(xs, (2..=22).step_by(2).collect::<Vec<_>>());
    assert!(detections.iter().all(|d| d.bounding_rect().y() == 0));

    detector
        .set_options(DetectorOptions::default().search_mode(SearchMode::NoOverlap))
        .unwrap();
    let detections = detector.detect(&image).unwrap();
    assert_eq!(positions(&detections), [(2, 0, 24)]);
}

#[test]
fn tilted_features_at_every_scale() {
    let options = DetectorOptions::default()
        .search_mode(SearchMode::Default)
        .scaling_factor(1.25)
        .step_ratio(0.5);
    let mut detector = HaarObjectDetector::with_options(diamond_cascade(), options).unwrap();
    assert!(detector.cascade().has_tilted_features());

    let flat = flat_integral(60, 60, 20);
    let windows = detector
        .scales(flat.resolution())
        .unwrap()
        .into_iter()
        .map(|scale| floor_px(12.0 * scale))
        .collect::<Vec<_>>();
    assert_eq!(windows, [60, 48, 38, 30, 24, 19, 15, 12]);
    assert!(detector.detect(&flat).unwrap().is_empty());

    // bright 16x16 square centered at (30, 30)
    let mut image = GrayImage::from_pixel(60, 60, Luma([20]));
    for y in 22..38 {
        for x in 22..38 {
            image.put_pixel(x, y, Luma([220]));
        }
    }
    let detections = detector.detect_image(&image).unwrap();
    assert_eq!(detections.len(), 23);

    // only windows 2.4 to 3 times the size of the square respond strongly enough
    let mut sizes = detections
        .iter()
        .map(|d| d.bounding_rect().width())
        .collect::<Vec<_>>();
    sizes.dedup();
    assert_eq!(sizes, [48, 38]);
    for det in &detections {
        let (cx, cy) = det.bounding_rect().center();
        assert!((cx - 30).abs() <= 3 && (cy - 30).abs() <= 3, "{det:?}");
    }
}

#[test]
fn detect_image_computes_integral() {
    let image = GrayImage::from_pixel(24, 24, Luma([50]));
    let mut detector = detector(&[0.0], DetectorOptions::default());
    assert_eq!(detector.detect_image(&image).unwrap().len(), 1);

    let counts = detector.timers().map(Timer::count).collect::<Vec<_>>();
    assert_eq!(counts, [1, 1, 1]);
}

#[test]
fn image_smaller_than_window() {
    let image = flat_integral(20, 30, 10);
    let mut detector = detector(&[0.0], DetectorOptions::default());
    assert!(detector.scales(image.resolution()).unwrap().is_empty());
    assert!(detector.detect(&image).unwrap().is_empty());
}

#[test]
fn size_limits() {
    let image = Resolution::new(30, 30);

    let too_large = DetectorOptions::default().min_size(Resolution::new(31, 24));
    assert!(detector(&[0.0], too_large).scales(image).is_err());

    let too_large = DetectorOptions::default().max_size(Resolution::new(1000, 1000));
    let mut too_large = detector(&[0.0], too_large);
    assert!(too_large.scales(image).is_err());
    assert!(too_large.detect(&flat_integral(30, 30, 10)).is_err());

    let image_sized = DetectorOptions::default().max_size(image);
    assert_eq!(
        detector(&[0.0], image_sized).scales(image).unwrap(),
        detector(&[0.0], DetectorOptions::default())
            .scales(image)
            .unwrap()
    );
    let smaller = DetectorOptions::default().max_size(Resolution::new(24, 30));
    assert_eq!(detector(&[0.0], smaller).scales(image).unwrap(), [1.0]);

    // minimum sizes below the cascade window are raised to it
    let tiny = DetectorOptions::default()
        .min_size(Resolution::new(5, 5))
        .scaling_mode(ScalingMode::SmallerToGreater);
    assert_eq!(detector(&[0.0], tiny).scales(image).unwrap()[0], 1.0);
}

#[test]
fn invalid_options() {
    for options in [
        DetectorOptions::default().scaling_factor(1.0),
        DetectorOptions::default().step_ratio(0.0),
        DetectorOptions::default()
            .min_size(Resolution::new(50, 50))
            .max_size(Resolution::new(40, 40)),
    ] {
        assert!(HaarObjectDetector::with_options(cascade(&[0.0]), options.clone()).is_err());

        let mut detector = HaarObjectDetector::new(cascade(&[0.0]));
        assert!(detector.set_options(options).is_err());
        assert_eq!(detector.options(), &DetectorOptions::default());
    }
}

#[test]
fn cancellation() {
    let image = flat_integral(30, 30, 10);
    let mut detector = detector(&[0.0], DetectorOptions::default());
    let token = CancellationToken::new();
    token.cancel();
    assert!(detector.detect_with_cancel(&image, &token).is_err());

    // a cancelled search leaves the detector usable
    assert_eq!(detector.detect(&image).unwrap().len(), 1);
}
