//! Runs a Haar cascade on an image and prints the detected rectangles.
//!
//! Usage: `cascada <cascade.json> <image> [options.json]`
//!
//! Every detection is printed as a line `x y width height`.

use std::{env, path::PathBuf};

use cascada::{
    detection::{DetectorOptions, HaarObjectDetector},
    haar::HaarCascade,
    image::load_gray,
};

const USAGE: &str = "usage: cascada <cascade.json> <image> [options.json]";

fn main() -> anyhow::Result<()> {
    cascada::init_logger!();
    cascada::init_thread_pool(None)?;

    let mut args = env::args_os().skip(1).map(PathBuf::from);
    let (Some(cascade_path), Some(image_path)) = (args.next(), args.next()) else {
        anyhow::bail!("{USAGE}");
    };
    let options = match args.next() {
        Some(path) => DetectorOptions::load(path)?,
        None => DetectorOptions::default(),
    };
    if args.next().is_some() {
        anyhow::bail!("{USAGE}");
    }

    let cascade = HaarCascade::load(&cascade_path)?;
    let image = load_gray(&image_path)?;

    let mut detector = HaarObjectDetector::with_options(cascade, options)?;
    let detections = detector.detect_image(&image)?;

    for det in &detections {
        let rect = det.bounding_rect();
        println!("{} {} {} {}", rect.x(), rect.y(), rect.width(), rect.height());
    }

    for timer in detector.timers() {
        log::debug!("{timer}");
    }

    Ok(())
}
