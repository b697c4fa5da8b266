//! Image loading and image-side primitives.
//!
//! Re-exports everything from `cascada-image`, and adds loading of grayscale images from the
//! filesystem.

use std::path::Path;

use image::GrayImage;

pub use cascada_image::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
enum ImageFormat {
    Jpeg,
    Png,
    Gif,
}

impl ImageFormat {
    fn from_path(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            Some("png") => Ok(Self::Png),
            Some("gif") => Ok(Self::Gif),
            _ => anyhow::bail!(
                "invalid image path '{}' (must have one of the supported extensions)",
                path.display()
            ),
        }
    }

    fn to_image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::Gif => image::ImageFormat::Gif,
        }
    }
}

/// Loads an image from the filesystem and converts it to 8-bit grayscale.
///
/// The path must have a supported file extension (`jpeg`, `jpg`, `png` or `gif`).
pub fn load_gray<A: AsRef<Path>>(path: A) -> anyhow::Result<GrayImage> {
    load_gray_impl(path.as_ref())
}

fn load_gray_impl(path: &Path) -> anyhow::Result<GrayImage> {
    let format = ImageFormat::from_path(path)?;
    let data = std::fs::read(path)?;
    let image = image::load_from_memory_with_format(&data, format.to_image_format())?.to_luma8();
    log::debug!(
        "loaded {}x{} image from '{}'",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(image)
}

/// Loads an image from the filesystem and computes its [`IntegralImage`].
pub fn load_integral<A: AsRef<Path>>(path: A) -> anyhow::Result<IntegralImage> {
    Ok(IntegralImage::new(&load_gray(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(
            ImageFormat::from_path(Path::new("a/b.jpg")).unwrap(),
            ImageFormat::Jpeg
        );
        assert_eq!(
            ImageFormat::from_path(Path::new("b.jpeg")).unwrap(),
            ImageFormat::Jpeg
        );
        assert_eq!(
            ImageFormat::from_path(Path::new("face.png")).unwrap(),
            ImageFormat::Png
        );
        assert!(ImageFormat::from_path(Path::new("face.bmp")).is_err());
        assert!(ImageFormat::from_path(Path::new("face")).is_err());
    }

    #[test]
    fn missing_file() {
        assert!(load_gray("/nonexistent/dir/image.png").is_err());
    }
}
