//! Integral images (summed-area tables).

use image::GrayImage;

use crate::Resolution;

/// Rectangle-sum queries a cascade classifier performs on an image.
///
/// All coordinates are in pixels of the source image. Implementations must answer every query in
/// constant time; that is what makes evaluating thousands of detection windows per image
/// tractable.
pub trait IntegralSource {
    /// Returns the resolution of the underlying source image.
    fn resolution(&self) -> Resolution;

    /// Returns the sum of all pixel values in the axis-aligned rectangle `x, y, width, height`.
    fn sum(&self, x: u32, y: u32, width: u32, height: u32) -> f64;

    /// Returns the sum of all squared pixel values in the axis-aligned rectangle.
    ///
    /// Together with [`IntegralSource::sum`], this allows computing the variance of a window.
    fn squared_sum(&self, x: u32, y: u32, width: u32, height: u32) -> f64;

    /// Returns the sum of all pixel values in a rectangle rotated by 45°.
    ///
    /// The rotated rectangle's top corner lies at `x, y`. It extends `width` pixels along the
    /// down-right diagonal and `height` pixels along the down-left diagonal, so it requires
    /// `x >= height`, `x + width <= image width` and `y + width + height <= image height`.
    fn tilted_sum(&self, x: u32, y: u32, width: u32, height: u32) -> f64;
}

impl<T: IntegralSource + ?Sized> IntegralSource for &T {
    fn resolution(&self) -> Resolution {
        (**self).resolution()
    }

    fn sum(&self, x: u32, y: u32, width: u32, height: u32) -> f64 {
        (**self).sum(x, y, width, height)
    }

    fn squared_sum(&self, x: u32, y: u32, width: u32, height: u32) -> f64 {
        (**self).squared_sum(x, y, width, height)
    }

    fn tilted_sum(&self, x: u32, y: u32, width: u32, height: u32) -> f64 {
        (**self).tilted_sum(x, y, width, height)
    }
}

/// Precomputed summed-area tables of a grayscale image.
///
/// Three `(width + 1) x (height + 1)` tables are stored: the regular integral image, the integral
/// image of squared pixel values, and the 45° rotated ("tilted") integral image. Row and column 0
/// of every table are zero, so queries need no boundary special-casing.
///
/// Building the tables is linear in the number of pixels (the tilted table additionally walks a
/// margin of `height` columns on either side).
#[derive(Clone)]
pub struct IntegralImage {
    res: Resolution,
    stride: usize,
    sum: Vec<u64>,
    squared: Vec<u64>,
    tilted: Vec<i64>,
}

impl IntegralImage {
    /// Computes the integral image of a grayscale image.
    pub fn new(image: &GrayImage) -> Self {
        let res = Resolution::new(image.width(), image.height());
        Self::from_luma(res, image.as_raw())
    }

    /// Computes the integral image of a row-major, tightly packed buffer of 8-bit luma values.
    ///
    /// # Panics
    ///
    /// This method will panic if `pixels` does not contain exactly `res.num_pixels()` values.
    pub fn from_luma(res: Resolution, pixels: &[u8]) -> Self {
        assert_eq!(
            pixels.len() as u64,
            res.num_pixels(),
            "pixel buffer does not match resolution {res}"
        );

        let (w, h) = (res.width() as usize, res.height() as usize);
        let stride = w + 1;
        let len = stride * (h + 1);

        let mut sum = vec![0u64; len];
        let mut squared = vec![0u64; len];
        for y in 0..h {
            let mut row_sum = 0u64;
            let mut row_squared = 0u64;
            for x in 0..w {
                let px = u64::from(pixels[y * w + x]);
                row_sum += px;
                row_squared += px * px;

                let idx = (y + 1) * stride + (x + 1);
                sum[idx] = sum[idx - stride] + row_sum;
                squared[idx] = squared[idx - stride] + row_squared;
            }
        }

        let tilted = tilted_table(w, h, pixels);

        log::trace!("computed integral image for {res}");
        Self {
            res,
            stride,
            sum,
            squared,
            tilted,
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride + x as usize
    }

    #[inline]
    fn rect_sum(&self, table: &[u64], x: u32, y: u32, width: u32, height: u32) -> u64 {
        let (x1, y1) = (x + width, y + height);
        let a = table[self.index(x, y)];
        let b = table[self.index(x1, y)];
        let c = table[self.index(x, y1)];
        let d = table[self.index(x1, y1)];
        (a + d) - (b + c)
    }
}

impl IntegralSource for IntegralImage {
    #[inline]
    fn resolution(&self) -> Resolution {
        self.res
    }

    #[inline]
    fn sum(&self, x: u32, y: u32, width: u32, height: u32) -> f64 {
        self.rect_sum(&self.sum, x, y, width, height) as f64
    }

    #[inline]
    fn squared_sum(&self, x: u32, y: u32, width: u32, height: u32) -> f64 {
        self.rect_sum(&self.squared, x, y, width, height) as f64
    }

    fn tilted_sum(&self, x: u32, y: u32, width: u32, height: u32) -> f64 {
        let t = |x: u32, y: u32| self.tilted[self.index(x, y)];
        let left = x
            .checked_sub(height)
            .expect("tilted rectangle extends past the left image border");

        let sum = t(x, y) - t(left, y + height) - t(x + width, y + width)
            + t(left + width, y + width + height);
        sum as f64
    }
}

/// Computes the tilted summed-area table.
///
/// Entry `(X, Y)` holds the sum of all pixels `(x, y)` with `y < Y` and `|x - X + 1| <= Y - y - 1`,
/// a triangle whose apex is pixel `(X - 1, Y - 1)` and which widens towards the top of the image.
///
/// Each row follows from the two rows above it:
/// `T(X, Y) = T(X - 1, Y - 1) + T(X + 1, Y - 1) - T(X, Y - 2) + I(X - 1, Y - 1) + I(X - 1, Y - 2)`.
/// The recurrence reads one column further out per row, so rows are computed on a buffer padded
/// by `h + 1` columns on either side. Entries outside of that buffer are zero.
fn tilted_table(w: usize, h: usize, pixels: &[u8]) -> Vec<i64> {
    let stride = w + 1;
    let pad = h + 1;
    let padded_width = stride + 2 * pad;

    let pixel = |x: i64, y: i64| -> i64 {
        if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
            0
        } else {
            i64::from(pixels[y as usize * w + x as usize])
        }
    };

    let mut table = vec![0i64; stride * (h + 1)];
    let mut above2 = vec![0i64; padded_width];
    let mut above1 = vec![0i64; padded_width];
    let mut row = vec![0i64; padded_width];

    for y in 1..=h {
        let yi = y as i64;
        for e in 0..padded_width {
            let x = e as i64 - pad as i64;
            let up_left = if e > 0 { above1[e - 1] } else { 0 };
            let up_right = if e + 1 < padded_width { above1[e + 1] } else { 0 };
            row[e] = up_left + up_right - above2[e] + pixel(x - 1, yi - 1) + pixel(x - 1, yi - 2);
        }

        table[y * stride..(y + 1) * stride].copy_from_slice(&row[pad..pad + stride]);

        // Shift rows down: `above1` becomes `above2`, the fresh row becomes `above1`.
        std::mem::swap(&mut above2, &mut above1);
        std::mem::swap(&mut above1, &mut row);
    }

    table
}
