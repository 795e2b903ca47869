// THEORY:
// `ColorSpaceViews` is a "dumb" data container, like `Pixel`. It walks the RGB
// buffer once and stores the three derived representations side by side at the
// same spatial layout (row-major, one entry per source pixel). The views are
// read-only after construction and die with the invocation that built them.

use crate::core_modules::D1::pixel::pixel::{HsvPixel, LabPixel, Pixel};
use image::{GrayImage, Luma, RgbImage};

/// HSV, Lab and grayscale renditions of one RGB buffer.
#[derive(Debug, Clone)]
pub struct ColorSpaceViews {
    width: u32,
    height: u32,
    /// Row-major HSV pixels (hue 0..=179).
    pub hsv: Vec<HsvPixel>,
    /// Row-major Lab pixels on the byte scale.
    pub lab: Vec<LabPixel>,
    /// Rec. 601 luma.
    pub gray: GrayImage,
}

impl ColorSpaceViews {
    pub fn from_rgb(rgb: &RgbImage) -> Self {
        let (width, height) = rgb.dimensions();
        let num_pixels = (width as usize) * (height as usize);

        let mut hsv = Vec::with_capacity(num_pixels);
        let mut lab = Vec::with_capacity(num_pixels);
        let mut gray_bytes = Vec::with_capacity(num_pixels);

        for rgb_pixel in rgb.pixels() {
            let pixel = Pixel::from(rgb_pixel);
            hsv.push(pixel.to_hsv());
            lab.push(pixel.to_lab());
            gray_bytes.push(pixel.gray());
        }

        // Same dimensions as the source, so the length always matches.
        let gray = GrayImage::from_raw(width, height, gray_bytes)
            .unwrap_or_else(|| GrayImage::new(width, height));

        Self {
            width,
            height,
            hsv,
            lab,
            gray,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.hsv.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hsv.is_empty()
    }
}

/// Grayscale rendition only, for stages that need no color information.
pub fn gray_view(rgb: &RgbImage) -> GrayImage {
    let (width, height) = rgb.dimensions();
    GrayImage::from_fn(width, height, |x, y| Luma([Pixel::from(rgb.get_pixel(x, y)).gray()]))
}
