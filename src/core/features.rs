use image::DynamicImage;
use crate::common::Result;
use crate::core::photo::decode_image;

pub const HISTOGRAM_BINS: usize = 256;

pub type Histogram = [u32; HISTOGRAM_BINS];

/// Colour and size statistics of one photo, computed fresh for every comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFeatures {
    pub histogram_r: Histogram,
    pub histogram_g: Histogram,
    pub histogram_b: Histogram,
    pub width: u32,
    pub height: u32,
    pub average_luminance: f64,
}

impl ImageFeatures {
    pub fn extract(payload: &str) -> Result<Self> {
        let image = decode_image(payload)?;
        Ok(Self::from_image(&image))
    }

    pub fn from_image(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba16();
        let (width, height) = rgba.dimensions();

        let mut features = ImageFeatures {
            histogram_r: [0; HISTOGRAM_BINS],
            histogram_g: [0; HISTOGRAM_BINS],
            histogram_b: [0; HISTOGRAM_BINS],
            width,
            height,
            average_luminance: 0.0,
        };

        let mut luminance_sum = 0.0f64;

        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            let r8 = (premultiply(r, a) >> 8) as u8;
            let g8 = (premultiply(g, a) >> 8) as u8;
            let b8 = (premultiply(b, a) >> 8) as u8;

            features.histogram_r[r8 as usize] += 1;
            features.histogram_g[g8 as usize] += 1;
            features.histogram_b[b8 as usize] += 1;

            luminance_sum += 0.299 * r8 as f64 + 0.587 * g8 as f64 + 0.114 * b8 as f64;
        }

        let total_pixels = width as u64 * height as u64;
        if total_pixels > 0 {
            features.average_luminance = luminance_sum / total_pixels as f64;
        }

        features
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

// Samples are weighted by alpha so transparent regions read as black
fn premultiply(sample: u16, alpha: u16) -> u32 {
    sample as u32 * alpha as u32 / 0xffff
}
