use std::path::Path;

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::map::map_colors;

use crate::error::ResolveError;

/// A decoded 8-bit RGB capture of the game screen.
#[derive(Debug, Clone)]
pub struct Frame {
    rgb: RgbImage,
}

impl Frame {
    pub fn from_rgb(rgb: RgbImage) -> Self {
        Self { rgb }
    }

    /// Decode an encoded image (PNG, JPEG, ...) into a frame.
    /// Empty or corrupt input is a `DecodeFailure`.
    pub fn decode(bytes: &[u8]) -> Result<Self, ResolveError> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_rgb(img.to_rgb8()))
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, ResolveError> {
        let img = image::open(path)?;
        Ok(Self::from_rgb(img.to_rgb8()))
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    /// Single-channel 8-bit luma copy of the frame, see [`luma_bt601`].
    pub fn to_gray(&self) -> GrayImage {
        luma_bt601(&self.rgb)
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgb8(self.rgb.clone())
    }
}

/// BT.601 luma (0.299 R + 0.587 G + 0.114 B), rounded to nearest.
///
/// Frames and reference images both go through this, so a reference that is
/// pixel-identical to a frame stays identical after conversion. Gray input
/// (R = G = B) maps to itself.
pub fn luma_bt601(rgb: &RgbImage) -> GrayImage {
    map_colors(rgb, |Rgb([r, g, b])| {
        let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000;
        Luma([luma as u8])
    })
}
