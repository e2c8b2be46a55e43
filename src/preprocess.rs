use image::{GrayImage, Luma};
use imageproc::edges::canny;
use imageproc::filter::separable_filter_equal;
use imageproc::integral_image::{integral_image, sum_image_pixels};

use crate::frame::Frame;

/// Side of the square neighbourhood used for the local mean.
pub const THRESHOLD_BLOCK_SIZE: u32 = 11;
/// Subtracted from the local mean before comparing.
pub const THRESHOLD_OFFSET: i16 = 2;

const BLUR_KERNEL_SIZE: usize = 5;

pub const CANNY_LOW: f32 = 100.0;
pub const CANNY_HIGH: f32 = 200.0;

/// Grayscale, then adaptive mean threshold.
///
/// Binarizes text against backgrounds whose brightness varies across the screen.
pub fn grayscale_strategy(frame: &Frame) -> GrayImage {
    adaptive_mean_threshold(&frame.to_gray(), THRESHOLD_BLOCK_SIZE, THRESHOLD_OFFSET)
}

/// Grayscale, invert, adaptive mean threshold, 5x5 Gaussian blur, Canny edges.
///
/// Used when light-on-dark text defeats the plain threshold; the edge map
/// keeps glyph outlines and drops speckle.
pub fn advanced_strategy(frame: &Frame) -> GrayImage {
    let mut gray = frame.to_gray();
    image::imageops::invert(&mut gray);

    let binary = adaptive_mean_threshold(&gray, THRESHOLD_BLOCK_SIZE, THRESHOLD_OFFSET);
    let blurred = separable_filter_equal(&binary, &gaussian_kernel(BLUR_KERNEL_SIZE));

    canny(&blurred, CANNY_LOW, CANNY_HIGH)
}

/// A pixel becomes 255 when it is brighter than the mean of the
/// `block_size`x`block_size` block around it minus `offset`, else 0.
/// Edge pixels are replicated past the border and the block mean is
/// rounded to the nearest integer.
pub fn adaptive_mean_threshold(gray: &GrayImage, block_size: u32, offset: i16) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return GrayImage::new(w, h);
    }

    let radius = block_size / 2;
    let side = 2 * radius + 1;
    let area = u64::from(side) * u64::from(side);
    let sums = integral_image::<_, u64>(&replicate_border(gray, radius));

    GrayImage::from_fn(w, h, |x, y| {
        // Padded coordinates: the block centred on (x, y) starts at (x, y).
        let sum = sum_image_pixels(&sums, x, y, x + side - 1, y + side - 1)[0];
        let mean = ((sum + area / 2) / area) as i16;
        let value = if gray.get_pixel(x, y)[0] as i16 > mean - offset { 255 } else { 0 };
        Luma([value])
    })
}

/// Copy of `gray` grown by `radius` on every side, filled with the nearest edge pixel.
fn replicate_border(gray: &GrayImage, radius: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    GrayImage::from_fn(w + 2 * radius, h + 2 * radius, |x, y| {
        let sx = x.saturating_sub(radius).min(w - 1);
        let sy = y.saturating_sub(radius).min(h - 1);
        *gray.get_pixel(sx, sy)
    })
}

/// Normalized 1-D Gaussian taps for an odd kernel `size`, with sigma
/// derived from the size the way OpenCV does when sigma is left at 0.
fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;

    let taps: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f32 = taps.iter().sum();

    taps.into_iter().map(|t| t / total).collect()
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    fn is_binary(img: &GrayImage) -> bool {
        img.pixels().all(|p| p[0] == 0 || p[0] == 255)
    }

    #[test]
    fn gaussian_kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(5);
        assert_eq!(k.len(), 5);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((k[0] - k[4]).abs() < 1e-6);
        assert!((k[1] - k[3]).abs() < 1e-6);
        assert!(k[2] > k[1] && k[1] > k[0]);
    }

    #[test]
    fn flat_image_thresholds_to_white() {
        // Every pixel equals its local mean, and mean - 2 < pixel.
        let gray = GrayImage::from_pixel(20, 20, Luma([90]));
        let out = adaptive_mean_threshold(&gray, 11, 2);
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn dark_stroke_on_light_background_turns_black() {
        let mut gray = GrayImage::from_pixel(30, 30, Luma([200]));
        for y in 10..20 {
            gray.put_pixel(15, y, Luma([20]));
        }
        let out = adaptive_mean_threshold(&gray, 11, 2);

        assert_eq!(out.get_pixel(15, 15)[0], 0);
        assert_eq!(out.get_pixel(2, 2)[0], 255);
    }

    /// Direct per-pixel evaluation: clamped neighbourhood, mean rounded once.
    fn threshold_by_hand(gray: &GrayImage, block_size: u32, offset: i16) -> GrayImage {
        let r = (block_size / 2) as i64;
        let (w, h) = gray.dimensions();
        let area = ((2 * r + 1) * (2 * r + 1)) as u64;
        GrayImage::from_fn(w, h, |x, y| {
            let mut sum = 0u64;
            for dy in -r..=r {
                for dx in -r..=r {
                    let sx = (x as i64 + dx).clamp(0, w as i64 - 1) as u32;
                    let sy = (y as i64 + dy).clamp(0, h as i64 - 1) as u32;
                    sum += gray.get_pixel(sx, sy)[0] as u64;
                }
            }
            let mean = ((sum + area / 2) / area) as i16;
            Luma([if gray.get_pixel(x, y)[0] as i16 > mean - offset { 255 } else { 0 }])
        })
    }

    #[test]
    fn block_mean_is_rounded_not_truncated() {
        // Block sum 12098 over 121 pixels: mean 99.98 rounds to 100, so 98 is not above 100 - 2.
        let mut gray = GrayImage::from_pixel(11, 11, Luma([100]));
        gray.put_pixel(5, 5, Luma([98]));
        let out = adaptive_mean_threshold(&gray, 11, 2);
        assert_eq!(out.get_pixel(5, 5)[0], 0);
    }

    #[test]
    fn threshold_matches_replicated_border_evaluation() {
        let gray = GrayImage::from_fn(64, 48, |x, y| {
            Luma([((x * 37 + y * 91 + x * y * 7) % 251) as u8])
        });
        assert_eq!(adaptive_mean_threshold(&gray, 11, 2), threshold_by_hand(&gray, 11, 2));

        // Smaller than the block in both directions.
        let tiny = GrayImage::from_fn(4, 3, |x, y| Luma([(x * 50 + y * 20) as u8]));
        assert_eq!(adaptive_mean_threshold(&tiny, 11, 2), threshold_by_hand(&tiny, 11, 2));
    }

    #[test]
    fn grayscale_strategy_is_binary_and_keeps_size() {
        let frame = Frame::from_rgb(RgbImage::from_fn(40, 24, |x, y| {
            Rgb([(x * 6) as u8, (y * 10) as u8, ((x + y) % 2 * 255) as u8])
        }));
        let out = grayscale_strategy(&frame);
        assert_eq!(out.dimensions(), (40, 24));
        assert!(is_binary(&out));
    }

    #[test]
    fn advanced_strategy_produces_edge_map() {
        let frame = Frame::from_rgb(RgbImage::from_fn(48, 48, |x, _| {
            if (x / 8) % 2 == 0 { Rgb([250, 250, 250]) } else { Rgb([10, 10, 10]) }
        }));
        let out = advanced_strategy(&frame);
        assert_eq!(out.dimensions(), (48, 48));
        assert!(is_binary(&out));

        let edges: Vec<(u32, u32)> = out
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] == 255)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!edges.is_empty(), "no edges found");

        // First stripe boundary sits between x = 7 and x = 8.
        assert!(edges.iter().any(|&(x, _)| (7..=8).contains(&x)));

        // Every edge lies close to a stripe boundary. Columns 0..=2 see only
        // the first stripe through the replicated border and threshold as
        // foreground, which puts one extra edge near x = 3.
        for &(x, y) in edges.iter().filter(|&&(x, _)| x >= 5) {
            let to_boundary = (x % 8).min(8 - x % 8);
            assert!(to_boundary <= 2, "stray edge at ({x}, {y})");
        }
    }

    #[test]
    fn advanced_strategy_on_flat_frame_has_no_edges() {
        let frame = Frame::from_rgb(RgbImage::from_pixel(32, 32, Rgb([120, 130, 140])));
        let out = advanced_strategy(&frame);
        assert!(out.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn strategies_are_deterministic() {
        let frame = Frame::from_rgb(RgbImage::from_fn(32, 32, |x, y| {
            Rgb([(x * y) as u8, (x * 7) as u8, (y * 3) as u8])
        }));
        assert_eq!(grayscale_strategy(&frame), grayscale_strategy(&frame));
        assert_eq!(advanced_strategy(&frame), advanced_strategy(&frame));
    }
}
