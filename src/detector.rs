use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use image::GrayImage;
use imageproc::integral_image::{integral_image, integral_squared_image, sum_image_pixels};
use serde::Serialize;

use crate::error::ResolveError;
use crate::frame::{Frame, luma_bt601};
use crate::state::ScreenState;

/// A labelled reference screen, converted to 8-bit grayscale the same way as frames.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    /// File name; carries the label fragment that names the screen state.
    pub label: String,
    pub path: PathBuf,
    pub image: GrayImage,
}

/// Best correlation of one reference image against the current frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedMatch {
    pub label: String,
    pub score: f32,
}

impl RankedMatch {
    pub fn state(&self) -> ScreenState {
        ScreenState::from_reference_label(&self.label)
    }
}

/// Load every `*.png` in `dir` as a grayscale reference, in file name order.
/// Entries that fail to decode are skipped with a warning.
pub fn load_reference_images(dir: &Path) -> Result<Vec<ReferenceImage>, ResolveError> {
    let no_references = || ResolveError::NoReferenceImages {
        dir: dir.to_path_buf(),
    };

    let entries = std::fs::read_dir(dir).map_err(|e| {
        tracing::warn!("failed to read reference directory {}: {e}", dir.display());
        no_references()
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(".png"))
        })
        .collect();
    paths.sort();

    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        match image::open(&path) {
            Ok(img) => {
                let label = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                tracing::debug!("loaded reference image: {}", path.display());
                images.push(ReferenceImage {
                    label,
                    path,
                    image: luma_bt601(&img.to_rgb8()),
                });
            }
            Err(e) => {
                tracing::warn!("failed to load reference image {}: {e}", path.display());
            }
        }
    }

    if images.is_empty() {
        return Err(no_references());
    }

    tracing::info!("loaded {} reference image(s) from {}", images.len(), dir.display());
    Ok(images)
}

/// Score every reference against `frame` and rank them by descending
/// correlation. Ties keep the input order.
/// References larger than the frame have no placement and are left out.
pub fn rank_references(frame: &GrayImage, references: &[ReferenceImage]) -> Vec<RankedMatch> {
    let mut ranked: Vec<RankedMatch> = references
        .iter()
        .filter_map(|reference| {
            let Some(score) = best_correlation(frame, &reference.image) else {
                tracing::warn!(
                    "reference image {} ({}x{}) does not fit frame {}x{}, skipping",
                    reference.label,
                    reference.image.width(),
                    reference.image.height(),
                    frame.width(),
                    frame.height()
                );
                return None;
            };
            tracing::debug!("reference {}: correlation={score:.4}", reference.label);
            Some(RankedMatch {
                label: reference.label.clone(),
                score,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked
}

/// Load the reference set from `dir` and rank it against the frame.
/// Fails with `NoReferenceImages` when nothing usable remains.
pub fn match_reference_dir(frame: &Frame, dir: &Path) -> Result<Vec<RankedMatch>, ResolveError> {
    let references = load_reference_images(dir)?;
    let ranked = rank_references(&frame.to_gray(), &references);

    if ranked.is_empty() {
        return Err(ResolveError::NoReferenceImages {
            dir: dir.to_path_buf(),
        });
    }

    Ok(ranked)
}

/// Maximum zero-mean normalized cross-correlation of `template` over all
/// placements inside `image`, in [-1, 1].
///
/// Placements where the image window or the template has no variance score 0.
/// Returns `None` when the template is empty or larger than the image.
pub fn best_correlation(image: &GrayImage, template: &GrayImage) -> Option<f32> {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > iw || th > ih {
        return None;
    }

    let n = (tw as f64) * (th as f64);
    let t_mean = template.pixels().map(|p| p[0] as f64).sum::<f64>() / n;
    let t_centered: Vec<f64> = template.pixels().map(|p| p[0] as f64 - t_mean).collect();
    let t_norm = t_centered.iter().map(|v| v * v).sum::<f64>().sqrt();

    // Window sums come from integral images; only the cross term needs a full pass.
    let sums = integral_image::<_, u64>(image);
    let squares = integral_squared_image::<_, u64>(image);
    let pixels = image.as_raw();
    let stride = iw as usize;

    let mut best = f64::NEG_INFINITY;
    for y in 0..=(ih - th) {
        for x in 0..=(iw - tw) {
            let right = x + tw - 1;
            let bottom = y + th - 1;
            let sum = sum_image_pixels(&sums, x, y, right, bottom)[0] as f64;
            let sum_sq = sum_image_pixels(&squares, x, y, right, bottom)[0] as f64;
            let variance = (sum_sq - sum * sum / n).max(0.0);
            let denom = variance.sqrt() * t_norm;

            let score = if denom <= f64::EPSILON {
                0.0
            } else {
                let mut cross = 0.0;
                for ty in 0..th as usize {
                    let row = (y as usize + ty) * stride + x as usize;
                    let t_row = ty * tw as usize;
                    for tx in 0..tw as usize {
                        cross += t_centered[t_row + tx] * pixels[row + tx] as f64;
                    }
                }
                (cross / denom).clamp(-1.0, 1.0)
            };

            if score > best {
                best = score;
            }
        }
    }

    Some(best as f32)
}
