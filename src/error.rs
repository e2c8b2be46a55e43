use std::path::PathBuf;

use thiserror::Error;

use crate::ocr::OcrError;

/// Failures that abort a classification call.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to decode frame: {0}")]
    DecodeFailure(#[from] image::ImageError),

    #[error("no usable reference images in {}", dir.display())]
    NoReferenceImages { dir: PathBuf },

    #[error("text extraction failed: {0}")]
    Ocr(#[from] OcrError),
}
