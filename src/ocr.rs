use std::path::PathBuf;
use std::process::Command;

use image::DynamicImage;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("failed to write temporary image: {0}")]
    TempImage(#[from] image::ImageError),

    #[error("failed to create temporary file: {0}")]
    TempFile(#[from] std::io::Error),

    #[error("failed to run {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tesseract failed: {0}")]
    Failed(String),
}

/// Turns an image into the raw text visible on it.
///
/// Implementations return an empty string for frames without text rather
/// than an error.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// Runs the `tesseract` executable on a temporary PNG and reads stdout.
#[derive(Debug, Clone)]
pub struct TesseractExtractor {
    executable: PathBuf,
    lang: String,
    psm: u8,
}

impl TesseractExtractor {
    pub fn new(executable: impl Into<PathBuf>, lang: impl Into<String>, psm: u8) -> Self {
        Self {
            executable: executable.into(),
            lang: lang.into(),
            psm,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.tesseract_path.clone(),
            config.tesseract_lang.clone(),
            config.tesseract_psm,
        )
    }
}

impl TextExtractor for TesseractExtractor {
    fn extract_text(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let input = NamedTempFile::with_suffix(".png")?;
        image.save(input.path())?;

        let output = Command::new(&self.executable)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .arg("--psm")
            .arg(self.psm.to_string())
            .output()
            .map_err(|source| OcrError::Spawn {
                program: self.executable.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
