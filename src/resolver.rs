use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use image::{DynamicImage, GrayImage};
use serde::Serialize;

use crate::classifier::classify_text;
use crate::detector::{self, RankedMatch};
use crate::error::ResolveError;
use crate::frame::Frame;
use crate::ocr::TextExtractor;
use crate::preprocess;
use crate::state::ScreenState;

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Cascade stage that produced a resolution, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStage {
    RawText,
    GrayscalePreprocessed,
    AdvancedPreprocessed,
    TemplateMatch,
}

/// Outcome of one classification call.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub call_id: u64,
    pub state: ScreenState,
    /// Every state the deciding stage produced. A text stage may yield
    /// several; the template stage always yields exactly one.
    pub candidates: Vec<ScreenState>,
    pub stage: CascadeStage,
    /// More than one text rule fired; `state` is the earliest in rule order.
    pub ambiguous: bool,
    /// OCR output of the deciding text stage.
    pub text: Option<String>,
    /// Reference ranking, only when the template stage ran.
    pub matches: Vec<RankedMatch>,
    pub classified_at: DateTime<Utc>,
}

/// Runs the OCR and template-matching cascade over a frame.
pub struct ScreenStateResolver {
    extractor: Box<dyn TextExtractor>,
}

impl ScreenStateResolver {
    pub fn new(extractor: impl TextExtractor + 'static) -> Self {
        Self {
            extractor: Box::new(extractor),
        }
    }

    /// Classify `frame`: OCR on the raw frame, then on the grayscale and
    /// advanced preprocessed frames, then template matching against the
    /// references in `reference_dir`. Each stage runs only when every
    /// earlier stage matched no rule.
    ///
    /// OCR failure on the raw frame aborts the call; on a preprocessed frame
    /// it only empties that stage.
    pub fn resolve_screen_state(
        &self,
        frame: &Frame,
        reference_dir: &Path,
    ) -> Result<Resolution, ResolveError> {
        let call_id = NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed);
        let span = tracing::info_span!("classify", call_id);
        let _guard = span.enter();

        let text = self.extractor.extract_text(&frame.to_dynamic())?;
        tracing::debug!(stage = ?CascadeStage::RawText, "extracted text: {text:?}");
        if let Some(resolution) = resolve_text_stage(call_id, CascadeStage::RawText, text) {
            return Ok(resolution);
        }

        let strategies: [(CascadeStage, fn(&Frame) -> GrayImage); 2] = [
            (CascadeStage::GrayscalePreprocessed, preprocess::grayscale_strategy),
            (CascadeStage::AdvancedPreprocessed, preprocess::advanced_strategy),
        ];

        for (stage, strategy) in strategies {
            tracing::info!(stage = ?stage, "no screen state detected, applying preprocessing");
            let processed = DynamicImage::ImageLuma8(strategy(frame));

            let text = match self.extractor.extract_text(&processed) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(stage = ?stage, "text extraction failed, skipping stage: {e}");
                    continue;
                }
            };
            tracing::debug!(stage = ?stage, "extracted text: {text:?}");

            if let Some(resolution) = resolve_text_stage(call_id, stage, text) {
                return Ok(resolution);
            }
        }

        tracing::info!(
            stage = ?CascadeStage::TemplateMatch,
            "no screen state detected from text, comparing with {}",
            reference_dir.display()
        );
        let matches = detector::match_reference_dir(frame, reference_dir)?;
        let top = &matches[0];
        let state = top.state();

        tracing::info!(
            stage = ?CascadeStage::TemplateMatch,
            "predicted screen state: {state} (best reference {} score={:.4})",
            top.label,
            top.score
        );

        Ok(Resolution {
            call_id,
            state,
            candidates: vec![state],
            stage: CascadeStage::TemplateMatch,
            ambiguous: false,
            text: None,
            matches,
            classified_at: Utc::now(),
        })
    }
}

/// Resolve a text stage. `None` when no rule fired, so the cascade moves on.
fn resolve_text_stage(call_id: u64, stage: CascadeStage, text: String) -> Option<Resolution> {
    let candidates = classify_text(&text);
    let &state = candidates.first()?;

    let ambiguous = candidates.len() > 1;
    if ambiguous {
        tracing::warn!(
            stage = ?stage,
            "ambiguous match: {candidates:?}, choosing {state}"
        );
    }
    tracing::info!(stage = ?stage, "screen state: {state}");

    Some(Resolution {
        call_id,
        state,
        candidates,
        stage,
        ambiguous,
        text: Some(text),
        matches: Vec::new(),
        classified_at: Utc::now(),
    })
}
