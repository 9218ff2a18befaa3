//! Per-page extraction decision.
//!
//! Each page moves through an explicit decision rather than nested
//! conditionals: inspect the native text layer, accept it when it is
//! dense enough (or OCR is off), otherwise fall back to OCR. Any render
//! or recognition error degrades the single page, never the document.

use super::document::{ExtractionError, PageSource};

/// Extraction outcome for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    /// Zero-based page index.
    pub index: u32,
    /// Raw extracted text (empty when the page failed).
    pub text: String,
    /// Whether OCR produced the text.
    pub used_ocr: bool,
    /// Whether extraction failed and the page degraded to empty.
    pub failed: bool,
}

impl PageResult {
    pub fn extracted(index: u32, text: String, used_ocr: bool) -> Self {
        Self {
            index,
            text,
            used_ocr,
            failed: false,
        }
    }

    pub fn failed(index: u32) -> Self {
        Self {
            index,
            text: String::new(),
            used_ocr: false,
            failed: true,
        }
    }
}

/// Result of inspecting a page's native text layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCheck {
    /// The text layer is usable as-is.
    Extracted(String),
    /// The layer is sparse or unreadable; render the page and OCR it.
    OcrFallback,
    /// The page could not be read and OCR is not an option.
    Failed(String),
}

/// Decide how to extract a page from its native text layer.
///
/// With OCR disabled the native text is accepted whatever its density;
/// a read error is then terminal for the page. With OCR enabled, sparse
/// or unreadable layers fall back to recognition.
pub fn native_check(
    source: &dyn PageSource,
    index: u32,
    use_ocr: bool,
    native_threshold: usize,
) -> NativeCheck {
    match source.native_text(index) {
        Ok(text) => {
            if !use_ocr || non_whitespace_chars(&text) >= native_threshold {
                NativeCheck::Extracted(text)
            } else {
                tracing::debug!(page = index, "sparse text layer, falling back to OCR");
                NativeCheck::OcrFallback
            }
        }
        Err(ExtractionError::ToolNotFound(tool)) => {
            // Without pdftotext nothing downstream will work either.
            NativeCheck::Failed(format!("tool not found: {}", tool))
        }
        Err(e) if use_ocr => {
            tracing::debug!(page = index, error = %e, "text layer unreadable, trying OCR");
            NativeCheck::OcrFallback
        }
        Err(e) => NativeCheck::Failed(e.to_string()),
    }
}

fn non_whitespace_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}
