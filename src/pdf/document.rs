//! Page content access through external Poppler and Tesseract tools.
//!
//! `PopplerDocument` reads native page text with `pdftotext`, counts pages
//! with `pdfinfo`, and falls back to rendering pages with `pdftoppm` plus
//! `tesseract` recognition when a page has no usable text layer. The
//! [`PageSource`] trait is the seam the rest of the pipeline works
//! against, so tests can substitute in-memory documents.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use thiserror::Error;

use super::Language;

/// Errors from page-level extraction and recognition.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read access to one document's pages.
///
/// Implementations must be safe to call from blocking worker threads;
/// chunks of a document are extracted concurrently.
pub trait PageSource: Send + Sync {
    /// Total number of pages.
    fn page_count(&self) -> u32;

    /// Document size in bytes, used for chunk planning.
    fn byte_size(&self) -> u64;

    /// The embedded text layer of a page (zero-based index).
    fn native_text(&self, page: u32) -> Result<String, ExtractionError>;

    /// Recognize a page's text by rendering it and running OCR.
    fn ocr_text(&self, page: u32, language: Language) -> Result<String, ExtractionError>;
}

/// Handle command output, extracting stdout on success or mapping a
/// missing binary to `ToolNotFound`.
fn handle_cmd_output(
    result: std::io::Result<std::process::Output>,
    tool_name: &str,
    error_prefix: &str,
) -> Result<String, ExtractionError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ExtractionError::ExtractionFailed(format!(
                    "{}: {}",
                    error_prefix, stderr
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(ExtractionError::Io(e)),
    }
}

/// Check command status, returning appropriate error on failure.
fn check_cmd_status(
    result: std::io::Result<std::process::ExitStatus>,
    tool_name: &str,
    error_msg: &str,
) -> Result<(), ExtractionError> {
    match result {
        Ok(s) if s.success() => Ok(()),
        Ok(_) => Err(ExtractionError::ExtractionFailed(error_msg.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(ExtractionError::Io(e)),
    }
}

/// A PDF on disk, read through the Poppler command-line tools.
#[derive(Debug)]
pub struct PopplerDocument {
    path: PathBuf,
    page_count: u32,
    byte_size: u64,
}

impl PopplerDocument {
    /// Open a PDF and determine its page count.
    pub fn open(path: &Path) -> Result<Self, ExtractionError> {
        let byte_size = std::fs::metadata(path)?.len();
        let page_count = pdf_page_count(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            page_count,
            byte_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render one page to a PNG under `output_dir` at OCR resolution.
    fn render_page(&self, page: u32, output_dir: &Path) -> Result<PathBuf, ExtractionError> {
        // pdftoppm pages are 1-based.
        let page_str = (page + 1).to_string();
        let status = Command::new("pdftoppm")
            .args(["-png", "-r", "300", "-f", &page_str, "-l", &page_str])
            .arg(&self.path)
            .arg(output_dir.join("page"))
            .status();

        check_cmd_status(
            status,
            "pdftoppm (install poppler-utils)",
            &format!("pdftoppm failed to render page {}", page + 1),
        )?;

        find_page_image(output_dir, page + 1).ok_or_else(|| {
            ExtractionError::ExtractionFailed(format!("no image rendered for page {}", page + 1))
        })
    }
}

impl PageSource for PopplerDocument {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn byte_size(&self) -> u64 {
        self.byte_size
    }

    fn native_text(&self, page: u32) -> Result<String, ExtractionError> {
        // pdftotext pages are 1-based.
        let page_str = (page + 1).to_string();
        let output = Command::new("pdftotext")
            .args(["-layout", "-enc", "UTF-8", "-f", &page_str, "-l", &page_str])
            .arg(&self.path)
            .arg("-") // Output to stdout
            .output();

        handle_cmd_output(
            output,
            "pdftotext (install poppler-utils)",
            &format!("pdftotext failed on page {}", page + 1),
        )
    }

    fn ocr_text(&self, page: u32, language: Language) -> Result<String, ExtractionError> {
        let temp_dir = TempDir::new()?;
        let image_path = self.render_page(page, temp_dir.path())?;

        let output = Command::new("tesseract")
            .arg(&image_path)
            .arg("stdout")
            .args(["-l", language.code()])
            .output();

        handle_cmd_output(
            output,
            "tesseract (install tesseract-ocr)",
            &format!("tesseract failed on page {}", page + 1),
        )
    }
}

/// Get the page count of a PDF via pdfinfo.
fn pdf_page_count(path: &Path) -> Result<u32, ExtractionError> {
    let output = Command::new("pdfinfo").arg(path).output();
    let stdout = handle_cmd_output(output, "pdfinfo (install poppler-utils)", "pdfinfo failed")?;

    for line in stdout.lines() {
        if let Some(rest) = line.strip_prefix("Pages:") {
            if let Ok(count) = rest.trim().parse() {
                return Ok(count);
            }
        }
    }
    Err(ExtractionError::InvalidDocument(
        "could not determine page count".to_string(),
    ))
}

/// Find the image pdftoppm generated for a 1-based page number.
///
/// pdftoppm zero-pads the page number to the document's digit width
/// (page-01.png, page-001.png, ...).
fn find_page_image(dir: &Path, page: u32) -> Option<PathBuf> {
    for digits in [1, 2, 3, 4, 5] {
        let filename = format!("page-{:0width$}.png", page, width = digits);
        let path = dir.join(&filename);
        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Report availability of the external tools the pipeline shells out to.
pub fn check_tools() -> Vec<(&'static str, bool)> {
    ["pdftotext", "pdfinfo", "pdftoppm", "tesseract"]
        .iter()
        .map(|tool| (*tool, which::which(tool).is_ok()))
        .collect()
}
