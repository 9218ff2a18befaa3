//! Batch and streaming extraction orchestration.
//!
//! Ties the planner, page extractor, normalizer, and filter together.
//! Batch mode extracts chunks concurrently on a bounded worker pool,
//! rejoins results in strict page order, and runs the cross-page filter
//! over the complete set. Streaming mode walks pages sequentially and
//! emits one progress record per page; the filter is skipped because its
//! statistics need the whole document.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::config::Settings;

use super::chunker::ChunkPlanner;
use super::document::{ExtractionError, PageSource, PopplerDocument};
use super::filter::{FilterOptions, TextFilter};
use super::normalizer::normalize;
use super::page::{native_check, NativeCheck, PageResult};
use super::Language;

/// Errors from document-level processing.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("document has no pages")]
    EmptyDocument,

    #[error("extraction failed on all {0} pages")]
    AllPagesFailed(u32),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Per-request extraction options for batch mode.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    pub use_ocr: bool,
    pub chunking: bool,
    pub language: Language,
    pub remove_repetitive: bool,
    pub remove_copyright: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            use_ocr: true,
            chunking: true,
            language: Language::Eng,
            remove_repetitive: true,
            remove_copyright: true,
        }
    }
}

/// Combined result of a batch extraction.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Concatenated page text with page markers.
    pub text: String,
    /// Total pages in the document.
    pub pages: u32,
    /// Exact character count of `text`.
    pub total_chars: usize,
    /// Number of chunks the document was processed in.
    pub chunks_processed: usize,
    /// Whether the repetition/copyright filter ran.
    pub filtered: bool,
}

/// One unit of the streaming protocol: a completed page.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressRecord {
    /// 1-based page number.
    pub page: u32,
    pub total_pages: u32,
    /// Percent complete, non-decreasing, exactly 100 on the last page.
    pub progress: u32,
    pub text: String,
}

/// Summary of processor configuration for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessorInfo {
    pub extraction_method: String,
    pub gpu_enabled: bool,
    pub chunk_size_mb: u64,
}

/// Stateless per-request pipeline driver.
///
/// Holds only read-only settings and the two concurrency gates: a
/// CPU-sized pool for chunk workers and a small semaphore for OCR calls
/// (one slot when a GPU is configured, since concurrent recognitions
/// would oversubscribe the device).
pub struct PdfProcessor {
    settings: Arc<Settings>,
    chunk_workers: Arc<Semaphore>,
    ocr_slots: Arc<Semaphore>,
}

impl PdfProcessor {
    pub fn new(settings: Arc<Settings>) -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let ocr_slots = if settings.use_gpu {
            tracing::warn!(
                "GPU requested but {} runs on CPU; OCR calls will be serialized",
                settings.extraction_method
            );
            1
        } else {
            cpus.min(4)
        };

        Self {
            settings,
            chunk_workers: Arc::new(Semaphore::new(cpus)),
            ocr_slots: Arc::new(Semaphore::new(ocr_slots)),
        }
    }

    /// Processor configuration for the status endpoint.
    pub fn info(&self) -> ProcessorInfo {
        ProcessorInfo {
            extraction_method: self.settings.extraction_method.clone(),
            gpu_enabled: self.settings.use_gpu,
            chunk_size_mb: self.settings.chunk_size_mb,
        }
    }

    /// Open a PDF on disk for processing.
    pub fn open(&self, path: &Path) -> Result<Arc<PopplerDocument>, ProcessError> {
        Ok(Arc::new(PopplerDocument::open(path)?))
    }

    /// Batch-extract a PDF file into one combined result.
    pub async fn process_file(
        &self,
        path: &Path,
        options: ExtractOptions,
    ) -> Result<ExtractionResult, ProcessError> {
        let source = self.open(path)?;
        self.process_source(source, options).await
    }

    /// Batch-extract any page source into one combined result.
    pub async fn process_source(
        &self,
        source: Arc<dyn PageSource>,
        options: ExtractOptions,
    ) -> Result<ExtractionResult, ProcessError> {
        let page_count = source.page_count();
        let planner = ChunkPlanner::new(self.settings.chunk_size_bytes());
        let ranges = planner.plan(page_count, source.byte_size(), options.chunking)?;
        let chunk_count = ranges.len();

        tracing::info!(
            pages = page_count,
            chunks = chunk_count,
            use_ocr = options.use_ocr,
            language = %options.language,
            "starting batch extraction"
        );

        // Extract chunks concurrently, then reassemble in page order.
        let mut join_set = JoinSet::new();
        for (chunk_index, range) in ranges.iter().copied().enumerate() {
            let this = self.clone_handles();
            let source = source.clone();
            join_set.spawn(async move {
                let _permit = this.chunk_workers.acquire().await.ok();
                let mut results = Vec::with_capacity(range.len() as usize);
                for page in range.pages() {
                    let result = this
                        .extract_page(source.clone(), page, options.use_ocr, options.language)
                        .await;
                    results.push(result);
                }
                (chunk_index, results)
            });
        }

        let mut chunks: Vec<Option<Vec<PageResult>>> = vec![None; chunk_count];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((chunk_index, results)) => chunks[chunk_index] = Some(results),
                Err(e) => {
                    tracing::error!(error = %e, "chunk worker panicked");
                }
            }
        }

        // Page order is a correctness requirement: chunk index, then page
        // index within the chunk. A lost chunk degrades to failed pages.
        let mut results: Vec<PageResult> = Vec::with_capacity(page_count as usize);
        for (chunk_index, chunk) in chunks.into_iter().enumerate() {
            match chunk {
                Some(pages) => results.extend(pages),
                None => results.extend(ranges[chunk_index].pages().map(PageResult::failed)),
            }
        }
        if results.iter().all(|r| r.failed) {
            return Err(ProcessError::AllPagesFailed(page_count));
        }

        // Normalize each page, then filter across the complete set.
        let mut page_texts: Vec<String> = results.iter().map(|r| normalize(&r.text)).collect();

        let filter_options = FilterOptions {
            remove_repetitive: options.remove_repetitive,
            remove_copyright: options.remove_copyright,
        };
        let filtered = filter_options.any();
        if filtered {
            let filter = TextFilter::new(&self.settings.filter);
            page_texts = filter.filter_pages(page_texts, filter_options);
        }

        let text = assemble(&page_texts);
        let total_chars = text.chars().count();

        Ok(ExtractionResult {
            text,
            pages: page_count,
            total_chars,
            chunks_processed: chunk_count,
            filtered,
        })
    }

    /// Stream a PDF file page by page into `tx`.
    pub async fn stream_file(
        &self,
        path: &Path,
        use_ocr: bool,
        language: Language,
        tx: mpsc::Sender<ProgressRecord>,
    ) -> Result<(), ProcessError> {
        let source = self.open(path)?;
        self.stream_source(source, use_ocr, language, tx).await
    }

    /// Stream any page source, one progress record per completed page.
    ///
    /// Pages are emitted strictly in order. The cross-page filter never
    /// runs here. A closed receiver means the client went away: remaining
    /// work is abandoned without error.
    pub async fn stream_source(
        &self,
        source: Arc<dyn PageSource>,
        use_ocr: bool,
        language: Language,
        tx: mpsc::Sender<ProgressRecord>,
    ) -> Result<(), ProcessError> {
        let total = source.page_count();
        if total == 0 {
            return Err(ProcessError::EmptyDocument);
        }

        for page in 0..total {
            let result = self
                .extract_page(source.clone(), page, use_ocr, language)
                .await;
            let record = ProgressRecord {
                page: page + 1,
                total_pages: total,
                progress: progress_percent(page + 1, total),
                text: normalize(&result.text),
            };
            if tx.send(record).await.is_err() {
                tracing::debug!(page, total, "stream consumer dropped, abandoning extraction");
                return Ok(());
            }
        }

        Ok(())
    }

    /// Extract one page: native check on a blocking worker, then OCR
    /// under the OCR semaphore and timeout if the page needs it. Failures
    /// degrade the page to empty; the document continues.
    async fn extract_page(
        &self,
        source: Arc<dyn PageSource>,
        page: u32,
        use_ocr: bool,
        language: Language,
    ) -> PageResult {
        let threshold = self.settings.native_text_threshold;
        let check_source = source.clone();
        let check = tokio::task::spawn_blocking(move || {
            native_check(check_source.as_ref(), page, use_ocr, threshold)
        })
        .await
        .unwrap_or_else(|e| NativeCheck::Failed(format!("extraction worker panicked: {}", e)));

        match check {
            NativeCheck::Extracted(text) => PageResult::extracted(page, text, false),
            NativeCheck::Failed(message) => {
                tracing::warn!(page, message, "page extraction failed, degrading to empty");
                PageResult::failed(page)
            }
            NativeCheck::OcrFallback => self.ocr_page(source, page, language).await,
        }
    }

    async fn ocr_page(
        &self,
        source: Arc<dyn PageSource>,
        page: u32,
        language: Language,
    ) -> PageResult {
        let permit = match self.ocr_slots.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return PageResult::failed(page),
        };

        let ocr_source = source.clone();
        let task =
            tokio::task::spawn_blocking(move || ocr_source.ocr_text(page, language));
        let timeout = Duration::from_secs(self.settings.ocr_timeout_secs);

        let result = match tokio::time::timeout(timeout, task).await {
            Ok(Ok(Ok(text))) => PageResult::extracted(page, text, true),
            Ok(Ok(Err(e))) => {
                tracing::warn!(page, error = %e, "OCR failed, degrading page to empty");
                PageResult::failed(page)
            }
            Ok(Err(e)) => {
                tracing::warn!(page, error = %e, "OCR worker panicked");
                PageResult::failed(page)
            }
            Err(_) => {
                tracing::warn!(
                    page,
                    timeout_secs = self.settings.ocr_timeout_secs,
                    "OCR timed out, degrading page to empty"
                );
                PageResult::failed(page)
            }
        };

        drop(permit);
        result
    }

    /// Cheap handle for moving the processor's gates into chunk tasks.
    fn clone_handles(&self) -> PdfProcessor {
        PdfProcessor {
            settings: self.settings.clone(),
            chunk_workers: self.chunk_workers.clone(),
            ocr_slots: self.ocr_slots.clone(),
        }
    }
}

/// Join non-blank pages with page markers, the batch output format.
fn assemble(page_texts: &[String]) -> String {
    let blocks: Vec<String> = page_texts
        .iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(index, text)| format!("--- Page {} ---\n{}", index + 1, text))
        .collect();
    blocks.join("\n\n")
}

/// Integer progress percent for `done` of `total` pages.
fn progress_percent(done: u32, total: u32) -> u32 {
    ((f64::from(done) / f64::from(total)) * 100.0).round() as u32
}
