//! End-to-end pipeline tests over an in-memory page source.
//!
//! These cover the batch and streaming paths without touching Poppler or
//! Tesseract: a fake `PageSource` serves scripted native/OCR text per
//! page, including failure injection.

use std::sync::Arc;

use tokio::sync::mpsc;

use pdf2text::config::Settings;
use pdf2text::pdf::{
    ExtractOptions, ExtractionError, Language, PageSource, PdfProcessor, ProcessError,
    ProgressRecord,
};

/// Scripted behavior for one fake page.
#[derive(Clone)]
struct FakePage {
    native: Result<String, String>,
    ocr: Result<String, String>,
}

impl FakePage {
    fn native(text: &str) -> Self {
        Self {
            native: Ok(text.to_string()),
            ocr: Err("ocr should not run".to_string()),
        }
    }

    fn scanned(ocr_text: &str) -> Self {
        Self {
            native: Ok(String::new()),
            ocr: Ok(ocr_text.to_string()),
        }
    }

    fn broken() -> Self {
        Self {
            native: Err("render failure".to_string()),
            ocr: Err("recognition failure".to_string()),
        }
    }
}

struct FakePdf {
    pages: Vec<FakePage>,
    byte_size: u64,
}

impl FakePdf {
    fn new(pages: Vec<FakePage>) -> Self {
        Self {
            pages,
            byte_size: 1024,
        }
    }

    fn with_byte_size(mut self, byte_size: u64) -> Self {
        self.byte_size = byte_size;
        self
    }
}

impl PageSource for FakePdf {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn byte_size(&self) -> u64 {
        self.byte_size
    }

    fn native_text(&self, page: u32) -> Result<String, ExtractionError> {
        self.pages[page as usize]
            .native
            .clone()
            .map_err(ExtractionError::ExtractionFailed)
    }

    fn ocr_text(&self, page: u32, _language: Language) -> Result<String, ExtractionError> {
        self.pages[page as usize]
            .ocr
            .clone()
            .map_err(ExtractionError::ExtractionFailed)
    }
}

fn processor() -> PdfProcessor {
    PdfProcessor::new(Arc::new(Settings::default()))
}

fn no_filter_options() -> ExtractOptions {
    ExtractOptions {
        use_ocr: false,
        remove_repetitive: false,
        remove_copyright: false,
        ..ExtractOptions::default()
    }
}

async fn collect_stream(
    processor: &PdfProcessor,
    source: Arc<dyn PageSource>,
    use_ocr: bool,
) -> Vec<ProgressRecord> {
    let (tx, mut rx) = mpsc::channel(32);
    processor
        .stream_source(source, use_ocr, Language::Eng, tx)
        .await
        .unwrap();
    let mut records = Vec::new();
    while let Some(record) = rx.recv().await {
        records.push(record);
    }
    records
}

/// Scenario A: three native-text pages, OCR off, filtering off. All
/// content survives verbatim (post-normalization).
#[tokio::test]
async fn native_three_page_document() {
    let source = Arc::new(FakePdf::new(vec![
        FakePage::native("First page body text, long enough to be dense."),
        FakePage::native("Second page body text, also long enough."),
        FakePage::native("Third page body text, likewise sufficient."),
    ]));

    let result = processor()
        .process_source(source, no_filter_options())
        .await
        .unwrap();

    assert_eq!(result.pages, 3);
    assert_eq!(result.chunks_processed, 1);
    assert!(!result.filtered);
    assert!(result.text.contains("First page body text"));
    assert!(result.text.contains("Second page body text"));
    assert!(result.text.contains("Third page body text"));
    assert!(result.text.contains("--- Page 1 ---"));
    assert!(result.text.contains("--- Page 3 ---"));
}

/// total_chars must equal the exact character length of the returned text.
#[tokio::test]
async fn total_chars_matches_text_length() {
    let source = Arc::new(FakePdf::new(vec![
        FakePage::native("Some unicode content: caffè, naïve, 中文."),
        FakePage::native("And a second page of ordinary text here."),
    ]));

    let result = processor()
        .process_source(source, no_filter_options())
        .await
        .unwrap();

    assert_eq!(result.total_chars, result.text.chars().count());
    assert!(result.total_chars > 0);
}

/// Scenario B: a copyright line on every page disappears when
/// remove_copyright is on and survives when it is off.
#[tokio::test]
async fn copyright_filtering_toggle() {
    let pages: Vec<FakePage> = (0..6)
        .map(|i| {
            FakePage::native(&format!(
                "Copyright 2024 Acme Corp\nChapter body paragraph {} with real content.\nAnother line of body {}.",
                i, i
            ))
        })
        .collect();

    let with_filter = ExtractOptions {
        use_ocr: false,
        remove_repetitive: false,
        remove_copyright: true,
        ..ExtractOptions::default()
    };
    let result = processor()
        .process_source(Arc::new(FakePdf::new(pages.clone())), with_filter)
        .await
        .unwrap();
    assert!(!result.text.contains("Copyright 2024"));
    assert!(result.text.contains("Chapter body paragraph 0"));
    assert!(result.text.contains("Chapter body paragraph 5"));

    let without_filter = ExtractOptions {
        remove_copyright: false,
        ..with_filter
    };
    let result = processor()
        .process_source(Arc::new(FakePdf::new(pages)), without_filter)
        .await
        .unwrap();
    assert_eq!(result.text.matches("Copyright 2024 Acme Corp").count(), 6);
}

/// Scenario C: a header on 5 of 6 pages with a 50% threshold is removed
/// when remove_repetitive is on, retained when off.
#[tokio::test]
async fn repetitive_header_toggle() {
    let mut pages: Vec<FakePage> = (0..5)
        .map(|i| {
            FakePage::native(&format!(
                "ACME QUARTERLY REPORT\nSection {} discusses the quarterly figures.\nFurther detail for section {}.",
                i, i
            ))
        })
        .collect();
    pages.push(FakePage::native(
        "Final page has no header.\nJust closing remarks.",
    ));

    let on = ExtractOptions {
        use_ocr: false,
        remove_repetitive: true,
        remove_copyright: false,
        ..ExtractOptions::default()
    };
    let result = processor()
        .process_source(Arc::new(FakePdf::new(pages.clone())), on)
        .await
        .unwrap();
    assert!(!result.text.contains("ACME QUARTERLY REPORT"));
    assert!(result.text.contains("Section 0 discusses"));

    let off = ExtractOptions {
        remove_repetitive: false,
        ..on
    };
    let result = processor()
        .process_source(Arc::new(FakePdf::new(pages)), off)
        .await
        .unwrap();
    assert_eq!(result.text.matches("ACME QUARTERLY REPORT").count(), 5);
}

/// Scenario E: streaming a 10-page document yields exactly 10 records
/// with progress 10, 20, ..., 100.
#[tokio::test]
async fn stream_ten_pages_progress_sequence() {
    let pages: Vec<FakePage> = (0..10)
        .map(|i| FakePage::native(&format!("Streaming page {} content, dense enough.", i)))
        .collect();
    let source = Arc::new(FakePdf::new(pages));

    let records = collect_stream(&processor(), source, false).await;

    assert_eq!(records.len(), 10);
    let progress: Vec<u32> = records.iter().map(|r| r.progress).collect();
    assert_eq!(progress, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.page, i as u32 + 1);
        assert_eq!(record.total_pages, 10);
        assert!(record.text.contains(&format!("Streaming page {}", i)));
    }
}

/// Streaming progress is non-decreasing and ends at exactly 100 for page
/// counts that do not divide 100 evenly.
#[tokio::test]
async fn stream_progress_monotonic_for_odd_page_counts() {
    for total in [1usize, 3, 7, 13] {
        let pages: Vec<FakePage> = (0..total)
            .map(|i| FakePage::native(&format!("Page {} has enough body text to pass.", i)))
            .collect();
        let records = collect_stream(&processor(), Arc::new(FakePdf::new(pages)), false).await;

        assert_eq!(records.len(), total);
        let mut last = 0;
        for record in &records {
            assert!(record.progress >= last);
            assert!(record.progress <= 100);
            last = record.progress;
        }
        assert_eq!(records.last().unwrap().progress, 100);
    }
}

/// Sparse pages fall back to OCR; dense pages never touch it.
#[tokio::test]
async fn mixed_native_and_scanned_pages() {
    let source = Arc::new(FakePdf::new(vec![
        FakePage::native(
            "A perfectly ordinary page with a healthy embedded text layer, dense enough to skip OCR.",
        ),
        FakePage::scanned("Recognized text from the scanned second page."),
    ]));

    let options = ExtractOptions {
        remove_repetitive: false,
        remove_copyright: false,
        ..ExtractOptions::default()
    };
    let result = processor().process_source(source, options).await.unwrap();

    assert!(result.text.contains("embedded text layer"));
    assert!(result.text.contains("Recognized text from the scanned"));
}

/// A failing page degrades to empty; the rest of the document survives.
#[tokio::test]
async fn partial_failure_continues() {
    let source = Arc::new(FakePdf::new(vec![
        FakePage::native(
            "Good first page with plenty of native text on it, comfortably past the density check.",
        ),
        FakePage::broken(),
        FakePage::native(
            "Good third page with plenty of native text on it too, also past the density check.",
        ),
    ]));

    let options = ExtractOptions {
        remove_repetitive: false,
        remove_copyright: false,
        ..ExtractOptions::default()
    };
    let result = processor().process_source(source, options).await.unwrap();

    assert_eq!(result.pages, 3);
    assert!(result.text.contains("Good first page"));
    assert!(result.text.contains("Good third page"));
    // The failed page is skipped in the output rather than faked.
    assert!(!result.text.contains("--- Page 2 ---"));
}

/// Only when every page fails does the whole request fail.
#[tokio::test]
async fn total_failure_is_an_error() {
    let source = Arc::new(FakePdf::new(vec![FakePage::broken(), FakePage::broken()]));

    let err = processor()
        .process_source(source, ExtractOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::AllPagesFailed(2)));
}

/// Chunked and unchunked processing produce the same text in the same
/// order.
#[tokio::test]
async fn chunked_processing_preserves_page_order() {
    let pages: Vec<FakePage> = (0..40)
        .map(|i| FakePage::native(&format!("Ordered page {:02} with sufficient body text.", i)))
        .collect();

    // ~1 MB/page against a 10 MB chunk size -> 4 chunks of 10 pages.
    let chunked_source =
        Arc::new(FakePdf::new(pages.clone()).with_byte_size(40 * 1024 * 1024));
    let plain_source = Arc::new(FakePdf::new(pages));

    let options = no_filter_options();
    let chunked = processor()
        .process_source(chunked_source, options)
        .await
        .unwrap();
    let plain = processor()
        .process_source(plain_source, options)
        .await
        .unwrap();

    assert_eq!(chunked.chunks_processed, 4);
    assert_eq!(plain.chunks_processed, 1);
    assert_eq!(chunked.text, plain.text);

    // Page markers appear in strictly increasing order.
    let positions: Vec<usize> = (0..40)
        .map(|i| {
            chunked
                .text
                .find(&format!("Ordered page {:02}", i))
                .expect("page missing from output")
        })
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

/// Dropping the stream receiver abandons the remaining pages silently.
#[tokio::test]
async fn stream_consumer_disconnect_abandons_work() {
    let pages: Vec<FakePage> = (0..100)
        .map(|i| FakePage::native(&format!("Page {} body text, long enough to pass.", i)))
        .collect();
    let source = Arc::new(FakePdf::new(pages));

    let (tx, mut rx) = mpsc::channel(1);
    let proc = processor();

    // Take two records, then hang up.
    let driver = tokio::spawn(async move {
        proc.stream_source(source, false, Language::Eng, tx).await
    });
    let first = rx.recv().await.unwrap();
    assert_eq!(first.page, 1);
    let second = rx.recv().await.unwrap();
    assert_eq!(second.page, 2);
    drop(rx);

    // The producer must finish without error once it notices.
    let result = driver.await.unwrap();
    assert!(result.is_ok());
}

/// Zero-page documents are rejected before any extraction.
#[tokio::test]
async fn empty_document_is_rejected() {
    let source = Arc::new(FakePdf::new(vec![]));
    let err = processor()
        .process_source(source.clone(), ExtractOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::EmptyDocument));

    let (tx, _rx) = mpsc::channel(1);
    let err = processor()
        .stream_source(source, true, Language::Eng, tx)
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::EmptyDocument));
}

/// Streaming normalizes each page in isolation but never filters.
#[tokio::test]
async fn stream_normalizes_but_does_not_filter() {
    let pages: Vec<FakePage> = (0..4)
        .map(|i| {
            FakePage::native(&format!(
                "Copyright 2024 Acme Corp\nStreamed   body  text {} with di\u{fb03}cult words.",
                i
            ))
        })
        .collect();

    let records = collect_stream(&processor(), Arc::new(FakePdf::new(pages)), false).await;

    for record in &records {
        // Normalized: ligature expanded, spaces collapsed.
        assert!(record.text.contains("difficult words"));
        assert!(!record.text.contains("  "));
        // Not filtered: the copyright line is still there.
        assert!(record.text.contains("Copyright 2024 Acme Corp"));
    }
}
