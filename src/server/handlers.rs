//! HTTP endpoint handlers.

use std::convert::Infallible;
use std::io::Write;

use axum::body::Body;
use axum::extract::{Multipart, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream;
use serde::Deserialize;
use serde_json::json;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;

use crate::pdf::{ExtractOptions, Language, PageSource, ProgressRecord};

use super::error::ApiError;
use super::AppState;

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "eng".to_string()
}

fn parse_language(code: &str) -> Result<Language, ApiError> {
    Language::from_code(code)
        .ok_or_else(|| ApiError::BadRequest(format!("Unsupported language: {}", code)))
}

/// Query parameters for batch extraction.
#[derive(Debug, Deserialize)]
pub struct ExtractParams {
    #[serde(default = "default_true")]
    pub use_ocr: bool,
    #[serde(default = "default_true")]
    pub chunk_processing: bool,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_true")]
    pub remove_repetitive: bool,
    #[serde(default = "default_true")]
    pub remove_copyright: bool,
}

/// Query parameters for streaming extraction. Filtering options are not
/// exposed here: the filter needs whole-document statistics that do not
/// exist mid-stream.
#[derive(Debug, Deserialize)]
pub struct StreamParams {
    #[serde(default = "default_true")]
    pub use_ocr: bool,
    #[serde(default = "default_language")]
    pub language: String,
}

/// An upload that passed validation, spooled to a temp file.
struct ValidatedUpload {
    file: NamedTempFile,
    filename: String,
}

/// Pull the `file` field out of the multipart body, enforcing the type
/// and size checks before any extraction work starts.
async fn receive_pdf(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<ValidatedUpload, ApiError> {
    let max_bytes = state.settings.max_file_size_bytes();

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload.pdf".to_string());
        if !filename.to_lowercase().ends_with(".pdf") {
            return Err(ApiError::BadRequest(
                "Only PDF files are supported".to_string(),
            ));
        }

        let request_id = uuid::Uuid::new_v4();
        let mut file = NamedTempFile::new()?;
        let mut total: u64 = 0;
        let mut head: Vec<u8> = Vec::new();

        while let Some(chunk) = field.chunk().await? {
            total += chunk.len() as u64;
            if total > max_bytes {
                return Err(ApiError::PayloadTooLarge(state.settings.max_file_size_mb));
            }
            // Sniff the content type from the first bytes; the extension
            // alone is not trusted.
            if head.len() < 16 {
                head.extend_from_slice(&chunk[..chunk.len().min(16 - head.len())]);
                if head.len() >= 5 && !is_pdf_content(&head) {
                    return Err(ApiError::BadRequest(
                        "Only PDF files are supported".to_string(),
                    ));
                }
            }
            file.write_all(&chunk)?;
        }

        if !is_pdf_content(&head) {
            return Err(ApiError::BadRequest(
                "Only PDF files are supported".to_string(),
            ));
        }
        file.flush()?;

        tracing::info!(
            request_id = %request_id,
            filename = %filename,
            bytes = total,
            "upload accepted"
        );
        return Ok(ValidatedUpload { file, filename });
    }

    Err(ApiError::BadRequest("missing 'file' field".to_string()))
}

fn is_pdf_content(head: &[u8]) -> bool {
    infer::get(head)
        .map(|kind| kind.mime_type() == "application/pdf")
        .unwrap_or(false)
}

/// `POST /api/extract` — batch extraction, one combined result.
pub async fn extract(
    State(state): State<AppState>,
    Query(params): Query<ExtractParams>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let language = parse_language(&params.language)?;
    let upload = receive_pdf(&state, &mut multipart).await?;

    let options = ExtractOptions {
        use_ocr: params.use_ocr,
        chunking: params.chunk_processing,
        language,
        remove_repetitive: params.remove_repetitive,
        remove_copyright: params.remove_copyright,
    };
    let result = state.processor.process_file(upload.file.path(), options).await?;

    Ok(Json(json!({
        "success": true,
        "filename": upload.filename,
        "pages": result.pages,
        "text": result.text,
        "total_chars": result.total_chars,
        "chunks_processed": result.chunks_processed,
    }))
    .into_response())
}

/// `POST /api/extract-stream` — newline-delimited progress records, one
/// per completed page.
pub async fn extract_stream(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let language = parse_language(&params.language)?;
    let upload = receive_pdf(&state, &mut multipart).await?;

    // Open before responding so validation failures still get a proper
    // error status instead of a broken stream.
    let source = state.processor.open(upload.file.path())?;
    if source.page_count() == 0 {
        return Err(ApiError::BadRequest("document has no pages".to_string()));
    }

    let (tx, rx) = mpsc::channel::<ProgressRecord>(16);
    let processor = state.processor.clone();
    tokio::spawn(async move {
        // The temp file must outlive the extraction.
        let _upload = upload;
        if let Err(e) = processor
            .stream_source(source, params.use_ocr, language, tx)
            .await
        {
            tracing::error!(error = %e, "streaming extraction failed");
        }
    });

    let body = Body::from_stream(stream::unfold(rx, |mut rx| async {
        let record = rx.recv().await?;
        let mut line = serde_json::to_string(&record).unwrap_or_default();
        line.push('\n');
        Some((Ok::<_, Infallible>(line), rx))
    }));

    Ok(([(header::CONTENT_TYPE, "application/x-ndjson")], body).into_response())
}

/// `GET /api/status` — processor configuration and limits.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ready",
        "processor": state.processor.info(),
        "max_file_size_mb": state.settings.max_file_size_mb,
        "chunk_size_mb": state.settings.chunk_size_mb,
    }))
}

/// `GET /health` — health check for container orchestration.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "extraction_method": state.settings.extraction_method,
        "gpu_enabled": state.settings.use_gpu,
        "max_file_size_mb": state.settings.max_file_size_mb,
        "chunk_size_mb": state.settings.chunk_size_mb,
    }))
}

/// `GET /` — service banner.
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "pdf2text converter API",
        "health": "/health",
    }))
}
