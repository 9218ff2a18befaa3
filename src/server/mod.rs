//! HTTP server for the extraction API.
//!
//! Thin plumbing around the pipeline: multipart upload validation, the
//! batch and streaming endpoints, and status/health reporting. Each
//! request gets an isolated pipeline run; the shared state is only the
//! read-only settings and the processor's concurrency gates.

mod error;
mod handlers;
mod routes;

pub use error::ApiError;
pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::pdf::PdfProcessor;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub processor: Arc<PdfProcessor>,
}

impl AppState {
    pub fn new(settings: Arc<Settings>) -> Self {
        let processor = Arc::new(PdfProcessor::new(settings.clone()));
        Self {
            settings,
            processor,
        }
    }
}

/// Start the web server.
pub async fn serve(settings: Arc<Settings>, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
