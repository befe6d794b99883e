// HTTP surface: the page plus one endpoint per button.
//
// Routes:
//   GET  /              the single-page UI
//   POST /api/analyze   multipart `text` + optional `file` -> AnalysisOutcome
//   POST /api/clear     -> ClearedFields
//   POST /api/export    JSON `{ "text": ... }` -> `{ "download": url | null }`
//   GET  /download      the exported file as an attachment
//   GET  /health        liveness probe

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use textlens_app::{
    analyze_input, clear_inputs, export_result, AnalysisOutcome, AnalysisRequest, ClearedFields,
    FileSource,
};
use textlens_llm::TextGenerator;

use crate::page::INDEX_HTML;

/// URL the page follows to fetch the exported file.
pub const DOWNLOAD_ROUTE: &str = "/download";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    generator: Arc<dyn TextGenerator>,
    export_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(generator: Arc<dyn TextGenerator>, export_path: PathBuf) -> Self {
        Self {
            generator,
            export_path: Arc::new(export_path),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub download: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the application router. Request bodies (uploads included) are capped
/// at `max_upload_bytes`.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/clear", post(clear))
        .route("/api/export", post(export))
        .route(DOWNLOAD_ROUTE, get(download))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `router` on an already-bound listener until ctrl-c.
pub async fn run(listener: TcpListener, router: Router) -> anyhow::Result<()> {
    let local_addr = listener.local_addr()?;
    info!("TextLens listening on http://{local_addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> &'static str {
    "ok"
}

async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<AnalysisOutcome> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            error!("analyze request is not a multipart form: {rejection}");
            return Json(AnalysisOutcome::error(rejection.body_text()));
        }
    };

    let request = match read_analysis_form(&mut multipart).await {
        Ok(request) => request,
        Err(e) => {
            error!("failed to read analysis form: {e}");
            return Json(AnalysisOutcome::error(e.body_text()));
        }
    };

    Json(analyze_input(state.generator.as_ref(), request).await)
}

async fn clear() -> Json<ClearedFields> {
    Json(clear_inputs())
}

async fn export(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> (StatusCode, Json<ExportResponse>) {
    match export_result(&request.text, &state.export_path).await {
        Ok(Some(_)) => (
            StatusCode::OK,
            Json(ExportResponse {
                download: Some(DOWNLOAD_ROUTE.to_string()),
                error: None,
            }),
        ),
        Ok(None) => (
            StatusCode::OK,
            Json(ExportResponse {
                download: None,
                error: None,
            }),
        ),
        Err(e) => {
            error!("export failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExportResponse {
                    download: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

async fn download(State(state): State<AppState>) -> Response {
    let path = state.export_path.as_path();
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "analysis_result.txt".to_string());
            let headers = [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{file_name}\""),
                ),
            ];
            (headers, bytes).into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "nothing has been exported yet").into_response()
        }
        Err(e) => {
            error!("failed to read export {}: {e}", path.display());
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to read export").into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Form parsing
// ---------------------------------------------------------------------------

/// Pull the `text` and `file` fields out of the analyze form. An empty file
/// part (no name, no bytes) is what browsers send when nothing was picked and
/// counts as no file.
async fn read_analysis_form(multipart: &mut Multipart) -> Result<AnalysisRequest, MultipartError> {
    let mut request = AnalysisRequest::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("text") => request.text = Some(field.text().await?),
            Some("file") => {
                let file_name = field.file_name().map(str::to_string).unwrap_or_default();
                let bytes = field.bytes().await?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                request.file = Some(FileSource::Upload {
                    name: file_name,
                    bytes: bytes.to_vec(),
                });
            }
            other => debug!(field = ?other, "ignoring unknown form field"),
        }
    }

    Ok(request)
}
