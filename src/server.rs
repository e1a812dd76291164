//! HTTP API for the chapter tutor.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/chapters` | List available chapters and their count |
//! | `GET`  | `/api/chapters/{name}` | Chapter name and content length |
//! | `POST` | `/api/ask` | Ask `{chapter, question}` |
//! | `POST` | `/api/chapter{N}` | Ask `{question}` about `Chapter{N}`, N in 1..=13 |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Envelope
//!
//! Successful responses carry `"status": "success"` next to their payload:
//!
//! ```json
//! { "status": "success", "chapter": "Chapter1", "question": "...", "response": "...", "time_taken": 1.42 }
//! ```
//!
//! Errors carry `"status": "error"` and a message:
//!
//! ```json
//! { "status": "error", "message": "Missing required field: question" }
//! ```
//!
//! Status codes: `400` malformed body, `404` unknown chapter or route,
//! `405` wrong method, `500` no answer produced. Unmatched paths and methods
//! answer with the same error envelope. Asking about a chapter that is not
//! loaded is a `500` ("Failed to generate response"), not a `404`; only the
//! chapter info route reports unknown chapters as not found.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser and mobile
//! front-ends can call the API directly.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::TutorError;
use crate::tutor::{AnswerResult, Tutor};

/// Document identifiers served by the `/api/chapter{N}` routes, indexed by
/// `N - 1`.
pub const CHAPTER_ROUTES: [&str; 13] = [
    "Chapter1",
    "Chapter2",
    "Chapter3",
    "Chapter4",
    "Chapter5",
    "Chapter6",
    "Chapter7",
    "Chapter8",
    "Chapter9",
    "Chapter10",
    "Chapter11",
    "Chapter12",
    "Chapter13",
];

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    tutor: Arc<Tutor>,
}

/// Starts the HTTP server.
///
/// Loads the corpus and builds the model client before binding, so no
/// request is accepted until every chapter has been read. Runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let tutor = Arc::new(Tutor::from_config(config)?);

    info!(
        "Serving {} chapter(s) with model {}",
        tutor.corpus().len(),
        tutor.model_name()
    );
    let unavailable = tutor.corpus().unavailable();
    if !unavailable.is_empty() {
        warn!("Unavailable chapters: {}", unavailable.join(", "));
    }

    let app = router(tutor);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("Tutor API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router with all routes and the CORS layer.
pub fn router(tutor: Arc<Tutor>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chapters", get(handle_list_chapters))
        .route("/api/chapters/{name}", get(handle_chapter_info))
        .route("/api/ask", post(handle_ask))
        .route("/api/{endpoint}", post(handle_chapter_question))
        .route("/health", get(handle_health))
        .fallback(handle_not_found)
        .method_not_allowed_fallback(handle_method_not_allowed)
        .layer(cors)
        .with_state(AppState { tutor })
}

/// Resolves a `chapter{N}` route segment through [`CHAPTER_ROUTES`].
pub fn chapter_for_endpoint(endpoint: &str) -> Option<&'static str> {
    let digits = endpoint.strip_prefix("chapter")?;
    if digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: usize = digits.parse().ok()?;
    CHAPTER_ROUTES.get(n.checked_sub(1)?).copied()
}

// ============ Envelope ============

#[derive(Serialize)]
struct Success<T> {
    status: &'static str,
    #[serde(flatten)]
    payload: T,
}

fn success<T: Serialize>(payload: T) -> Json<Success<T>> {
    Json(Success {
        status: "success",
        payload,
    })
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

/// Internal error type that converts into an error envelope response.
struct AppError {
    status: StatusCode,
    message: String,
}

impl From<TutorError> for AppError {
    fn from(err: TutorError) -> Self {
        AppError {
            status: err.status_code(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: "error",
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Maps a failed ask to a `500` carrying the client-facing `message`,
/// keeping the status of any other error.
fn generation_failure(err: TutorError, message: impl Into<String>) -> AppError {
    match err {
        TutorError::Generation { .. } => AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        },
        other => other.into(),
    }
}

async fn handle_not_found() -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        message: "Not found".to_string(),
    }
}

async fn handle_method_not_allowed() -> AppError {
    AppError {
        status: StatusCode::METHOD_NOT_ALLOWED,
        message: "Method not allowed".to_string(),
    }
}

/// Reads a string field from a parsed request body.
fn string_field<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name).and_then(Value::as_str)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/chapters ============

#[derive(Serialize)]
struct ChapterList {
    chapters: Vec<String>,
    count: usize,
}

async fn handle_list_chapters(State(state): State<AppState>) -> Json<Success<ChapterList>> {
    let chapters: Vec<String> = state
        .tutor
        .corpus()
        .ids()
        .into_iter()
        .map(str::to_string)
        .collect();
    let count = chapters.len();
    success(ChapterList { chapters, count })
}

// ============ GET /api/chapters/{name} ============

#[derive(Serialize)]
struct ChapterInfo {
    chapter: String,
    content_length: usize,
}

async fn handle_chapter_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Success<ChapterInfo>>, AppError> {
    let text = state
        .tutor
        .corpus()
        .get(&name)
        .ok_or_else(|| TutorError::NotFound("Chapter not found".to_string()))?;

    Ok(success(ChapterInfo {
        content_length: text.chars().count(),
        chapter: name,
    }))
}

// ============ POST /api/ask ============

/// Handler for `POST /api/ask`.
///
/// Both `chapter` and `question` must be present as strings; anything else,
/// including an unparsable body, is a `400`.
async fn handle_ask(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Success<AnswerResult>>, AppError> {
    let missing =
        || TutorError::RequestValidation("Missing required fields: chapter and question".into());

    let Json(body) = body.map_err(|_| missing())?;
    let (chapter, question) = match (string_field(&body, "chapter"), string_field(&body, "question"))
    {
        (Some(chapter), Some(question)) => (chapter, question),
        _ => return Err(missing().into()),
    };

    let result = state
        .tutor
        .ask(chapter, question)
        .await
        .map_err(|e| generation_failure(e, "Failed to generate response"))?;
    Ok(success(result))
}

// ============ POST /api/chapter{N} ============

/// Handler for the per-chapter routes.
///
/// One handler serves every entry of [`CHAPTER_ROUTES`]; the route segment
/// selects the chapter and only `question` is read from the body.
async fn handle_chapter_question(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Success<AnswerResult>>, AppError> {
    let chapter = chapter_for_endpoint(&endpoint)
        .ok_or_else(|| TutorError::NotFound(format!("No such endpoint: /api/{}", endpoint)))?;

    let missing = || TutorError::RequestValidation("Missing required field: question".into());

    let Json(body) = body.map_err(|_| missing())?;
    let question = string_field(&body, "question").ok_or_else(missing)?;

    let result = state
        .tutor
        .ask(chapter, question)
        .await
        .map_err(|e| {
            generation_failure(e, format!("Failed to generate response for {}", chapter))
        })?;
    Ok(success(result))
}
