//! Error taxonomy shared by the corpus, the tutor and the HTTP layer.
//!
//! Each variant maps to exactly one HTTP status in [`TutorError::status_code`];
//! the server never has to inspect error messages to classify them.

use axum::http::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TutorError {
    /// The document directory could not be created or read.
    #[error("document directory {} is unavailable: {source}", .path.display())]
    Configuration {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single document failed text extraction.
    #[error(transparent)]
    Extraction(#[from] crate::extract::ExtractError),

    #[error("{0}")]
    NotFound(String),

    /// No answer was produced for the chapter: it is not loaded, or the
    /// model call failed or returned no usable text.
    #[error("no answer produced for {chapter}")]
    Generation { chapter: String },

    #[error("{0}")]
    RequestValidation(String),
}

impl TutorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TutorError::NotFound(_) => StatusCode::NOT_FOUND,
            TutorError::RequestValidation(_) => StatusCode::BAD_REQUEST,
            TutorError::Configuration { .. }
            | TutorError::Extraction(_)
            | TutorError::Generation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
