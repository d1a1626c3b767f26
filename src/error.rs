//! Per-request errors / 请求错误
//!
//! Startup failures are plain `anyhow` errors returned to `main`; everything
//! that can go wrong while answering one request is a [`ServeError`].

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("404 page not found: {0}")]
    NotFound(String),

    #[error("failed to open {bucket}/{object}: {message}")]
    Open {
        bucket: String,
        object: String,
        message: String,
    },

    #[error("failed to read {bucket}/{object}: {source}")]
    Copy {
        bucket: String,
        object: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render index page: {0}")]
    Render(#[from] std::fmt::Error),
}

impl ServeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("{}", self);
        }

        // The raw message goes to the client, as plain text
        (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))],
            format!("{}\n", self),
        )
            .into_response()
    }
}
