//! Handler error reporting.
//!
//! Handlers return `Result<_, AppError>`; the error becomes a response and
//! its private description is attached to the response extensions where the
//! access log picks it up.

use std::fmt;

use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;

/// Private error descriptions attached to a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerErrors(Vec<String>);

impl HandlerErrors {
    pub fn push(&mut self, error: impl Into<String>) {
        self.0.push(error.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// One `Error #NN: ...` line per entry.
    pub fn summary(&self) -> String {
        self.0
            .iter()
            .enumerate()
            .map(|(i, error)| format!("Error #{:02}: {}\n", i + 1, error))
            .collect()
    }
}

/// Append an error description to the response's `HandlerErrors`.
pub fn attach_error<B>(response: &mut Response<B>, error: impl Into<String>) {
    let extensions = response.extensions_mut();
    match extensions.get_mut::<HandlerErrors>() {
        Some(errors) => errors.push(error),
        None => {
            let mut errors = HandlerErrors::default();
            errors.push(error);
            extensions.insert(errors);
        }
    }
}

/// Error returned by request handlers.
///
/// The client sees `status` and a public message; the private description
/// only reaches the logs.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    public: String,
    private: String,
}

impl AppError {
    /// Error with the status' canonical reason as the public message.
    pub fn new(status: StatusCode, private: impl fmt::Display) -> Self {
        Self {
            status,
            public: status.canonical_reason().unwrap_or("error").to_string(),
            private: private.to_string(),
        }
    }

    pub fn internal(private: impl fmt::Display) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, private)
    }

    pub fn with_public_message(mut self, message: impl Into<String>) -> Self {
        self.public = message.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.private)
    }
}

impl<E> From<E> for AppError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::internal(error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let mut response = (self.status, self.public).into_response();
        attach_error(&mut response, self.private);
        response
    }
}
