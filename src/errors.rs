use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::{contact_service::ContactError, gallery_service::GalleryError};

/// A lightweight wrapper for handler errors that keeps the message local.
///
/// Every failure leaving the API is rendered as `{ "success": false, "error": ... }`.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Map a gallery failure to a response, using `fallback` as the public
    /// message for internal errors so no paths or I/O details leak out.
    pub fn from_gallery(err: GalleryError, fallback: &str) -> Self {
        match err {
            GalleryError::Validation(msg) => Self::bad_request(msg),
            GalleryError::AccessDenied => Self::new(StatusCode::FORBIDDEN, "Access denied"),
            GalleryError::NotFound => Self::new(StatusCode::NOT_FOUND, "Image not found"),
            GalleryError::Io(err) => {
                tracing::error!(error = %err, "{}", fallback);
                Self::internal(fallback)
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.message,
        }));

        (self.status, body).into_response()
    }
}

impl From<ContactError> for AppError {
    fn from(err: ContactError) -> Self {
        match err {
            ContactError::MissingField | ContactError::InvalidEmail => {
                AppError::bad_request(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn renders_uniform_error_body() {
        let response = AppError::bad_request("nope").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body, json!({ "success": false, "error": "nope" }));
    }

    #[tokio::test]
    async fn io_errors_do_not_leak_details() {
        let err = GalleryError::Io(io::Error::other("/secret/path exploded"));
        let app_err = AppError::from_gallery(err, "Failed to serve image");
        assert_eq!(app_err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(app_err.message, "Failed to serve image");
    }

    #[test]
    fn gallery_errors_map_to_statuses() {
        assert_eq!(
            AppError::from_gallery(GalleryError::AccessDenied, "x").status,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from_gallery(GalleryError::NotFound, "x").status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from_gallery(GalleryError::Validation("bad".into()), "x").status,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn contact_errors_are_bad_requests() {
        let err: AppError = ContactError::InvalidEmail.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Please enter a valid email address.");
    }
}
