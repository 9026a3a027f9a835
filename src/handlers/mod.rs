//! HTTP handlers. Each delegates to a service and converts failures into
//! [`AppError`](crate::errors::AppError).

pub mod contact_handlers;
pub mod gallery_handlers;
pub mod health_handlers;

use serde::Serialize;

/// `{ "success": true, "message": ... }`
#[derive(Serialize, Debug)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
