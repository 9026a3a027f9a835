//! Core services used by the HTTP handlers.

pub mod contact_service;
pub mod gallery_service;
pub mod mailer;
