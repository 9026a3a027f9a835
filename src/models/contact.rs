//! A contact-form submission. Never persisted.

use serde::Deserialize;

/// Body of `POST /api/contact`.
///
/// Missing fields deserialize as empty strings so they fail validation with
/// the same message as blank ones.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct ContactMessage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}
