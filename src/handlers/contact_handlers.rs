//! `POST /api/contact`

use crate::{
    errors::AppError, handlers::MessageResponse, models::contact::ContactMessage,
    state::AppState,
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

/// Accept a contact-form submission.
///
/// Responds 200 as soon as the message passes validation and is logged,
/// whatever happens to the email relay.
pub async fn submit_contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactMessage>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(contact) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected contact payload");
        AppError::bad_request("Please fill all fields correctly.")
    })?;

    let delivery = state.contact.submit(&contact).await?;
    tracing::debug!(?delivery, "contact submission accepted");

    Ok(Json(MessageResponse::ok("Message sent successfully!")))
}
