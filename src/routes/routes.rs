//! Defines routes for the contact form and image gallery.
//!
//! ## Structure
//! - **Service endpoints**
//!   - `GET    /api/health` - liveness
//!   - `GET    /api/ready` - readiness (gallery disk round trip)
//!   - `POST   /api/contact` - submit a contact message
//!
//! - **Gallery endpoints**
//!   - `GET    /api/gallery/images` - list images
//!   - `GET    /api/gallery/images/{filename}` - download one image
//!   - `DELETE /api/gallery/images/{filename}` - delete one image
//!   - `POST   /api/gallery/upload` - multipart upload, field `images`

use crate::{
    handlers::{
        contact_handlers::submit_contact,
        gallery_handlers::{delete_image, get_image, list_images, upload_images},
        health_handlers::{health, ready},
    },
    services::gallery_service::UploadLimits,
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Slack for multipart boundaries and part headers on top of the file bytes.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Build the router for all API routes.
///
/// The upload route gets a body limit large enough for a full batch so the
/// per-file limit in `GalleryStore` is what actually rejects oversize files.
pub fn routes(limits: UploadLimits) -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/ready", get(ready))
        .route("/api/contact", post(submit_contact))
        .route("/api/gallery/images", get(list_images))
        .route(
            "/api/gallery/images/{filename}",
            get(get_image).delete(delete_image),
        )
        .route(
            "/api/gallery/upload",
            post(upload_images).layer(DefaultBodyLimit::max(upload_body_limit(limits))),
        )
}

/// The complete application: routes, state, request tracing and CORS.
pub fn app(state: AppState) -> Router {
    routes(state.gallery.limits())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

fn upload_body_limit(limits: UploadLimits) -> usize {
    let per_file = usize::try_from(limits.max_file_size).unwrap_or(usize::MAX);
    limits
        .max_files
        .saturating_mul(per_file)
        .saturating_add(MULTIPART_OVERHEAD)
}
