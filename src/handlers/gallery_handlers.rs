//! HTTP handlers for the image gallery.
//! Image bodies are streamed in both directions; storage concerns live in
//! `GalleryStore`.

use crate::{
    errors::AppError, handlers::MessageResponse, models::image::GalleryImage,
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use futures::StreamExt;
use serde::Serialize;
use std::io;
use tokio_util::io::ReaderStream;

/// Multipart field that carries image files.
pub const UPLOAD_FIELD: &str = "images";

#[derive(Serialize, Debug)]
pub struct ListImagesResponse {
    pub success: bool,
    pub images: Vec<GalleryImage>,
    pub count: usize,
}

#[derive(Serialize, Debug)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub images: Vec<GalleryImage>,
}

/// GET `/api/gallery/images`
pub async fn list_images(
    State(state): State<AppState>,
) -> Result<Json<ListImagesResponse>, AppError> {
    let images = state
        .gallery
        .list_images()
        .await
        .map_err(|err| AppError::from_gallery(err, "Failed to load gallery images"))?;

    Ok(Json(ListImagesResponse {
        success: true,
        count: images.len(),
        images,
    }))
}

/// GET `/api/gallery/images/{filename}` as a streaming response.
pub async fn get_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let (image, file) = state
        .gallery
        .open_image(&filename)
        .await
        .map_err(|err| AppError::from_gallery(err, "Failed to serve image"))?;

    let body = Body::from_stream(ReaderStream::new(file));
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    set_image_headers(response.headers_mut(), &image);

    Ok(response)
}

/// POST `/api/gallery/upload` - multipart upload under the `images` field.
///
/// Parts without a filename are ignored. The batch is all-or-nothing: any
/// rejected part discards everything staged so far.
pub async fn upload_images(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected upload request");
        AppError::bad_request("Expected a multipart/form-data upload")
    })?;

    let mut batch = state.gallery.begin_upload();
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        tracing::debug!(error = %err, "failed to parse multipart data");
        AppError::bad_request("Failed to parse multipart data")
    })? {
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if field.name() != Some(UPLOAD_FIELD) {
            return Err(AppError::bad_request("Unexpected field"));
        }

        let content_type = field.content_type().map(str::to_string);
        let stream = field.map(|chunk| chunk.map_err(io::Error::other));
        batch
            .add_file(&original_name, content_type.as_deref(), stream)
            .await
            .map_err(|err| AppError::from_gallery(err, "Failed to upload images"))?;
    }

    let images = batch
        .commit()
        .await
        .map_err(|err| AppError::from_gallery(err, "Failed to upload images"))?;
    tracing::info!(count = images.len(), "gallery images uploaded");

    Ok(Json(UploadResponse {
        success: true,
        message: format!("{} images uploaded successfully", images.len()),
        images,
    }))
}

/// DELETE `/api/gallery/images/{filename}`
pub async fn delete_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .gallery
        .delete_image(&filename)
        .await
        .map_err(|err| AppError::from_gallery(err, "Failed to delete image"))?;
    tracing::info!(filename = %filename, "gallery image deleted");

    Ok(Json(MessageResponse::ok("Image deleted successfully")))
}

fn set_image_headers(headers: &mut HeaderMap, image: &GalleryImage) {
    let content_type = mime_guess::from_path(&image.filename).first_or_octet_stream();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type.as_ref())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(image.size_bytes));

    let last_modified = image
        .uploaded_at
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    if let Ok(value) = HeaderValue::from_str(&last_modified) {
        headers.insert(header::LAST_MODIFIED, value);
    }
}
