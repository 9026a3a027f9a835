//! Represents an image held in the gallery directory.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Public URL prefix under which gallery images are served.
pub const IMAGE_URL_PREFIX: &str = "/api/gallery/images";

/// A single image in the gallery.
///
/// There is no metadata store: every field is derived from the file on disk
/// (or, for `original_name`, from the upload that created it).
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    /// Server-generated unique name; the identity of the image.
    pub filename: String,

    /// Client-supplied filename at upload time. Advisory only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,

    /// Path the image is served from.
    pub url: String,

    /// Size in bytes.
    #[serde(rename = "size")]
    pub size_bytes: u64,

    /// When the file was written.
    #[serde(rename = "uploadDate")]
    pub uploaded_at: DateTime<Utc>,
}

impl GalleryImage {
    pub fn url_for(filename: &str) -> String {
        format!("{}/{}", IMAGE_URL_PREFIX, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_client_field_names() {
        let uploaded_at = DateTime::parse_from_rfc3339("2025-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let image = GalleryImage {
            filename: "gallery-1-000000001.png".into(),
            original_name: None,
            url: GalleryImage::url_for("gallery-1-000000001.png"),
            size_bytes: 42,
            uploaded_at,
        };

        let value = serde_json::to_value(&image).unwrap();
        assert_eq!(
            value,
            json!({
                "filename": "gallery-1-000000001.png",
                "url": "/api/gallery/images/gallery-1-000000001.png",
                "size": 42,
                "uploadDate": "2025-01-02T03:04:05Z",
            })
        );
    }

    #[test]
    fn original_name_is_camel_cased_when_present() {
        let image = GalleryImage {
            filename: "gallery-1-2.jpg".into(),
            original_name: Some("holiday.JPG".into()),
            url: GalleryImage::url_for("gallery-1-2.jpg"),
            size_bytes: 1,
            uploaded_at: Utc::now(),
        };
        let value = serde_json::to_value(&image).unwrap();
        assert_eq!(value["originalName"], "holiday.JPG");
    }
}
