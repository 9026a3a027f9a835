//! Shared handler state.

use crate::services::{contact_service::ContactNotifier, gallery_service::GalleryStore};
use std::sync::Arc;

/// Cloned into every handler. The gallery store is cheap to clone; the
/// notifier owns a mail transport and is shared behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub gallery: GalleryStore,
    pub contact: Arc<ContactNotifier>,
}

impl AppState {
    pub fn new(gallery: GalleryStore, contact: ContactNotifier) -> Self {
        Self {
            gallery,
            contact: Arc::new(contact),
        }
    }
}
