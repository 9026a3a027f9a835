//! src/services/gallery_service.rs
//!
//! GalleryStore - the gallery directory used as an append-only object store.
//! There is no index or metadata file: listing re-reads the directory and
//! every image attribute is derived from the file itself.
//!
//! Uploads are staged into hidden temp files and only published (under a
//! freshly generated name) once the whole batch has been accepted, so a
//! rejected batch leaves the directory untouched.

use crate::models::image::GalleryImage;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt, pin_mut};
use rand::Rng;
use std::{
    fs::Metadata,
    io::{self, ErrorKind},
    path::{Component, Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// Extensions (lowercase, without the dot) that List treats as images.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

const NAME_PREFIX: &str = "gallery";
const STAGING_PREFIX: &str = ".upload-";
const MAX_EXTENSION_LEN: usize = 10;
const MAX_PUBLISH_ATTEMPTS: usize = 8;

/// Per-request upload limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_file_size: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_files: 10,
            max_file_size: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("{0}")]
    Validation(String),
    #[error("access denied")]
    AccessDenied,
    #[error("image not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type GalleryResult<T> = Result<T, GalleryError>;

/// GalleryStore provides the four gallery operations:
/// - List images (directory scan filtered by extension)
/// - Store a batch of uploaded images (see [`UploadBatch`])
/// - Open an image for streaming
/// - Delete an image
///
/// Serve and Delete only ever touch paths that resolve strictly inside the
/// canonical store root.
#[derive(Clone, Debug)]
pub struct GalleryStore {
    /// Canonicalized gallery directory.
    root: PathBuf,

    limits: UploadLimits,
}

/// A path that passed the containment check.
struct ResolvedImage {
    /// The directory entry named by the caller.
    entry: PathBuf,
    /// Canonical target of `entry` (differs when `entry` is a symlink).
    target: PathBuf,
}

impl GalleryStore {
    /// Open (creating if needed) the gallery directory at `dir`.
    ///
    /// The directory is canonicalized once here; all containment checks
    /// compare against that canonical root.
    pub async fn open(dir: impl AsRef<Path>, limits: UploadLimits) -> GalleryResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await?;
        let root = fs::canonicalize(dir).await?;
        debug!("gallery root resolved to {}", root.display());
        Ok(Self { root, limits })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    /// List every image in the gallery directory, sorted by filename.
    ///
    /// Entries without an allow-listed extension, directories and symlinks
    /// are skipped. An entry removed between the scan and its stat is skipped
    /// too.
    pub async fn list_images(&self) -> GalleryResult<Vec<GalleryImage>> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut images = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };
            if !has_image_extension(&filename) {
                continue;
            }
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(GalleryError::Io(err)),
            };
            if !meta.is_file() {
                continue;
            }
            images.push(describe(filename, &meta));
        }

        images.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(images)
    }

    /// Start a new upload batch against this store.
    pub fn begin_upload(&self) -> UploadBatch<'_> {
        UploadBatch {
            store: self,
            staged: Vec::new(),
        }
    }

    /// Open an image for reading.
    ///
    /// Returns the image descriptor and an opened file ready for streaming.
    pub async fn open_image(&self, filename: &str) -> GalleryResult<(GalleryImage, File)> {
        let resolved = self.resolve(filename).await?;
        let file = File::open(&resolved.target).await.map_err(not_found_or_io)?;
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(GalleryError::NotFound);
        }
        Ok((describe(filename.to_string(), &meta), file))
    }

    /// Remove an image from the gallery.
    ///
    /// Any file inside the root can be removed this way, including files that
    /// List does not report.
    pub async fn delete_image(&self, filename: &str) -> GalleryResult<()> {
        let resolved = self.resolve(filename).await?;
        let meta = fs::metadata(&resolved.target)
            .await
            .map_err(not_found_or_io)?;
        if !meta.is_file() {
            return Err(GalleryError::NotFound);
        }
        fs::remove_file(&resolved.entry)
            .await
            .map_err(not_found_or_io)?;
        debug!("removed gallery file {}", resolved.entry.display());
        Ok(())
    }

    /// Map a caller-supplied filename to a path strictly inside the root.
    ///
    /// Names that are empty, absolute, `.`/`..` or contain a separator are
    /// rejected before the filesystem is touched. Everything else is
    /// canonicalized (following symlinks) and compared component-wise with
    /// the canonical root.
    async fn resolve(&self, filename: &str) -> GalleryResult<ResolvedImage> {
        ensure_plain_filename(filename)?;

        let entry = self.root.join(filename);
        let target = fs::canonicalize(&entry).await.map_err(not_found_or_io)?;
        if target == self.root || !target.starts_with(&self.root) {
            warn!(filename, "rejected gallery path outside the store root");
            return Err(GalleryError::AccessDenied);
        }

        Ok(ResolvedImage { entry, target })
    }

    /// Publish a fully written staging file under a new unique name.
    ///
    /// Uses a hard link so an existing file is never replaced; a collision
    /// simply draws another name.
    async fn publish(&self, staged: &Path, extension: &str) -> GalleryResult<String> {
        for _ in 0..MAX_PUBLISH_ATTEMPTS {
            let filename = generate_filename(extension);
            match fs::hard_link(staged, self.root.join(&filename)).await {
                Ok(()) => {
                    if let Err(err) = fs::remove_file(staged).await {
                        warn!(
                            "could not remove staging file {}: {}",
                            staged.display(),
                            err
                        );
                    }
                    return Ok(filename);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    debug!(filename = %filename, "generated name already taken, retrying");
                }
                Err(err) => return Err(GalleryError::Io(err)),
            }
        }

        Err(GalleryError::Io(io::Error::new(
            ErrorKind::AlreadyExists,
            "could not allocate a unique gallery filename",
        )))
    }
}

/// An in-progress multi-file upload.
///
/// Files are streamed into hidden staging files as they are added and only
/// become visible on [`UploadBatch::commit`]. Dropping the batch without
/// committing removes everything it staged.
pub struct UploadBatch<'a> {
    store: &'a GalleryStore,
    staged: Vec<StagedFile>,
}

struct StagedFile {
    path: PathBuf,
    original_name: String,
    extension: String,
    size_bytes: u64,
}

impl UploadBatch<'_> {
    /// Validate and stage one uploaded file.
    ///
    /// Fails with `Validation` when the batch is already full, when the
    /// declared content type is not `image/*`, or as soon as the streamed
    /// body exceeds the per-file size limit.
    pub async fn add_file<S>(
        &mut self,
        original_name: &str,
        content_type: Option<&str>,
        stream: S,
    ) -> GalleryResult<()>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let limits = self.store.limits;
        if self.staged.len() >= limits.max_files {
            return Err(GalleryError::Validation(format!(
                "Too many files. At most {} images can be uploaded at once",
                limits.max_files
            )));
        }

        let is_image = content_type
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            debug!(original_name, ?content_type, "rejecting non-image upload");
            return Err(GalleryError::Validation(
                "Only image files are allowed".into(),
            ));
        }

        // Armed before the first byte is written so a cancelled or failed
        // write never leaves the staging file behind.
        let guard = StagingGuard::new(
            self.store
                .root
                .join(format!("{}{}.part", STAGING_PREFIX, Uuid::new_v4())),
        );
        let size_bytes = write_limited(guard.path(), stream, limits.max_file_size).await?;
        let path = guard.disarm();

        debug!(original_name, size_bytes, "staged gallery upload");
        self.staged.push(StagedFile {
            path,
            original_name: original_name.to_string(),
            extension: sanitize_extension(original_name),
            size_bytes,
        });
        Ok(())
    }

    /// Publish every staged file and return their descriptors.
    ///
    /// If any publication fails, files already published by this batch are
    /// removed again.
    pub async fn commit(mut self) -> GalleryResult<Vec<GalleryImage>> {
        if self.staged.is_empty() {
            return Err(GalleryError::Validation("No images uploaded".into()));
        }

        let mut published: Vec<GalleryImage> = Vec::with_capacity(self.staged.len());
        for file in &self.staged {
            match self.store.publish(&file.path, &file.extension).await {
                Ok(filename) => published.push(GalleryImage {
                    url: GalleryImage::url_for(&filename),
                    filename,
                    original_name: Some(file.original_name.clone()),
                    size_bytes: file.size_bytes,
                    uploaded_at: Utc::now(),
                }),
                Err(err) => {
                    for image in &published {
                        let _ = fs::remove_file(self.store.root.join(&image.filename)).await;
                    }
                    return Err(err);
                }
            }
        }

        self.staged.clear();
        Ok(published)
    }
}

impl Drop for UploadBatch<'_> {
    fn drop(&mut self) {
        for file in &self.staged {
            match std::fs::remove_file(&file.path) {
                Ok(()) => debug!("discarded staging file {}", file.path.display()),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => warn!(
                    "could not discard staging file {}: {}",
                    file.path.display(),
                    err
                ),
            }
        }
    }
}

/// Removes a staging file on drop unless disarmed.
struct StagingGuard {
    path: PathBuf,
    armed: bool,
}

impl StagingGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Hand ownership of the file over to the caller.
    fn disarm(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("discarded partial staging file {}", self.path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                "could not discard staging file {}: {}",
                self.path.display(),
                err
            ),
        }
    }
}

/// Stream `stream` into a new file at `path`, failing once more than
/// `max_size` bytes have arrived.
async fn write_limited<S>(path: &Path, stream: S, max_size: u64) -> GalleryResult<u64>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    let mut file = File::create(path).await?;
    let mut size_bytes: u64 = 0;

    pin_mut!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| {
            debug!("upload stream failed: {}", err);
            GalleryError::Validation("Failed to read uploaded file".into())
        })?;
        size_bytes += chunk.len() as u64;
        if size_bytes > max_size {
            return Err(GalleryError::Validation(format!(
                "File too large. Maximum size is {} MB",
                max_size / (1024 * 1024)
            )));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    file.sync_all().await?;

    Ok(size_bytes)
}

/// `gallery-<unixMillis>-<9 random digits><extension>`
fn generate_filename(extension: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
    format!("{}-{}-{:09}{}", NAME_PREFIX, millis, suffix, extension)
}

/// Lowercased `.ext` of a client filename, or an empty string when the
/// extension is missing or not plain ASCII alphanumerics.
fn sanitize_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.bytes().all(|b| b.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

fn has_image_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Accept only a single normal path component.
fn ensure_plain_filename(filename: &str) -> GalleryResult<()> {
    if filename.contains(['/', '\\', '\0']) {
        return Err(GalleryError::AccessDenied);
    }
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(GalleryError::AccessDenied),
    }
}

fn not_found_or_io(err: io::Error) -> GalleryError {
    if err.kind() == ErrorKind::NotFound {
        GalleryError::NotFound
    } else {
        GalleryError::Io(err)
    }
}

fn describe(filename: String, meta: &Metadata) -> GalleryImage {
    let uploaded_at = meta
        .created()
        .or_else(|_| meta.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    GalleryImage {
        url: GalleryImage::url_for(&filename),
        filename,
        original_name: None,
        size_bytes: meta.len(),
        uploaded_at,
    }
}
