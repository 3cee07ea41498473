use std::path::{Path, PathBuf};

use anyhow::Result;
use bytes::Bytes;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;

/// 10 MB upload limit for images
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Public path prefix the upload directory is served under.
pub const UPLOAD_ROUTE: &str = "/uploads";

pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Bytes,
}

/// Manages uploaded greenhouse and plant images on disk.
///
/// Each image is stored as `{dir}/{uuid}.{ext}` and referenced by records as
/// `/uploads/{uuid}.{ext}`.
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Image upload directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write an upload to disk and return the reference to store on the record.
    pub async fn save(&self, upload: &ImageUpload) -> Result<String, ApiError> {
        if upload.data.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::PayloadTooLarge(MAX_IMAGE_BYTES));
        }
        let ext = extension_for(&upload.content_type).ok_or_else(|| {
            ApiError::Validation(format!("unsupported image type '{}'", upload.content_type))
        })?;

        let name = format!("{}.{}", Uuid::new_v4(), ext);
        let path = self.dir.join(&name);
        fs::write(&path, &upload.data).await.map_err(|e| {
            ApiError::Internal(anyhow::anyhow!("failed to write image {}: {}", path.display(), e))
        })?;

        info!(
            "Stored image {} ({} bytes, from {})",
            name,
            upload.data.len(),
            upload.file_name.as_deref().unwrap_or("unnamed upload")
        );
        Ok(format!("{UPLOAD_ROUTE}/{name}"))
    }

    /// Best-effort removal of an image this store owns. References that point
    /// elsewhere are left alone.
    pub async fn remove(&self, reference: &str) {
        let Some(name) = owned_file_name(reference) else {
            return;
        };
        match fs::remove_file(self.dir.join(name)).await {
            Ok(()) => info!("Deleted image {}", name),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Image {} already gone", name)
            }
            Err(e) => warn!("Failed to delete image {}: {}", name, e),
        }
    }
}

fn owned_file_name(reference: &str) -> Option<&str> {
    let name = reference.strip_prefix(UPLOAD_ROUTE)?.strip_prefix('/')?;
    let valid = !name.is_empty()
        && !name.contains(['/', '\\'])
        && !name.starts_with('.');
    valid.then_some(name)
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let ext = match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        _ => return None,
    };
    Some(ext)
}
