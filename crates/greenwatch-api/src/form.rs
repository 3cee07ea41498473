//! Multipart form handling shared by the greenhouse and plant endpoints.

use axum::extract::Multipart;
use tracing::debug;

use greenwatch_types::api::{GreenhouseDraft, PlantDraft};

use crate::error::ApiError;
use crate::images::{ImageStore, ImageUpload, UPLOAD_ROUTE};

/// What the form asked to do with the record's image.
pub enum ImageChange {
    /// No `image` part: keep whatever the record has.
    Keep,
    /// Empty text `image` part.
    Clear,
    /// Text `image` part holding a reference to store verbatim. References into
    /// the upload store are only accepted when they name the record's current
    /// image, so every stored upload belongs to exactly one record.
    Reference(String),
    /// File `image` part.
    Upload(ImageUpload),
}

impl ImageChange {
    /// Resolve to the reference to store. Uploads are written to disk here.
    pub async fn resolve(
        self,
        images: &ImageStore,
        current: Option<String>,
    ) -> Result<Option<String>, ApiError> {
        match self {
            Self::Keep => Ok(current),
            Self::Clear => Ok(None),
            Self::Reference(reference) if current.as_deref() == Some(reference.as_str()) => Ok(current),
            Self::Reference(reference) if reference.starts_with(UPLOAD_ROUTE) => {
                Err(ApiError::Validation(format!(
                    "image '{}' belongs to another record; upload the file instead",
                    reference
                )))
            }
            Self::Reference(reference) => Ok(Some(reference)),
            Self::Upload(upload) => images.save(&upload).await.map(Some),
        }
    }
}

pub trait FormDraft: Default {
    fn set_field(&mut self, name: &str, value: String) -> bool;
}

impl FormDraft for GreenhouseDraft {
    fn set_field(&mut self, name: &str, value: String) -> bool {
        GreenhouseDraft::set_field(self, name, value)
    }
}

impl FormDraft for PlantDraft {
    fn set_field(&mut self, name: &str, value: String) -> bool {
        PlantDraft::set_field(self, name, value)
    }
}

pub async fn read_form<D: FormDraft>(mut multipart: Multipart) -> Result<(D, ImageChange), ApiError> {
    let mut draft = D::default();
    let mut image = ImageChange::Keep;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let is_file = file_name.is_some()
                || content_type.as_deref().is_some_and(|ct| !ct.starts_with("text/"));

            image = if is_file {
                let data = field.bytes().await?;
                if data.is_empty() {
                    ImageChange::Keep
                } else {
                    ImageChange::Upload(ImageUpload {
                        file_name,
                        content_type: content_type.unwrap_or_else(|| "application/octet-stream".into()),
                        data,
                    })
                }
            } else {
                let value = field.text().await?;
                let value = value.trim();
                if value.is_empty() {
                    ImageChange::Clear
                } else {
                    ImageChange::Reference(value.to_string())
                }
            };
            continue;
        }

        let value = field.text().await?;
        if !draft.set_field(&name, value) {
            debug!("Ignoring unknown form field '{}'", name);
        }
    }

    Ok((draft, image))
}
