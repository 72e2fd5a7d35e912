//! Profile photo replacement.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use qrtag_core::{AccountId, PhotoRef};

use super::MediaSettings;
use super::encoder::{EncodeError, SizeBoundedImageEncoder, is_jpeg};
use crate::storage::{ObjectStore, PutOptions, StorageError};

/// MIME type of every stored photo.
const PHOTO_CONTENT_TYPE: &str = "image/jpeg";

/// Errors that can occur while replacing a photo.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The upload had no bytes.
    #[error("photo is empty")]
    Empty,

    /// The upload is not a readable image.
    #[error("photo is not a supported image: {0}")]
    InvalidImage(#[source] EncodeError),

    /// Encoding a readable image failed.
    #[error("photo encoding failed: {0}")]
    Encoding(#[source] EncodeError),

    /// The encoding task panicked or was cancelled.
    #[error("photo encoding task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The object store rejected the write.
    #[error("photo upload failed: {0}")]
    UploadFailed(#[source] StorageError),
}

impl From<EncodeError> for MediaError {
    fn from(e: EncodeError) -> Self {
        match e {
            EncodeError::Decode(_) | EncodeError::Io(_) => Self::InvalidImage(e),
            other => Self::Encoding(other),
        }
    }
}

/// Stores profile photos at their account's canonical key.
///
/// Each account has exactly one photo object, `{account_id}.jpg`, which is
/// overwritten on every replacement. Callers persist the returned
/// [`PhotoRef`] only after `replace_photo` succeeds, so a failed upload never
/// changes what the profile points to.
#[derive(Clone)]
pub struct MediaUploadCoordinator {
    store: Arc<dyn ObjectStore>,
    encoder: SizeBoundedImageEncoder,
    budget_bytes: usize,
}

impl MediaUploadCoordinator {
    /// Create a coordinator writing to `store`.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError` if the settings are invalid.
    pub fn new(store: Arc<dyn ObjectStore>, settings: MediaSettings) -> Result<Self, EncodeError> {
        if settings.budget_bytes == 0 {
            return Err(EncodeError::ZeroBudget);
        }
        Ok(Self {
            store,
            encoder: SizeBoundedImageEncoder::new(settings.encoder)?,
            budget_bytes: settings.budget_bytes,
        })
    }

    /// Storage key of an account's photo.
    #[must_use]
    pub fn photo_key(account: AccountId) -> String {
        format!("{account}.jpg")
    }

    /// Replace the account's photo with `file`.
    ///
    /// JPEG uploads within budget are stored as-is; anything else is
    /// re-encoded under the budget first.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Empty` or `MediaError::InvalidImage` for unusable
    /// uploads and `MediaError::UploadFailed` if the object store write fails.
    #[instrument(skip(self, file), fields(account = %account, size = file.len()))]
    pub async fn replace_photo(&self, account: AccountId, file: Bytes) -> Result<PhotoRef, MediaError> {
        if file.is_empty() {
            return Err(MediaError::Empty);
        }

        let body = self.prepare(file).await?;
        let key = Self::photo_key(account);
        let stored_size = body.len();

        self.store
            .put(&key, body, &PutOptions::replace_uncached(PHOTO_CONTENT_TYPE))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, key = %key, "Photo upload failed");
                MediaError::UploadFailed(e)
            })?;

        let url = self.store.public_url(&key).map_err(MediaError::UploadFailed)?;
        let photo = PhotoRef::new(url.as_str(), Utc::now().timestamp_millis());

        tracing::info!(key = %key, stored_size, "Replaced profile photo");
        Ok(photo)
    }

    async fn prepare(&self, file: Bytes) -> Result<Bytes, MediaError> {
        if file.len() <= self.budget_bytes && is_jpeg(&file) {
            return Ok(file);
        }

        let encoder = self.encoder;
        let budget = self.budget_bytes;
        let encoded =
            tokio::task::spawn_blocking(move || encoder.encode_bytes(&file, budget)).await??;

        if encoded.within_budget {
            tracing::debug!(
                quality = encoded.quality,
                attempts = encoded.attempts,
                size = encoded.bytes.len(),
                "Re-encoded photo"
            );
        } else {
            tracing::warn!(
                quality = encoded.quality,
                size = encoded.bytes.len(),
                budget,
                "Photo still over budget at minimum quality"
            );
        }

        Ok(Bytes::from(encoded.bytes))
    }
}
