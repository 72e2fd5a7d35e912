//! Photo ingestion pipeline.
//!
//! [`SizeBoundedImageEncoder`] shrinks arbitrary uploads under a byte budget;
//! [`MediaUploadCoordinator`] stores the result at the account's fixed key
//! and hands back a cache-busted [`PhotoRef`](qrtag_core::PhotoRef).

pub mod encoder;
pub mod upload;

use serde::{Deserialize, Serialize};

pub use encoder::{EncodeError, EncodedImage, EncoderSettings, SizeBoundedImageEncoder};
pub use upload::{MediaError, MediaUploadCoordinator};

/// Default stored photo budget (300 KiB).
pub const DEFAULT_PHOTO_BUDGET_BYTES: usize = 300 * 1024;

/// Limits applied to profile photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSettings {
    /// Largest photo stored without re-encoding.
    pub budget_bytes: usize,
    /// Quality schedule used when re-encoding.
    pub encoder: EncoderSettings,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            budget_bytes: DEFAULT_PHOTO_BUDGET_BYTES,
            encoder: EncoderSettings::default(),
        }
    }
}
