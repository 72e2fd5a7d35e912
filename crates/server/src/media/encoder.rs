//! Size-bounded JPEG encoding.
//!
//! The encoder downsizes an image to at most [`EncoderSettings::max_width`]
//! pixels wide and then re-encodes it as JPEG at decreasing quality until the
//! output fits the byte budget or the quality floor is reached. It performs
//! no I/O.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageDecoder, ImageError, ImageFormat, ImageReader, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while encoding a photo.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Input bytes could not be read as an image.
    #[error("could not decode image: {0}")]
    Decode(#[source] ImageError),

    /// Input format could not be detected.
    #[error("could not read image: {0}")]
    Io(#[from] std::io::Error),

    /// JPEG encoding failed.
    #[error("could not encode image: {0}")]
    Encode(#[source] ImageError),

    /// The byte budget was zero.
    #[error("byte budget must be greater than zero")]
    ZeroBudget,

    /// Quality parameters are inconsistent.
    #[error("invalid encoder settings: {0}")]
    InvalidSettings(&'static str),
}

/// Quality schedule and size limits for [`SizeBoundedImageEncoder`].
///
/// Qualities are JPEG quality percents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// Widest output allowed; wider inputs are downscaled.
    pub max_width: u32,
    /// Quality of the first attempt.
    pub initial_quality: u8,
    /// Quality reduction between attempts.
    pub quality_step: u8,
    /// Lowest quality that will be tried.
    pub min_quality: u8,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            max_width: 800,
            initial_quality: 90,
            quality_step: 5,
            min_quality: 10,
        }
    }
}

impl EncoderSettings {
    /// Hard cap on encode attempts: `ceil((initial - min) / step) + 1`.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        let span = self.initial_quality.saturating_sub(self.min_quality) as u32;
        let step = if self.quality_step == 0 {
            1
        } else {
            self.quality_step as u32
        };
        span.div_ceil(step) + 1
    }

    fn validate(&self) -> Result<(), EncodeError> {
        if self.max_width == 0 {
            return Err(EncodeError::InvalidSettings("max_width must be positive"));
        }
        if self.quality_step == 0 {
            return Err(EncodeError::InvalidSettings("quality_step must be positive"));
        }
        if self.min_quality == 0 || self.initial_quality > 100 {
            return Err(EncodeError::InvalidSettings("qualities must be within 1..=100"));
        }
        if self.min_quality > self.initial_quality {
            return Err(EncodeError::InvalidSettings(
                "min_quality must not exceed initial_quality",
            ));
        }
        Ok(())
    }
}

/// Result of [`SizeBoundedImageEncoder::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// JPEG bytes.
    pub bytes: Vec<u8>,
    /// Quality the bytes were encoded at.
    pub quality: u8,
    pub width: u32,
    pub height: u32,
    /// Number of encode attempts made.
    pub attempts: u32,
    /// Whether `bytes` fits the requested budget. `false` means the floor
    /// quality was reached and the result is best-effort.
    pub within_budget: bool,
}

/// Iterative JPEG encoder that targets a byte budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeBoundedImageEncoder {
    settings: EncoderSettings,
}

impl SizeBoundedImageEncoder {
    /// Create an encoder with custom settings.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError::InvalidSettings` if the quality schedule is empty
    /// or out of range.
    pub fn new(settings: EncoderSettings) -> Result<Self, EncodeError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    #[must_use]
    pub const fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Decode raw upload bytes and encode them under `max_bytes`.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError` if the bytes are not a decodable image or the
    /// budget is zero.
    pub fn encode_bytes(&self, input: &[u8], max_bytes: usize) -> Result<EncodedImage, EncodeError> {
        let image = decode(input)?;
        self.encode(&image, max_bytes)
    }

    /// Encode `image` as JPEG, lowering quality until it fits `max_bytes`.
    ///
    /// Terminates when the output fits, when the next quality would fall
    /// below the floor, or after [`EncoderSettings::max_attempts`] attempts,
    /// whichever comes first. When the budget is never met the smallest
    /// attempt is returned with `within_budget == false`.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError::ZeroBudget` if `max_bytes` is zero.
    pub fn encode(&self, image: &DynamicImage, max_bytes: usize) -> Result<EncodedImage, EncodeError> {
        if max_bytes == 0 {
            return Err(EncodeError::ZeroBudget);
        }

        let rgb = fit_width(image.to_rgb8(), self.settings.max_width);
        let cap = self.settings.max_attempts();
        let mut quality = self.settings.initial_quality;
        let mut attempts = 0;
        let mut best: Option<(Vec<u8>, u8)> = None;

        loop {
            let bytes = encode_jpeg(&rgb, quality)?;
            attempts += 1;
            tracing::trace!(quality, size = bytes.len(), max_bytes, "JPEG attempt");

            if bytes.len() <= max_bytes {
                return Ok(finished(&rgb, bytes, quality, attempts, true));
            }
            if best.as_ref().is_none_or(|(b, _)| bytes.len() <= b.len()) {
                best = Some((bytes, quality));
            }

            let next = quality
                .checked_sub(self.settings.quality_step)
                .filter(|q| *q >= self.settings.min_quality);
            match next {
                Some(q) if attempts < cap => quality = q,
                _ => break,
            }
        }

        let (bytes, quality) = best.ok_or(EncodeError::InvalidSettings("no attempts made"))?;
        Ok(finished(&rgb, bytes, quality, attempts, false))
    }
}

/// Decode image bytes, applying any EXIF orientation.
///
/// # Errors
///
/// Returns `EncodeError::Decode` if the format is unknown or the data is corrupt.
pub fn decode(input: &[u8]) -> Result<DynamicImage, EncodeError> {
    let reader = ImageReader::new(Cursor::new(input)).with_guessed_format()?;
    let mut decoder = reader.into_decoder().map_err(EncodeError::Decode)?;
    let orientation = decoder.orientation().map_err(EncodeError::Decode)?;
    let mut image = DynamicImage::from_decoder(decoder).map_err(EncodeError::Decode)?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// Whether the bytes carry a JPEG signature.
#[must_use]
pub fn is_jpeg(input: &[u8]) -> bool {
    matches!(image::guess_format(input), Ok(ImageFormat::Jpeg))
}

/// Downscale so the width is at most `max_width`, preserving aspect ratio.
/// Never upscales.
fn fit_width(rgb: RgbImage, max_width: u32) -> RgbImage {
    let (width, height) = rgb.dimensions();
    if width <= max_width {
        return rgb;
    }
    let scaled = u64::from(height) * u64::from(max_width) / u64::from(width);
    let new_height = u32::try_from(scaled).unwrap_or(u32::MAX).max(1);
    imageops::resize(&rgb, max_width, new_height, FilterType::Triangle)
}

fn finished(
    rgb: &RgbImage,
    bytes: Vec<u8>,
    quality: u8,
    attempts: u32,
    within_budget: bool,
) -> EncodedImage {
    EncodedImage {
        bytes,
        quality,
        width: rgb.width(),
        height: rgb.height(),
        attempts,
        within_budget,
    }
}

fn encode_jpeg(rgb: &RgbImage, quality: u8) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(rgb)
        .map_err(EncodeError::Encode)?;
    Ok(buf)
}
