//! Size-bounded encoding on realistic inputs.

#![allow(clippy::unwrap_used)]

use qrtag_integration_tests::{dimensions, is_jpeg, noise_png, png_bytes};
use qrtag_server::media::{DEFAULT_PHOTO_BUDGET_BYTES, EncoderSettings, SizeBoundedImageEncoder};

#[test]
fn test_large_photo_fits_budget_or_is_flagged() {
    let input = noise_png(800, 900, 7);
    assert!(input.len() > 2_000_000);

    let encoder = SizeBoundedImageEncoder::default();
    let out = encoder
        .encode_bytes(&input, DEFAULT_PHOTO_BUDGET_BYTES)
        .unwrap();

    assert!(is_jpeg(&out.bytes));
    assert!(out.attempts <= EncoderSettings::default().max_attempts());
    if out.within_budget {
        assert!(out.bytes.len() <= DEFAULT_PHOTO_BUDGET_BYTES);
    } else {
        assert_eq!(out.quality, EncoderSettings::default().min_quality);
    }
}

#[test]
fn test_tiny_budget_terminates_at_the_cap() {
    let input = noise_png(400, 300, 11);
    let encoder = SizeBoundedImageEncoder::default();

    let out = encoder.encode_bytes(&input, 1).unwrap();

    assert!(!out.within_budget);
    assert_eq!(out.attempts, EncoderSettings::default().max_attempts());
    assert_eq!((out.width, out.height), (400, 300));
}

#[test]
fn test_wide_input_is_downscaled_proportionally() {
    let out = SizeBoundedImageEncoder::default()
        .encode_bytes(&png_bytes(2400, 1800), DEFAULT_PHOTO_BUDGET_BYTES)
        .unwrap();

    assert!(out.within_budget);
    assert_eq!((out.width, out.height), (800, 600));
    assert_eq!(dimensions(&out.bytes), (800, 600));
}
