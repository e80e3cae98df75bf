// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Binarization collaborator
//!
//! The pipeline drives binarization through the [`Binarizer`] trait and
//! treats the encoded bytes on both sides as an opaque transport format.
//! [`ThresholdBinarizer`] is the built-in implementation: grayscale
//! conversion followed by a per-pixel luma cutoff.

use std::io::Cursor;

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BinarizeError {
    #[error("failed to decode image for binarization: {0}")]
    Decode(String),

    #[error("failed to encode binarized image: {0}")]
    Encode(String),

    #[error("binarizer failed: {0}")]
    External(String),
}

/// Black/white thresholding transform over encoded image bytes.
///
/// Implementations must be pure: the same input bytes and threshold must
/// produce the same output bytes.
#[async_trait]
pub trait Binarizer: Send + Sync {
    async fn binarize(&self, encoded: &[u8], threshold: u8) -> Result<Vec<u8>, BinarizeError>;
}

/// Built-in grayscale + threshold binarizer.
///
/// Pixels with luma strictly above the threshold become white, everything
/// else black. Output is always PNG regardless of the input container.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdBinarizer;

impl ThresholdBinarizer {
    fn apply(image: &DynamicImage, threshold: u8) -> GrayImage {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();
        let mut out = GrayImage::new(width, height);

        for (x, y, pixel) in gray.enumerate_pixels() {
            let value = if pixel[0] > threshold { 255u8 } else { 0u8 };
            out.put_pixel(x, y, Luma([value]));
        }

        out
    }
}

#[async_trait]
impl Binarizer for ThresholdBinarizer {
    async fn binarize(&self, encoded: &[u8], threshold: u8) -> Result<Vec<u8>, BinarizeError> {
        let image =
            image::load_from_memory(encoded).map_err(|e| BinarizeError::Decode(e.to_string()))?;

        debug!(
            width = image.width(),
            height = image.height(),
            threshold,
            "binarizing image"
        );

        let binary = Self::apply(&image, threshold);

        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(binary)
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| BinarizeError::Encode(e.to_string()))?;

        Ok(buf.into_inner())
    }
}
