// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Validated raster image value type

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

use super::image_utils::{decode_image_bytes, ImageError};

/// A decoded raster image with guaranteed non-zero dimensions.
///
/// Once constructed the image is treated as an immutable value; the
/// pipeline replaces whole instances rather than mutating pixels.
#[derive(Clone)]
pub struct RasterImage {
    image: DynamicImage,
    width: u32,
    height: u32,
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl RasterImage {
    /// Wrap a decoded image, rejecting zero-dimension buffers.
    pub fn new(image: DynamicImage) -> Result<Self, ImageError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(ImageError::ZeroDimension);
        }
        Ok(Self {
            image,
            width,
            height,
        })
    }

    /// Decode image container bytes into a validated raster image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        let (image, _info) = decode_image_bytes(bytes)?;
        Self::new(image)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Re-encode as PNG for the encoded-bytes collaborator interfaces.
    ///
    /// PNG is lossless, so encode/decode round trips are bit-stable for
    /// the same pixel data.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, ImageError> {
        let mut buf = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| ImageError::EncodeFailed(e.to_string()))?;
        Ok(buf.into_inner())
    }
}
