// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image decoding, binarization and text recognition collaborators

pub mod binarize;
pub mod image_utils;
pub mod raster;
pub mod recognize;

pub use binarize::{Binarizer, BinarizeError, ThresholdBinarizer};
pub use image_utils::{decode_base64_image, decode_image_bytes, detect_format, ImageError, ImageInfo};
pub use raster::RasterImage;
pub use recognize::{
    HttpRecognizer, ProgressFn, RecognizeError, RecognizeInput, RecognizeOptions, RecognizedText,
    Recognizer,
};
