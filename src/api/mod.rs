// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP API surface
//!
//! Stateless preprocess/recognize endpoints driving the same Binarizer
//! and Recognizer collaborators the pipeline uses. Presentation layers
//! that need the stateful pipeline embed [`crate::PipelineController`]
//! directly.

pub mod errors;
pub mod http_server;
pub mod preprocess;
pub mod recognize;

pub use errors::ApiError;
pub use http_server::{router, start_server, AppState};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::vision::image_utils::{detect_format, strip_data_url_prefix, MAX_IMAGE_SIZE};

/// Decode a base64 image payload (data-URL prefix tolerated), enforcing
/// the decoded-byte size cap and magic-byte format check shared with the
/// capture layer.
pub(crate) fn decode_image_payload(data: Option<&str>) -> Result<Vec<u8>, ApiError> {
    let payload = data.map(strip_data_url_prefix).unwrap_or("");
    if payload.is_empty() {
        return Err(ApiError::Validation("imageData is required".to_string()));
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| ApiError::Validation(format!("invalid base64 image: {}", e)))?;
    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ApiError::Validation(format!(
            "image exceeds maximum size of {} bytes",
            MAX_IMAGE_SIZE
        )));
    }
    detect_format(&bytes).map_err(|e| ApiError::Validation(e.to_string()))?;

    Ok(bytes)
}
