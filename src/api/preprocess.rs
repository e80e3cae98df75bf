// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! POST /api/preprocess - binarize an uploaded image

use axum::{extract::State, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::vision::image_utils::strip_data_url_prefix;

use super::errors::ApiError;
use super::http_server::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessRequest {
    /// Base64-encoded image, with or without a data-URL prefix
    #[serde(default)]
    pub image_data: Option<String>,

    /// Binarization threshold; the configured default applies when unset
    #[serde(default)]
    pub threshold: Option<u8>,
}

impl PreprocessRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let image = self
            .image_data
            .as_deref()
            .map(strip_data_url_prefix)
            .unwrap_or("");
        if image.is_empty() {
            return Err(ApiError::Validation("imageData is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessResponse {
    /// Binarized image as a PNG data URL
    pub processed_image: String,
    pub threshold: u8,
}

pub async fn preprocess_handler(
    State(state): State<AppState>,
    Json(request): Json<PreprocessRequest>,
) -> Result<Json<PreprocessResponse>, ApiError> {
    request.validate()?;

    let threshold = request
        .threshold
        .unwrap_or(state.config.default_threshold);

    let bytes = super::decode_image_payload(request.image_data.as_deref())?;

    debug!(threshold, size = bytes.len(), "preprocess request");

    let processed = state
        .binarizer
        .binarize(&bytes, threshold)
        .await
        .map_err(|e| {
            warn!("binarization failed: {}", e);
            ApiError::Processing(format!("binarization failed: {}", e))
        })?;

    Ok(Json(PreprocessResponse {
        processed_image: format!("data:image/png;base64,{}", STANDARD.encode(processed)),
        threshold,
    }))
}
