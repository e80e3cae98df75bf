// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! POST /api/recognize - extract text from an uploaded image

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::vision::image_utils::strip_data_url_prefix;
use crate::vision::{RecognizeError, RecognizeInput, RecognizeOptions};

use super::errors::ApiError;
use super::http_server::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeRequest {
    /// Base64-encoded image, with or without a data-URL prefix
    #[serde(default)]
    pub image_data: Option<String>,
}

impl RecognizeRequest {
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
pub struct RecognizeResponse {
    pub text: String,
}

pub async fn recognize_handler(
    State(state): State<AppState>,
    Json(request): Json<RecognizeRequest>,
) -> Result<Json<RecognizeResponse>, ApiError> {
    request.validate()?;

    let bytes = super::decode_image_payload(request.image_data.as_deref())?;

    debug!(size = bytes.len(), "recognize request");

    let recognized = state
        .recognizer
        .recognize(
            RecognizeInput::Encoded(&bytes),
            &state.config.language_hints,
            RecognizeOptions::default(),
        )
        .await
        .map_err(|e| {
            warn!("recognition failed: {}", e);
            match e {
                RecognizeError::Request(msg) => {
                    ApiError::Upstream(format!("recognition request failed: {}", msg))
                }
                RecognizeError::Backend(msg) => {
                    ApiError::Processing(format!("recognition failed: {}", msg))
                }
            }
        })?;

    info!(chars = recognized.text.len(), "recognition completed");

    Ok(Json(RecognizeResponse {
        text: recognized.text,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_missing_image() {
        let request = RecognizeRequest { image_data: None };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_ok() {
        let request = RecognizeRequest {
            image_data: Some("iVBORw0KGgo=".to_string()),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_camel_case_round_trip() {
        let request: RecognizeRequest =
            serde_json::from_str(r#"{"imageData": "abcd"}"#).unwrap();
        assert_eq!(request.image_data.as_deref(), Some("abcd"));

        let response = RecognizeResponse {
            text: "hello".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["text"], "hello");
    }
}
