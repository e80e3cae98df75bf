// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text recognition collaborator
//!
//! The [`Recognizer`] trait accepts either an encoded-bytes or a
//! decoded-image representation of the input. The pipeline's primary
//! attempt uses the encoded form with a progress callback; its fallback
//! attempt hands over the decoded image with no progress reporting.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::raster::RasterImage;

/// Progress callback, invoked with a completion fraction in `0.0..=1.0`
pub type ProgressFn = Arc<dyn Fn(f32) + Send + Sync>;

/// Input representation handed to a recognizer attempt
pub enum RecognizeInput<'a> {
    /// Encoded image container bytes (PNG in practice)
    Encoded(&'a [u8]),
    /// An already-decoded image object
    Decoded(&'a DynamicImage),
}

impl std::fmt::Debug for RecognizeInput<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecognizeInput::Encoded(bytes) => {
                f.debug_tuple("Encoded").field(&bytes.len()).finish()
            }
            RecognizeInput::Decoded(img) => f
                .debug_tuple("Decoded")
                .field(&(img.width(), img.height()))
                .finish(),
        }
    }
}

/// Per-call recognition options
#[derive(Default)]
pub struct RecognizeOptions {
    pub progress: Option<ProgressFn>,
}

/// Recognized text with an overall confidence score.
///
/// Empty text is a legitimate successful outcome (no characters found).
#[derive(Debug, Clone)]
pub struct RecognizedText {
    pub text: String,
    pub confidence: f32,
}

impl RecognizedText {
    pub fn new(text: String, confidence: f32) -> Self {
        Self { text, confidence }
    }

    /// True when the text is empty or whitespace only
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Error)]
pub enum RecognizeError {
    #[error("recognition request failed: {0}")]
    Request(String),

    #[error("recognition backend error: {0}")]
    Backend(String),
}

/// OCR engine collaborator.
///
/// `languages` is an ordered hint list evaluated jointly (e.g.
/// `["jpn", "eng"]`), not a set of alternatives.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(
        &self,
        input: RecognizeInput<'_>,
        languages: &[String],
        options: RecognizeOptions,
    ) -> Result<RecognizedText, RecognizeError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HttpRecognizeRequest {
    image_data: String,
    languages: String,
}

#[derive(Debug, Deserialize)]
struct HttpRecognizeResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    error: Option<String>,
}

/// Recognizer backed by an HTTP OCR service.
///
/// Posts `{"imageData": <base64>, "languages": "jpn+eng"}` and reads back
/// `{"text": ...}`, the wire shape of a Tesseract sidecar service.
#[derive(Debug, Clone)]
pub struct HttpRecognizer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRecognizer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    fn encode_input(input: &RecognizeInput<'_>) -> Result<String, RecognizeError> {
        match input {
            RecognizeInput::Encoded(bytes) => Ok(STANDARD.encode(bytes)),
            RecognizeInput::Decoded(img) => {
                // The wire format only carries encoded bytes, so the decoded
                // representation is re-encoded here rather than in the pipeline.
                let raster = RasterImage::new((*img).clone())
                    .map_err(|e| RecognizeError::Request(e.to_string()))?;
                let png = raster
                    .to_png_bytes()
                    .map_err(|e| RecognizeError::Request(e.to_string()))?;
                Ok(STANDARD.encode(png))
            }
        }
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    async fn recognize(
        &self,
        input: RecognizeInput<'_>,
        languages: &[String],
        options: RecognizeOptions,
    ) -> Result<RecognizedText, RecognizeError> {
        let body = HttpRecognizeRequest {
            image_data: Self::encode_input(&input)?,
            languages: languages.join("+"),
        };

        if let Some(ref progress) = options.progress {
            progress(0.0);
        }

        debug!(endpoint = %self.endpoint, languages = %body.languages, "sending recognition request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| RecognizeError::Request(e.to_string()))?;

        let status = response.status();
        let parsed: HttpRecognizeResponse = response
            .json()
            .await
            .map_err(|e| RecognizeError::Request(e.to_string()))?;

        if let Some(err) = parsed.error {
            warn!(%status, "recognition backend reported an error: {}", err);
            return Err(RecognizeError::Backend(err));
        }
        if !status.is_success() {
            return Err(RecognizeError::Backend(format!(
                "recognition service returned {}",
                status
            )));
        }

        if let Some(ref progress) = options.progress {
            progress(1.0);
        }

        Ok(RecognizedText::new(parsed.text, 1.0))
    }
}
