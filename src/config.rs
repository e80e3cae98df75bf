// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pipeline and service configuration

use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_threshold() -> u8 {
    128
}

fn default_language_hints() -> Vec<String> {
    vec!["jpn".to_string(), "eng".to_string()]
}

fn default_event_capacity() -> usize {
    64
}

fn default_recognizer_url() -> String {
    "http://127.0.0.1:8090/api/recognize".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("language hint list must not be empty")]
    EmptyLanguages,

    #[error("event channel capacity must be greater than zero")]
    ZeroEventCapacity,

    #[error("recognizer URL must not be empty")]
    EmptyRecognizerUrl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Threshold used when the caller does not pass one explicitly
    #[serde(default = "default_threshold")]
    pub default_threshold: u8,

    /// Ordered language hints evaluated jointly by the recognizer
    #[serde(default = "default_language_hints")]
    pub language_hints: Vec<String>,

    /// Broadcast buffer size for pipeline events
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Endpoint for the HTTP recognizer backend
    #[serde(default = "default_recognizer_url")]
    pub recognizer_url: String,

    /// Port for the HTTP API surface
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
            language_hints: default_language_hints(),
            event_capacity: default_event_capacity(),
            recognizer_url: default_recognizer_url(),
            port: default_port(),
        }
    }
}

impl PipelineConfig {
    /// Build a config from `SNAPTEXT_*` environment variables, falling
    /// back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_threshold = env::var("SNAPTEXT_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<u8>().ok())
            .unwrap_or(defaults.default_threshold);

        // Language hints are written the Tesseract way: "jpn+eng"
        let language_hints = env::var("SNAPTEXT_LANGUAGES")
            .ok()
            .map(|v| {
                v.split('+')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|hints| !hints.is_empty())
            .unwrap_or(defaults.language_hints);

        let event_capacity = env::var("SNAPTEXT_EVENT_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|c| *c > 0)
            .unwrap_or(defaults.event_capacity);

        let recognizer_url =
            env::var("SNAPTEXT_RECOGNIZER_URL").unwrap_or(defaults.recognizer_url);

        let port = env::var("SNAPTEXT_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(defaults.port);

        Self {
            default_threshold,
            language_hints,
            event_capacity,
            recognizer_url,
            port,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.language_hints.is_empty() {
            return Err(ConfigError::EmptyLanguages);
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::ZeroEventCapacity);
        }
        if self.recognizer_url.trim().is_empty() {
            return Err(ConfigError::EmptyRecognizerUrl);
        }
        Ok(())
    }
}
