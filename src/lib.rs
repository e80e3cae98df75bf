// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! snaptext: image capture, threshold binarization and OCR orchestration.
//!
//! The core is [`PipelineController`], a state machine that moves image
//! data from an acquisition source (file bytes or a camera frame) through
//! a binarization transform to a text recognizer with one-shot fallback
//! retry, discarding stale async results by generation counter.

pub mod api;
pub mod capture;
pub mod config;
pub mod pipeline;
pub mod vision;

pub use capture::{CameraBackend, CameraFacing, CameraSession, CameraStream, CaptureError, ImageSource};
pub use config::{ConfigError, PipelineConfig};
pub use pipeline::{
    FailureReason, PipelineController, PipelineError, PipelineEvent, PipelineState,
    ProcessedImage, RecognitionResult,
};
pub use vision::{
    Binarizer, BinarizeError, HttpRecognizer, ImageError, RasterImage, RecognizeError,
    RecognizeInput, RecognizeOptions, RecognizedText, Recognizer, ThresholdBinarizer,
};
