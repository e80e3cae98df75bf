// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pipeline orchestration core

pub mod controller;
pub mod state;

pub use controller::{PipelineController, PipelineError, ProcessedImage};
pub use state::{FailureReason, PipelineEvent, PipelineState, RecognitionResult};
