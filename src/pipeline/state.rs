// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pipeline states, events and the recognition result value

use serde::{Deserialize, Serialize};

/// Why the pipeline entered [`PipelineState::Failed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The binarization transform failed
    Binarize,
    /// Both recognition attempts failed
    Recognition,
}

/// Current position in the capture → preprocess → recognize cycle.
///
/// `Failed` is recoverable: the affected step may be retried as long as
/// its input image survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// No source image acquired yet
    Empty,
    /// A source image is held, nothing processed
    SourceReady,
    /// A binarized image is held alongside the original
    Processed,
    /// A recognition run is in flight
    Recognizing,
    /// Recognition finished; a result (possibly empty text) is stored
    RecognitionDone,
    Failed(FailureReason),
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Empty => "empty",
            PipelineState::SourceReady => "source_ready",
            PipelineState::Processed => "processed",
            PipelineState::Recognizing => "recognizing",
            PipelineState::RecognitionDone => "recognition_done",
            PipelineState::Failed(_) => "failed",
        }
    }
}

/// Outcome of a recognition cycle.
///
/// `completed` is true for genuine recognition output (including empty
/// text); false when `text` carries an error description after both
/// recognition attempts failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub text: String,
    pub completed: bool,
}

/// Observable pipeline notifications.
///
/// Every state transition and terminal error is emitted; subscribers
/// observe them via [`super::PipelineController::subscribe`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum PipelineEvent {
    StateChanged {
        from: PipelineState,
        to: PipelineState,
    },
    SourceAcquired {
        generation: u64,
        width: u32,
        height: u32,
    },
    /// A preprocess request replaced a still-queued threshold
    PreprocessSuperseded {
        threshold: u8,
    },
    ProcessedReady {
        threshold: u8,
    },
    RecognitionProgress {
        fraction: f32,
    },
    /// An async result arrived for a superseded source and was dropped
    StaleResultDiscarded {
        generation: u64,
    },
    PipelineFailed {
        reason: FailureReason,
        message: String,
    },
}
