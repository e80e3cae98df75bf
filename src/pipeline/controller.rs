// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! The capture → preprocess → recognize orchestration core
//!
//! [`PipelineController`] owns the pipeline state machine. Commands are
//! serialized through one async mutex; the external collaborator calls
//! (binarize, recognize) run with the lock released and re-validate the
//! generation counter before applying their results, so a newly acquired
//! source always supersedes in-flight work for the previous one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::capture::{CameraBackend, CameraFacing, CaptureError, ImageSource};
use crate::config::PipelineConfig;
use crate::vision::{
    BinarizeError, Binarizer, ImageError, ProgressFn, RasterImage, RecognizeError, RecognizeInput,
    RecognizeOptions, RecognizedText, Recognizer,
};

use super::state::{FailureReason, PipelineEvent, PipelineState, RecognitionResult};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("precondition not met: {0}")]
    Precondition(&'static str),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("binarization failed: {0}")]
    Binarize(#[from] BinarizeError),

    #[error("recognition failed: {0}")]
    Recognition(String),

    #[error(transparent)]
    Image(#[from] ImageError),
}

/// The binarized image together with its transport bytes and the
/// threshold that produced it. Held independently of the original.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub image: RasterImage,
    pub encoded: Vec<u8>,
    pub threshold: u8,
}

struct PipelineInner {
    state: PipelineState,
    source: ImageSource,
    original: Option<RasterImage>,
    processed: Option<ProcessedImage>,
    result: Option<RecognitionResult>,
    /// Bumped on every source acquisition; stale async results are
    /// detected by comparing against the value captured at dispatch.
    generation: u64,
    /// Latest queued threshold while a preprocess call is in flight
    pending_threshold: Option<u8>,
}

/// Clears the preprocess in-flight flag when the worker exits, on every
/// path including the caller's future being dropped mid-await.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Orchestrates ImageSource, Binarizer and Recognizer.
pub struct PipelineController {
    binarizer: Arc<dyn Binarizer>,
    recognizer: Arc<dyn Recognizer>,
    config: PipelineConfig,
    events: broadcast::Sender<PipelineEvent>,
    /// Whether a preprocess worker currently owns the drain loop. Lives
    /// outside the state mutex so the guard can clear it without locking.
    preprocess_in_flight: AtomicBool,
    inner: Mutex<PipelineInner>,
}

impl std::fmt::Debug for PipelineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineController").finish_non_exhaustive()
    }
}

impl PipelineController {
    pub fn new(
        binarizer: Arc<dyn Binarizer>,
        recognizer: Arc<dyn Recognizer>,
        camera: Arc<dyn CameraBackend>,
        config: PipelineConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);

        Self {
            binarizer,
            recognizer,
            config,
            events,
            preprocess_in_flight: AtomicBool::new(false),
            inner: Mutex::new(PipelineInner {
                state: PipelineState::Empty,
                source: ImageSource::new(camera),
                original: None,
                processed: None,
                result: None,
                generation: 0,
                pending_threshold: None,
            }),
        }
    }

    /// Subscribe to pipeline events. Every state transition and terminal
    /// error is delivered to all live receivers.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> PipelineState {
        self.inner.lock().await.state
    }

    pub async fn result(&self) -> Option<RecognitionResult> {
        self.inner.lock().await.result.clone()
    }

    pub async fn generation(&self) -> u64 {
        self.inner.lock().await.generation
    }

    pub async fn processed(&self) -> Option<ProcessedImage> {
        self.inner.lock().await.processed.clone()
    }

    pub async fn has_camera_session(&self) -> bool {
        self.inner.lock().await.source.has_session()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Acquire the source image from uploaded file bytes.
    pub async fn acquire_from_file(&self, bytes: &[u8]) -> Result<(), PipelineError> {
        let mut inner = self.inner.lock().await;
        let image = inner.source.load_from_file(bytes)?;
        self.install_source(&mut inner, image);
        Ok(())
    }

    /// Open a live camera session, releasing any prior one first.
    pub async fn open_camera(&self, facing: CameraFacing) -> Result<(), PipelineError> {
        let mut inner = self.inner.lock().await;
        inner.source.open_camera(facing).await?;
        Ok(())
    }

    /// Grab one frame as the new source image and close the session.
    pub async fn capture_frame(&self) -> Result<(), PipelineError> {
        let mut inner = self.inner.lock().await;
        let frame = inner.source.capture_frame().await?;
        self.install_source(&mut inner, frame);
        Ok(())
    }

    /// Release the camera if open. Idempotent.
    pub async fn close_camera(&self) {
        self.inner.lock().await.source.close_camera();
    }

    /// Binarize the current source image with the given threshold.
    ///
    /// Requires an acquired source; otherwise fails with a precondition
    /// error and no state change. A call arriving while another is in
    /// flight queues its threshold and returns immediately; only the
    /// latest queued value is kept (queue-and-supersede), matching
    /// slider-drag usage where only the settled value matters. The
    /// in-flight worker drains the queue before finishing; the in-flight
    /// flag is cleared even when the caller's future is dropped mid-await,
    /// so an interrupted call never blocks later ones.
    pub async fn preprocess(&self, threshold: u8) -> Result<(), PipelineError> {
        let (mut encoded, mut generation) = {
            let mut inner = self.inner.lock().await;
            let original = inner
                .original
                .as_ref()
                .ok_or(PipelineError::Precondition("no source image acquired"))?;

            if self.preprocess_in_flight.load(Ordering::SeqCst) {
                if let Some(replaced) = inner.pending_threshold.replace(threshold) {
                    self.emit(PipelineEvent::PreprocessSuperseded {
                        threshold: replaced,
                    });
                }
                debug!(threshold, "preprocess queued behind in-flight call");
                return Ok(());
            }

            let encoded = original.to_png_bytes()?;
            // a threshold left queued by an abandoned worker is older
            // than this request and loses to it
            inner.pending_threshold = None;
            self.preprocess_in_flight.store(true, Ordering::SeqCst);
            (encoded, inner.generation)
        };

        let _in_flight = InFlightGuard(&self.preprocess_in_flight);

        let mut threshold = threshold;
        loop {
            let outcome = self.binarizer.binarize(&encoded, threshold).await;

            let mut inner = self.inner.lock().await;
            let stale = inner.generation != generation;
            let mut step_err: Option<PipelineError> = None;

            if stale {
                debug!(generation, "discarding binarization result for superseded source");
                self.emit(PipelineEvent::StaleResultDiscarded { generation });
            } else {
                let applied = outcome.and_then(|bytes| {
                    RasterImage::from_bytes(&bytes)
                        .map(|image| (image, bytes))
                        .map_err(|e| BinarizeError::Decode(e.to_string()))
                });

                match applied {
                    Ok((image, bytes)) => {
                        info!(threshold, "binarized image ready");
                        inner.processed = Some(ProcessedImage {
                            image,
                            encoded: bytes,
                            threshold,
                        });
                        self.set_state(&mut inner, PipelineState::Processed);
                        self.emit(PipelineEvent::ProcessedReady { threshold });
                    }
                    Err(e) => {
                        warn!(threshold, "binarization failed: {}", e);
                        self.set_state(&mut inner, PipelineState::Failed(FailureReason::Binarize));
                        self.emit(PipelineEvent::PipelineFailed {
                            reason: FailureReason::Binarize,
                            message: e.to_string(),
                        });
                        step_err = Some(PipelineError::Binarize(e));
                    }
                }
            }

            match inner.pending_threshold.take() {
                Some(next) => {
                    threshold = next;
                    if stale {
                        // the queued request targets the current source now
                        let snapshot = match inner.original.as_ref() {
                            Some(original) => original.to_png_bytes(),
                            None => return Ok(()),
                        };
                        match snapshot {
                            Ok(bytes) => {
                                encoded = bytes;
                                generation = inner.generation;
                            }
                            Err(e) => return Err(e.into()),
                        }
                    }
                }
                None => {
                    return match step_err {
                        Some(e) => Err(e),
                        None => Ok(()),
                    };
                }
            }
        }
    }

    /// Run text recognition over the processed image.
    ///
    /// Requires a processed image; otherwise fails with a precondition
    /// error and no state change. Two attempts are made in order: the
    /// encoded PNG bytes with a progress callback, then the decoded image
    /// object without one. A success on either attempt (including empty
    /// text) completes the cycle; if both fail the pipeline enters
    /// `Failed` and the stored result carries the error description.
    ///
    /// Returns `Ok(None)` when the finished run was superseded by a new
    /// source acquisition and its result discarded.
    pub async fn recognize(&self) -> Result<Option<RecognitionResult>, PipelineError> {
        let (encoded, image, generation) = {
            let mut inner = self.inner.lock().await;
            let processed = inner
                .processed
                .as_ref()
                .ok_or(PipelineError::Precondition("no preprocessed image available"))?;
            let snapshot = (
                processed.encoded.clone(),
                processed.image.clone(),
                inner.generation,
            );
            self.set_state(&mut inner, PipelineState::Recognizing);
            snapshot
        };

        let languages = self.config.language_hints.clone();
        let events = self.events.clone();
        let progress: ProgressFn = Arc::new(move |fraction| {
            let _ = events.send(PipelineEvent::RecognitionProgress { fraction });
        });

        // Explicit two-step strategy list: exactly one fallback attempt.
        let mut recognized: Option<RecognizedText> = None;
        let mut last_error: Option<RecognizeError> = None;

        for step in 0..2 {
            let attempt = if step == 0 {
                self.recognizer
                    .recognize(
                        RecognizeInput::Encoded(&encoded),
                        &languages,
                        RecognizeOptions {
                            progress: Some(progress.clone()),
                        },
                    )
                    .await
            } else {
                self.recognizer
                    .recognize(
                        RecognizeInput::Decoded(image.as_dynamic()),
                        &languages,
                        RecognizeOptions::default(),
                    )
                    .await
            };

            match attempt {
                Ok(text) => {
                    recognized = Some(text);
                    break;
                }
                Err(e) => {
                    if step == 0 {
                        warn!("primary recognition attempt failed, retrying with decoded image: {}", e);
                    } else {
                        warn!("fallback recognition attempt failed: {}", e);
                    }
                    last_error = Some(e);
                }
            }
        }

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!(generation, "discarding recognition result for superseded source");
            self.emit(PipelineEvent::StaleResultDiscarded { generation });
            return Ok(None);
        }

        match recognized {
            Some(text) => {
                info!(chars = text.text.len(), "recognition completed");
                let result = RecognitionResult {
                    text: text.text,
                    completed: true,
                };
                inner.result = Some(result.clone());
                self.set_state(&mut inner, PipelineState::RecognitionDone);
                Ok(Some(result))
            }
            None => {
                let message = last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "recognition failed".to_string());
                inner.result = Some(RecognitionResult {
                    text: message.clone(),
                    completed: false,
                });
                self.set_state(&mut inner, PipelineState::Failed(FailureReason::Recognition));
                self.emit(PipelineEvent::PipelineFailed {
                    reason: FailureReason::Recognition,
                    message: message.clone(),
                });
                Err(PipelineError::Recognition(message))
            }
        }
    }

    /// Install a freshly acquired source image: bump the generation,
    /// clear processed/result state and move to `SourceReady`.
    fn install_source(&self, inner: &mut PipelineInner, image: RasterImage) {
        inner.generation += 1;
        inner.processed = None;
        inner.result = None;
        inner.pending_threshold = None;

        self.emit(PipelineEvent::SourceAcquired {
            generation: inner.generation,
            width: image.width(),
            height: image.height(),
        });

        inner.original = Some(image);
        self.set_state(inner, PipelineState::SourceReady);
    }

    fn set_state(&self, inner: &mut PipelineInner, to: PipelineState) {
        if inner.state != to {
            let from = std::mem::replace(&mut inner.state, to);
            debug!(from = from.name(), to = to.name(), "pipeline state changed");
            self.emit(PipelineEvent::StateChanged { from, to });
        }
    }

    fn emit(&self, event: PipelineEvent) {
        // no live subscribers is not an error
        let _ = self.events.send(event);
    }
}
