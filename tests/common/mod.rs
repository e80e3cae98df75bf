// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared fixtures and mock collaborators for the integration suites

// each test binary uses a different subset of these helpers
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use tokio::sync::Semaphore;

use snaptext::{
    BinarizeError, Binarizer, CameraBackend, CameraFacing, CameraStream, CaptureError,
    PipelineConfig, PipelineController, RasterImage, RecognizeError, RecognizeInput,
    RecognizeOptions, RecognizedText, Recognizer, ThresholdBinarizer,
};

/// Encode a plain RGB image of the given size as PNG bytes
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::new_rgb8(width, height);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// A 256x2 grayscale gradient, so thresholding produces distinct outputs
pub fn gradient_png() -> Vec<u8> {
    let mut img = GrayImage::new(256, 2);
    for y in 0..2u32 {
        for x in 0..256u32 {
            img.put_pixel(x, y, Luma([x as u8]));
        }
    }
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

pub fn controller_with(
    binarizer: Arc<dyn Binarizer>,
    recognizer: Arc<dyn Recognizer>,
    camera: Arc<dyn CameraBackend>,
) -> PipelineController {
    PipelineController::new(binarizer, recognizer, camera, PipelineConfig::default())
}

// ---------------------------------------------------------------------------
// Binarizer mocks
// ---------------------------------------------------------------------------

/// Fails the first `failures` calls, then delegates to the real binarizer
pub struct FlakyBinarizer {
    calls: AtomicUsize,
    failures: usize,
    inner: ThresholdBinarizer,
}

impl FlakyBinarizer {
    pub fn new(failures: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failures,
            inner: ThresholdBinarizer,
        }
    }
}

#[async_trait]
impl Binarizer for FlakyBinarizer {
    async fn binarize(&self, encoded: &[u8], threshold: u8) -> Result<Vec<u8>, BinarizeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(BinarizeError::External("transient failure".to_string()));
        }
        self.inner.binarize(encoded, threshold).await
    }
}

/// Waits for a test-controlled permit before each call, so tests can hold
/// a preprocess in flight while issuing other commands
pub struct GatedBinarizer {
    pub gate: Arc<Semaphore>,
    inner: ThresholdBinarizer,
}

impl GatedBinarizer {
    pub fn new() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                gate: gate.clone(),
                inner: ThresholdBinarizer,
            },
            gate,
        )
    }
}

#[async_trait]
impl Binarizer for GatedBinarizer {
    async fn binarize(&self, encoded: &[u8], threshold: u8) -> Result<Vec<u8>, BinarizeError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| BinarizeError::External(e.to_string()))?;
        permit.forget();
        self.inner.binarize(encoded, threshold).await
    }
}

// ---------------------------------------------------------------------------
// Recognizer mocks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptKind {
    Encoded,
    Decoded,
}

#[derive(Debug, Clone)]
pub enum RecognizerScript {
    /// Every attempt succeeds with this text
    Succeed(&'static str),
    /// The encoded-input attempt fails; the decoded one succeeds
    FailPrimaryThenSucceed(&'static str),
    /// Every attempt fails
    FailBoth,
}

/// Recognizer driven by a fixed script, recording each attempt's input
/// representation
pub struct ScriptedRecognizer {
    script: RecognizerScript,
    pub attempts: Mutex<Vec<AttemptKind>>,
}

impl ScriptedRecognizer {
    pub fn new(script: RecognizerScript) -> Self {
        Self {
            script,
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> Vec<AttemptKind> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn recognize(
        &self,
        input: RecognizeInput<'_>,
        _languages: &[String],
        options: RecognizeOptions,
    ) -> Result<RecognizedText, RecognizeError> {
        let kind = match input {
            RecognizeInput::Encoded(_) => AttemptKind::Encoded,
            RecognizeInput::Decoded(_) => AttemptKind::Decoded,
        };
        self.attempts.lock().unwrap().push(kind);

        if let Some(ref progress) = options.progress {
            progress(0.5);
        }

        match (&self.script, kind) {
            (RecognizerScript::Succeed(text), _) => Ok(RecognizedText::new(text.to_string(), 0.9)),
            (RecognizerScript::FailPrimaryThenSucceed(_), AttemptKind::Encoded) => Err(
                RecognizeError::Backend("primary representation rejected".to_string()),
            ),
            (RecognizerScript::FailPrimaryThenSucceed(text), AttemptKind::Decoded) => {
                Ok(RecognizedText::new(text.to_string(), 0.8))
            }
            (RecognizerScript::FailBoth, _) => {
                Err(RecognizeError::Backend("engine unavailable".to_string()))
            }
        }
    }
}

/// Recognizer that waits for a test-controlled permit before answering
pub struct GatedRecognizer {
    pub gate: Arc<Semaphore>,
    text: &'static str,
}

impl GatedRecognizer {
    pub fn new(text: &'static str) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                gate: gate.clone(),
                text,
            },
            gate,
        )
    }
}

#[async_trait]
impl Recognizer for GatedRecognizer {
    async fn recognize(
        &self,
        _input: RecognizeInput<'_>,
        _languages: &[String],
        _options: RecognizeOptions,
    ) -> Result<RecognizedText, RecognizeError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| RecognizeError::Backend(e.to_string()))?;
        permit.forget();
        Ok(RecognizedText::new(self.text.to_string(), 1.0))
    }
}

// ---------------------------------------------------------------------------
// Camera mocks
// ---------------------------------------------------------------------------

/// Camera backend handing out tracked streams; each stream's release flag
/// is recorded so tests can assert release ordering
pub struct MockCamera {
    deny: bool,
    pub opened: Mutex<Vec<Arc<AtomicBool>>>,
}

impl MockCamera {
    pub fn new() -> Self {
        Self {
            deny: false,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn denied() -> Self {
        Self {
            deny: true,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn released_flags(&self) -> Vec<Arc<AtomicBool>> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl CameraBackend for MockCamera {
    async fn open(&self, _facing: CameraFacing) -> Result<Box<dyn CameraStream>, CaptureError> {
        if self.deny {
            return Err(CaptureError::MediaAccess("permission denied".to_string()));
        }
        let released = Arc::new(AtomicBool::new(false));
        self.opened.lock().unwrap().push(released.clone());
        Ok(Box::new(MockStream { released }))
    }
}

pub struct MockStream {
    released: Arc<AtomicBool>,
}

#[async_trait]
impl CameraStream for MockStream {
    async fn next_frame(&mut self) -> Result<RasterImage, CaptureError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(CaptureError::NoActiveSession);
        }
        RasterImage::from_bytes(&gradient_png()).map_err(CaptureError::Decode)
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
