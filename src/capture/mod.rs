// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image acquisition: file decoding and camera capture
//!
//! An [`ImageSource`] produces the pipeline's source image from exactly
//! one of two origins: decoded file bytes or a one-shot camera frame grab.
//! It owns the camera lifecycle and enforces the one-session-at-a-time
//! policy.

pub mod camera;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::vision::{ImageError, RasterImage};

pub use camera::{CameraBackend, CameraFacing, CameraSession, CameraStream};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera unavailable or access denied: {0}")]
    MediaAccess(String),

    #[error("no active camera session")]
    NoActiveSession,

    #[error("failed to grab camera frame: {0}")]
    Frame(String),

    #[error(transparent)]
    Decode(#[from] ImageError),
}

/// Produces source images and owns the camera session.
pub struct ImageSource {
    backend: Arc<dyn CameraBackend>,
    session: Option<CameraSession>,
}

impl std::fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSource")
            .field("has_session", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

impl ImageSource {
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        Self {
            backend,
            session: None,
        }
    }

    /// Decode arbitrary image-container bytes into a source image.
    pub fn load_from_file(&self, bytes: &[u8]) -> Result<RasterImage, CaptureError> {
        let image = RasterImage::from_bytes(bytes)?;
        debug!(
            width = image.width(),
            height = image.height(),
            "decoded source image from file bytes"
        );
        Ok(image)
    }

    /// Open a camera session, releasing any prior session first.
    ///
    /// The old session's hardware resource is released before the new
    /// stream is acquired, so at most one session is ever live.
    pub async fn open_camera(&mut self, facing: CameraFacing) -> Result<(), CaptureError> {
        self.close_camera();

        let stream = self.backend.open(facing).await?;
        info!(?facing, "camera session opened");
        self.session = Some(CameraSession::new(stream));
        Ok(())
    }

    /// Grab one frame and close the session.
    ///
    /// Capture is a one-shot action: the session is released on every
    /// path out of this method, success or error.
    pub async fn capture_frame(&mut self) -> Result<RasterImage, CaptureError> {
        let mut session = self.session.take().ok_or(CaptureError::NoActiveSession)?;
        let frame = session.grab().await;
        session.release();
        let frame = frame?;
        info!(
            width = frame.width(),
            height = frame.height(),
            "captured camera frame"
        );
        Ok(frame)
    }

    /// Release the camera if open. Idempotent; a no-op without a session.
    pub fn close_camera(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.release();
            info!("camera session closed");
        }
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }
}

impl Drop for ImageSource {
    fn drop(&mut self) {
        self.close_camera();
    }
}
