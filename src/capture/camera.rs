// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Camera backend traits and session lifecycle

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CaptureError;
use crate::vision::RasterImage;

/// Preferred camera facing when multiple devices are available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    /// Front-facing (user) camera
    User,
    /// Rear-facing camera, preferred for document capture
    #[default]
    Environment,
}

/// Environment-specific camera access.
///
/// Opening may fail with [`CaptureError::MediaAccess`] when permission is
/// denied or no device exists.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    async fn open(&self, facing: CameraFacing) -> Result<Box<dyn CameraStream>, CaptureError>;
}

/// A live stream of frames from an open camera.
///
/// `next_frame` returns [`CaptureError::NoActiveSession`] when the stream
/// has not yet delivered a frame, and [`CaptureError::Frame`] for device
/// faults. `release` must be idempotent.
#[async_trait]
pub trait CameraStream: Send {
    async fn next_frame(&mut self) -> Result<RasterImage, CaptureError>;

    fn release(&mut self);
}

/// Owns one open camera stream, the single exclusive hardware resource.
///
/// Release is guaranteed on every exit path; dropping an active session
/// releases the stream.
pub struct CameraSession {
    stream: Option<Box<dyn CameraStream>>,
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("active", &self.is_active())
            .finish()
    }
}

impl CameraSession {
    pub(crate) fn new(stream: Box<dyn CameraStream>) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    /// Grab the next frame from the stream.
    pub async fn grab(&mut self) -> Result<RasterImage, CaptureError> {
        match self.stream.as_mut() {
            Some(stream) => stream.next_frame().await,
            None => Err(CaptureError::NoActiveSession),
        }
    }

    /// Stop the underlying stream. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            debug!("camera stream released");
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct TrackedStream {
        released: Arc<AtomicBool>,
    }

    #[async_trait]
    impl CameraStream for TrackedStream {
        async fn next_frame(&mut self) -> Result<RasterImage, CaptureError> {
            RasterImage::new(DynamicImage::new_rgb8(8, 8)).map_err(CaptureError::Decode)
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn tracked() -> (CameraSession, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        let session = CameraSession::new(Box::new(TrackedStream {
            released: released.clone(),
        }));
        (session, released)
    }

    #[tokio::test]
    async fn test_grab_after_release_fails() {
        let (mut session, _) = tracked();
        session.release();
        let result = session.grab().await;
        assert!(matches!(result.unwrap_err(), CaptureError::NoActiveSession));
    }

    #[test]
    fn test_release_idempotent() {
        let (mut session, released) = tracked();
        session.release();
        session.release();
        assert!(released.load(Ordering::SeqCst));
        assert!(!session.is_active());
    }

    #[test]
    fn test_drop_releases_stream() {
        let (session, released) = tracked();
        drop(session);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_facing_default_and_serde() {
        assert_eq!(CameraFacing::default(), CameraFacing::Environment);
        let json = serde_json::to_string(&CameraFacing::Environment).unwrap();
        assert_eq!(json, r#""environment""#);
        let parsed: CameraFacing = serde_json::from_str(r#""user""#).unwrap();
        assert_eq!(parsed, CameraFacing::User);
    }
}
