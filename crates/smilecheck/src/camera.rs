//! Frame sources for face capture.
//!
//! A [`FrameSource`] is the camera collaborator: it is acquired, produces
//! snapshots on demand, and must be released afterwards. [`CameraGuard`]
//! ties the release to scope so the device is let go on every exit path.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::FacePayload;

/// A device or stand-in that produces face image snapshots.
pub trait FrameSource: Send + std::fmt::Debug {
    /// The name of this source (for logging and error messages).
    fn name(&self) -> &'static str;

    /// Acquire the underlying device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CameraUnavailable`] if the device cannot be opened.
    fn acquire(&mut self) -> Result<()>;

    /// Capture one frame as an image payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CaptureFailed`] if the source is not acquired or
    /// cannot produce a frame.
    fn snapshot(&mut self) -> Result<FacePayload>;

    /// Release the device. Must be safe to call when not acquired.
    fn release(&mut self);

    /// Check if the device is currently held.
    fn is_active(&self) -> bool;
}

/// Scoped ownership of an acquired [`FrameSource`].
#[derive(Debug)]
pub struct CameraGuard<'a> {
    source: &'a mut dyn FrameSource,
}

impl<'a> CameraGuard<'a> {
    /// Acquire `source` for the lifetime of the guard.
    ///
    /// # Errors
    ///
    /// Returns the source's acquisition error; nothing is held in that case.
    pub fn acquire(source: &'a mut dyn FrameSource) -> Result<Self> {
        if let Err(e) = source.acquire() {
            source.release();
            return Err(e);
        }
        info!(source = source.name(), "camera acquired");
        Ok(Self { source })
    }

    /// Capture one frame.
    ///
    /// # Errors
    ///
    /// Returns the source's capture error.
    pub fn snapshot(&mut self) -> Result<FacePayload> {
        self.source.snapshot()
    }

    /// Name of the guarded source.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.source.name()
    }
}

impl Drop for CameraGuard<'_> {
    fn drop(&mut self) {
        self.source.release();
        info!(source = self.source.name(), "camera released");
    }
}

/// Replays a fixed sequence of frames, cycling when it reaches the end.
///
/// Built either from image files, which are read on acquire, or from
/// in-memory payloads.
#[derive(Debug)]
pub struct ReplaySource {
    files: Vec<PathBuf>,
    frames: Vec<FacePayload>,
    cursor: usize,
    active: bool,
}

impl ReplaySource {
    /// A source that reads `paths` from disk when acquired.
    #[must_use]
    pub fn from_files(paths: Vec<PathBuf>) -> Self {
        Self {
            files: paths,
            frames: Vec::new(),
            cursor: 0,
            active: false,
        }
    }

    /// A source that replays `frames` directly.
    #[must_use]
    pub fn from_frames(frames: Vec<FacePayload>) -> Self {
        Self {
            files: Vec::new(),
            frames,
            cursor: 0,
            active: false,
        }
    }

    /// Number of snapshots taken since the last acquire.
    #[must_use]
    pub fn frames_taken(&self) -> usize {
        self.cursor
    }
}

impl FrameSource for ReplaySource {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn acquire(&mut self) -> Result<()> {
        if !self.files.is_empty() {
            let mut frames = Vec::with_capacity(self.files.len());
            for path in &self.files {
                let bytes = std::fs::read(path).map_err(|e| {
                    Error::camera_unavailable(self.name(), format!("{}: {e}", path.display()))
                })?;
                frames.push(FacePayload::new(bytes));
            }
            self.frames = frames;
        }
        if self.frames.is_empty() {
            return Err(Error::camera_unavailable(self.name(), "no frames to replay"));
        }
        self.cursor = 0;
        self.active = true;
        Ok(())
    }

    fn snapshot(&mut self) -> Result<FacePayload> {
        if !self.active {
            return Err(Error::capture_failed(self.name(), "source not acquired"));
        }
        let frame = self.frames[self.cursor % self.frames.len()].clone();
        self.cursor += 1;
        debug!(frame = self.cursor, fingerprint = %frame.short_fingerprint(), "frame captured");
        Ok(frame)
    }

    fn release(&mut self) {
        if !self.files.is_empty() {
            self.frames.clear();
        }
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Read a single image file as a face payload.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is empty.
pub fn read_face_file(path: &std::path::Path) -> Result<FacePayload> {
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Err(Error::MissingFaceImage);
    }
    Ok(FacePayload::new(bytes))
}
