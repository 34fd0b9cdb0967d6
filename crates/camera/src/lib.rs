//! Camera capability used by the gate scanner.
//!
//! The scanner only needs to open a rear-facing video stream and later stop
//! every track on it. Platform capture lives behind [`CameraDevice`].

use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

pub const IDEAL_WIDTH: u32 = 1280;
pub const IDEAL_HEIGHT: u32 = 960;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    User,
    #[default]
    Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConstraints {
    pub facing_mode: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
            ideal_width: IDEAL_WIDTH,
            ideal_height: IDEAL_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub track_id: String,
    pub width: u32,
    pub height: u32,
    pub stopped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera device found")]
    NotFound,
    #[error("camera unavailable: {0}")]
    Unavailable(String),
}

/// A live capture stream. Stopping is synchronous and idempotent.
pub trait MediaStream: Send + Sync {
    fn tracks(&self) -> Vec<TrackInfo>;
    fn stop_all_tracks(&self);

    fn is_stopped(&self) -> bool {
        self.tracks().iter().all(|track| track.stopped)
    }
}

#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn acquire(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<Arc<dyn MediaStream>, CameraError>;
}

/// Stand-in used when the host has no capture backend.
pub struct MissingCamera;

#[async_trait]
impl CameraDevice for MissingCamera {
    async fn acquire(
        &self,
        _constraints: &CameraConstraints,
    ) -> Result<Arc<dyn MediaStream>, CameraError> {
        Err(CameraError::NotFound)
    }
}

/// In-process camera producing single-track streams at the requested size.
///
/// Keeps count of how many of its streams are still running so callers can
/// verify the hardware lock is released.
#[derive(Default)]
pub struct VirtualCamera {
    next_stream: AtomicU64,
    acquisitions: AtomicUsize,
    active: Arc<AtomicUsize>,
}

impl VirtualCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn active_streams(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraDevice for VirtualCamera {
    async fn acquire(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<Arc<dyn MediaStream>, CameraError> {
        let stream_id = self.next_stream.fetch_add(1, Ordering::SeqCst) + 1;
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_add(1, Ordering::SeqCst);
        debug!(
            stream_id,
            width = constraints.ideal_width,
            height = constraints.ideal_height,
            "camera: virtual stream opened"
        );
        Ok(Arc::new(VirtualStream {
            track_id: format!("virtual-video-{stream_id}"),
            width: constraints.ideal_width,
            height: constraints.ideal_height,
            stopped: AtomicBool::new(false),
            active: Arc::clone(&self.active),
        }))
    }
}

struct VirtualStream {
    track_id: String,
    width: u32,
    height: u32,
    stopped: AtomicBool,
    active: Arc<AtomicUsize>,
}

impl MediaStream for VirtualStream {
    fn tracks(&self) -> Vec<TrackInfo> {
        vec![TrackInfo {
            track_id: self.track_id.clone(),
            width: self.width,
            height: self.height,
            stopped: self.stopped.load(Ordering::SeqCst),
        }]
    }

    fn stop_all_tracks(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.active.fetch_sub(1, Ordering::SeqCst);
            debug!(track_id = %self.track_id, "camera: virtual track stopped");
        }
    }
}
