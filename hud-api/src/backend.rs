//! Trait for HUD backends. Host uses this to call render_frame uniformly.

use crate::snapshot::Snapshot;
use crate::video::VideoFrame;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend initialization failed: {0}")]
    Init(String),
    #[error("surface error: {0}")]
    Surface(String),
    #[error("render failed: {0}")]
    Render(String),
}

/// What the host hands over for one displayed frame.
pub struct FrameInput<'a> {
    pub snapshot: &'a Snapshot,
    /// Newest decoded frame, if any arrived since the previous call.
    pub video: Option<&'a VideoFrame>,
    pub video_connected: bool,
    pub viewport_size: (u32, u32),
}

/// HUD backend that renders into a target it owns (offscreen texture).
pub trait HudBackend: Send {
    /// Compose and submit one frame.
    fn render_frame(&mut self, input: &FrameInput<'_>) -> Result<(), BackendError>;
}

/// Extension for backends that can present to a window. Host passes raw handles (e.g. from winit);
/// the backend owns the surface and performs get_current_texture + present internally.
pub trait HudBackendWindow: HudBackend + Send {
    fn render_frame_to_window(
        &mut self,
        input: &FrameInput<'_>,
        raw_window_handle: RawWindowHandle,
        raw_display_handle: RawDisplayHandle,
    ) -> Result<(), BackendError>;
}
