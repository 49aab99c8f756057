//! Shared HUD API for Roadlite.
//! Defines the snapshot records, the latest-value snapshot store, video frame types
//! and the HudBackend traits so hosts can drive the renderer without touching wgpu.

mod backend;
mod snapshot;
mod store;
mod video;

pub use backend::{BackendError, FrameInput, HudBackend, HudBackendWindow};
pub use snapshot::{
    Actuators, AlertSize, AlertStatus, CarControl, CarParams, CarState, ControlsState, DeviceState,
    GpsLocationExt, LeadData, LineVertices, LiveParameters, LongControlState, RadarState, RoadGeometry,
    Snapshot, TopicUpdate, UiState, MAX_LINE_VERTICES, SET_SPEED_NA,
};
pub use store::{SnapshotSource, SnapshotStore};
pub use video::{PixelFormat, VideoFrame, VideoSource};
pub use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
