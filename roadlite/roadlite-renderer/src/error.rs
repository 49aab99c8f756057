//! Renderer error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::compositor::FramePhase;

#[derive(Error, Debug)]
pub enum RoadliteError {
    #[error("failed to read {path}: {source}")]
    AssetIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid font data in {0}")]
    InvalidFont(PathBuf),
    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("frame size must be > 0 (got {width}x{height})")]
    InvalidSize { width: u32, height: u32 },
    #[error("illegal frame phase transition {from:?} -> {to:?}")]
    PhaseOrder { from: FramePhase, to: FramePhase },
    #[error("malformed video frame {width}x{height} ({len} bytes)")]
    MalformedVideoFrame { width: u32, height: u32, len: usize },
    #[error("frame already submitted")]
    FrameSubmitted,
    #[error("frame readback failed: {0}")]
    Readback(String),
}

impl From<RoadliteError> for hud_api::BackendError {
    fn from(e: RoadliteError) -> Self {
        match e {
            RoadliteError::AssetIo { .. }
            | RoadliteError::InvalidFont(_)
            | RoadliteError::Image { .. }
            | RoadliteError::Config(_) => hud_api::BackendError::Init(e.to_string()),
            _ => hud_api::BackendError::Render(e.to_string()),
        }
    }
}

pub type Result<T, E = RoadliteError> = std::result::Result<T, E>;
