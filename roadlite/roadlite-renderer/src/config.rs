//! Roadlite configuration: camera optics, HUD layout, asset paths, swapchain.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;
use crate::resources::{FontId, ImageId};

/// Pinhole intrinsics `[[fx, 0, cx], [0, fy, cy], [0, 0, 1]]` in video pixels.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl CameraIntrinsics {
    /// Road camera of the 1928x1208 sensor.
    pub const ROAD: Self = Self { fx: 2648.0, fy: 2648.0, cx: 1928.0 / 2.0, cy: 1208.0 / 2.0 };
    /// Wide camera of the 1928x1208 sensor.
    pub const WIDE: Self = Self { fx: 567.0, fy: 567.0, cx: 1928.0 / 2.0, cy: 1208.0 / 2.0 };
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub road: CameraIntrinsics,
    pub wide: CameraIntrinsics,
    /// Zoom constant; effective zoom is `zoom / fx`.
    pub zoom: f32,
    /// Vertical mounting offset in screen pixels.
    pub y_offset: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            road: CameraIntrinsics::ROAD,
            wide: CameraIntrinsics::WIDE,
            zoom: 2912.8,
            y_offset: 150.0,
        }
    }
}

/// Fixed HUD layout in screen pixels.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub border: f32,
    pub header_height: f32,
    pub footer_height: f32,
    /// Width of a side panel left of the visualization rect.
    pub side_panel_width: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { border: 30.0, header_height: 420.0, footer_height: 280.0, side_panel_width: 0.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub sans_regular: PathBuf,
    pub sans_semibold: PathBuf,
    pub sans_bold: PathBuf,
    pub wheel: PathBuf,
    pub driver_face: PathBuf,
    pub brake: PathBuf,
    pub autohold_active: PathBuf,
    pub turn_sign: PathBuf,
}

impl AssetPaths {
    /// Default file names under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            sans_regular: dir.join("fonts/opensans_regular.ttf"),
            sans_semibold: dir.join("fonts/opensans_semibold.ttf"),
            sans_bold: dir.join("fonts/opensans_bold.ttf"),
            wheel: dir.join("img_chffr_wheel.png"),
            driver_face: dir.join("img_driver_face.png"),
            brake: dir.join("img_brake_disc.png"),
            autohold_active: dir.join("img_autohold_active.png"),
            turn_sign: dir.join("img_trafficSign_turn.png"),
        }
    }

    pub fn font(&self, id: FontId) -> &Path {
        match id {
            FontId::SansRegular => &self.sans_regular,
            FontId::SansSemibold => &self.sans_semibold,
            FontId::SansBold => &self.sans_bold,
        }
    }

    pub fn image(&self, id: ImageId) -> &Path {
        match id {
            ImageId::Wheel => &self.wheel,
            ImageId::DriverFace => &self.driver_face,
            ImageId::Brake => &self.brake,
            ImageId::AutoholdActive => &self.autohold_active,
            ImageId::TurnSign => &self.turn_sign,
        }
    }
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self::in_dir("assets")
    }
}

/// Everything the HUD reads from a config file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct HudConfig {
    pub camera: CameraConfig,
    pub layout: LayoutConfig,
    pub assets: AssetPaths,
    /// Device mounting correction, column-major 4x4.
    pub device_transform: [f32; 16],
    pub show_debug_panel: bool,
    pub show_basic_info: bool,
}

impl Default for HudConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            layout: LayoutConfig::default(),
            assets: AssetPaths::default(),
            device_transform: [
                1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
            ],
            show_debug_panel: true,
            show_basic_info: true,
        }
    }
}

impl HudConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| crate::error::RoadliteError::AssetIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// Renderer and bridge configuration.
#[derive(Clone, Debug)]
pub struct RoadliteConfig {
    pub hud: HudConfig,
    /// Swapchain texture format for the output (e.g. Rgba8Unorm or Bgra8Unorm).
    pub swapchain_format: wgpu::TextureFormat,
}

impl Default for RoadliteConfig {
    fn default() -> Self {
        Self {
            hud: HudConfig::default(),
            swapchain_format: wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = HudConfig::from_toml_str(
            r#"
            show_debug_panel = false
            [camera]
            zoom = 2138.5
            y_offset = 0.0
            [layout]
            side_panel_width = 300.0
            "#,
        )
        .unwrap();
        assert!(!cfg.show_debug_panel);
        assert_eq!(cfg.camera.zoom, 2138.5);
        assert_eq!(cfg.camera.road, CameraIntrinsics::ROAD);
        assert_eq!(cfg.layout.border, 30.0);
        assert_eq!(cfg.layout.side_panel_width, 300.0);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = HudConfig::from_toml_str("camera = 3").unwrap_err();
        assert!(matches!(err, crate::error::RoadliteError::Config(_)));
    }
}
