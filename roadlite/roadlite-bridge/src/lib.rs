//! Roadlite bridge: implements hud_api::HudBackend using roadlite-renderer.

mod plugin;
mod window_backend;

pub use plugin::RoadlitePlugin;
pub use window_backend::RoadliteWindowBackend;
