//! Headless host: render one frame offscreen from a TOML snapshot fixture, optionally dump it as PNG.
//! Run: cargo run -p debug --bin hud_headless -- --assets assets --output frame.png

use std::path::PathBuf;

use clap::Parser;
use debug::synthetic::{frame_at, road_geometry};
use hud_api::{FrameInput, HudBackend, Snapshot};
use roadlite_bridge::RoadlitePlugin;
use roadlite_renderer::{AssetPaths, HudConfig, RoadliteConfig, TransformEngine};

#[derive(Parser, Debug)]
#[command(name = "hud_headless", about = "Render one Roadlite HUD frame without a window")]
struct Args {
    /// Snapshot fixture (TOML, one table per topic).
    #[arg(long, default_value = "debug/fixtures/drive.toml")]
    fixture: PathBuf,
    /// HUD config TOML; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding fonts/ and the icon PNGs.
    #[arg(long)]
    assets: Option<PathBuf>,
    #[arg(long, default_value = "2160")]
    width: u32,
    #[arg(long, default_value = "1080")]
    height: u32,
    /// Render as if the camera were disconnected.
    #[arg(long)]
    no_video: bool,
    /// Replace the fixture's model geometry with synthetic lanes for this viewport.
    #[arg(long)]
    synthetic_lanes: bool,
    /// Write the frame here as PNG.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn load_fixture(path: &PathBuf) -> Result<Snapshot, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    toml::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))
}

fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let mut hud = match &args.config {
        Some(path) => HudConfig::load(path).map_err(|e| e.to_string())?,
        None => HudConfig::default(),
    };
    if let Some(dir) = &args.assets {
        hud.assets = AssetPaths::in_dir(dir);
    }

    let mut snapshot = load_fixture(&args.fixture)?;
    if args.synthetic_lanes {
        let mut transform = TransformEngine::new(hud.camera.clone(), hud.layout.clone(), hud.device_transform);
        let view = transform.update(args.width, args.height, snapshot.ui.wide_camera);
        snapshot.model = road_geometry(&view, 0.0, snapshot.radar_state.lead_one.d_rel);
    }

    let config = RoadliteConfig { hud, swapchain_format: wgpu::TextureFormat::Rgba8Unorm };
    let mut backend = RoadlitePlugin::new_headless(config).map_err(|e| e.to_string())?;
    let video = (!args.no_video).then(|| frame_at(964, 604, 0));
    let input = FrameInput {
        snapshot: &snapshot,
        video: video.as_ref(),
        video_connected: !args.no_video,
        viewport_size: (args.width, args.height),
    };
    backend.render_frame(&input).map_err(|e| e.to_string())?;
    if let Some(stats) = backend.last_stats() {
        println!(
            "hud_headless: {}x{} status {:?}, video {}, {} overlay commands",
            args.width, args.height, stats.status, stats.video_drawn, stats.overlay_cmds
        );
    }

    if let Some(path) = &args.output {
        let image = backend.read_offscreen().map_err(|e| e.to_string())?;
        image.save(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        println!("hud_headless: wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hud_api::LongControlState;

    #[test]
    fn bundled_fixture_parses() {
        let snap: Snapshot = toml::from_str(include_str!("../../fixtures/drive.toml")).unwrap();
        assert_eq!(snap.controls_state.long_control_state, LongControlState::Pid);
        assert_eq!(snap.radar_state.lead_one.d_rel, 20.0);
        assert_eq!(snap.model.track.len(), 6);
        assert!(snap.ui.world_objects_visible);
    }
}
