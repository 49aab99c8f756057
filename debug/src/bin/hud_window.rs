//! Backend-agnostic window host: depends on hud-api + RoadliteWindowBackend only, never on wgpu.
//! A publisher thread streams a synthetic drive into the snapshot store; the render loop
//! reads the newest snapshot and camera frame every redraw.
//! Run: cargo run -p debug --bin hud_window -- --assets assets
//! Keys: V toggles the camera connection, Esc quits.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use clap::Parser;
use debug::synthetic::{drive_updates, SyntheticCamera};
use hud_api::{FrameInput, HudBackendWindow, SnapshotSource, SnapshotStore, VideoSource};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use roadlite_renderer::{AssetPaths, HudConfig, TransformEngine};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowId;

const PUBLISH_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "hud_window", about = "Roadlite HUD in a window, driven by a synthetic drive")]
struct Args {
    /// HUD config TOML; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding fonts/ and the icon PNGs.
    #[arg(long)]
    assets: Option<PathBuf>,
    #[arg(long, default_value = "1440")]
    width: u32,
    #[arg(long, default_value = "720")]
    height: u32,
}

fn pack_size(w: u32, h: u32) -> u64 {
    (w as u64) << 32 | h as u64
}

fn unpack_size(v: u64) -> (u32, u32) {
    ((v >> 32) as u32, v as u32)
}

/// Publishes `drive_updates` at a fixed rate until `running` is cleared.
fn spawn_publisher(
    store: Arc<SnapshotStore>,
    hud: HudConfig,
    size: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut transform = TransformEngine::new(hud.camera, hud.layout, hud.device_transform);
        let start = Instant::now();
        while running.load(Ordering::Relaxed) {
            let (w, h) = unpack_size(size.load(Ordering::Relaxed));
            let view = transform.update(w.max(1), h.max(1), false);
            store.publish_all(drive_updates(start.elapsed().as_secs_f32(), &view));
            std::thread::sleep(PUBLISH_INTERVAL);
        }
        log::info!("publisher stopped");
    })
}

struct App {
    window: Option<winit::window::Window>,
    /// Backend: renders through hud-api's HudBackendWindow, holds no wgpu types here.
    backend: Option<Box<dyn HudBackendWindow>>,
    hud: HudConfig,
    initial_size: (u32, u32),
    size: Arc<AtomicU64>,
    store: Arc<SnapshotStore>,
    camera: SyntheticCamera,
    running: Arc<AtomicBool>,
    publisher: Option<JoinHandle<()>>,
    /// Set when the window or renderer could not be created; returned from `main`.
    fatal: Option<String>,
}

impl App {
    fn new(hud: HudConfig, initial_size: (u32, u32)) -> Self {
        let store = Arc::new(SnapshotStore::default());
        let size = Arc::new(AtomicU64::new(pack_size(initial_size.0, initial_size.1)));
        let running = Arc::new(AtomicBool::new(true));
        let publisher = spawn_publisher(Arc::clone(&store), hud.clone(), Arc::clone(&size), Arc::clone(&running));
        Self {
            window: None,
            backend: None,
            hud,
            initial_size,
            size,
            store,
            camera: SyntheticCamera::new(964, 604),
            running,
            publisher: Some(publisher),
            fatal: None,
        }
    }

    fn set_size(&self, w: u32, h: u32) {
        self.size.store(pack_size(w, h), Ordering::Relaxed);
    }

    fn stop_publisher(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.publisher.take() {
            let _ = handle.join();
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.stop_publisher();
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, message: String) {
        log::error!("{}", message);
        self.fatal = Some(message);
        self.shutdown(event_loop);
    }

    /// Stops the publisher and reports why the loop ended, if it failed.
    fn finish(mut self) -> Result<(), String> {
        self.stop_publisher();
        match self.fatal.take() {
            Some(message) => Err(message),
            None => Ok(()),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let window = match &self.window {
            Some(w) => w,
            None => return,
        };
        let phys = window.inner_size();
        self.set_size(phys.width, phys.height);
        if self.backend.is_none() {
            match roadlite_bridge::RoadliteWindowBackend::from_window(window, self.hud.clone()) {
                Ok(backend) => self.backend = Some(backend),
                Err(e) => {
                    self.fail(event_loop, format!("renderer init failed: {}", e));
                    return;
                }
            }
        }
        let (raw_window, raw_display) = match (window.window_handle(), window.display_handle()) {
            (Ok(wh), Ok(dh)) => (wh.as_raw(), dh.as_raw()),
            _ => return,
        };
        let backend = match &mut self.backend {
            Some(b) => b,
            None => return,
        };
        let snapshot = self.store.latest();
        let frame = self.camera.latest_frame();
        let input = FrameInput {
            snapshot: &snapshot,
            video: frame.as_ref(),
            video_connected: self.camera.connected(),
            viewport_size: (phys.width, phys.height),
        };
        if let Err(e) = backend.render_frame_to_window(&input, raw_window, raw_display) {
            log::warn!("frame failed: {}", e);
        }
        window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let (w, h) = self.initial_size;
        let attrs = winit::window::WindowAttributes::default()
            .with_title("Roadlite HUD (synthetic drive)")
            .with_inner_size(winit::dpi::LogicalSize::new(w, h));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => w,
            Err(e) => {
                self.fail(event_loop, format!("create window: {}", e));
                return;
            }
        };
        let phys = window.inner_size();
        self.set_size(phys.width, phys.height);
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            WindowEvent::Resized(physical) => {
                self.set_size(physical.width, physical.height);
                if let Some(ref w) = self.window {
                    w.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match event.logical_key.as_ref() {
                    Key::Named(NamedKey::Escape) => self.shutdown(event_loop),
                    Key::Character("v") | Key::Character("V") => {
                        let connected = self.camera.connected();
                        self.camera.set_connected(!connected);
                    }
                    _ => {}
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
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
    let event_loop = winit::event_loop::EventLoop::new().map_err(|e| e.to_string())?;
    let mut app = App::new(hud, (args.width, args.height));
    event_loop.run_app(&mut app).map_err(|e| e.to_string())?;
    app.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_packing_keeps_both_halves() {
        assert_eq!(unpack_size(pack_size(2160, 1080)), (2160, 1080));
    }

    #[test]
    fn init_failure_ends_the_run_with_an_error() {
        let mut app = App::new(HudConfig::default(), (64, 32));
        app.fatal = Some("renderer init failed: no adapter".to_string());
        assert_eq!(app.finish(), Err("renderer init failed: no adapter".to_string()));
    }

    #[test]
    fn clean_exit_stops_the_publisher() {
        let app = App::new(HudConfig::default(), (64, 32));
        let store = Arc::clone(&app.store);
        let running = Arc::clone(&app.running);
        assert_eq!(app.finish(), Ok(()));
        assert!(!running.load(Ordering::Relaxed));
        let version = store.latest().version;
        std::thread::sleep(PUBLISH_INTERVAL * 2);
        assert_eq!(store.latest().version, version);
    }
}
