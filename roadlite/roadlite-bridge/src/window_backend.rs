//! Window-capable backend: created from a window, implements HudBackendWindow.

use hud_api::{BackendError, FrameInput, HudBackend, HudBackendWindow};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::SurfaceTargetUnsafe;

use crate::plugin::RoadlitePlugin;
use roadlite_renderer::{HudConfig, RoadliteConfig};

/// Backend that owns the wgpu Instance and RoadlitePlugin; can present to a window.
/// Created via `RoadliteWindowBackend::from_window(window, hud)`; each frame use
/// `render_frame_to_window(input, raw_window_handle, raw_display_handle)`.
/// The surface is recreated each frame, so its lifetime never outlives the window handles.
pub struct RoadliteWindowBackend {
    instance: wgpu::Instance,
    plugin: RoadlitePlugin,
}

impl RoadliteWindowBackend {
    /// Create a window-capable backend from a window (e.g. winit). The window is only used
    /// to get raw handles and to create an initial surface for adapter selection.
    /// The host must keep the window alive; each frame pass its raw handles to
    /// `render_frame_to_window`.
    pub fn from_window(
        window: &(impl HasWindowHandle + HasDisplayHandle),
        hud: HudConfig,
    ) -> Result<Box<dyn HudBackendWindow>, BackendError> {
        let (raw_window, raw_display) = {
            let wh = window.window_handle().map_err(|e| BackendError::Init(e.to_string()))?;
            let dh = window.display_handle().map_err(|e| BackendError::Init(e.to_string()))?;
            (wh.as_raw(), dh.as_raw())
        };
        let backend = pollster::block_on(Self::from_raw_handles_async(raw_window, raw_display, hud))?;
        Ok(Box::new(backend))
    }

    async fn from_raw_handles_async(
        raw_window_handle: raw_window_handle::RawWindowHandle,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        hud: HudConfig,
    ) -> Result<Self, BackendError> {
        let instance = wgpu::Instance::default();
        let target = SurfaceTargetUnsafe::RawHandle {
            raw_window_handle,
            raw_display_handle,
        };
        let surface = unsafe {
            instance
                .create_surface_unsafe(target)
                .map_err(|e| BackendError::Surface(e.to_string()))?
        };
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| BackendError::Init("no adapter".to_string()))?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await
            .map_err(|e| BackendError::Init(e.to_string()))?;
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .first()
            .copied()
            .unwrap_or(wgpu::TextureFormat::Rgba8Unorm);
        log::info!("adapter {} / swapchain format {:?}", adapter.get_info().name, format);
        let config = RoadliteConfig { hud, swapchain_format: format };
        let plugin = RoadlitePlugin::new_with_config(device, queue, config)?;
        drop(surface);
        Ok(Self { instance, plugin })
    }

    fn surface_config(format: wgpu::TextureFormat, width: u32, height: u32) -> wgpu::SurfaceConfiguration {
        // Render views are always non-sRGB so overlay blending matches the GL canvas.
        let view_format = format.remove_srgb_suffix();
        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Opaque,
            view_formats: if view_format == format { vec![] } else { vec![view_format] },
            desired_maximum_frame_latency: 2,
        }
    }

    pub fn plugin(&self) -> &RoadlitePlugin {
        &self.plugin
    }
}

impl HudBackend for RoadliteWindowBackend {
    fn render_frame(&mut self, input: &FrameInput<'_>) -> Result<(), BackendError> {
        self.plugin.render_frame(input)
    }
}

impl HudBackendWindow for RoadliteWindowBackend {
    fn render_frame_to_window(
        &mut self,
        input: &FrameInput<'_>,
        raw_window_handle: raw_window_handle::RawWindowHandle,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
    ) -> Result<(), BackendError> {
        let (width, height) = input.viewport_size;
        if width == 0 || height == 0 {
            log::debug!("skipping frame for zero-sized window");
            return Ok(());
        }
        let target = SurfaceTargetUnsafe::RawHandle {
            raw_window_handle,
            raw_display_handle,
        };
        let surface = unsafe {
            self.instance
                .create_surface_unsafe(target)
                .map_err(|e| BackendError::Surface(e.to_string()))?
        };
        let swapchain_format = self.plugin.renderer().config().swapchain_format;
        let config = Self::surface_config(swapchain_format, width, height);
        surface.configure(self.plugin.device(), &config);

        let frame = match surface.get_current_texture() {
            Ok(f) => f,
            Err(e @ (wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost)) => {
                log::warn!("surface {}; reconfiguring", e);
                surface.configure(self.plugin.device(), &config);
                surface
                    .get_current_texture()
                    .map_err(|e| BackendError::Surface(e.to_string()))?
            }
            Err(wgpu::SurfaceError::Timeout) => {
                return Err(BackendError::Surface("get_current_texture timeout".to_string()))
            }
            Err(e) => return Err(BackendError::Surface(e.to_string())),
        };
        let viewport = frame.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(self.plugin.renderer().target_format()),
            ..Default::default()
        });
        self.plugin.render_frame_to_swapchain(input, &viewport)?;
        frame.present();
        Ok(())
    }
}
