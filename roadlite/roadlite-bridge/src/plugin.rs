//! Roadlite plugin: implements HudBackend for the host.

use hud_api::{BackendError, FrameInput, HudBackend};
use roadlite_renderer::{read_texture_rgba, FrameStats, Renderer, RoadliteConfig, RoadliteError};

/// Offscreen color target used when no swapchain view is supplied.
struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl OffscreenTarget {
    fn ensure_size(device: &wgpu::Device, existing: Option<Self>, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        if let Some(t) = existing {
            if t.texture.width() == width && t.texture.height() == height {
                return t;
            }
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("roadlite_offscreen"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        Self { texture, view }
    }
}

/// Roadlite plugin: owns the renderer (and with it the wgpu device/queue); implements HudBackend.
pub struct RoadlitePlugin {
    renderer: Renderer,
    offscreen: Option<OffscreenTarget>,
    last_stats: Option<FrameStats>,
}

impl RoadlitePlugin {
    /// Create with wgpu device and queue (default config).
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Result<Self, BackendError> {
        Self::new_with_config(device, queue, RoadliteConfig::default())
    }

    pub fn new_with_config(device: wgpu::Device, queue: wgpu::Queue, config: RoadliteConfig) -> Result<Self, BackendError> {
        let renderer = Renderer::new_with_config(device, queue, config)?;
        Ok(Self { renderer, offscreen: None, last_stats: None })
    }

    /// Create without a window: picks any adapter and renders offscreen only.
    pub fn new_headless(config: RoadliteConfig) -> Result<Self, BackendError> {
        let (device, queue) = pollster::block_on(async {
            let instance = wgpu::Instance::default();
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .ok_or_else(|| BackendError::Init("no adapter".to_string()))?;
            log::info!("headless adapter: {}", adapter.get_info().name);
            adapter
                .request_device(&wgpu::DeviceDescriptor::default(), None)
                .await
                .map_err(|e| BackendError::Init(e.to_string()))
        })?;
        Self::new_with_config(device, queue, config)
    }

    /// Access device/queue if the host needs them (e.g. for swapchain).
    pub fn device(&self) -> &wgpu::Device {
        self.renderer.device()
    }
    pub fn queue(&self) -> &wgpu::Queue {
        self.renderer.queue()
    }
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Summary of the last successfully composed frame.
    pub fn last_stats(&self) -> Option<FrameStats> {
        self.last_stats
    }

    /// Render one frame into `swapchain_view` (a view in the renderer's target format).
    pub fn render_frame_to_swapchain(
        &mut self,
        input: &FrameInput<'_>,
        swapchain_view: &wgpu::TextureView,
    ) -> Result<(), BackendError> {
        self.render_frame_impl(input, Some(swapchain_view))
    }

    /// Copy the offscreen target of the last `render_frame` to the CPU.
    pub fn read_offscreen(&self) -> Result<image::RgbaImage, BackendError> {
        let target = self
            .offscreen
            .as_ref()
            .ok_or_else(|| BackendError::Render("no offscreen frame rendered yet".to_string()))?;
        Ok(read_texture_rgba(self.renderer.device(), self.renderer.queue(), &target.texture)?)
    }

    fn render_frame_impl(
        &mut self,
        input: &FrameInput<'_>,
        swapchain_view: Option<&wgpu::TextureView>,
    ) -> Result<(), BackendError> {
        if let Some(frame) = input.video {
            match self.renderer.upload_video(frame) {
                Ok(()) => {}
                Err(e @ RoadliteError::MalformedVideoFrame { .. }) => log::warn!("dropping camera frame: {}", e),
                Err(e) => return Err(e.into()),
            }
        }
        let (width, height) = input.viewport_size;

        #[cfg(debug_assertions)]
        self.renderer.device().push_error_scope(wgpu::ErrorFilter::Validation);

        let stats = match swapchain_view {
            Some(view) => self.renderer.render_to_view(input.snapshot, input.video_connected, view, width, height),
            None => {
                let format = self.renderer.target_format();
                let target = OffscreenTarget::ensure_size(self.renderer.device(), self.offscreen.take(), format, width.max(1), height.max(1));
                let result = self.renderer.render_to_view(input.snapshot, input.video_connected, &target.view, width, height);
                self.offscreen = Some(target);
                result
            }
        };

        #[cfg(debug_assertions)]
        if let Some(err) = pollster::block_on(self.renderer.device().pop_error_scope()) {
            log::error!("wgpu validation error: {}", err);
        }

        self.last_stats = Some(stats?);
        Ok(())
    }
}

impl HudBackend for RoadlitePlugin {
    fn render_frame(&mut self, input: &FrameInput<'_>) -> Result<(), BackendError> {
        self.render_frame_impl(input, None)
    }
}
