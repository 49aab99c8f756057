//! Roadlite Renderer: wgpu camera video pass + stencil/cover vector overlay + HUD.

pub mod canvas;
pub mod compositor;
pub mod config;
pub mod error;
pub mod gpu_frame;
pub mod hud;
pub mod overlay_pass;
pub mod readback;
pub mod resources;
pub mod transform;
pub mod video_pass;
pub mod world;

pub use canvas::{Canvas, Color, DrawCmd, DrawList, Paint, TextAlign};
pub use compositor::{Compositor, FramePhase, FrameSink, FrameStats, RenderContext, VideoDraw};
pub use config::{AssetPaths, CameraConfig, CameraIntrinsics, HudConfig, LayoutConfig, RoadliteConfig};
pub use error::{Result, RoadliteError};
pub use gpu_frame::GpuFrame;
pub use hud::{Hud, SystemStatus};
pub use overlay_pass::OverlayPass;
pub use readback::read_texture_rgba;
pub use resources::{FontId, FrameResources, ImageId, Resources, VideoTexture};
pub use transform::{line_polygon, Rect, TransformEngine, ViewTransform};
pub use video_pass::VideoPass;

use hud_api::{Snapshot, VideoFrame};

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: RoadliteConfig,
    transform: TransformEngine,
    compositor: Compositor,
    resources: Resources,
    video_pass: VideoPass,
    overlay_pass: OverlayPass,
    frame_resources: Option<FrameResources>,
    video_texture: Option<VideoTexture>,
}

impl Renderer {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Result<Self> {
        Self::new_with_config(device, queue, RoadliteConfig::default())
    }

    /// Loads fonts and images from `config.hud.assets` and builds both pipelines.
    pub fn new_with_config(device: wgpu::Device, queue: wgpu::Queue, config: RoadliteConfig) -> Result<Self> {
        let target_format = config.swapchain_format.remove_srgb_suffix();
        let resources = Resources::load(&device, &queue, &config.hud.assets)?;
        let video_pass = VideoPass::new(&device, target_format)?;
        let overlay_pass = OverlayPass::new(&device, target_format, &resources)?;
        let transform = TransformEngine::new(
            config.hud.camera.clone(),
            config.hud.layout.clone(),
            config.hud.device_transform,
        );
        let compositor = Compositor::from_config(&config.hud);
        log::info!("roadlite renderer ready (target format {:?})", target_format);
        Ok(Self {
            device,
            queue,
            config,
            transform,
            compositor,
            resources,
            video_pass,
            overlay_pass,
            frame_resources: None,
            video_texture: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device { &self.device }
    pub fn queue(&self) -> &wgpu::Queue { &self.queue }
    pub fn config(&self) -> &RoadliteConfig { &self.config }
    pub fn transform(&self) -> &TransformEngine { &self.transform }
    pub fn compositor(&self) -> &Compositor { &self.compositor }

    /// Format pipelines render in. Blending happens on non-sRGB values.
    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.config.swapchain_format.remove_srgb_suffix()
    }

    pub fn ensure_frame_resources(&mut self, width: u32, height: u32) -> Result<()> {
        let existing = self.frame_resources.take();
        let new_res = FrameResources::ensure_size(&self.device, existing, width, height)?;
        self.frame_resources = Some(new_res);
        Ok(())
    }

    /// Upload the newest camera frame. The texture is reallocated only on size change.
    pub fn upload_video(&mut self, frame: &VideoFrame) -> Result<()> {
        if !frame.is_well_formed() {
            return Err(RoadliteError::MalformedVideoFrame {
                width: frame.width,
                height: frame.height,
                len: frame.pixels.len(),
            });
        }
        let existing = self.video_texture.take();
        let texture = VideoTexture::ensure_size(&self.device, existing, frame.width, frame.height)?;
        texture.upload(&self.queue, &frame.to_rgba8());
        self.video_texture = Some(texture);
        Ok(())
    }

    /// Render one frame into `output_view` (a view in `target_format`) and submit it.
    pub fn render_to_view(
        &mut self,
        snapshot: &Snapshot,
        video_connected: bool,
        output_view: &wgpu::TextureView,
        width: u32,
        height: u32,
    ) -> Result<FrameStats> {
        self.ensure_frame_resources(width, height)?;
        let view = self.transform.update(width, height, snapshot.ui.wide_camera);
        let ctx = RenderContext { snapshot, view: &view, video_connected };
        let stencil_view = match self.frame_resources.as_ref() {
            Some(frame) => frame.stencil_view(),
            None => return Err(RoadliteError::InvalidSize { width, height }),
        };
        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("roadlite_frame"),
        });
        let mut sink = GpuFrame {
            device: &self.device,
            queue: &self.queue,
            encoder: Some(encoder),
            output_view,
            stencil_view,
            fb_size: (width, height),
            resources: &self.resources,
            video_pass: &self.video_pass,
            video_texture: self.video_texture.as_ref(),
            overlay_pass: &mut self.overlay_pass,
        };
        let stats = self.compositor.compose(&ctx, &mut sink)?;
        log::trace!("frame {}x{}: {:?}", width, height, stats);
        Ok(stats)
    }
}
