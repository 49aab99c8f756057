//! Per-size frame resources: the stencil target used by path fills and the camera texture.

use wgpu::TextureView;

use crate::error::{Result, RoadliteError};

pub const STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Stencil8;

/// Stencil buffer matching the framebuffer size.
pub struct FrameResources {
    pub stencil: wgpu::Texture,
    width: u32,
    height: u32,
}

impl FrameResources {
    pub fn ensure_size(device: &wgpu::Device, existing: Option<Self>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RoadliteError::InvalidSize { width, height });
        }
        if let Some(r) = existing {
            if r.width == width && r.height == height {
                return Ok(r);
            }
        }
        let stencil = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("overlay_stencil"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: STENCIL_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Ok(Self { stencil, width, height })
    }
    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn stencil_view(&self) -> TextureView { self.stencil.create_view(&Default::default()) }
}

/// Camera frame texture. Reallocated only when the incoming frame size changes.
pub struct VideoTexture {
    pub texture: wgpu::Texture,
    pub view: TextureView,
    width: u32,
    height: u32,
}

impl VideoTexture {
    pub fn ensure_size(device: &wgpu::Device, existing: Option<Self>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RoadliteError::InvalidSize { width, height });
        }
        if let Some(t) = existing {
            if t.width == width && t.height == height {
                return Ok(t);
            }
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("video_frame"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        Ok(Self { texture, view, width, height })
    }

    /// Push RGBA8 pixels into the texture.
    pub fn upload(&self, queue: &wgpu::Queue, rgba: &[u8]) {
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.width),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d { width: self.width, height: self.height, depth_or_array_layers: 1 },
        );
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
}
