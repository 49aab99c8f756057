//! Resource manager: fonts, icons, the 1x1 white fill texture and the static frame quad.
//! Every handle is a closed enum, so a lookup can never miss.

pub mod font;
pub mod frame;

use std::path::Path;

use bytemuck::{Pod, Zeroable};

use crate::config::AssetPaths;
use crate::error::{Result, RoadliteError};

pub use font::{FontAtlas, GlyphQuad, ATLAS_PX};
pub use frame::{FrameResources, VideoTexture, STENCIL_FORMAT};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FontId {
    SansRegular,
    SansSemibold,
    SansBold,
}

impl FontId {
    pub const ALL: [FontId; 3] = [FontId::SansRegular, FontId::SansSemibold, FontId::SansBold];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageId {
    Wheel,
    DriverFace,
    Brake,
    AutoholdActive,
    TurnSign,
}

impl ImageId {
    pub const ALL: [ImageId; 5] =
        [ImageId::Wheel, ImageId::DriverFace, ImageId::Brake, ImageId::AutoholdActive, ImageId::TurnSign];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Texture a draw samples from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKey {
    White,
    Font(FontId),
    Image(ImageId),
}

pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: (u32, u32),
}

fn upload_rgba(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, width: u32, height: u32, rgba: &[u8]) -> GpuTexture {
    let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::ImageDataLayout { offset: 0, bytes_per_row: Some(4 * width), rows_per_image: Some(height) },
        size,
    );
    let view = texture.create_view(&Default::default());
    GpuTexture { texture, view, size: (width, height) }
}

fn load_image(device: &wgpu::Device, queue: &wgpu::Queue, path: &Path) -> Result<GpuTexture> {
    let img = image::open(path)
        .map_err(|source| RoadliteError::Image { path: path.to_path_buf(), source })?
        .to_rgba8();
    let (w, h) = img.dimensions();
    let label = path.file_name().and_then(|n| n.to_str()).unwrap_or("image");
    Ok(upload_rgba(device, queue, label, w, h, img.as_raw()))
}

/// Video quad vertex: position in quad space, uv in frame space.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct QuadVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

/// Full quad with v flipped so the first frame row lands on top.
pub const FRAME_QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { pos: [-1.0, -1.0], uv: [0.0, 1.0] },
    QuadVertex { pos: [-1.0, 1.0], uv: [0.0, 0.0] },
    QuadVertex { pos: [1.0, 1.0], uv: [1.0, 0.0] },
    QuadVertex { pos: [1.0, -1.0], uv: [1.0, 1.0] },
];
pub const FRAME_QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

pub struct FrameQuad {
    pub vertex_buf: wgpu::Buffer,
    pub index_buf: wgpu::Buffer,
    pub index_count: u32,
}

impl FrameQuad {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let vertex_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_quad_vertices"),
            size: std::mem::size_of_val(&FRAME_QUAD_VERTICES) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&vertex_buf, 0, bytemuck::cast_slice(&FRAME_QUAD_VERTICES));
        // Index buffer writes must be 4-byte aligned; pad to 8 bytes.
        let mut indices = [0u16; 8];
        indices[..6].copy_from_slice(&FRAME_QUAD_INDICES);
        let index_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_quad_indices"),
            size: std::mem::size_of_val(&indices) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&index_buf, 0, bytemuck::cast_slice(&indices));
        Self { vertex_buf, index_buf, index_count: FRAME_QUAD_INDICES.len() as u32 }
    }
}

pub struct Resources {
    fonts: Vec<(FontAtlas, GpuTexture)>,
    images: Vec<GpuTexture>,
    white: GpuTexture,
    pub sampler: wgpu::Sampler,
    pub frame_quad: FrameQuad,
}

impl Resources {
    /// Load every font and image. Any missing or undecodable asset fails the whole load.
    pub fn load(device: &wgpu::Device, queue: &wgpu::Queue, assets: &AssetPaths) -> Result<Self> {
        let mut fonts = Vec::with_capacity(FontId::ALL.len());
        for id in FontId::ALL {
            let path = assets.font(id);
            let atlas = FontAtlas::load(path)?;
            let (w, h) = atlas.size();
            let texture = upload_rgba(device, queue, "font_atlas", w, h, atlas.pixels());
            log::info!("loaded font {:?} from {}", id, path.display());
            fonts.push((atlas, texture));
        }
        let mut images = Vec::with_capacity(ImageId::ALL.len());
        for id in ImageId::ALL {
            let path = assets.image(id);
            let texture = load_image(device, queue, path)?;
            log::info!("loaded image {:?} ({}x{}) from {}", id, texture.size.0, texture.size.1, path.display());
            images.push(texture);
        }
        let white = upload_rgba(device, queue, "white", 1, 1, &[255, 255, 255, 255]);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("roadlite_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let frame_quad = FrameQuad::new(device, queue);
        Ok(Self { fonts, images, white, sampler, frame_quad })
    }

    pub fn font(&self, id: FontId) -> &FontAtlas {
        &self.fonts[id.index()].0
    }

    pub fn image(&self, id: ImageId) -> &GpuTexture {
        &self.images[id.index()]
    }

    pub fn texture(&self, key: TextureKey) -> &GpuTexture {
        match key {
            TextureKey::White => &self.white,
            TextureKey::Font(id) => &self.fonts[id.index()].1,
            TextureKey::Image(id) => self.image(id),
        }
    }
}
