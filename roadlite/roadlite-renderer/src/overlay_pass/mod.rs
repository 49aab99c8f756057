//! Overlay pass: alpha-blended vector fills, icons and text over the whole framebuffer.

pub mod tessellate;

use std::collections::HashMap;

use wgpu::CommandEncoder;

use crate::canvas::DrawList;
use crate::error::Result;
use crate::resources::{FontId, ImageId, Resources, TextureKey, STENCIL_FORMAT};

pub use tessellate::{Draw, DrawKind, OverlayVertex, Tessellation, TextLayout};

const OVERLAY_SHADER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/overlay.wgsl"));

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 5] = [
    wgpu::VertexAttribute { offset: 0, shader_location: 0, format: wgpu::VertexFormat::Float32x2 },
    wgpu::VertexAttribute { offset: 8, shader_location: 1, format: wgpu::VertexFormat::Float32x2 },
    wgpu::VertexAttribute { offset: 16, shader_location: 2, format: wgpu::VertexFormat::Float32x4 },
    wgpu::VertexAttribute { offset: 32, shader_location: 3, format: wgpu::VertexFormat::Float32x4 },
    wgpu::VertexAttribute { offset: 48, shader_location: 4, format: wgpu::VertexFormat::Float32x4 },
];

fn stencil_face(compare: wgpu::CompareFunction, pass_op: wgpu::StencilOperation) -> wgpu::StencilFaceState {
    wgpu::StencilFaceState {
        compare,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op,
    }
}

struct PipelineSpec<'a> {
    label: &'a str,
    blend: Option<wgpu::BlendState>,
    write_mask: wgpu::ColorWrites,
    stencil: wgpu::StencilFaceState,
    stencil_write_mask: u32,
}

pub struct OverlayPass {
    stencil_pipeline: wgpu::RenderPipeline,
    cover_pipeline: wgpu::RenderPipeline,
    quad_pipeline: wgpu::RenderPipeline,
    viewport_buf: wgpu::Buffer,
    viewport_bind_group: wgpu::BindGroup,
    texture_bind_groups: HashMap<TextureKey, wgpu::BindGroup>,
    vertex_buf: Option<wgpu::Buffer>,
}

impl OverlayPass {
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat, resources: &Resources) -> Result<Self> {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("overlay_shader"),
            source: wgpu::ShaderSource::Wgsl(OVERLAY_SHADER.into()),
        });
        let viewport_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("overlay_viewport_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(16),
                },
                count: None,
            }],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("overlay_texture_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("overlay_pipeline_layout"),
            bind_group_layouts: &[&viewport_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |spec: PipelineSpec<'_>| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(spec.label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<OverlayVertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &VERTEX_ATTRIBUTES,
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: output_format,
                        blend: spec.blend,
                        write_mask: spec.write_mask,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: STENCIL_FORMAT,
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::Always,
                    stencil: wgpu::StencilState {
                        front: spec.stencil,
                        back: spec.stencil,
                        read_mask: 0xff,
                        write_mask: spec.stencil_write_mask,
                    },
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };
        let stencil_pipeline = make_pipeline(PipelineSpec {
            label: "overlay_stencil_pipeline",
            blend: None,
            write_mask: wgpu::ColorWrites::empty(),
            stencil: stencil_face(wgpu::CompareFunction::Always, wgpu::StencilOperation::Invert),
            stencil_write_mask: 0xff,
        });
        // Covers pixels with a non-zero stencil and zeroes them for the next path.
        let cover_pipeline = make_pipeline(PipelineSpec {
            label: "overlay_cover_pipeline",
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            write_mask: wgpu::ColorWrites::ALL,
            stencil: stencil_face(wgpu::CompareFunction::NotEqual, wgpu::StencilOperation::Zero),
            stencil_write_mask: 0xff,
        });
        let quad_pipeline = make_pipeline(PipelineSpec {
            label: "overlay_quad_pipeline",
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            write_mask: wgpu::ColorWrites::ALL,
            stencil: stencil_face(wgpu::CompareFunction::Always, wgpu::StencilOperation::Keep),
            stencil_write_mask: 0,
        });

        let viewport_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("overlay_viewport"),
            size: 16,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let viewport_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("overlay_viewport_bind_group"),
            layout: &viewport_layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: viewport_buf.as_entire_binding() }],
        });

        let keys = std::iter::once(TextureKey::White)
            .chain(FontId::ALL.map(TextureKey::Font))
            .chain(ImageId::ALL.map(TextureKey::Image));
        let texture_bind_groups: HashMap<_, _> = keys
            .map(|key| {
                let bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("overlay_texture_bind_group"),
                    layout: &texture_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&resources.texture(key).view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&resources.sampler),
                        },
                    ],
                });
                (key, bg)
            })
            .collect();

        Ok(Self {
            stencil_pipeline,
            cover_pipeline,
            quad_pipeline,
            viewport_buf,
            viewport_bind_group,
            texture_bind_groups,
            vertex_buf: None,
        })
    }

    fn ensure_vertex_capacity(&mut self, device: &wgpu::Device, bytes: u64) {
        if self.vertex_buf.as_ref().is_some_and(|b| b.size() >= bytes) {
            return;
        }
        let size = bytes.next_power_of_two();
        log::debug!("overlay vertex buffer grown to {} bytes", size);
        self.vertex_buf = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("overlay_vertices"),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
    }

    /// Tessellate `list` and draw it over `output_view`. Scissor state lives only inside this pass.
    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        &mut self,
        encoder: &mut CommandEncoder,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        resources: &Resources,
        output_view: &wgpu::TextureView,
        stencil_view: &wgpu::TextureView,
        list: &DrawList,
    ) -> Result<()> {
        let tess = Tessellation::build(list, resources);
        if tess.draws.is_empty() {
            return Ok(());
        }
        let (fb_w, fb_h) = list.fb_size;
        queue.write_buffer(&self.viewport_buf, 0, bytemuck::cast_slice(&[fb_w as f32, fb_h as f32, 0.0, 0.0]));
        let bytes: &[u8] = bytemuck::cast_slice(&tess.vertices);
        self.ensure_vertex_capacity(device, bytes.len() as u64);
        let Some(vertex_buf) = &self.vertex_buf else { return Ok(()) };
        queue.write_buffer(vertex_buf, 0, bytes);

        let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("overlay_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: stencil_view,
                depth_ops: None,
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rp.set_viewport(0.0, 0.0, fb_w as f32, fb_h as f32, 0.0, 1.0);
        rp.set_bind_group(0, &self.viewport_bind_group, &[]);
        rp.set_vertex_buffer(0, vertex_buf.slice(..));
        rp.set_stencil_reference(0);
        for draw in &tess.draws {
            let [x, y, w, h] = draw.scissor.unwrap_or([0, 0, fb_w, fb_h]);
            rp.set_scissor_rect(x, y, w, h);
            match &draw.kind {
                DrawKind::Fill { stencil, cover } => {
                    let Some(white) = self.texture_bind_groups.get(&TextureKey::White) else { continue };
                    rp.set_bind_group(1, white, &[]);
                    rp.set_pipeline(&self.stencil_pipeline);
                    rp.draw(stencil.clone(), 0..1);
                    rp.set_pipeline(&self.cover_pipeline);
                    rp.draw(cover.clone(), 0..1);
                }
                DrawKind::Quads { texture, vertices } => {
                    let Some(bg) = self.texture_bind_groups.get(texture) else { continue };
                    rp.set_bind_group(1, bg, &[]);
                    rp.set_pipeline(&self.quad_pipeline);
                    rp.draw(vertices.clone(), 0..1);
                }
            }
        }
        drop(rp);
        Ok(())
    }
}
