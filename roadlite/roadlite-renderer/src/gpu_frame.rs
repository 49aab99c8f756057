//! GPU `FrameSink`: records the compositor's passes into one encoder and submits on present.

use crate::canvas::{Color, DrawList};
use crate::compositor::{FrameSink, VideoDraw};
use crate::error::{Result, RoadliteError};
use crate::overlay_pass::OverlayPass;
use crate::resources::{Resources, VideoTexture};
use crate::video_pass::VideoPass;

pub struct GpuFrame<'a> {
    pub(crate) device: &'a wgpu::Device,
    pub(crate) queue: &'a wgpu::Queue,
    pub(crate) encoder: Option<wgpu::CommandEncoder>,
    pub(crate) output_view: &'a wgpu::TextureView,
    pub(crate) stencil_view: wgpu::TextureView,
    pub(crate) fb_size: (u32, u32),
    pub(crate) resources: &'a Resources,
    pub(crate) video_pass: &'a VideoPass,
    pub(crate) video_texture: Option<&'a VideoTexture>,
    pub(crate) overlay_pass: &'a mut OverlayPass,
}

/// The frame's encoder, or an error once it has been submitted.
fn recording<T>(encoder: &mut Option<T>) -> Result<&mut T> {
    encoder.as_mut().ok_or(RoadliteError::FrameSubmitted)
}

impl FrameSink for GpuFrame<'_> {
    fn clear(&mut self, color: Color) -> Result<()> {
        let encoder = recording(&mut self.encoder)?;
        let rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("background_clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.output_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: color.r as f64,
                        g: color.g as f64,
                        b: color.b as f64,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.stencil_view,
                depth_ops: None,
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        drop(rp);
        Ok(())
    }

    fn draw_video(&mut self, draw: &VideoDraw) -> Result<()> {
        let encoder = recording(&mut self.encoder)?;
        let Some(video) = self.video_texture else {
            log::trace!("video pass skipped: no frame uploaded yet");
            return Ok(());
        };
        self.video_pass.encode(encoder, self.device, self.queue, self.resources, video, self.output_view, self.fb_size, draw)
    }

    fn draw_overlay(&mut self, list: &DrawList) -> Result<()> {
        let encoder = recording(&mut self.encoder)?;
        self.overlay_pass.encode(
            encoder,
            self.device,
            self.queue,
            self.resources,
            self.output_view,
            &self.stencil_view,
            list,
        )
    }

    fn present(&mut self) -> Result<()> {
        let encoder = self.encoder.take().ok_or(RoadliteError::FrameSubmitted)?;
        self.queue.submit([encoder.finish()]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_fails_after_submit() {
        let mut encoder = Some(7u32);
        assert_eq!(recording(&mut encoder).copied().ok(), Some(7));
        encoder.take();
        assert!(matches!(recording(&mut encoder), Err(RoadliteError::FrameSubmitted)));
    }
}
