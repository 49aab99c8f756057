//! Frame compositor: orders background clear, video pass, overlay pass and present.
//!
//! The compositor only decides *what* happens in which order; a `FrameSink` does the GPU
//! work (`GpuFrame` in the renderer, a recording sink in tests).

use glam::Mat4;
use hud_api::Snapshot;

use crate::canvas::{Canvas, Color, DrawList};
use crate::config::HudConfig;
use crate::error::{Result, RoadliteError};
use crate::hud::{Hud, SystemStatus};
use crate::transform::{Rect, ViewTransform};
use crate::world::draw_world;

/// Where a frame is in its pass sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    BackgroundClear,
    VideoPass,
    OverlayBegin,
    OverlayContent,
    OverlayEnd,
    Present,
}

impl FramePhase {
    /// `Idle -> BackgroundClear -> VideoPass? -> OverlayBegin -> OverlayContent? -> OverlayEnd -> Present -> Idle`
    pub fn can_advance_to(self, next: FramePhase) -> bool {
        use FramePhase::*;
        matches!(
            (self, next),
            (Idle, BackgroundClear)
                | (BackgroundClear, VideoPass)
                | (BackgroundClear, OverlayBegin)
                | (VideoPass, OverlayBegin)
                | (OverlayBegin, OverlayContent)
                | (OverlayBegin, OverlayEnd)
                | (OverlayContent, OverlayEnd)
                | (OverlayEnd, Present)
                | (Present, Idle)
        )
    }
}

/// Inputs of one frame. Built fresh each frame; nothing here outlives it.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext<'a> {
    pub snapshot: &'a Snapshot,
    pub view: &'a ViewTransform,
    pub video_connected: bool,
}

impl RenderContext<'_> {
    /// Video and overlay are drawn only while started with a connected camera.
    pub fn draw_vision(&self) -> bool {
        self.video_connected && self.snapshot.ui.started
    }
}

/// Video pass parameters. Viewport and scissor apply to this pass only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoDraw {
    pub viewport: Rect,
    pub scissor: Rect,
    pub matrix: Mat4,
}

/// Receives the passes of one frame in order.
pub trait FrameSink {
    /// Fill color and clear stencil.
    fn clear(&mut self, color: Color) -> Result<()>;
    fn draw_video(&mut self, draw: &VideoDraw) -> Result<()>;
    /// Alpha-blended overlay over the whole framebuffer.
    fn draw_overlay(&mut self, list: &DrawList) -> Result<()>;
    fn present(&mut self) -> Result<()>;
}

/// What one composed frame contained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameStats {
    pub status: SystemStatus,
    pub video_drawn: bool,
    pub overlay_cmds: usize,
}

pub struct Compositor {
    hud: Hud,
    phase: FramePhase,
}

impl Compositor {
    pub fn new(hud: Hud) -> Self {
        Self { hud, phase: FramePhase::Idle }
    }

    pub fn from_config(config: &HudConfig) -> Self {
        Self::new(Hud::from_config(config))
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Move to `next`, rejecting out-of-order transitions.
    pub fn advance(&mut self, next: FramePhase) -> Result<()> {
        if !self.phase.can_advance_to(next) {
            return Err(RoadliteError::PhaseOrder { from: self.phase, to: next });
        }
        self.phase = next;
        Ok(())
    }

    /// World overlay followed by the HUD. Empty when vision is not drawn.
    pub fn build_overlay(&self, ctx: &RenderContext<'_>) -> DrawList {
        let mut canvas = Canvas::new(ctx.view.fb_size);
        if ctx.draw_vision() {
            draw_world(&mut canvas, ctx);
            self.hud.draw(&mut canvas, ctx);
        }
        canvas.finish()
    }

    /// Run one frame through `sink`. A failed frame leaves the compositor idle.
    pub fn compose<S: FrameSink + ?Sized>(&mut self, ctx: &RenderContext<'_>, sink: &mut S) -> Result<FrameStats> {
        let result = self.run(ctx, sink);
        if result.is_err() {
            self.phase = FramePhase::Idle;
        }
        result
    }

    fn run<S: FrameSink + ?Sized>(&mut self, ctx: &RenderContext<'_>, sink: &mut S) -> Result<FrameStats> {
        let status = SystemStatus::from_controls(&ctx.snapshot.controls_state);
        self.advance(FramePhase::BackgroundClear)?;
        sink.clear(status.background())?;

        let draw_vision = ctx.draw_vision();
        if draw_vision {
            self.advance(FramePhase::VideoPass)?;
            sink.draw_video(&VideoDraw {
                viewport: ctx.view.video_rect,
                scissor: ctx.view.viz_rect,
                matrix: ctx.view.frame_matrix,
            })?;
        }

        self.advance(FramePhase::OverlayBegin)?;
        let overlay = self.build_overlay(ctx);
        if !overlay.is_empty() {
            self.advance(FramePhase::OverlayContent)?;
            sink.draw_overlay(&overlay)?;
        }
        self.advance(FramePhase::OverlayEnd)?;

        self.advance(FramePhase::Present)?;
        sink.present()?;
        self.advance(FramePhase::Idle)?;

        Ok(FrameStats { status, video_drawn: draw_vision, overlay_cmds: overlay.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraConfig, LayoutConfig};
    use crate::transform::TransformEngine;
    use hud_api::{ControlsState, TopicUpdate, UiState};

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        fail_overlay: bool,
    }

    impl FrameSink for Recorder {
        fn clear(&mut self, _color: Color) -> Result<()> {
            self.calls.push("clear");
            Ok(())
        }
        fn draw_video(&mut self, _draw: &VideoDraw) -> Result<()> {
            self.calls.push("video");
            Ok(())
        }
        fn draw_overlay(&mut self, _list: &DrawList) -> Result<()> {
            if self.fail_overlay {
                return Err(RoadliteError::Readback("overlay".into()));
            }
            self.calls.push("overlay");
            Ok(())
        }
        fn present(&mut self) -> Result<()> {
            self.calls.push("present");
            Ok(())
        }
    }

    fn view() -> ViewTransform {
        let mut e = TransformEngine::new(CameraConfig::default(), LayoutConfig::default(), HudConfig::default().device_transform);
        e.update(2160, 1080, false)
    }

    fn started() -> Snapshot {
        Snapshot::default().with(TopicUpdate::Ui(UiState { started: true, ..Default::default() }))
    }

    #[test]
    fn phase_transitions() {
        use FramePhase::*;
        assert!(Idle.can_advance_to(BackgroundClear));
        assert!(BackgroundClear.can_advance_to(OverlayBegin));
        assert!(OverlayBegin.can_advance_to(OverlayEnd));
        assert!(!Idle.can_advance_to(Present));
        assert!(!VideoPass.can_advance_to(Present));
        assert!(!OverlayEnd.can_advance_to(OverlayContent));
    }

    #[test]
    fn out_of_order_advance_is_an_error() {
        let mut c = Compositor::new(Hud::default());
        let err = c.advance(FramePhase::Present).unwrap_err();
        assert!(matches!(err, RoadliteError::PhaseOrder { from: FramePhase::Idle, to: FramePhase::Present }));
        assert_eq!(c.phase(), FramePhase::Idle);
    }

    #[test]
    fn connected_and_started_draws_everything() {
        let snap = started();
        let view = view();
        let ctx = RenderContext { snapshot: &snap, view: &view, video_connected: true };
        let mut c = Compositor::new(Hud::default());
        let mut sink = Recorder::default();
        let stats = c.compose(&ctx, &mut sink).unwrap();
        assert_eq!(sink.calls, ["clear", "video", "overlay", "present"]);
        assert!(stats.video_drawn);
        assert!(stats.overlay_cmds > 0);
        assert_eq!(c.phase(), FramePhase::Idle);
    }

    #[test]
    fn disconnected_video_is_background_only() {
        let snap = started();
        let view = view();
        let ctx = RenderContext { snapshot: &snap, view: &view, video_connected: false };
        let mut c = Compositor::new(Hud::default());
        let mut sink = Recorder::default();
        let stats = c.compose(&ctx, &mut sink).unwrap();
        assert_eq!(sink.calls, ["clear", "present"]);
        assert_eq!(stats.overlay_cmds, 0);
    }

    #[test]
    fn background_follows_system_status() {
        let snap = Snapshot::default().with(TopicUpdate::ControlsState(ControlsState { enabled: true, ..Default::default() }));
        let view = view();
        let ctx = RenderContext { snapshot: &snap, view: &view, video_connected: false };
        let mut c = Compositor::new(Hud::default());
        let stats = c.compose(&ctx, &mut Recorder::default()).unwrap();
        assert_eq!(stats.status, SystemStatus::Engaged);
    }

    #[test]
    fn failed_frame_resets_to_idle() {
        let snap = started();
        let view = view();
        let ctx = RenderContext { snapshot: &snap, view: &view, video_connected: true };
        let mut c = Compositor::new(Hud::default());
        let mut sink = Recorder { fail_overlay: true, ..Default::default() };
        assert!(c.compose(&ctx, &mut sink).is_err());
        assert_eq!(c.phase(), FramePhase::Idle);
        sink.fail_overlay = false;
        assert!(c.compose(&ctx, &mut sink).is_ok());
    }
}
