//! Whole-frame scenarios driven through the compositor with a recording sink.

use hud_api::{CarParams, CarState, LeadData, RadarState, RoadGeometry, Snapshot, TopicUpdate, UiState};
use roadlite_renderer::{
    Color, Compositor, DrawCmd, DrawList, FrameSink, HudConfig, Paint, RenderContext, Result, TransformEngine,
    VideoDraw, ViewTransform,
};

#[derive(Default)]
struct Recorder {
    calls: Vec<&'static str>,
    overlay: Option<DrawList>,
    video: Option<VideoDraw>,
}

impl FrameSink for Recorder {
    fn clear(&mut self, _color: Color) -> Result<()> {
        self.calls.push("clear");
        Ok(())
    }
    fn draw_video(&mut self, draw: &VideoDraw) -> Result<()> {
        self.calls.push("video");
        self.video = Some(*draw);
        Ok(())
    }
    fn draw_overlay(&mut self, list: &DrawList) -> Result<()> {
        self.calls.push("overlay");
        self.overlay = Some(list.clone());
        Ok(())
    }
    fn present(&mut self) -> Result<()> {
        self.calls.push("present");
        Ok(())
    }
}

fn view(width: u32, height: u32) -> ViewTransform {
    let cfg = HudConfig::default();
    let mut engine = TransformEngine::new(cfg.camera, cfg.layout, cfg.device_transform);
    engine.update(width, height, false)
}

fn driving(lead: LeadData) -> Snapshot {
    Snapshot::default()
        .with(TopicUpdate::Ui(UiState {
            started: true,
            is_metric: true,
            world_objects_visible: true,
            ..Default::default()
        }))
        .with(TopicUpdate::CarState(CarState { v_ego: 25.0, ..Default::default() }))
        .with(TopicUpdate::CarParams(CarParams { openpilot_longitudinal_control: true }))
        .with(TopicUpdate::RadarState(RadarState { lead_one: lead, ..Default::default() }))
        .with(TopicUpdate::Model(RoadGeometry { lead_vertices: [[1080.0, 700.0], [0.0, 0.0]], ..Default::default() }))
}

fn run(snap: &Snapshot, video_connected: bool) -> Recorder {
    let view = view(2160, 1080);
    let ctx = RenderContext { snapshot: snap, view: &view, video_connected };
    let mut compositor = Compositor::from_config(&HudConfig::default());
    let mut sink = Recorder::default();
    compositor.compose(&ctx, &mut sink).unwrap();
    sink
}

fn fills_with(list: &DrawList, color: Color) -> Vec<&DrawCmd> {
    list.cmds
        .iter()
        .filter(|c| matches!(c, DrawCmd::Fill { paint: Paint::Solid(p), .. } if *p == color))
        .collect()
}

#[test]
fn close_lead_gets_a_red_chevron() {
    let lead = LeadData { status: true, d_rel: 20.0, v_rel: -2.0 };
    let sink = run(&driving(lead), true);
    assert_eq!(sink.calls, ["clear", "video", "overlay", "present"]);

    let overlay = sink.overlay.unwrap();
    let bodies = fills_with(&overlay, Color::RED.with_alpha(178));
    assert_eq!(bodies.len(), 1);
    let DrawCmd::Fill { path, scissor, .. } = bodies[0] else { panic!() };
    let bounds = path.bounds().unwrap();
    assert!((bounds.h - 750.0 / (20.0 / 3.0 + 30.0) * 2.35).abs() < 1e-3);
    assert!(scissor.is_some());
    assert_eq!(fills_with(&overlay, Color::YELLOW).len(), 1);
}

#[test]
fn distant_lead_body_is_transparent() {
    let lead = LeadData { status: true, d_rel: 60.0, v_rel: 0.0 };
    let overlay = run(&driving(lead), true).overlay.unwrap();
    assert_eq!(fills_with(&overlay, Color::RED.with_alpha(0)).len(), 1);
}

#[test]
fn speed_and_unit_are_drawn() {
    let overlay = run(&driving(LeadData::default()), true).overlay.unwrap();
    let texts: Vec<&str> = overlay.texts().collect();
    assert!(texts.contains(&"90"));
    assert!(texts.contains(&"km/h"));
}

#[test]
fn not_started_is_background_only() {
    let snap = Snapshot::default();
    let sink = run(&snap, true);
    assert_eq!(sink.calls, ["clear", "present"]);
    assert!(sink.overlay.is_none());
}

#[test]
fn lost_video_drops_vision_until_reconnected() {
    let snap = driving(LeadData::default());
    assert_eq!(run(&snap, false).calls, ["clear", "present"]);
    let sink = run(&snap, true);
    let video = sink.video.unwrap();
    let view = view(2160, 1080);
    assert_eq!(video.scissor, view.viz_rect);
    assert_eq!(video.viewport, view.video_rect);
}
