//! Synthetic camera frames and a synthetic drive, so the hosts run without a car.

use std::sync::Arc;

use glam::Vec2;
use hud_api::{
    Actuators, CarControl, CarParams, CarState, ControlsState, DeviceState, GpsLocationExt, LeadData, LineVertices,
    LiveParameters, PixelFormat, RadarState, RoadGeometry, TopicUpdate, UiState, VideoFrame, VideoSource,
};
use roadlite_renderer::{line_polygon, CameraIntrinsics, ViewTransform};

/// Road camera frame size the intrinsics are expressed in.
const SENSOR_HEIGHT: f32 = CameraIntrinsics::ROAD.cy * 2.0;
const HORIZON_Y: f32 = 640.0;
const LINE_SAMPLES: usize = 16;

/// Camera that paints sky over scrolling asphalt. Frames are smaller than the sensor;
/// the video pass scales them.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    tick: u64,
    connected: bool,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, tick: 0, connected: true }
    }

    pub fn set_connected(&mut self, connected: bool) {
        if connected != self.connected {
            log::info!("synthetic camera {}", if connected { "connected" } else { "disconnected" });
        }
        self.connected = connected;
    }
}

impl VideoSource for SyntheticCamera {
    fn connected(&self) -> bool {
        self.connected
    }

    fn latest_frame(&mut self) -> Option<VideoFrame> {
        if !self.connected {
            return None;
        }
        self.tick += 1;
        Some(frame_at(self.width, self.height, self.tick))
    }
}

/// One RGB frame; the asphalt bands move down by a few rows per tick.
pub fn frame_at(width: u32, height: u32, tick: u64) -> VideoFrame {
    let horizon = (height as f32 * HORIZON_Y / SENSOR_HEIGHT) as u32;
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        let px = if y < horizon {
            let t = y as f32 / horizon.max(1) as f32;
            [(90.0 + 80.0 * t) as u8, (130.0 + 60.0 * t) as u8, (180.0 + 30.0 * t) as u8]
        } else {
            let band = ((y as u64 + tick * 6) / 32) % 2;
            let g = 64 + band as u8 * 8;
            [g, g, g + 4]
        };
        for _ in 0..width {
            pixels.extend_from_slice(&px);
        }
    }
    VideoFrame { width, height, pixels: Arc::from(pixels), format: PixelFormat::Rgb8 }
}

/// Centerline from the bottom of the sensor to the horizon, bending by `curve` pixels.
fn centerline(bottom_dx: f32, horizon_dx: f32, curve: f32) -> Vec<Vec2> {
    let cx = CameraIntrinsics::ROAD.cx;
    (0..=LINE_SAMPLES)
        .map(|i| {
            let s = i as f32 / LINE_SAMPLES as f32;
            let y = SENSOR_HEIGHT - s * (SENSOR_HEIGHT - HORIZON_Y);
            let x = cx + bottom_dx * (1.0 - s) + horizon_dx * s + curve * s * s;
            Vec2::new(x, y)
        })
        .collect()
}

/// Lane lines, road edges, track and lead anchors for a lead `lead_d` meters ahead.
pub fn road_geometry(view: &ViewTransform, curve: f32, lead_d: f32) -> RoadGeometry {
    let line = |bottom: f32, horizon: f32, hw: f32| -> LineVertices {
        line_polygon(&centerline(bottom, horizon, curve), hw, view)
    };
    // Closer leads sit lower in the frame.
    let lead_s = (1.0 - 8.0 / lead_d.max(8.0)).clamp(0.0, 1.0);
    let lead_video = Vec2::new(
        CameraIntrinsics::ROAD.cx + curve * lead_s * lead_s,
        SENSOR_HEIGHT - lead_s * (SENSOR_HEIGHT - HORIZON_Y),
    );
    RoadGeometry {
        lane_lines: [
            line(-1500.0, -90.0, 6.0),
            line(-500.0, -30.0, 10.0),
            line(500.0, 30.0, 10.0),
            line(1500.0, 90.0, 6.0),
        ],
        lane_line_probs: [0.3, 0.9, 0.9, 0.3],
        road_edges: [line(-2200.0, -130.0, 12.0), line(2200.0, 130.0, 12.0)],
        road_edge_stds: [0.4, 0.6],
        track: line(0.0, 0.0, 220.0),
        lead_vertices: [view.to_screen(lead_video).to_array(), [0.0, 0.0]],
    }
}

/// Every topic for time `t` seconds into the drive.
pub fn drive_updates(t: f32, view: &ViewTransform) -> Vec<TopicUpdate> {
    let lead_d = 25.0 + 15.0 * (t * 0.5).sin();
    let lead_v = 7.5 * (t * 0.5).cos();
    let steer = 12.0 * (t * 0.7).sin();
    let braking = lead_v < -4.0;
    vec![
        TopicUpdate::ControlsState(ControlsState {
            enabled: true,
            engageable: true,
            v_cruise: 100.0,
            angle_steers: steer,
            v_pid: 20.0,
            steer_ratio: 15.3,
            steer_rate_cost: 0.5,
            steer_actuator_delay: 0.1,
            decel_for_model: (t % 20.0) > 17.0,
            ..Default::default()
        }),
        TopicUpdate::CarState(CarState {
            v_ego: 22.0 + 4.0 * (t * 0.3).sin(),
            brake_lights: braking,
            auto_hold_activated: false,
            engine_rpm: 1800,
        }),
        TopicUpdate::CarControl(CarControl {
            enabled: true,
            actuators: Actuators {
                gas: if braking { 0.0 } else { 0.2 },
                brake: if braking { 0.4 } else { 0.0 },
                steering_angle_deg: steer,
            },
        }),
        TopicUpdate::RadarState(RadarState {
            lead_one: LeadData { status: true, d_rel: lead_d, v_rel: lead_v },
            ..Default::default()
        }),
        TopicUpdate::DeviceState(DeviceState { cpu_temp_c: vec![44.0, 47.5, 46.0, 45.5] }),
        TopicUpdate::CarParams(CarParams { openpilot_longitudinal_control: true }),
        TopicUpdate::LiveParameters(LiveParameters { angle_offset_deg: 0.4, angle_offset_average_deg: 0.35 }),
        TopicUpdate::GpsLocationExt(GpsLocationExt {
            accuracy: 3.2,
            altitude: 118.0,
            vertical_accuracy: 4.0,
        }),
        TopicUpdate::Ui(UiState {
            started: true,
            is_metric: true,
            world_objects_visible: true,
            dm_active: true,
            ..Default::default()
        }),
        TopicUpdate::Model(road_geometry(view, 180.0 * (t * 0.2).sin(), lead_d)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use hud_api::MAX_LINE_VERTICES;
    use roadlite_renderer::{HudConfig, TransformEngine};

    fn view() -> ViewTransform {
        let cfg = HudConfig::default();
        TransformEngine::new(cfg.camera, cfg.layout, cfg.device_transform).update(2160, 1080, false)
    }

    #[test]
    fn frames_are_well_formed() {
        let frame = frame_at(64, 40, 3);
        assert!(frame.is_well_formed());
    }

    #[test]
    fn lines_fit_vertex_capacity() {
        let geo = road_geometry(&view(), 100.0, 30.0);
        assert_eq!(geo.track.len(), 2 * (LINE_SAMPLES + 1));
        assert!(geo.track.len() <= MAX_LINE_VERTICES);
    }

    #[test]
    fn disconnected_camera_yields_nothing() {
        let mut cam = SyntheticCamera::new(8, 8);
        assert!(cam.latest_frame().is_some());
        cam.set_connected(false);
        assert!(cam.latest_frame().is_none());
        assert!(!cam.connected());
    }
}
