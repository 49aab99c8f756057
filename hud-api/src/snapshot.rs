//! Snapshot records published by the estimation pipeline and read by the renderer.
//! Each record mirrors one topic; the host fills them and publishes through `SnapshotStore`.

use serde::Deserialize;

/// Max vertices of one line polygon (left edge forward + right edge backward).
pub const MAX_LINE_VERTICES: usize = 66;

/// Cruise set speed value meaning "not available".
pub const SET_SPEED_NA: f32 = 255.0;

/// Longitudinal controller state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LongControlState {
    #[default]
    Off,
    Pid,
    Stopping,
    Starting,
}

impl LongControlState {
    pub fn name(self) -> &'static str {
        match self {
            LongControlState::Off => "off",
            LongControlState::Pid => "pid",
            LongControlState::Stopping => "stopping",
            LongControlState::Starting => "starting",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSize {
    #[default]
    None,
    Small,
    Mid,
    Full,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    #[default]
    Normal,
    UserPrompt,
    Critical,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControlsState {
    pub enabled: bool,
    pub engageable: bool,
    pub steer_override: bool,
    pub alert_size: AlertSize,
    pub alert_status: AlertStatus,
    /// Set cruise speed in km/h. 0 = unset, 255 = not available.
    pub v_cruise: f32,
    /// Current steering wheel angle in degrees.
    pub angle_steers: f32,
    pub long_control_state: LongControlState,
    pub v_pid: f32,
    pub up_accel_cmd: f32,
    pub ui_accel_cmd: f32,
    pub uf_accel_cmd: f32,
    pub steer_ratio: f32,
    pub steer_rate_cost: f32,
    pub steer_actuator_delay: f32,
    pub decel_for_model: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CarState {
    /// Ego speed in m/s.
    pub v_ego: f32,
    pub brake_lights: bool,
    pub auto_hold_activated: bool,
    pub engine_rpm: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Actuators {
    pub gas: f32,
    pub brake: f32,
    pub steering_angle_deg: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CarControl {
    pub enabled: bool,
    pub actuators: Actuators,
}

/// One tracked lead vehicle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LeadData {
    pub status: bool,
    /// Relative distance in meters.
    pub d_rel: f32,
    /// Relative velocity in m/s, negative when closing.
    pub v_rel: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RadarState {
    pub lead_one: LeadData,
    pub lead_two: LeadData,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeviceState {
    pub cpu_temp_c: Vec<f32>,
}

impl DeviceState {
    /// Mean CPU temperature, 0 when no sensor reported.
    pub fn average_cpu_temp(&self) -> f32 {
        if self.cpu_temp_c.is_empty() {
            return 0.0;
        }
        self.cpu_temp_c.iter().sum::<f32>() / self.cpu_temp_c.len() as f32
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CarParams {
    pub openpilot_longitudinal_control: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LiveParameters {
    pub angle_offset_deg: f32,
    pub angle_offset_average_deg: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GpsLocationExt {
    pub accuracy: f32,
    pub altitude: f32,
    pub vertical_accuracy: f32,
}

/// Host-side UI flags.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct UiState {
    pub started: bool,
    pub is_metric: bool,
    pub end_to_end: bool,
    pub world_objects_visible: bool,
    pub dm_active: bool,
    pub wide_camera: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            started: false,
            is_metric: true,
            end_to_end: false,
            world_objects_visible: false,
            dm_active: false,
            wide_camera: false,
        }
    }
}

/// Ordered screen-space vertices of one closed line polygon. Capacity is fixed.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LineVertices {
    points: Vec<[f32; 2]>,
}

impl LineVertices {
    pub fn new() -> Self {
        Self { points: Vec::with_capacity(MAX_LINE_VERTICES) }
    }

    /// Builds from points, dropping anything past `MAX_LINE_VERTICES`.
    pub fn from_points(points: impl IntoIterator<Item = [f32; 2]>) -> Self {
        let mut line = Self::new();
        for p in points {
            if !line.push(p) {
                break;
            }
        }
        line
    }

    /// Appends a vertex; returns false when the line is full.
    pub fn push(&mut self, p: [f32; 2]) -> bool {
        if self.points.len() >= MAX_LINE_VERTICES {
            return false;
        }
        self.points.push(p);
        true
    }

    pub fn points(&self) -> &[[f32; 2]] {
        let n = self.points.len().min(MAX_LINE_VERTICES);
        &self.points[..n]
    }

    pub fn len(&self) -> usize {
        self.points().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Lane/path geometry already projected into screen space.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoadGeometry {
    pub lane_lines: [LineVertices; 4],
    /// Per lane line probability in [0, 1].
    pub lane_line_probs: [f32; 4],
    pub road_edges: [LineVertices; 2],
    /// Per road edge standard deviation; drawn with alpha 1 - std.
    pub road_edge_stds: [f32; 2],
    pub track: LineVertices,
    /// Screen anchor of lead one and lead two.
    pub lead_vertices: [[f32; 2]; 2],
}

/// One published record.
#[derive(Clone, Debug)]
pub enum TopicUpdate {
    ControlsState(ControlsState),
    CarState(CarState),
    CarControl(CarControl),
    RadarState(RadarState),
    DeviceState(DeviceState),
    CarParams(CarParams),
    LiveParameters(LiveParameters),
    GpsLocationExt(GpsLocationExt),
    Ui(UiState),
    Model(RoadGeometry),
}

/// Immutable bundle of the latest record per topic.
/// Topics that were never published keep their defaults.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub version: u64,
    pub controls_state: ControlsState,
    pub car_state: CarState,
    pub car_control: CarControl,
    pub radar_state: RadarState,
    pub device_state: DeviceState,
    pub car_params: CarParams,
    pub live_parameters: LiveParameters,
    pub gps_location_ext: GpsLocationExt,
    pub ui: UiState,
    pub model: RoadGeometry,
}

impl Snapshot {
    /// Replace one record with a newer one.
    pub fn apply(&mut self, update: TopicUpdate) {
        match update {
            TopicUpdate::ControlsState(r) => self.controls_state = r,
            TopicUpdate::CarState(r) => self.car_state = r,
            TopicUpdate::CarControl(r) => self.car_control = r,
            TopicUpdate::RadarState(r) => self.radar_state = r,
            TopicUpdate::DeviceState(r) => self.device_state = r,
            TopicUpdate::CarParams(r) => self.car_params = r,
            TopicUpdate::LiveParameters(r) => self.live_parameters = r,
            TopicUpdate::GpsLocationExt(r) => self.gps_location_ext = r,
            TopicUpdate::Ui(r) => self.ui = r,
            TopicUpdate::Model(r) => self.model = r,
        }
    }

    pub fn with(mut self, update: TopicUpdate) -> Self {
        self.apply(update);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_vertices_capacity_is_fixed() {
        let line = LineVertices::from_points((0..100).map(|i| [i as f32, 0.0]));
        assert_eq!(line.len(), MAX_LINE_VERTICES);
        let mut line = line;
        assert!(!line.push([0.0, 0.0]));
    }

    #[test]
    fn apply_replaces_only_its_topic() {
        let snap = Snapshot::default()
            .with(TopicUpdate::CarState(CarState { v_ego: 3.0, ..Default::default() }))
            .with(TopicUpdate::RadarState(RadarState {
                lead_one: LeadData { status: true, d_rel: 12.0, v_rel: 0.0 },
                ..Default::default()
            }));
        assert_eq!(snap.car_state.v_ego, 3.0);
        assert_eq!(snap.radar_state.lead_one.d_rel, 12.0);
        assert_eq!(snap.controls_state.v_cruise, 0.0);
    }

    #[test]
    fn average_cpu_temp_of_empty_list_is_zero() {
        assert_eq!(DeviceState::default().average_cpu_temp(), 0.0);
        let d = DeviceState { cpu_temp_c: vec![40.0, 50.0] };
        assert_eq!(d.average_cpu_temp(), 45.0);
    }
}
