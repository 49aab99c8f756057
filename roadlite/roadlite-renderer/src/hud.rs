//! HUD and indicators: header gradient, set speed box, current speed, steering/event icon,
//! info bar, debug panel and the footer badges.

use glam::Vec2;
use hud_api::{AlertSize, AlertStatus, ControlsState, GpsLocationExt, Snapshot, SET_SPEED_NA};

use crate::canvas::{Canvas, Color, Paint, TextAlign};
use crate::compositor::RenderContext;
use crate::config::{HudConfig, LayoutConfig};
use crate::resources::{FontId, ImageId};
use crate::transform::Rect;

// Unit conversions are computed in f64.
const KPH_PER_MPS: f64 = 3.6;
const MPH_PER_MPS: f64 = 2.2369362920544;
/// Applied to the km/h cruise value when showing imperial units.
const CRUISE_IMPERIAL_FACTOR: f64 = 0.6225;

const BADGE_RADIUS: f32 = 96.0;
const BADGE_SPACING: f32 = BADGE_RADIUS * 2.0 + 60.0;
const EVENT_WIDTH: f32 = 220.0;
const WHEEL_DISC_RADIUS: f32 = 96.0;

const SPEED_BRAKE_RED: Color = Color::rgbaf(1.0, 66.0 / 255.0, 66.0 / 255.0, 1.0);
const DEBUG_GREEN: Color = Color::rgbaf(0.0, 1.0, 0.0, 250.0 / 255.0);
const INFO_BAR_GREEN: Color = Color::rgbaf(34.0 / 255.0, 139.0 / 255.0, 34.0 / 255.0, 200.0 / 255.0);

/// Nearest integer, ties to even.
fn nearest(x: f64) -> i32 {
    x.round_ties_even() as i32
}

/// Displayed ego speed in km/h or mph, never negative.
pub fn speed_display(v_ego: f32, is_metric: bool) -> i32 {
    let factor = if is_metric { KPH_PER_MPS } else { MPH_PER_MPS };
    nearest((v_ego as f64 * factor).max(0.0))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetSpeed {
    Unavailable,
    Set(i32),
}

/// Cruise set speed: 0 and 255 mean not available.
pub fn set_speed_display(v_cruise: f32, is_metric: bool) -> SetSpeed {
    if v_cruise == 0.0 || v_cruise == SET_SPEED_NA {
        return SetSpeed::Unavailable;
    }
    let v = v_cruise as f64;
    let v = if is_metric { v } else { v * CRUISE_IMPERIAL_FACTOR };
    SetSpeed::Set(nearest(v))
}

/// Overall system state; picks the background color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SystemStatus {
    Disengaged,
    Engaged,
    Warning,
    Alert,
}

impl SystemStatus {
    pub fn from_controls(controls: &ControlsState) -> Self {
        if !controls.enabled {
            return SystemStatus::Disengaged;
        }
        match controls.alert_status {
            AlertStatus::UserPrompt => SystemStatus::Warning,
            AlertStatus::Critical => SystemStatus::Alert,
            AlertStatus::Normal => SystemStatus::Engaged,
        }
    }

    pub fn background(self) -> Color {
        match self {
            SystemStatus::Disengaged => Color::rgba(0x17, 0x33, 0x49, 0xff),
            SystemStatus::Engaged => Color::rgba(0x17, 0x86, 0x44, 0xff),
            SystemStatus::Warning => Color::rgba(0xDA, 0x6F, 0x25, 0xff),
            SystemStatus::Alert => Color::rgba(0xC9, 0x22, 0x31, 0xff),
        }
    }
}

/// State of the steering wheel icon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Engagement {
    Engaged,
    Warning,
    Engageable,
    Inactive,
}

impl Engagement {
    pub fn from_state(status: SystemStatus, controls: &ControlsState) -> Self {
        if status == SystemStatus::Engaged && !controls.steer_override {
            Engagement::Engaged
        } else if status == SystemStatus::Warning {
            Engagement::Warning
        } else if controls.engageable {
            Engagement::Engageable
        } else {
            Engagement::Inactive
        }
    }

    /// Disc color behind the wheel; `None` draws no disc.
    pub fn disc_color(self) -> Option<Color> {
        match self {
            Engagement::Engaged => Some(Color::rgba(23, 134, 68, 255)),
            Engagement::Warning => Some(Color::rgba(218, 111, 37, 255)),
            Engagement::Engageable => Some(Color::rgba(23, 51, 73, 255)),
            Engagement::Inactive => None,
        }
    }

    pub fn icon_alpha(self) -> f32 {
        if self == Engagement::Inactive { 0.1 } else { 1.0 }
    }
}

/// Disc and icon alpha of a footer badge.
pub fn badge_alphas(active: bool) -> (f32, f32) {
    if active { (0.3, 1.0) } else { (0.1, 0.15) }
}

/// GPS horizontal accuracy shown in the debug panel: 0 means no fix, >100 is an outlier.
pub fn gps_accuracy_display(accuracy: f32) -> f32 {
    if accuracy > 100.0 {
        99.99
    } else if accuracy == 0.0 {
        99.8
    } else {
        accuracy
    }
}

/// GPS altitude, replaced when the vertical accuracy is missing or an outlier.
pub fn gps_altitude_display(gps: &GpsLocationExt) -> f32 {
    if gps.vertical_accuracy == 0.0 || gps.vertical_accuracy > 100.0 {
        99.99
    } else {
        gps.altitude
    }
}

/// One debug panel line.
#[derive(Clone, Debug, PartialEq)]
pub struct DebugRow {
    pub label: Option<&'static str>,
    pub value: String,
    /// x of the value text when the viz rect starts at the border.
    pub x: f32,
    pub highlight: bool,
}

const DEBUG_TEXT_X: f32 = 260.0;
const DEBUG_LABEL_X: f32 = DEBUG_TEXT_X - 210.0;

impl DebugRow {
    fn line(value: String, x: f32, highlight: bool) -> Self {
        Self { label: None, value, x, highlight }
    }

    fn measure(label: &'static str, value: String, x: f32) -> Self {
        Self { label: Some(label), value, x, highlight: false }
    }
}

/// Debug panel contents, top to bottom.
pub fn debug_rows(snap: &Snapshot) -> Vec<DebugRow> {
    let cs = &snap.controls_state;
    let actuators = &snap.car_control.actuators;
    let lead = &snap.radar_state.lead_one;
    let gps = &snap.gps_location_ext;

    let lead_dist = if lead.status { format!("{:.1}m", lead.d_rel) } else { "--".to_string() };
    let rpm = match snap.car_state.engine_rpm {
        0 => "OFF".to_string(),
        rpm => rpm.to_string(),
    };
    let target = if snap.car_control.enabled {
        format!("{:.1} °", actuators.steering_angle_deg)
    } else {
        "--".to_string()
    };

    let (tx, lx) = (DEBUG_TEXT_X, DEBUG_LABEL_X);
    vec![
        DebugRow::line(format!("State: {}", cs.long_control_state.name()), tx, true),
        DebugRow::line(format!("P: {:.3}", cs.up_accel_cmd), tx, false),
        DebugRow::line(format!("I: {:.3}", cs.ui_accel_cmd), tx, false),
        DebugRow::line(format!("F: {:.3}", cs.uf_accel_cmd), tx, false),
        DebugRow::line(format!("vPid: {:.3}({:.1})", cs.v_pid, cs.v_pid as f64 * KPH_PER_MPS), lx, true),
        DebugRow::line(format!("Gas: {:.3}", actuators.gas), lx, false),
        DebugRow::line(format!("Brake: {:.3}", actuators.brake), lx, false),
        DebugRow::measure("CPU Temp:", format!("{:.1}°", snap.device_state.average_cpu_temp()), tx - 40.0),
        DebugRow::measure("Lead Dist:", lead_dist, tx - 40.0),
        DebugRow::measure("GPS Acc:", format!("{:.2}m", gps_accuracy_display(gps.accuracy)), tx - 40.0),
        DebugRow::measure("GPS Alt:", format!("{:.2}m", gps_altitude_display(gps)), tx - 40.0),
        DebugRow::measure("Engine RPM:", rpm, tx - 30.0),
        DebugRow::measure("Steer:", format!("{:.1} °", cs.angle_steers), tx - 80.0),
        DebugRow::measure("Target:", target, tx - 80.0),
    ]
}

/// Footer badge centers: driver face, brake, autohold.
pub fn badge_centers(viz: &Rect, layout: &LayoutConfig) -> [Vec2; 3] {
    let y = viz.bottom() - layout.footer_height / 2.0;
    let x0 = viz.x + BADGE_RADIUS + layout.border * 2.0;
    [0.0, 1.0, 2.0].map(|i| Vec2::new(x0 + BADGE_SPACING * i, y))
}

/// HUD drawn on top of the world overlay.
#[derive(Clone, Debug)]
pub struct Hud {
    layout: LayoutConfig,
    show_debug_panel: bool,
    show_basic_info: bool,
}

impl Default for Hud {
    fn default() -> Self {
        Self::from_config(&HudConfig::default())
    }
}

impl Hud {
    pub fn from_config(config: &HudConfig) -> Self {
        Self {
            layout: config.layout.clone(),
            show_debug_panel: config.show_debug_panel,
            show_basic_info: config.show_basic_info,
        }
    }

    pub fn draw(&self, canvas: &mut Canvas, ctx: &RenderContext<'_>) {
        let snap = ctx.snapshot;
        let viz = ctx.view.viz_rect;
        self.draw_header(canvas, &viz);
        self.draw_max_speed(canvas, snap, &viz);
        draw_speed(canvas, snap, &viz);
        self.draw_event(canvas, snap, &viz);
        if self.show_basic_info {
            self.draw_basic_info(canvas, snap, &viz);
        }
        if self.show_debug_panel {
            draw_debug_panel(canvas, snap, viz.x - self.layout.border);
        }

        let [face, brake, autohold] = badge_centers(&viz, &self.layout);
        if snap.controls_state.alert_size == AlertSize::None {
            draw_badge(canvas, face, ImageId::DriverFace, snap.ui.dm_active);
        }
        draw_badge(canvas, brake, ImageId::Brake, snap.car_state.brake_lights);
        draw_badge(canvas, autohold, ImageId::AutoholdActive, snap.car_state.auto_hold_activated);
    }

    fn draw_header(&self, canvas: &mut Canvas, viz: &Rect) {
        let h = self.layout.header_height;
        let gradient = Paint::LinearGradient {
            start: Vec2::new(viz.x, viz.y + (h - h / 2.5)),
            end: Vec2::new(viz.x, viz.y + h),
            inner: Color::rgbaf(0.0, 0.0, 0.0, 0.45),
            outer: Color::rgbaf(0.0, 0.0, 0.0, 0.0),
        };
        canvas.fill_rect(Rect::new(viz.x, viz.y, viz.w, h), gradient);
    }

    fn draw_max_speed(&self, canvas: &mut Canvas, snap: &Snapshot, viz: &Rect) {
        let b = self.layout.border;
        let rect = Rect::new(viz.x + b * 2.0, (viz.y + b * 1.5).trunc(), 184.0, 202.0);
        canvas.fill_rounded_rect(rect, 30.0, Paint::Solid(Color::BLACK.with_alpha(100)));
        canvas.stroke_rounded_rect(rect, 20.0, 10.0, Color::WHITE.with_alpha(100));

        let set = set_speed_display(snap.controls_state.v_cruise, snap.ui.is_metric);
        let label_alpha = if matches!(set, SetSpeed::Set(_)) { 200 } else { 100 };
        let cx = rect.center_x();
        let align = TextAlign::CENTER_BASELINE;
        canvas.text(cx, 118.0, "MAX", 19.0 * 2.5, Color::WHITE.with_alpha(label_alpha), FontId::SansRegular, align);
        match set {
            SetSpeed::Set(v) => canvas.text(cx, 212.0, v.to_string(), 48.0 * 2.5, Color::WHITE, FontId::SansBold, align),
            SetSpeed::Unavailable => {
                canvas.text(cx, 212.0, "N/A", 32.0 * 2.5, Color::WHITE.with_alpha(100), FontId::SansSemibold, align)
            }
        }
    }

    fn draw_event(&self, canvas: &mut Canvas, snap: &Snapshot, viz: &Rect) {
        let b = self.layout.border;
        let cs = &snap.controls_state;
        let event_x = viz.right() - (EVENT_WIDTH + b * 2.0);
        let event_y = viz.y + b * 1.5 + 25.0;

        if cs.decel_for_model && cs.enabled {
            let size = (160.0f32 * 1.5 * 0.82).trunc();
            let x = event_x - (size / 4.0).trunc() + 80.0;
            let y = event_y + b - 45.0;
            canvas.image(Rect::new(x, y, size, size), ImageId::TurnSign, 1.0);
            return;
        }

        let status = SystemStatus::from_controls(cs);
        let engagement = Engagement::from_state(status, cs);
        let center = Vec2::new(
            event_x + (EVENT_WIDTH - WHEEL_DISC_RADIUS),
            event_y + WHEEL_DISC_RADIUS / 2.0 + b * 1.5,
        );
        if let Some(color) = engagement.disc_color() {
            canvas.fill_circle(center, WHEEL_DISC_RADIUS, Paint::Solid(color));
        }
        let icon = WHEEL_DISC_RADIUS * 1.5;
        canvas.save();
        canvas.translate(center.x, center.y);
        canvas.rotate(-cs.angle_steers.to_radians());
        canvas.image(Rect::new(-icon / 2.0, -icon / 2.0, icon, icon), ImageId::Wheel, engagement.icon_alpha());
        canvas.restore();
    }

    fn draw_basic_info(&self, canvas: &mut Canvas, snap: &Snapshot, viz: &Rect) {
        let cs = &snap.controls_state;
        let lp = &snap.live_parameters;
        let text = format!(
            "SR({:.2}) SRC({:.2}) SAD({:.2}) AO({:.2}/{:.2})",
            cs.steer_ratio, cs.steer_rate_cost, cs.steer_actuator_delay, lp.angle_offset_deg, lp.angle_offset_average_deg
        );
        let x = viz.x + self.layout.border * 2.0;
        let y = viz.bottom() - 10.0;
        canvas.fill_rect(Rect::new(x - 40.0, y - 27.0, 950.0, 50.0), Paint::Solid(INFO_BAR_GREEN));
        canvas.text(x, y, text, 20.0 * 2.3, Color::WHITE.with_alpha(254), FontId::SansRegular, TextAlign::LEFT_MIDDLE);
    }
}

fn draw_speed(canvas: &mut Canvas, snap: &Snapshot, viz: &Rect) {
    let speed = speed_display(snap.car_state.v_ego, snap.ui.is_metric);
    let color = if snap.car_state.brake_lights { SPEED_BRAKE_RED } else { Color::WHITE };
    let unit = if snap.ui.is_metric { "km/h" } else { "mph" };
    let cx = viz.center_x();
    let align = TextAlign::CENTER_BASELINE;
    canvas.text(cx, 190.0, speed.to_string(), 80.0 * 2.5, color, FontId::SansBold, align);
    canvas.text(cx, 270.0, unit, 24.0 * 2.5, Color::WHITE.with_alpha(200), FontId::SansRegular, align);
}

/// Row positions are laid out for a viz rect starting at the border; `dx` shifts them
/// right of a side panel.
fn draw_debug_panel(canvas: &mut Canvas, snap: &Snapshot, dx: f32) {
    const ROW_HEIGHT: f32 = 55.0;
    const SIZE: f32 = 20.0 * 2.3;
    let dim = Color::WHITE.with_alpha(200);
    let align = TextAlign::LEFT_BASELINE;

    let mut y = 20.0;
    for row in debug_rows(snap) {
        y += ROW_HEIGHT;
        match row.label {
            Some(label) => {
                canvas.text(row.x + dx, y, row.value, SIZE, dim, FontId::SansRegular, align);
                canvas.text(DEBUG_LABEL_X + dx, y, label, SIZE, dim, FontId::SansRegular, align);
            }
            None => {
                let color = if row.highlight { DEBUG_GREEN } else { Color::WHITE };
                canvas.text(row.x + dx, y, row.value, SIZE, color, FontId::SansRegular, align);
            }
        }
    }
}

fn draw_badge(canvas: &mut Canvas, center: Vec2, image: ImageId, active: bool) {
    let (bg_alpha, img_alpha) = badge_alphas(active);
    canvas.fill_circle(center, BADGE_RADIUS, Paint::Solid(Color::BLACK.with_alpha((255.0 * bg_alpha) as u8)));
    let size = (BADGE_RADIUS * 1.5).trunc();
    let half = (size / 2.0).trunc();
    canvas.image(Rect::new(center.x - half, center.y - half, size, size), image, img_alpha);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::DrawCmd;
    use crate::transform::TransformEngine;
    use hud_api::{CarControl, CarState, LeadData, RadarState, TopicUpdate};

    #[test]
    fn speed_conversion() {
        assert_eq!(speed_display(0.0, true), 0);
        assert_eq!(speed_display(10.0, true), 36);
        assert_eq!(speed_display(10.0, false), 22);
        assert_eq!(speed_display(-5.0, true), 0);
        assert_eq!(speed_display(-5.0, false), 0);
    }

    #[test]
    fn speed_rounds_in_double_precision() {
        // v * 3.6 is 9.4999998 in f64 but rounds up to 9.5 in f32.
        assert_eq!(speed_display(2.6388888, true), 9);
        assert_eq!(speed_display(2.64, true), 10);
        assert_eq!(set_speed_display(41.0, false), SetSpeed::Set(26));
    }

    #[test]
    fn rounding_ties_to_even() {
        assert_eq!(nearest(2.5), 2);
        assert_eq!(nearest(3.5), 4);
        assert_eq!(nearest(2.4), 2);
    }

    #[test]
    fn set_speed_sentinels() {
        assert_eq!(set_speed_display(0.0, true), SetSpeed::Unavailable);
        assert_eq!(set_speed_display(255.0, false), SetSpeed::Unavailable);
        assert_eq!(set_speed_display(100.0, true), SetSpeed::Set(100));
        assert_eq!(set_speed_display(100.0, false), SetSpeed::Set(62));
    }

    #[test]
    fn gps_clamps_to_sentinels() {
        assert_eq!(format!("{:.2}", gps_accuracy_display(0.0)), "99.80");
        assert_eq!(format!("{:.2}", gps_accuracy_display(150.0)), "99.99");
        assert_eq!(format!("{:.2}", gps_accuracy_display(12.345)), "12.35");
        let gps = GpsLocationExt { accuracy: 1.0, altitude: 42.0, vertical_accuracy: 0.0 };
        assert_eq!(gps_altitude_display(&gps), 99.99);
        let gps = GpsLocationExt { vertical_accuracy: 3.0, ..gps };
        assert_eq!(gps_altitude_display(&gps), 42.0);
    }

    #[test]
    fn status_and_engagement() {
        let mut cs = ControlsState::default();
        assert_eq!(SystemStatus::from_controls(&cs), SystemStatus::Disengaged);
        assert_eq!(Engagement::from_state(SystemStatus::Disengaged, &cs), Engagement::Inactive);
        cs.engageable = true;
        assert_eq!(Engagement::from_state(SystemStatus::Disengaged, &cs), Engagement::Engageable);

        cs.enabled = true;
        assert_eq!(SystemStatus::from_controls(&cs), SystemStatus::Engaged);
        assert_eq!(Engagement::from_state(SystemStatus::Engaged, &cs), Engagement::Engaged);
        cs.steer_override = true;
        assert_eq!(Engagement::from_state(SystemStatus::Engaged, &cs), Engagement::Engageable);

        cs.alert_status = AlertStatus::UserPrompt;
        assert_eq!(SystemStatus::from_controls(&cs), SystemStatus::Warning);
        assert_eq!(Engagement::from_state(SystemStatus::Warning, &cs), Engagement::Warning);
        cs.alert_status = AlertStatus::Critical;
        assert_eq!(SystemStatus::from_controls(&cs), SystemStatus::Alert);

        assert_eq!(Engagement::Inactive.disc_color(), None);
        assert_eq!(Engagement::Inactive.icon_alpha(), 0.1);
    }

    #[test]
    fn badges_are_spaced_along_the_footer() {
        let viz = Rect::new(30.0, 30.0, 2100.0, 1020.0);
        let [a, b, c] = badge_centers(&viz, &LayoutConfig::default());
        assert_eq!(a, Vec2::new(30.0 + 96.0 + 60.0, 1050.0 - 140.0));
        assert_eq!(b.x - a.x, 252.0);
        assert_eq!(c.x - b.x, 252.0);
    }

    #[test]
    fn debug_rows_show_placeholders_without_data() {
        let rows = debug_rows(&Snapshot::default());
        let values: Vec<&str> = rows.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values[0], "State: off");
        assert_eq!(values[7], "0.0°");
        assert_eq!(values[8], "--");
        assert_eq!(values[9], "99.80m");
        assert_eq!(values[10], "99.99m");
        assert_eq!(values[11], "OFF");
        assert_eq!(values[13], "--");
    }

    #[test]
    fn debug_rows_format_live_values() {
        let snap = Snapshot::default()
            .with(TopicUpdate::CarState(CarState { engine_rpm: 1800, ..Default::default() }))
            .with(TopicUpdate::RadarState(RadarState {
                lead_one: LeadData { status: true, d_rel: 23.46, v_rel: 0.0 },
                ..Default::default()
            }))
            .with(TopicUpdate::CarControl(CarControl {
                enabled: true,
                actuators: hud_api::Actuators { steering_angle_deg: -4.3, ..Default::default() },
            }));
        let rows = debug_rows(&snap);
        assert_eq!(rows[8].value, "23.5m");
        assert_eq!(rows[11].value, "1800");
        assert_eq!(rows[13].value, "-4.3 °");
        assert_eq!(rows[11].x, 230.0);
        assert_eq!(rows[4].value, "vPid: 0.000(0.0)");
    }

    #[test]
    fn hud_text_stays_right_of_the_side_panel() {
        let mut config = HudConfig::default();
        config.layout.side_panel_width = 300.0;
        let view = TransformEngine::new(config.camera.clone(), config.layout.clone(), config.device_transform)
            .update(2160, 1080, false);
        let snap = Snapshot::default();
        let ctx = RenderContext { snapshot: &snap, view: &view, video_connected: true };
        let mut canvas = Canvas::new(view.fb_size);
        Hud::from_config(&config).draw(&mut canvas, &ctx);

        let texts: Vec<(f32, String)> = canvas
            .finish()
            .cmds
            .into_iter()
            .filter_map(|c| match c {
                DrawCmd::Text { origin, text, .. } => Some((origin.x, text)),
                _ => None,
            })
            .collect();
        assert!(texts.contains(&(DEBUG_TEXT_X + 300.0, "State: off".to_string())));
        assert!(texts.contains(&(DEBUG_LABEL_X + 300.0, "CPU Temp:".to_string())));
        for (x, text) in &texts {
            assert!(*x >= view.viz_rect.x, "{text:?} at x={x}");
        }
    }
}
