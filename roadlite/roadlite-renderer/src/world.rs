//! Vector overlay: lane lines, road edges, the driving track and lead chevrons,
//! clipped to the visualization rect.

use glam::Vec2;
use hud_api::{LeadData, LineVertices, RoadGeometry};

use crate::canvas::{Canvas, Color, Paint};
use crate::compositor::RenderContext;
use crate::transform::Rect;

/// Leads at or beyond this distance are drawn without fill.
const LEAD_FADE_DISTANCE: f32 = 40.0;

/// Chevron fill alpha in [0, 255] for a lead at `d_rel` meters closing at `v_rel` m/s.
pub fn lead_fill_alpha(d_rel: f32, v_rel: f32) -> f32 {
    if d_rel >= LEAD_FADE_DISTANCE {
        return 0.0;
    }
    let mut alpha = 255.0 * (1.0 - d_rel / LEAD_FADE_DISTANCE);
    if v_rel < 0.0 {
        alpha += 255.0 * (-v_rel / 10.0);
    }
    alpha.clamp(0.0, 255.0)
}

/// Chevron size in pixels; shrinks with distance, bounded to [15, 30] * 2.35.
pub fn chevron_size(d_rel: f32) -> f32 {
    (750.0 / (d_rel / 3.0 + 30.0)).clamp(15.0, 30.0) * 2.35
}

/// Keeps the chevron on screen: x within `[0, viz.right - size/2]`, y above `viz.bottom - 0.6 size`.
pub fn chevron_anchor(vertex: Vec2, size: f32, viz: &Rect) -> Vec2 {
    let x = vertex.x.clamp(0.0, viz.right() - size / 2.0);
    let y = vertex.y.min(viz.bottom() - size * 0.6);
    Vec2::new(x, y)
}

/// The second lead is only worth drawing when it is a distinct vehicle.
pub fn draw_second_lead(one: &LeadData, two: &LeadData) -> bool {
    two.status && (one.d_rel - two.d_rel).abs() > 3.0
}

pub fn draw_chevron(canvas: &mut Canvas, lead: &LeadData, vertex: Vec2, viz: &Rect) {
    let fill_alpha = lead_fill_alpha(lead.d_rel, lead.v_rel);
    let sz = chevron_size(lead.d_rel);
    let Vec2 { x, y } = chevron_anchor(vertex, sz, viz);

    let g_xo = sz / 5.0;
    let g_yo = sz / 10.0;
    canvas.fill_polygon(
        &[
            Vec2::new(x + sz * 1.35 + g_xo, y + sz + g_yo),
            Vec2::new(x, y - g_xo),
            Vec2::new(x - sz * 1.35 - g_xo, y + sz + g_yo),
        ],
        Paint::Solid(Color::YELLOW),
    );
    canvas.fill_polygon(
        &[Vec2::new(x + sz * 1.25, y + sz), Vec2::new(x, y), Vec2::new(x - sz * 1.25, y + sz)],
        Paint::Solid(Color::RED.with_alpha(fill_alpha as u8)),
    );
}

fn draw_line(canvas: &mut Canvas, line: &LineVertices, paint: Paint) {
    let pts: Vec<Vec2> = line.points().iter().map(|p| Vec2::from_array(*p)).collect();
    canvas.fill_polygon(&pts, paint);
}

/// Lane lines and road edges (skipped in end-to-end mode), then the track gradient.
pub fn draw_lanes(canvas: &mut Canvas, model: &RoadGeometry, end_to_end: bool, fb_size: (u32, u32)) {
    if !end_to_end {
        for (line, prob) in model.lane_lines.iter().zip(model.lane_line_probs) {
            let color = Color::rgbaf(1.0, 1.0, 1.0, prob.clamp(0.0, 1.0));
            draw_line(canvas, line, Paint::Solid(color));
        }
        for (edge, std) in model.road_edges.iter().zip(model.road_edge_stds) {
            let color = Color::rgbaf(1.0, 0.0, 0.0, (1.0 - std).clamp(0.0, 1.0));
            draw_line(canvas, edge, Paint::Solid(color));
        }
    }
    let (w, h) = (fb_size.0 as f32, fb_size.1 as f32);
    let base = if end_to_end { Color::RED } else { Color::WHITE };
    let track = Paint::LinearGradient {
        start: Vec2::new(w, h),
        end: Vec2::new(w, h * 0.4),
        inner: base,
        outer: base.with_alpha(0),
    };
    draw_line(canvas, &model.track, track);
}

/// World overlay: lanes, track and, with longitudinal control, lead chevrons.
pub fn draw_world(canvas: &mut Canvas, ctx: &RenderContext<'_>) {
    let snap = ctx.snapshot;
    if !snap.ui.world_objects_visible {
        return;
    }
    let viz = ctx.view.viz_rect;
    canvas.save();
    canvas.scissor(viz);
    draw_lanes(canvas, &snap.model, snap.ui.end_to_end, ctx.view.fb_size);

    if snap.car_params.openpilot_longitudinal_control {
        let one = &snap.radar_state.lead_one;
        let two = &snap.radar_state.lead_two;
        let [v1, v2] = snap.model.lead_vertices;
        if one.status {
            draw_chevron(canvas, one, Vec2::from_array(v1), &viz);
        }
        if draw_second_lead(one, two) {
            draw_chevron(canvas, two, Vec2::from_array(v2), &viz);
        }
    }
    canvas.restore();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::DrawCmd;

    #[test]
    fn fill_alpha_fades_with_distance_and_grows_when_closing() {
        assert_eq!(lead_fill_alpha(40.0, -5.0), 0.0);
        assert_eq!(lead_fill_alpha(50.0, 0.0), 0.0);
        assert_eq!(lead_fill_alpha(20.0, 0.0), 127.5);
        assert!((lead_fill_alpha(20.0, -2.0) - 178.5).abs() < 1e-4);
        assert_eq!(lead_fill_alpha(20.0, 3.0), 127.5);
        assert_eq!(lead_fill_alpha(0.0, -10.0), 255.0);
    }

    #[test]
    fn chevron_size_is_bounded_and_shrinks() {
        let min = 15.0 * 2.35;
        let max = 30.0 * 2.35;
        assert_eq!(chevron_size(0.0), 25.0 * 2.35);
        assert_eq!(chevron_size(-50.0), max);
        assert_eq!(chevron_size(1000.0), min);
        let mut prev = chevron_size(0.0);
        for d in (1..200).map(|d| d as f32) {
            let s = chevron_size(d);
            assert!(s <= prev && s >= min && s <= max);
            prev = s;
        }
    }

    #[test]
    fn anchor_stays_inside_viz() {
        let viz = Rect::new(30.0, 30.0, 2100.0, 1020.0);
        let a = chevron_anchor(Vec2::new(5000.0, 5000.0), 40.0, &viz);
        assert_eq!(a, Vec2::new(2130.0 - 20.0, 1050.0 - 24.0));
        let b = chevron_anchor(Vec2::new(-10.0, 100.0), 40.0, &viz);
        assert_eq!(b, Vec2::new(0.0, 100.0));
    }

    #[test]
    fn second_lead_needs_status_and_separation() {
        let one = LeadData { status: true, d_rel: 20.0, v_rel: 0.0 };
        let near = LeadData { status: true, d_rel: 22.0, v_rel: 0.0 };
        let far = LeadData { status: true, d_rel: 23.5, v_rel: 0.0 };
        let off = LeadData { status: false, ..far };
        assert!(!draw_second_lead(&one, &near));
        assert!(draw_second_lead(&one, &far));
        assert!(!draw_second_lead(&one, &off));
    }

    #[test]
    fn chevron_body_alpha_is_truncated_fill_alpha() {
        let viz = Rect::new(0.0, 0.0, 1000.0, 1000.0);
        let mut c = Canvas::new((1000, 1000));
        draw_chevron(&mut c, &LeadData { status: true, d_rel: 20.0, v_rel: -2.0 }, Vec2::new(500.0, 500.0), &viz);
        let list = c.finish();
        assert_eq!(list.len(), 2);
        let DrawCmd::Fill { paint: Paint::Solid(glow), .. } = &list.cmds[0] else { panic!() };
        let DrawCmd::Fill { paint: Paint::Solid(body), path, .. } = &list.cmds[1] else { panic!() };
        assert_eq!(*glow, Color::YELLOW);
        assert_eq!(body.alpha_u8(), 178);
        assert_eq!(path.contours[0][1], Vec2::new(500.0, 500.0));
    }

    #[test]
    fn end_to_end_skips_lines_and_reddens_track() {
        let mut model = RoadGeometry::default();
        let tri = LineVertices::from_points([[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]]);
        model.lane_lines[1] = tri.clone();
        model.lane_line_probs[1] = 0.8;
        model.track = tri;

        let mut c = Canvas::new((100, 100));
        draw_lanes(&mut c, &model, false, (100, 100));
        let normal = c.finish();
        // One lane line plus the track; empty lines draw nothing.
        assert_eq!(normal.len(), 2);

        let mut c = Canvas::new((100, 100));
        draw_lanes(&mut c, &model, true, (100, 100));
        let e2e = c.finish();
        assert_eq!(e2e.len(), 1);
        let DrawCmd::Fill { paint: Paint::LinearGradient { start, end, inner, outer }, .. } = &e2e.cmds[0] else {
            panic!()
        };
        assert_eq!(*start, Vec2::new(100.0, 100.0));
        assert_eq!(*end, Vec2::new(100.0, 40.0));
        assert_eq!(*inner, Color::RED);
        assert_eq!(outer.a, 0.0);
    }
}
