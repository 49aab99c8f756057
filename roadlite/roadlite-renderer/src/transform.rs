//! Transform engine: maps the raw camera frame onto the viewport and gives the
//! overlay pass the matching video-pixel -> screen transform.

use glam::{Affine2, Mat4, Vec2, Vec4};
use hud_api::LineVertices;

use crate::config::{CameraConfig, CameraIntrinsics, LayoutConfig};

/// Axis-aligned rectangle in screen pixels (y down).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }
    pub fn right(&self) -> f32 { self.x + self.w }
    pub fn bottom(&self) -> f32 { self.y + self.h }
    pub fn center_x(&self) -> f32 { self.x + self.w / 2.0 }
    pub fn center_y(&self) -> f32 { self.y + self.h / 2.0 }

    pub fn intersect(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let r = self.right().min(other.right());
        let b = self.bottom().min(other.bottom());
        Rect::new(x, y, (r - x).max(0.0), (b - y).max(0.0))
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    /// Integer `[x, y, w, h]` clipped to a `fb`-sized target; `None` when nothing is left.
    pub fn to_scissor(&self, fb: (u32, u32)) -> Option<[u32; 4]> {
        let x0 = self.x.max(0.0).floor() as u32;
        let y0 = self.y.max(0.0).floor() as u32;
        let x1 = (self.right().ceil().max(0.0) as u32).min(fb.0);
        let y1 = (self.bottom().ceil().max(0.0) as u32).min(fb.1);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some([x0, y0, x1 - x0, y1 - y0])
    }
}

/// Inputs that decide whether the transform must be rebuilt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransformKey {
    pub width: u32,
    pub height: u32,
    pub wide_camera: bool,
}

/// Everything derived from viewport size and camera mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub fb_size: (u32, u32),
    pub video_rect: Rect,
    /// Region the world overlay is clipped to.
    pub viz_rect: Rect,
    /// Effective zoom (video pixel -> screen pixel scale).
    pub zoom: f32,
    /// Quad-space -> clip-space matrix for the video pass.
    pub frame_matrix: Mat4,
    /// Video pixel -> screen pixel transform for the overlay pass.
    pub car_space: Affine2,
}

impl ViewTransform {
    /// Project a video-frame pixel to screen pixels.
    pub fn to_screen(&self, p: Vec2) -> Vec2 {
        self.car_space.transform_point2(p)
    }
}

/// `zoom / fx`, halved for the wide camera.
pub fn frame_zoom(zoom: f32, intrinsics: &CameraIntrinsics, wide_camera: bool) -> f32 {
    let mut z = zoom / intrinsics.fx;
    if wide_camera {
        z *= 0.5;
    }
    z
}

/// Pure computation of the view transform. Same inputs give bit-identical output.
pub fn compute_view_transform(
    camera: &CameraConfig,
    layout: &LayoutConfig,
    device_transform: &Mat4,
    key: TransformKey,
) -> ViewTransform {
    let intrinsics = if key.wide_camera { &camera.wide } else { &camera.road };
    let zoom = frame_zoom(camera.zoom, intrinsics, key.wide_camera);

    let (w, h) = (key.width as f32, key.height as f32);
    let b = layout.border;
    let side = layout.side_panel_width;
    let video_rect = Rect::new(b + side, b, w - 2.0 * b - side, h - 2.0 * b);
    let viz_rect = video_rect;

    let zx = zoom * 2.0 * intrinsics.cx / video_rect.w;
    let zy = zoom * 2.0 * intrinsics.cy / video_rect.h;
    let frame = Mat4::from_cols(
        Vec4::new(zx, 0.0, 0.0, 0.0),
        Vec4::new(0.0, zy, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(0.0, -camera.y_offset / video_rect.h * 2.0, 0.0, 1.0),
    );
    let frame_matrix = *device_transform * frame;

    // (0,0) to the video center, same scale as the video, then (0,0) to the frame's top left.
    let car_space = Affine2::from_translation(Vec2::new(
        video_rect.x + video_rect.w / 2.0,
        video_rect.y + video_rect.h / 2.0 + camera.y_offset,
    )) * Affine2::from_scale(Vec2::splat(zoom))
        * Affine2::from_translation(Vec2::new(-intrinsics.cx, -intrinsics.cy));

    ViewTransform {
        fb_size: (key.width, key.height),
        video_rect,
        viz_rect,
        zoom,
        frame_matrix,
        car_space,
    }
}

/// Caches the view transform and rebuilds it only on resize or camera switch.
pub struct TransformEngine {
    camera: CameraConfig,
    layout: LayoutConfig,
    device_transform: Mat4,
    current: Option<(TransformKey, ViewTransform)>,
    rebuilds: u64,
}

impl TransformEngine {
    pub fn new(camera: CameraConfig, layout: LayoutConfig, device_transform: [f32; 16]) -> Self {
        Self {
            camera,
            layout,
            device_transform: Mat4::from_cols_array(&device_transform),
            current: None,
            rebuilds: 0,
        }
    }

    /// Current transform for the given viewport; recomputed only when the key changed.
    pub fn update(&mut self, width: u32, height: u32, wide_camera: bool) -> ViewTransform {
        let key = TransformKey { width, height, wide_camera };
        match self.current {
            Some((k, view)) if k == key => view,
            _ => {
                let view = compute_view_transform(&self.camera, &self.layout, &self.device_transform, key);
                log::debug!("view transform rebuilt for {}x{} (wide: {}), zoom {}", width, height, wide_camera, view.zoom);
                self.current = Some((key, view));
                self.rebuilds += 1;
                view
            }
        }
    }

    pub fn current(&self) -> Option<&ViewTransform> {
        self.current.as_ref().map(|(_, v)| v)
    }

    /// How many times the transform was rebuilt.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}

/// Closed polygon for a line given its centerline in video pixels: left edge
/// walked forward, right edge walked back, all projected to screen space.
pub fn line_polygon(centerline: &[Vec2], half_width: f32, view: &ViewTransform) -> LineVertices {
    let left = centerline.iter().map(|p| Vec2::new(p.x - half_width, p.y));
    let right = centerline.iter().rev().map(|p| Vec2::new(p.x + half_width, p.y));
    LineVertices::from_points(left.chain(right).map(|p| view.to_screen(p).to_array()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> TransformEngine {
        let identity = Mat4::IDENTITY.to_cols_array();
        TransformEngine::new(CameraConfig::default(), LayoutConfig::default(), identity)
    }

    #[test]
    fn scissor_is_clipped_to_target() {
        assert_eq!(Rect::new(30.0, 30.0, 2100.0, 1020.0).to_scissor((2160, 1080)), Some([30, 30, 2100, 1020]));
        assert_eq!(Rect::new(-10.0, 5.5, 50.0, 10.0).to_scissor((20, 20)), Some([0, 5, 20, 11]));
        assert_eq!(Rect::new(30.0, 30.0, 0.0, 10.0).to_scissor((100, 100)), None);
        assert_eq!(Rect::new(200.0, 0.0, 10.0, 10.0).to_scissor((100, 100)), None);
    }

    #[test]
    fn wide_zoom_is_half_of_road_zoom_for_same_focal_length() {
        let k = CameraIntrinsics::ROAD;
        let road = frame_zoom(2912.8, &k, false);
        let wide = frame_zoom(2912.8, &k, true);
        assert_eq!(wide, road * 0.5);
    }

    #[test]
    fn repeated_resize_is_bit_identical() {
        let mut e = engine();
        let a = e.update(2160, 1080, false);
        let b = compute_view_transform(
            &CameraConfig::default(),
            &LayoutConfig::default(),
            &Mat4::IDENTITY,
            TransformKey { width: 2160, height: 1080, wide_camera: false },
        );
        let bits = |m: Mat4| m.to_cols_array().map(f32::to_bits);
        assert_eq!(bits(a.frame_matrix), bits(b.frame_matrix));
        assert_eq!(a.car_space, b.car_space);
    }

    #[test]
    fn rebuild_only_on_size_or_mode_change() {
        let mut e = engine();
        e.update(1920, 1080, false);
        e.update(1920, 1080, false);
        assert_eq!(e.rebuilds(), 1);
        e.update(1920, 1080, true);
        assert_eq!(e.rebuilds(), 2);
        e.update(1280, 720, true);
        assert_eq!(e.rebuilds(), 3);
    }

    #[test]
    fn frame_matrix_scales_and_offsets() {
        let cam = CameraConfig::default();
        let layout = LayoutConfig::default();
        let view = compute_view_transform(
            &cam,
            &layout,
            &Mat4::IDENTITY,
            TransformKey { width: 2160, height: 1080, wide_camera: false },
        );
        let zoom = cam.zoom / cam.road.fx;
        assert_eq!(view.video_rect, Rect::new(30.0, 30.0, 2100.0, 1020.0));
        let m = view.frame_matrix.to_cols_array();
        assert_eq!(m[0], zoom * 2.0 * cam.road.cx / 2100.0);
        assert_eq!(m[5], zoom * 2.0 * cam.road.cy / 1020.0);
        assert_eq!(m[13], -cam.y_offset / 1020.0 * 2.0);
    }

    #[test]
    fn car_space_maps_principal_point_to_video_center() {
        let cam = CameraConfig::default();
        let view = compute_view_transform(
            &cam,
            &LayoutConfig::default(),
            &Mat4::IDENTITY,
            TransformKey { width: 2160, height: 1080, wide_camera: false },
        );
        let p = view.to_screen(Vec2::new(cam.road.cx, cam.road.cy));
        assert!((p.x - view.video_rect.center_x()).abs() < 1e-3);
        assert!((p.y - (view.video_rect.center_y() + cam.y_offset)).abs() < 1e-3);
    }

    #[test]
    fn line_polygon_walks_left_then_right_back() {
        let mut e = engine();
        let view = e.update(2160, 1080, false);
        let center = [Vec2::new(900.0, 1000.0), Vec2::new(950.0, 700.0)];
        let poly = line_polygon(&center, 10.0, &view);
        assert_eq!(poly.len(), 4);
        let pts = poly.points();
        let expect_first = view.to_screen(Vec2::new(890.0, 1000.0));
        let expect_last = view.to_screen(Vec2::new(910.0, 1000.0));
        assert_eq!(pts[0], expect_first.to_array());
        assert_eq!(pts[3], expect_last.to_array());
    }
}
