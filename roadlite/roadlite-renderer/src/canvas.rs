//! Vector canvas: records fills, images and text into a `DrawList` that the overlay pass
//! tessellates. Keeps a transform stack and a scissor like an immediate-mode 2D API.

use glam::{Affine2, Vec2};

use crate::resources::{FontId, ImageId};
use crate::transform::Rect;

/// Straight-alpha RGBA, components in [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self::rgbaf(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgbaf(0.0, 0.0, 0.0, 1.0);
    pub const RED: Self = Self::rgbaf(201.0 / 255.0, 34.0 / 255.0, 49.0 / 255.0, 1.0);
    pub const YELLOW: Self = Self::rgbaf(218.0 / 255.0, 202.0 / 255.0, 37.0 / 255.0, 1.0);

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r: r as f32 / 255.0, g: g as f32 / 255.0, b: b as f32 / 255.0, a: a as f32 / 255.0 }
    }

    pub const fn rgbaf(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a: a as f32 / 255.0, ..self }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Alpha as an 8-bit channel.
    pub fn alpha_u8(self) -> u8 {
        (self.a * 255.0).round().clamp(0.0, 255.0) as u8
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Paint {
    Solid(Color),
    /// Linear gradient between two points, clamped outside.
    LinearGradient { start: Vec2, end: Vec2, inner: Color, outer: Color },
}

/// One or more closed contours filled with the even-odd rule.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    pub contours: Vec<Vec<Vec2>>,
}

impl Path {
    pub fn bounds(&self) -> Option<Rect> {
        let mut pts = self.contours.iter().flatten();
        let first = *pts.next()?;
        let (mut min, mut max) = (first, first);
        for p in pts {
            min = min.min(*p);
            max = max.max(*p);
        }
        Some(Rect::new(min.x, min.y, max.x - min.x, max.y - min.y))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VAlign {
    Baseline,
    Middle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextAlign {
    pub h: HAlign,
    pub v: VAlign,
}

impl TextAlign {
    pub const LEFT_BASELINE: Self = Self { h: HAlign::Left, v: VAlign::Baseline };
    pub const CENTER_BASELINE: Self = Self { h: HAlign::Center, v: VAlign::Baseline };
    pub const LEFT_MIDDLE: Self = Self { h: HAlign::Left, v: VAlign::Middle };
}

/// Recorded draw command. Geometry is already in screen pixels.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCmd {
    Fill { path: Path, paint: Paint, scissor: Option<Rect> },
    Image { image: ImageId, quad: [Vec2; 4], alpha: f32, scissor: Option<Rect> },
    Text {
        font: FontId,
        origin: Vec2,
        size: f32,
        color: Color,
        align: TextAlign,
        text: String,
        scissor: Option<Rect>,
    },
}

/// Ordered commands for one overlay pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawList {
    pub fb_size: (u32, u32),
    pub cmds: Vec<DrawCmd>,
}

impl DrawList {
    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    /// Texts in draw order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.cmds.iter().filter_map(|c| match c {
            DrawCmd::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

const CIRCLE_SEGMENTS: usize = 48;
const CORNER_SEGMENTS: usize = 8;

#[derive(Clone, Copy)]
struct CanvasState {
    xform: Affine2,
    scissor: Option<Rect>,
}

/// Records draw commands for one frame.
pub struct Canvas {
    fb_size: (u32, u32),
    state: CanvasState,
    stack: Vec<CanvasState>,
    cmds: Vec<DrawCmd>,
}

impl Canvas {
    pub fn new(fb_size: (u32, u32)) -> Self {
        Self {
            fb_size,
            state: CanvasState { xform: Affine2::IDENTITY, scissor: None },
            stack: Vec::new(),
            cmds: Vec::new(),
        }
    }

    pub fn save(&mut self) {
        self.stack.push(self.state);
    }

    pub fn restore(&mut self) {
        if let Some(s) = self.stack.pop() {
            self.state = s;
        }
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.state.xform = self.state.xform * Affine2::from_translation(Vec2::new(x, y));
    }

    pub fn rotate(&mut self, radians: f32) {
        self.state.xform = self.state.xform * Affine2::from_angle(radians);
    }

    /// Clip subsequent commands to `rect` (screen space).
    pub fn scissor(&mut self, rect: Rect) {
        self.state.scissor = Some(rect);
    }

    pub fn reset_scissor(&mut self) {
        self.state.scissor = None;
    }

    fn map(&self, p: Vec2) -> Vec2 {
        self.state.xform.transform_point2(p)
    }

    /// Fill a closed polygon through `points`. Fewer than three points draws nothing.
    pub fn fill_polygon(&mut self, points: &[Vec2], paint: Paint) {
        if points.len() < 3 {
            return;
        }
        let contour: Vec<Vec2> = points.iter().map(|p| self.map(*p)).collect();
        self.push_fill(Path { contours: vec![contour] }, paint);
    }

    pub fn fill_rect(&mut self, r: Rect, paint: Paint) {
        self.fill_polygon(&rect_points(r), paint);
    }

    pub fn fill_rounded_rect(&mut self, r: Rect, radius: f32, paint: Paint) {
        let pts = rounded_rect_points(r, radius);
        self.fill_polygon(&pts, paint);
    }

    /// Stroke centered on the rounded rect outline, as an even-odd ring.
    pub fn stroke_rounded_rect(&mut self, r: Rect, radius: f32, width: f32, color: Color) {
        let hw = width / 2.0;
        let outer = Rect::new(r.x - hw, r.y - hw, r.w + width, r.h + width);
        let inner = Rect::new(r.x + hw, r.y + hw, r.w - width, r.h - width);
        let mut contours = vec![rounded_rect_points(outer, radius + hw)];
        if !inner.is_empty() {
            contours.push(rounded_rect_points(inner, (radius - hw).max(0.0)));
        }
        let contours = contours
            .into_iter()
            .map(|c| c.into_iter().map(|p| self.map(p)).collect::<Vec<Vec2>>())
            .collect();
        self.push_fill(Path { contours }, Paint::Solid(color));
    }

    pub fn fill_circle(&mut self, center: Vec2, radius: f32, paint: Paint) {
        let pts: Vec<Vec2> = (0..CIRCLE_SEGMENTS)
            .map(|i| {
                let a = i as f32 / CIRCLE_SEGMENTS as f32 * std::f32::consts::TAU;
                center + Vec2::new(a.cos(), a.sin()) * radius
            })
            .collect();
        self.fill_polygon(&pts, paint);
    }

    /// Draw an image stretched over `r` (in current transform space).
    pub fn image(&mut self, r: Rect, image: ImageId, alpha: f32) {
        let quad = rect_points(r).map(|p| self.map(p));
        self.cmds.push(DrawCmd::Image { image, quad, alpha, scissor: self.state.scissor });
    }

    /// Text at `(x, y)`. Only the translation part of the transform applies to text.
    pub fn text(&mut self, x: f32, y: f32, text: impl Into<String>, size: f32, color: Color, font: FontId, align: TextAlign) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.cmds.push(DrawCmd::Text {
            font,
            origin: self.map(Vec2::new(x, y)),
            size,
            color,
            align,
            text,
            scissor: self.state.scissor,
        });
    }

    fn push_fill(&mut self, path: Path, paint: Paint) {
        let paint = match paint {
            Paint::LinearGradient { start, end, inner, outer } => Paint::LinearGradient {
                start: self.map(start),
                end: self.map(end),
                inner,
                outer,
            },
            p => p,
        };
        self.cmds.push(DrawCmd::Fill { path, paint, scissor: self.state.scissor });
    }

    pub fn finish(self) -> DrawList {
        DrawList { fb_size: self.fb_size, cmds: self.cmds }
    }
}

fn rect_points(r: Rect) -> [Vec2; 4] {
    [
        Vec2::new(r.x, r.y),
        Vec2::new(r.right(), r.y),
        Vec2::new(r.right(), r.bottom()),
        Vec2::new(r.x, r.bottom()),
    ]
}

fn rounded_rect_points(r: Rect, radius: f32) -> Vec<Vec2> {
    let radius = radius.min(r.w / 2.0).min(r.h / 2.0).max(0.0);
    if radius == 0.0 {
        return rect_points(r).to_vec();
    }
    let corners = [
        (Vec2::new(r.right() - radius, r.y + radius), -std::f32::consts::FRAC_PI_2),
        (Vec2::new(r.right() - radius, r.bottom() - radius), 0.0),
        (Vec2::new(r.x + radius, r.bottom() - radius), std::f32::consts::FRAC_PI_2),
        (Vec2::new(r.x + radius, r.y + radius), std::f32::consts::PI),
    ];
    let mut pts = Vec::with_capacity(4 * (CORNER_SEGMENTS + 1));
    for (c, start) in corners {
        for i in 0..=CORNER_SEGMENTS {
            let a = start + i as f32 / CORNER_SEGMENTS as f32 * std::f32::consts::FRAC_PI_2;
            pts.push(c + Vec2::new(a.cos(), a.sin()) * radius);
        }
    }
    pts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_polygon_records_nothing() {
        let mut c = Canvas::new((100, 100));
        c.fill_polygon(&[], Paint::Solid(Color::WHITE));
        c.fill_polygon(&[Vec2::ZERO, Vec2::ONE], Paint::Solid(Color::WHITE));
        c.text(0.0, 0.0, "", 10.0, Color::WHITE, FontId::SansRegular, TextAlign::LEFT_BASELINE);
        assert!(c.finish().is_empty());
    }

    #[test]
    fn scissor_is_captured_per_command_and_restored() {
        let mut c = Canvas::new((100, 100));
        c.save();
        c.scissor(Rect::new(10.0, 10.0, 50.0, 50.0));
        c.fill_rect(Rect::new(0.0, 0.0, 5.0, 5.0), Paint::Solid(Color::WHITE));
        c.restore();
        c.fill_rect(Rect::new(0.0, 0.0, 5.0, 5.0), Paint::Solid(Color::WHITE));
        let list = c.finish();
        match (&list.cmds[0], &list.cmds[1]) {
            (DrawCmd::Fill { scissor: a, .. }, DrawCmd::Fill { scissor: b, .. }) => {
                assert_eq!(*a, Some(Rect::new(10.0, 10.0, 50.0, 50.0)));
                assert_eq!(*b, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn transform_applies_to_geometry() {
        let mut c = Canvas::new((100, 100));
        c.translate(10.0, 20.0);
        c.rotate(std::f32::consts::PI);
        c.fill_polygon(&[Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0), Vec2::ZERO], Paint::Solid(Color::WHITE));
        let list = c.finish();
        let DrawCmd::Fill { path, .. } = &list.cmds[0] else { panic!() };
        let p = path.contours[0][0];
        assert!((p - Vec2::new(9.0, 20.0)).length() < 1e-5);
    }

    #[test]
    fn stroke_is_two_contours() {
        let mut c = Canvas::new((100, 100));
        c.stroke_rounded_rect(Rect::new(10.0, 10.0, 50.0, 50.0), 5.0, 4.0, Color::WHITE);
        let list = c.finish();
        let DrawCmd::Fill { path, .. } = &list.cmds[0] else { panic!() };
        assert_eq!(path.contours.len(), 2);
        let b = path.bounds().unwrap();
        assert!((b.x - 8.0).abs() < 1e-4 && (b.w - 54.0).abs() < 1e-4);
    }

    #[test]
    fn alpha_u8_rounds() {
        assert_eq!(Color::rgbaf(1.0, 1.0, 1.0, 0.5).alpha_u8(), 128);
        assert_eq!(Color::rgba(0, 0, 0, 178).alpha_u8(), 178);
    }
}
