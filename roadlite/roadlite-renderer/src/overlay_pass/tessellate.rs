//! Turns a `DrawList` into overlay vertices and draw batches.
//!
//! Path fills use stencil-then-cover: each contour is fanned into the stencil with
//! invert, then a bounding quad covers pixels with odd winding (even-odd rule).

use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::canvas::{Color, DrawCmd, DrawList, Paint, Path, TextAlign};
use crate::resources::{FontId, GlyphQuad, Resources, TextureKey};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct OverlayVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
    /// Gradient outer color; equals `color` for solid paint.
    pub color2: [f32; 4],
    /// Gradient start xy and end xy in screen pixels; zero length means solid.
    pub grad: [f32; 4],
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawKind {
    Fill { stencil: Range<u32>, cover: Range<u32> },
    Quads { texture: TextureKey, vertices: Range<u32> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Draw {
    pub kind: DrawKind,
    /// `[x, y, w, h]`; `None` means the full framebuffer.
    pub scissor: Option<[u32; 4]>,
}

#[derive(Clone, Debug, Default)]
pub struct Tessellation {
    pub vertices: Vec<OverlayVertex>,
    pub draws: Vec<Draw>,
}

/// Glyph placement for text commands.
pub trait TextLayout {
    fn layout(&self, font: FontId, text: &str, origin: Vec2, size: f32, align: TextAlign) -> Vec<GlyphQuad>;
}

impl TextLayout for Resources {
    fn layout(&self, font: FontId, text: &str, origin: Vec2, size: f32, align: TextAlign) -> Vec<GlyphQuad> {
        self.font(font).layout(text, origin, size, align)
    }
}

struct Shade {
    color: [f32; 4],
    color2: [f32; 4],
    grad: [f32; 4],
}

impl Shade {
    fn solid(c: Color) -> Self {
        let c = c.to_array();
        Self { color: c, color2: c, grad: [0.0; 4] }
    }

    fn from_paint(paint: &Paint) -> Self {
        match *paint {
            Paint::Solid(c) => Self::solid(c),
            Paint::LinearGradient { start, end, inner, outer } => Self {
                color: inner.to_array(),
                color2: outer.to_array(),
                grad: [start.x, start.y, end.x, end.y],
            },
        }
    }

    fn vertex(&self, p: Vec2, uv: [f32; 2]) -> OverlayVertex {
        OverlayVertex { pos: p.to_array(), uv, color: self.color, color2: self.color2, grad: self.grad }
    }
}

impl Tessellation {
    pub fn build(list: &DrawList, text: &dyn TextLayout) -> Self {
        let mut t = Tessellation::default();
        for cmd in &list.cmds {
            let scissor = match cmd_scissor(cmd) {
                Some(rect) => match rect.to_scissor(list.fb_size) {
                    Some(s) => Some(s),
                    None => continue,
                },
                None => None,
            };
            match cmd {
                DrawCmd::Fill { path, paint, .. } => t.push_fill(path, paint, scissor),
                DrawCmd::Image { image, quad, alpha, .. } => {
                    let shade = Shade::solid(Color::rgbaf(1.0, 1.0, 1.0, *alpha));
                    let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
                    let start = t.next_index();
                    t.push_quad(&shade, *quad, uvs);
                    t.push_quads_draw(TextureKey::Image(*image), start, scissor);
                }
                DrawCmd::Text { font, origin, size, color, align, text: s, .. } => {
                    let shade = Shade::solid(*color);
                    let start = t.next_index();
                    for g in text.layout(*font, s, *origin, *size, *align) {
                        let quad = [
                            g.min,
                            Vec2::new(g.max.x, g.min.y),
                            g.max,
                            Vec2::new(g.min.x, g.max.y),
                        ];
                        let uvs = [
                            [g.uv_min.x, g.uv_min.y],
                            [g.uv_max.x, g.uv_min.y],
                            [g.uv_max.x, g.uv_max.y],
                            [g.uv_min.x, g.uv_max.y],
                        ];
                        t.push_quad(&shade, quad, uvs);
                    }
                    t.push_quads_draw(TextureKey::Font(*font), start, scissor);
                }
            }
        }
        t
    }

    fn next_index(&self) -> u32 {
        self.vertices.len() as u32
    }

    fn push_fill(&mut self, path: &Path, paint: &Paint, scissor: Option<[u32; 4]>) {
        let Some(bounds) = path.bounds() else { return };
        let shade = Shade::from_paint(paint);

        let stencil_start = self.next_index();
        for contour in &path.contours {
            if contour.len() < 3 {
                continue;
            }
            let p0 = contour[0];
            for w in contour[1..].windows(2) {
                self.vertices.push(shade.vertex(p0, [0.0, 0.0]));
                self.vertices.push(shade.vertex(w[0], [0.0, 0.0]));
                self.vertices.push(shade.vertex(w[1], [0.0, 0.0]));
            }
        }
        let stencil = stencil_start..self.next_index();
        if stencil.is_empty() {
            return;
        }

        let cover_start = self.next_index();
        let quad = [
            Vec2::new(bounds.x, bounds.y),
            Vec2::new(bounds.right(), bounds.y),
            Vec2::new(bounds.right(), bounds.bottom()),
            Vec2::new(bounds.x, bounds.bottom()),
        ];
        self.push_quad(&shade, quad, [[0.0, 0.0]; 4]);
        let cover = cover_start..self.next_index();
        self.draws.push(Draw { kind: DrawKind::Fill { stencil, cover }, scissor });
    }

    fn push_quad(&mut self, shade: &Shade, q: [Vec2; 4], uv: [[f32; 2]; 4]) {
        for i in [0, 1, 2, 0, 2, 3] {
            self.vertices.push(shade.vertex(q[i], uv[i]));
        }
    }

    /// Record textured quads from `start` to the end, merged into the previous batch when it matches.
    fn push_quads_draw(&mut self, texture: TextureKey, start: u32, scissor: Option<[u32; 4]>) {
        let end = self.next_index();
        if end == start {
            return;
        }
        if let Some(Draw { kind: DrawKind::Quads { texture: prev, vertices }, scissor: prev_scissor }) = self.draws.last_mut() {
            if *prev == texture && *prev_scissor == scissor && vertices.end == start {
                vertices.end = end;
                return;
            }
        }
        self.draws.push(Draw { kind: DrawKind::Quads { texture, vertices: start..end }, scissor });
    }
}

fn cmd_scissor(cmd: &DrawCmd) -> Option<crate::transform::Rect> {
    match cmd {
        DrawCmd::Fill { scissor, .. } | DrawCmd::Image { scissor, .. } | DrawCmd::Text { scissor, .. } => *scissor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::resources::ImageId;
    use crate::transform::Rect;

    /// One 10x10 glyph per character.
    struct BoxGlyphs;

    impl TextLayout for BoxGlyphs {
        fn layout(&self, _font: FontId, text: &str, origin: Vec2, _size: f32, _align: TextAlign) -> Vec<GlyphQuad> {
            text.chars()
                .enumerate()
                .map(|(i, _)| {
                    let min = origin + Vec2::new(i as f32 * 10.0, -10.0);
                    GlyphQuad { min, max: min + Vec2::splat(10.0), uv_min: Vec2::ZERO, uv_max: Vec2::ONE }
                })
                .collect()
        }
    }

    #[test]
    fn vertex_is_64_bytes() {
        assert_eq!(std::mem::size_of::<OverlayVertex>(), 64);
    }

    #[test]
    fn fill_fans_each_contour_then_covers_bounds() {
        let mut c = Canvas::new((100, 100));
        c.fill_polygon(
            &[Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0), Vec2::new(0.0, 10.0), Vec2::new(5.0, 5.0)],
            Paint::Solid(Color::WHITE),
        );
        let t = Tessellation::build(&c.finish(), &BoxGlyphs);
        assert_eq!(t.draws.len(), 1);
        let DrawKind::Fill { stencil, cover } = &t.draws[0].kind else { panic!() };
        assert_eq!(stencil.len(), 3 * 3);
        assert_eq!(cover.len(), 6);
        assert_eq!(t.vertices[cover.start as usize + 2].pos, [10.0, 10.0]);
    }

    #[test]
    fn gradient_travels_with_vertices() {
        let mut c = Canvas::new((100, 100));
        let paint = Paint::LinearGradient {
            start: Vec2::new(100.0, 100.0),
            end: Vec2::new(100.0, 40.0),
            inner: Color::WHITE,
            outer: Color::WHITE.with_alpha(0),
        };
        c.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0), paint);
        let t = Tessellation::build(&c.finish(), &BoxGlyphs);
        let v = t.vertices[0];
        assert_eq!(v.grad, [100.0, 100.0, 100.0, 40.0]);
        assert_eq!(v.color2[3], 0.0);
    }

    #[test]
    fn consecutive_text_merges_into_one_batch() {
        let mut c = Canvas::new((100, 100));
        c.text(0.0, 20.0, "ab", 10.0, Color::WHITE, FontId::SansRegular, TextAlign::LEFT_BASELINE);
        c.text(0.0, 40.0, "c", 10.0, Color::WHITE, FontId::SansRegular, TextAlign::LEFT_BASELINE);
        c.text(0.0, 60.0, "d", 10.0, Color::WHITE, FontId::SansBold, TextAlign::LEFT_BASELINE);
        let t = Tessellation::build(&c.finish(), &BoxGlyphs);
        assert_eq!(t.draws.len(), 2);
        let DrawKind::Quads { texture, vertices } = &t.draws[0].kind else { panic!() };
        assert_eq!(*texture, TextureKey::Font(FontId::SansRegular));
        assert_eq!(vertices.len(), 3 * 6);
    }

    #[test]
    fn fully_clipped_commands_are_dropped() {
        let mut c = Canvas::new((100, 100));
        c.scissor(Rect::new(200.0, 200.0, 10.0, 10.0));
        c.image(Rect::new(0.0, 0.0, 10.0, 10.0), ImageId::Wheel, 1.0);
        c.reset_scissor();
        c.image(Rect::new(0.0, 0.0, 10.0, 10.0), ImageId::Wheel, 0.5);
        let t = Tessellation::build(&c.finish(), &BoxGlyphs);
        assert_eq!(t.draws.len(), 1);
        assert_eq!(t.draws[0].scissor, None);
        assert_eq!(t.vertices[0].color[3], 0.5);
    }
}
