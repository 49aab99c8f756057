//! Glyph atlas rasterized once per font with rusttype; text is laid out by scaling atlas glyphs.

use std::collections::HashMap;
use std::path::Path;

use glam::Vec2;
use rusttype::{point, Font, Scale};

use crate::canvas::{HAlign, TextAlign, VAlign};
use crate::error::{Result, RoadliteError};

/// Pixel size glyphs are rasterized at.
pub const ATLAS_PX: f32 = 96.0;
const ATLAS_WIDTH: u32 = 1024;
const PADDING: u32 = 2;

#[derive(Clone, Copy, Debug)]
struct GlyphInfo {
    uv_min: Vec2,
    uv_max: Vec2,
    /// Top-left of the glyph bitmap relative to the pen on the baseline, atlas pixels.
    offset: Vec2,
    size: Vec2,
    advance: f32,
}

/// One glyph quad in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphQuad {
    pub min: Vec2,
    pub max: Vec2,
    pub uv_min: Vec2,
    pub uv_max: Vec2,
}

pub struct FontAtlas {
    glyphs: HashMap<char, GlyphInfo>,
    ascent: f32,
    descent: f32,
    width: u32,
    height: u32,
    /// RGBA8, white with coverage in alpha.
    pixels: Vec<u8>,
}

fn charset() -> impl Iterator<Item = char> {
    (' '..='~').chain(['°'])
}

impl FontAtlas {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|source| RoadliteError::AssetIo { path: path.to_path_buf(), source })?;
        let font = Font::try_from_vec(data).ok_or_else(|| RoadliteError::InvalidFont(path.to_path_buf()))?;
        Ok(Self::rasterize(&font))
    }

    fn rasterize(font: &Font<'_>) -> Self {
        let scale = Scale::uniform(ATLAS_PX);
        let v = font.v_metrics(scale);

        // First pass: place glyphs in rows.
        let mut placed = Vec::new();
        let (mut x, mut y, mut row_h) = (PADDING, PADDING, 0u32);
        for c in charset() {
            let glyph = font.glyph(c).scaled(scale);
            let advance = glyph.h_metrics().advance_width;
            let glyph = glyph.positioned(point(0.0, 0.0));
            let Some(bb) = glyph.pixel_bounding_box() else {
                placed.push((c, glyph, advance, None));
                continue;
            };
            let (w, h) = (bb.width() as u32, bb.height() as u32);
            if x + w + PADDING > ATLAS_WIDTH {
                x = PADDING;
                y += row_h + PADDING;
                row_h = 0;
            }
            placed.push((c, glyph, advance, Some((x, y, w, h, bb.min.x, bb.min.y))));
            x += w + PADDING;
            row_h = row_h.max(h);
        }
        let height = (y + row_h + PADDING).next_power_of_two();
        let width = ATLAS_WIDTH;

        // Second pass: draw coverage.
        let mut pixels = vec![0u8; (width * height * 4) as usize];
        for px in pixels.chunks_exact_mut(4) {
            px[0] = 255;
            px[1] = 255;
            px[2] = 255;
        }
        let mut glyphs = HashMap::new();
        for (c, glyph, advance, slot) in placed {
            let info = match slot {
                Some((gx, gy, w, h, min_x, min_y)) => {
                    glyph.draw(|dx, dy, cov| {
                        let idx = (((gy + dy) * width + gx + dx) * 4 + 3) as usize;
                        pixels[idx] = (cov * 255.0).round() as u8;
                    });
                    GlyphInfo {
                        uv_min: Vec2::new(gx as f32 / width as f32, gy as f32 / height as f32),
                        uv_max: Vec2::new((gx + w) as f32 / width as f32, (gy + h) as f32 / height as f32),
                        offset: Vec2::new(min_x as f32, min_y as f32),
                        size: Vec2::new(w as f32, h as f32),
                        advance,
                    }
                }
                None => GlyphInfo { uv_min: Vec2::ZERO, uv_max: Vec2::ZERO, offset: Vec2::ZERO, size: Vec2::ZERO, advance },
            };
            glyphs.insert(c, info);
        }
        log::debug!("font atlas {}x{} with {} glyphs", width, height, glyphs.len());
        Self { glyphs, ascent: v.ascent, descent: v.descent, width, height, pixels }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn glyph(&self, c: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&c).or_else(|| self.glyphs.get(&'?'))
    }

    /// Advance width of `text` at `size` pixels.
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        let s = size / ATLAS_PX;
        text.chars().filter_map(|c| self.glyph(c)).map(|g| g.advance * s).sum()
    }

    /// Screen quads for `text` anchored at `origin` with the given alignment.
    pub fn layout(&self, text: &str, origin: Vec2, size: f32, align: TextAlign) -> Vec<GlyphQuad> {
        let s = size / ATLAS_PX;
        let mut pen = origin;
        if align.h == HAlign::Center {
            pen.x -= self.measure(text, size) / 2.0;
        }
        if align.v == VAlign::Middle {
            pen.y += (self.ascent + self.descent) / 2.0 * s;
        }
        let mut quads = Vec::with_capacity(text.len());
        for c in text.chars() {
            let Some(g) = self.glyph(c) else { continue };
            if g.size.x > 0.0 {
                let min = pen + g.offset * s;
                quads.push(GlyphQuad { min, max: min + g.size * s, uv_min: g.uv_min, uv_max: g.uv_max });
            }
            pen.x += g.advance * s;
        }
        quads
    }
}
