//! Raster backend – a [`Surface`] that paints straight into an RGBA canvas.
//!
//! Geometry arrives in millimetres and is scaled by the canvas DPI. Text is
//! measured with the shared [`FontManager`] and rasterised with `ab_glyph`.
//! Without a loaded TTF face the glyphs come from the Helvetica subsets that
//! printpdf embeds for its built-in fonts, so the preview shows the same
//! typeface as the PDF.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use printpdf::BuiltinFont;

use crate::error::{LabelError, Result};
use crate::fonts::{FontManager, Weight};
use crate::images::{ImageKind, LabelImage};
use crate::surface::{Color, Rect, Surface, TextStyle};

/// A face ready for glyph rasterisation.
#[derive(Clone)]
struct GlyphFace {
    font: FontArc,
    /// Char to glyph table for subset faces that carry no usable cmap.
    glyph_map: Option<Arc<HashMap<char, GlyphId>>>,
}

impl GlyphFace {
    fn glyph_id(&self, ch: char) -> GlyphId {
        match &self.glyph_map {
            Some(map) => map.get(&ch).copied().unwrap_or(GlyphId(0)),
            None => self.font.glyph_id(ch),
        }
    }
}

static HELVETICA: OnceLock<Option<GlyphFace>> = OnceLock::new();
static HELVETICA_BOLD: OnceLock<Option<GlyphFace>> = OnceLock::new();

/// Built-in Helvetica outlines for `weight`, decoded once per process.
fn builtin_face(weight: Weight) -> Option<GlyphFace> {
    let (slot, builtin) = match weight {
        Weight::Regular => (&HELVETICA, BuiltinFont::Helvetica),
        Weight::Bold => (&HELVETICA_BOLD, BuiltinFont::HelveticaBold),
    };
    slot.get_or_init(|| {
        let subset = builtin.get_subset_font();
        let glyph_map: HashMap<char, GlyphId> = subset
            .glyph_mapping
            .values()
            .map(|&(gid, ch)| (ch, GlyphId(gid)))
            .collect();
        match FontArc::try_from_vec(subset.bytes) {
            Ok(font) => Some(GlyphFace {
                font,
                glyph_map: Some(Arc::new(glyph_map)),
            }),
            Err(e) => {
                log::warn!("Built-in {weight:?} face unusable for rasterising: {e}");
                None
            }
        }
    })
    .clone()
}

/// Single-page pixel canvas.
pub struct RasterSurface {
    canvas: RgbaImage,
    dpi: f32,
    fonts: FontManager,
    /// Faces loaded from TTF bytes; the built-in face covers the rest.
    glyphs: HashMap<Weight, GlyphFace>,
    warned_no_glyphs: bool,
}

impl RasterSurface {
    /// White canvas of `width` × `height` mm at `dpi`.
    pub fn new(width: f32, height: f32, dpi: f32, fonts: FontManager) -> Result<Self> {
        if !(dpi.is_finite() && dpi > 0.0) {
            return Err(LabelError::Geometry(format!("invalid DPI {dpi}")));
        }
        let px_per_mm = dpi / 25.4;
        let w = (width * px_per_mm).round();
        let h = (height * px_per_mm).round();
        if !(w >= 1.0 && h >= 1.0) {
            return Err(LabelError::Geometry(format!(
                "canvas {width}x{height} mm is empty at {dpi} dpi"
            )));
        }

        let mut glyphs = HashMap::new();
        for weight in [Weight::Regular, Weight::Bold] {
            if let Some(bytes) = fonts.font_bytes(weight) {
                let font = FontArc::try_from_vec(bytes.to_vec())
                    .map_err(|e| LabelError::Font(format!("Failed to load glyphs: {e}")))?;
                glyphs.insert(
                    weight,
                    GlyphFace {
                        font,
                        glyph_map: None,
                    },
                );
            }
        }

        Ok(Self {
            canvas: RgbaImage::from_pixel(w as u32, h as u32, Rgba(Color::WHITE.to_rgba8())),
            dpi,
            fonts,
            glyphs,
            warned_no_glyphs: false,
        })
    }

    fn px_per_mm(&self) -> f32 {
        self.dpi / 25.4
    }

    /// Font size in pixels for a size in points.
    fn px_size(&self, pt: f32) -> f32 {
        pt * self.dpi / 72.0
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn into_image(self) -> RgbaImage {
        self.canvas
    }

    /// Pixel span `[start, end)` for a millimetre interval, clamped to `limit`.
    fn span(&self, start: f32, len: f32, limit: u32) -> (u32, u32) {
        let ppm = self.px_per_mm();
        let a = (start * ppm).round().clamp(0.0, limit as f32) as u32;
        let b = ((start + len) * ppm).round().clamp(0.0, limit as f32) as u32;
        (a, b.max(a))
    }

    fn fill_px(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, color: [u8; 4]) {
        for y in y0..y1.min(self.canvas.height()) {
            for x in x0..x1.min(self.canvas.width()) {
                self.canvas.put_pixel(x, y, Rgba(color));
            }
        }
    }
}

/// Blend `color` over the pixel at (`x`, `y`) with `coverage` in 0..=1.
fn blend(canvas: &mut RgbaImage, x: i64, y: i64, color: [u8; 4], coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let coverage = coverage.clamp(0.0, 1.0);
    let px = canvas.get_pixel_mut(x as u32, y as u32);
    for i in 0..3 {
        let under = px.0[i] as f32;
        px.0[i] = (under + (color[i] as f32 - under) * coverage).round() as u8;
    }
}

impl Surface for RasterSurface {
    fn measure_text(&self, text: &str, style: &TextStyle) -> f32 {
        let px = self
            .fonts
            .measure_text_width(text, self.px_size(style.size), style.weight);
        px / self.px_per_mm()
    }

    fn stroke_rect(&mut self, rect: Rect, width: f32, color: Color) {
        let t = (width * self.px_per_mm()).round().max(1.0);
        let (x0, x1) = self.span(rect.x, rect.width, self.canvas.width());
        let (y0, y1) = self.span(rect.y, rect.height, self.canvas.height());
        let t = t as u32;
        let c = color.to_rgba8();
        self.fill_px(x0, y0, x1, (y0 + t).min(y1), c);
        self.fill_px(x0, y1.saturating_sub(t).max(y0), x1, y1, c);
        self.fill_px(x0, y0, (x0 + t).min(x1), y1, c);
        self.fill_px(x1.saturating_sub(t).max(x0), y0, x1, y1, c);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let (x0, x1) = self.span(rect.x, rect.width, self.canvas.width());
        let (y0, y1) = self.span(rect.y, rect.height, self.canvas.height());
        self.fill_px(x0, y0, x1, y1, color.to_rgba8());
    }

    fn draw_text(&mut self, text: &str, x: f32, baseline: f32, style: &TextStyle) {
        let face = match self.glyphs.get(&style.weight) {
            Some(face) => Some(face.clone()),
            None => builtin_face(style.weight),
        };
        let Some(face) = face else {
            if !self.warned_no_glyphs {
                log::warn!("No glyph outlines available; preview text is not painted");
                self.warned_no_glyphs = true;
            }
            return;
        };
        let font = &face.font;

        // PxScale is the ascent-to-descent height; convert from an em size.
        let em_px = self.px_size(style.size);
        let scale = PxScale::from(
            font.units_per_em()
                .map(|upem| em_px * font.height_unscaled() / upem)
                .unwrap_or(em_px),
        );
        let color = style.color.to_rgba8();
        let ppm = self.px_per_mm();
        let baseline_px = baseline * ppm;
        let mut caret = x * ppm;
        let mut buf = [0u8; 4];

        for ch in text.chars() {
            let glyph = face
                .glyph_id(ch)
                .with_scale_and_position(scale, point(caret, baseline_px));
            // Advance by the measured width, not the face's own advance.
            caret += self
                .fonts
                .measure_text_width(ch.encode_utf8(&mut buf), em_px, style.weight);

            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                let canvas = &mut self.canvas;
                outlined.draw(|gx, gy, coverage| {
                    blend(
                        canvas,
                        bounds.min.x as i64 + gx as i64,
                        bounds.min.y as i64 + gy as i64,
                        color,
                        coverage,
                    );
                });
            }
        }
    }

    fn draw_image(&mut self, image: &LabelImage, rect: Rect) -> Result<()> {
        let ppm = self.px_per_mm();
        let w = (rect.width * ppm).round();
        let h = (rect.height * ppm).round();
        if !(w >= 1.0 && h >= 1.0) {
            return Err(LabelError::ImageDraw(format!(
                "{}: target {}x{} mm is too small",
                image.key(),
                rect.width,
                rect.height
            )));
        }

        let filter = match image.kind() {
            ImageKind::Photo => FilterType::Triangle,
            ImageKind::Symbol => FilterType::Nearest,
        };
        let resized = imageops::resize(&image.pixels().to_rgba8(), w as u32, h as u32, filter);
        imageops::overlay(
            &mut self.canvas,
            &resized,
            (rect.x * ppm).round() as i64,
            (rect.y * ppm).round() as i64,
        );
        Ok(())
    }
}
