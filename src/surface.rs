//! Drawing surface abstraction shared by the PDF and raster backends.
//!
//! Coordinates are millimetres from the top-left corner of the page (or
//! canvas); font sizes are points. Every backend supplies its own text
//! measurement, which the renderer feeds to [`crate::fonts::fit_text`].

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fonts::{FontManager, Weight};
use crate::images::LabelImage;

/// Millimetres per PDF point.
pub const MM_PER_PT: f32 = 25.4 / 72.0;

pub fn mm_from_pt(pt: f32) -> f32 {
    pt * MM_PER_PT
}

/// Axis-aligned rectangle in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

/// RGB colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Self = Self::gray(0.0);
    pub const WHITE: Self = Self::gray(1.0);
    /// Secondary text (reference line, captions).
    pub const MUTED: Self = Self::gray(0.4);
    pub const BORDER: Self = Self::gray(0.75);
    pub const PLACEHOLDER: Self = Self::gray(0.93);

    pub const fn gray(v: f32) -> Self {
        Self { r: v, g: v, b: v }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), 255]
    }
}

/// Font selection for one run of text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Size in points.
    pub size: f32,
    pub weight: Weight,
    pub color: Color,
}

impl TextStyle {
    pub const fn regular(size: f32) -> Self {
        Self {
            size,
            weight: Weight::Regular,
            color: Color::BLACK,
        }
    }

    pub const fn bold(size: f32) -> Self {
        Self {
            size,
            weight: Weight::Bold,
            color: Color::BLACK,
        }
    }

    pub const fn with_color(self, color: Color) -> Self {
        Self { color, ..self }
    }
}

/// A sink for label drawing operations.
pub trait Surface {
    /// Width of `text` in millimetres when drawn with `style`.
    fn measure_text(&self, text: &str, style: &TextStyle) -> f32;

    /// Outline `rect` with a line `width` millimetres thick.
    fn stroke_rect(&mut self, rect: Rect, width: f32, color: Color);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Draw a single line of text with its left edge at `x` and its
    /// baseline at `baseline`.
    fn draw_text(&mut self, text: &str, x: f32, baseline: f32, style: &TextStyle);

    /// Draw `image` stretched to `rect`.
    fn draw_image(&mut self, image: &LabelImage, rect: Rect) -> Result<()>;

    /// Commit the current page. Single-page surfaces ignore this.
    fn end_page(&mut self) {}
}

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    StrokeRect { rect: Rect, width: f32, color: Color },
    FillRect { rect: Rect, color: Color },
    Text { text: String, x: f32, baseline: f32, style: TextStyle },
    Image { key: String, rect: Rect },
    EndPage,
}

/// Surface that records operations instead of drawing them. Measures with
/// the built-in Helvetica metrics, like the PDF backend.
#[derive(Default)]
pub struct RecordingSurface {
    pub ops: Vec<DrawOp>,
    fonts: FontManager,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// All text strings drawn so far, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Split the recording into pages at each `EndPage`.
    pub fn pages(&self) -> Vec<&[DrawOp]> {
        self.ops
            .split(|op| *op == DrawOp::EndPage)
            .collect::<Vec<_>>()
            .split_last()
            .map(|(_, pages)| pages.to_vec())
            .unwrap_or_default()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.ops).unwrap_or_default()
    }
}

impl Surface for RecordingSurface {
    fn measure_text(&self, text: &str, style: &TextStyle) -> f32 {
        mm_from_pt(self.fonts.measure_text_width(text, style.size, style.weight))
    }

    fn stroke_rect(&mut self, rect: Rect, width: f32, color: Color) {
        self.ops.push(DrawOp::StrokeRect { rect, width, color });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }

    fn draw_text(&mut self, text: &str, x: f32, baseline: f32, style: &TextStyle) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            x,
            baseline,
            style: *style,
        });
    }

    fn draw_image(&mut self, image: &LabelImage, rect: Rect) -> Result<()> {
        self.ops.push(DrawOp::Image {
            key: image.key().to_string(),
            rect,
        });
        Ok(())
    }

    fn end_page(&mut self) {
        self.ops.push(DrawOp::EndPage);
    }
}
