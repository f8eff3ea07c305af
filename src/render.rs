//! PDF backend – a [`Surface`] that emits `printpdf` (v0.8 ops-based API)
//! operations, one `PdfPage` per committed page.

use std::collections::HashMap;
use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb as RgbPixel, RgbImage};
use printpdf::{
    BuiltinFont, Color as PdfColor, Line, LinePoint, Mm, Op, PaintMode, PdfDocument, PdfPage,
    PdfSaveOptions, PdfWarnMsg, Point, Polygon, PolygonRing, Pt, RawImage, Rgb, TextItem,
    WindingOrder, XObjectId, XObjectTransform,
};

use crate::error::{LabelError, Result};
use crate::fonts::{FontManager, Weight};
use crate::images::LabelImage;
use crate::surface::{mm_from_pt, Color, Rect, Surface, TextStyle};

/// PDF points per millimetre.
const PT_PER_MM: f32 = 72.0 / 25.4;

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Multi-page PDF drawing surface.
pub struct PdfSurface {
    doc: PdfDocument,
    pages: Vec<PdfPage>,
    ops: Vec<Op>,
    page_width: f32,
    page_height: f32,
    fonts: FontManager,
    /// Embedded images by [`LabelImage::key`]; each is written once.
    images: HashMap<String, ImageResource>,
    warnings: Vec<PdfWarnMsg>,
}

impl PdfSurface {
    /// New document with pages of `page_width` × `page_height` mm.
    pub fn new(title: &str, page_width: f32, page_height: f32) -> Self {
        Self {
            doc: PdfDocument::new(title),
            pages: Vec::new(),
            ops: Vec::new(),
            page_width,
            page_height,
            fonts: FontManager::builtin(),
            images: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Pages committed so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Distinct images embedded so far.
    pub fn embedded_images(&self) -> usize {
        self.images.len()
    }

    /// Commit any pending page and serialise the document.
    pub fn finish(mut self) -> Vec<u8> {
        if !self.ops.is_empty() {
            self.end_page();
        }
        // Ensure at least one page.
        if self.pages.is_empty() {
            self.pages
                .push(PdfPage::new(Mm(self.page_width), Mm(self.page_height), Vec::new()));
        }

        let pages = std::mem::take(&mut self.pages);
        self.doc.with_pages(pages);
        let bytes = self.doc.save(&PdfSaveOptions::default(), &mut self.warnings);
        if !self.warnings.is_empty() {
            log::debug!("printpdf reported {} warning(s)", self.warnings.len());
        }
        bytes
    }

    /// Top-left millimetres → bottom-left PDF points.
    fn to_pdf(&self, x: f32, y: f32) -> Point {
        Point {
            x: Pt(x * PT_PER_MM),
            y: Pt((self.page_height - y) * PT_PER_MM),
        }
    }

    fn rect_points(&self, rect: Rect) -> Vec<LinePoint> {
        [
            (rect.x, rect.y),
            (rect.right(), rect.y),
            (rect.right(), rect.bottom()),
            (rect.x, rect.bottom()),
        ]
        .into_iter()
        .map(|(x, y)| LinePoint {
            p: self.to_pdf(x, y),
            bezier: false,
        })
        .collect()
    }

    /// Embed `image` on first use and return its resource.
    fn resource(&mut self, image: &LabelImage) -> Result<&ImageResource> {
        if !self.images.contains_key(image.key()) {
            let flat = flatten_on_white(image.pixels());
            let (px_width, px_height) = flat.dimensions();

            let mut png = Vec::new();
            DynamicImage::ImageRgb8(flat)
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .map_err(|e| LabelError::ImageDraw(format!("{}: {e}", image.key())))?;
            let raw = RawImage::decode_from_bytes(&png, &mut self.warnings)
                .map_err(|e| LabelError::ImageDraw(format!("{}: PDF encode error: {e}", image.key())))?;
            let xobj_id = self.doc.add_image(&raw);

            self.images.insert(
                image.key().to_string(),
                ImageResource {
                    xobj_id,
                    px_width,
                    px_height,
                },
            );
        }
        self.images
            .get(image.key())
            .ok_or_else(|| LabelError::ImageDraw(format!("{}: not embedded", image.key())))
    }
}

fn pdf_rgb(color: Color) -> PdfColor {
    PdfColor::Rgb(Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
        icc_profile: None,
    })
}

fn builtin_font(weight: Weight) -> BuiltinFont {
    match weight {
        Weight::Regular => BuiltinFont::Helvetica,
        Weight::Bold => BuiltinFont::HelveticaBold,
    }
}

/// Composite any alpha channel over white; PDF image XObjects here are RGB.
fn flatten_on_white(source: &DynamicImage) -> RgbImage {
    if !source.color().has_alpha() {
        return source.to_rgb8();
    }
    let rgba = source.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u16;
        let over = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        RgbPixel([over(r), over(g), over(b)])
    })
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF).
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{00A0}' => 0x20,
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for the 0x80-0xFF range; printpdf passes
    // these bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

impl Surface for PdfSurface {
    fn measure_text(&self, text: &str, style: &TextStyle) -> f32 {
        mm_from_pt(self.fonts.measure_text_width(text, style.size, style.weight))
    }

    fn stroke_rect(&mut self, rect: Rect, width: f32, color: Color) {
        let points = self.rect_points(rect);
        self.ops.push(Op::SetOutlineColor {
            col: pdf_rgb(color),
        });
        self.ops.push(Op::SetOutlineThickness {
            pt: Pt(width * PT_PER_MM),
        });
        self.ops.push(Op::DrawLine {
            line: Line {
                points,
                is_closed: true,
            },
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let points = self.rect_points(rect);
        self.ops.push(Op::SetFillColor {
            col: pdf_rgb(color),
        });
        self.ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing { points }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    fn draw_text(&mut self, text: &str, x: f32, baseline: f32, style: &TextStyle) {
        if text.is_empty() {
            return;
        }
        let font = builtin_font(style.weight);
        let pos = self.to_pdf(x, baseline);

        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetTextCursor { pos });
        self.ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(style.size),
            font,
        });
        self.ops.push(Op::SetFillColor {
            col: pdf_rgb(style.color),
        });
        self.ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(to_winlatin(text))],
            font,
        });
        self.ops.push(Op::EndTextSection);
    }

    fn draw_image(&mut self, image: &LabelImage, rect: Rect) -> Result<()> {
        let page_height = self.page_height;
        let res = self.resource(image)?;

        // At dpi=72 printpdf renders 1 px = 1 pt, so scale = desired_pt / px_dim.
        let scale_x = if res.px_width > 0 {
            rect.width * PT_PER_MM / res.px_width as f32
        } else {
            1.0
        };
        let scale_y = if res.px_height > 0 {
            rect.height * PT_PER_MM / res.px_height as f32
        } else {
            1.0
        };
        let op = Op::UseXobject {
            id: res.xobj_id.clone(),
            transform: XObjectTransform {
                translate_x: Some(Pt(rect.x * PT_PER_MM)),
                // PDF origin is bottom-left: translate to the image's bottom edge.
                translate_y: Some(Pt((page_height - rect.bottom()) * PT_PER_MM)),
                dpi: Some(72.0),
                scale_x: Some(scale_x),
                scale_y: Some(scale_y),
                rotate: None,
            },
        };
        self.ops.push(op);
        Ok(())
    }

    fn end_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.pages
            .push(PdfPage::new(Mm(self.page_width), Mm(self.page_height), ops));
        log::debug!("Committed PDF page {}", self.pages.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::ImageKind;
    use image::{Rgba, RgbaImage};

    #[test]
    fn render_empty_document() {
        let surface = PdfSurface::new("empty", 210.0, 297.0);
        let bytes = surface.finish();
        assert!(bytes.len() > 100, "PDF should have content");
        // PDF magic number
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn pages_are_committed_in_order() {
        let mut surface = PdfSurface::new("pages", 210.0, 297.0);
        surface.stroke_rect(Rect::new(0.0, 4.5, 70.0, 36.0), 0.2, Color::BORDER);
        surface.end_page();
        surface.draw_text("second", 10.0, 10.0, &TextStyle::regular(8.0));
        surface.end_page();
        assert_eq!(surface.page_count(), 2);
        let bytes = surface.finish();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn images_are_embedded_once() {
        let mut surface = PdfSurface::new("images", 210.0, 297.0);
        let img = LabelImage::new(
            "photo:A",
            ImageKind::Photo,
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 128]))),
        );
        surface.draw_image(&img, Rect::new(5.0, 5.0, 12.0, 8.0)).unwrap();
        surface.draw_image(&img, Rect::new(80.0, 5.0, 12.0, 8.0)).unwrap();
        assert_eq!(surface.embedded_images(), 1);
        assert!(surface.finish().len() > 100);
    }

    #[test]
    fn alpha_is_flattened_on_white() {
        let clear = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])));
        assert_eq!(flatten_on_white(&clear).get_pixel(0, 0).0, [255, 255, 255]);
        let solid = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([9, 8, 7, 255])));
        assert_eq!(flatten_on_white(&solid).get_pixel(0, 0).0, [9, 8, 7]);
    }

    #[test]
    fn winlatin_maps_label_glyphs() {
        assert_eq!(to_winlatin("12 \u{20AC}").as_bytes(), &[b'1', b'2', b' ', 0x80]);
        assert_eq!(to_winlatin("a\u{2026}").as_bytes(), &[b'a', 0x85]);
        assert_eq!(to_winlatin("\u{e9}").as_bytes(), &[0xE9]);
        assert_eq!(to_winlatin("\u{4e2d}").as_bytes(), b"?");
    }

    #[test]
    fn y_axis_is_flipped() {
        let surface = PdfSurface::new("t", 210.0, 297.0);
        let p = surface.to_pdf(0.0, 297.0);
        assert!(p.y.0.abs() < 1e-3);
        let p = surface.to_pdf(25.4, 0.0);
        assert!((p.x.0 - 72.0).abs() < 1e-3);
    }
}
