//! Label templates – the fixed drawing sequence for one product in one cell.
//!
//! Every template is written once against [`Surface`]; text is measured on
//! the active surface and truncated with [`fit_text`]. Image and barcode
//! failures only degrade the label they belong to.
//!
//! Offsets below are millimetres from the cell's top-left corner and are laid
//! out for the 70 × 36 mm cell; horizontal extents follow the cell width.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::barcode::{BarcodeCache, MODULE_WIDTH_PX, SYMBOL_HEIGHT_PX};
use crate::fonts::fit_text;
use crate::images::{ImageKind, LabelImage};
use crate::layout_config::LabelStyle;
use crate::price;
use crate::product::ProductRecord;
use crate::surface::{mm_from_pt, Color, Rect, Surface, TextStyle};

/// Caption drawn inside the image placeholder.
pub const NO_IMAGE: &str = "No Image";

const PADDING: f32 = 2.0;
const BORDER_WIDTH: f32 = 0.2;
/// Helvetica cap height as a fraction of the font size.
const CAP_HEIGHT: f32 = 0.718;
const PLACEHOLDER_CAPTION_PT: f32 = 5.0;

// Compact
const COMPACT_IMAGE: f32 = 12.0;
const COMPACT_PRICE_RESERVE: f32 = 18.0;
const COMPACT_DESIGNATION: TextStyle = TextStyle::bold(8.0);
const COMPACT_DESIGNATION_BASELINE: f32 = 5.5;
const COMPACT_REFERENCE: TextStyle = TextStyle::regular(6.0).with_color(Color::MUTED);
const COMPACT_REFERENCE_BASELINE: f32 = 9.0;
const COMPACT_PRICE: TextStyle = TextStyle::bold(10.0);
const COMPACT_PRICE_BASELINE: f32 = 6.0;
const COMPACT_QUANTITY: TextStyle = TextStyle::regular(6.0).with_color(Color::MUTED);
const COMPACT_QUANTITY_BASELINE: f32 = 10.5;
const COMPACT_SYMBOL_INSET: f32 = 5.0;
const COMPACT_SYMBOL_TOP: f32 = 16.0;
const COMPACT_SYMBOL_HEIGHT: f32 = 11.0;
const COMPACT_CAPTION: TextStyle = TextStyle::regular(6.0);
const COMPACT_CAPTION_BASELINE: f32 = 30.5;

// Branded
const BODY_PT: f32 = 7.0;
const BRAND_PRIMARY: TextStyle = TextStyle::bold(9.0);
const BRAND_PRIMARY_BASELINE: f32 = 5.0;
const BRAND_SECONDARY: TextStyle = TextStyle::regular(5.0).with_color(Color::MUTED);
const BRAND_SECONDARY_BASELINE: f32 = 7.5;
const BRAND_MAX_WIDTH: f32 = 24.0;
const REFERENCE_LABEL: &str = "Ref:";
const REF_BLOCK: TextStyle = TextStyle::regular(5.5);
const REF_BLOCK_CODE: TextStyle = TextStyle::regular(5.5).with_color(Color::MUTED);
const REF_BLOCK_BASELINE: f32 = 4.0;
const REF_BLOCK_CODE_BASELINE: f32 = 6.5;
const REF_BLOCK_MAX_WIDTH: f32 = 30.0;
const CORNER_SYMBOL_WIDTH: f32 = 26.0;
const CORNER_SYMBOL_TOP: f32 = 7.5;
const CORNER_SYMBOL_HEIGHT: f32 = 5.0;
const SLOT_TOP: f32 = 10.0;
const SLOT_WIDTH: f32 = 22.0;
const SLOT_HEIGHT: f32 = 20.0;
const BRANDED_DESIGNATION: TextStyle = TextStyle::bold(BODY_PT);
const BRANDED_DESIGNATION_BASELINE: f32 = 16.5;
const PRICE_BASELINE: f32 = 29.0;
const PRICE_INTEGER_SCALE: f32 = 4.0;
const PRICE_CURRENCY_SCALE: f32 = 3.0;
const PRICE_FRACTION_SCALE: f32 = 1.5;
/// Fraction baseline lift, as a fraction of the integer font size.
const PRICE_FRACTION_RISE: f32 = 0.4;
const BRANDED_QUANTITY: TextStyle = TextStyle::regular(5.5);
const BRANDED_QUANTITY_BASELINE: f32 = 34.0;

/// Visual layout of a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Template {
    /// Image, designation and price on top, full-width barcode at the bottom.
    #[default]
    Compact,
    /// Brand wordmark, product image and a large split price.
    BrandedImage,
    /// As `BrandedImage`, with the barcode in the image slot.
    BrandedNoImage,
}

impl Template {
    pub const ALL: [Template; 3] = [
        Template::Compact,
        Template::BrandedImage,
        Template::BrandedNoImage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Template::Compact => "compact",
            Template::BrandedImage => "branded-image",
            Template::BrandedNoImage => "branded-no-image",
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Template {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Template::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown template {s:?} (expected one of: compact, branded-image, branded-no-image)"
                )
            })
    }
}

/// What had to be degraded while drawing one label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelOutcome {
    /// The image slot shows the "No Image" placeholder.
    pub image_placeholder: bool,
    /// The barcode symbol (and its caption) was left out.
    pub barcode_omitted: bool,
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
    Right,
}

/// Draws labels; owns the barcode memo for one export or preview session.
pub struct LabelRenderer<'a> {
    style: &'a LabelStyle,
    barcodes: BarcodeCache,
}

impl<'a> LabelRenderer<'a> {
    pub fn new(style: &'a LabelStyle) -> Self {
        Self {
            style,
            barcodes: BarcodeCache::new(),
        }
    }

    /// Draw `product` into `cell` using `template`. `image` is the product's
    /// resolved photo, if any.
    pub fn render<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        product: &ProductRecord,
        cell: Rect,
        template: Template,
        image: Option<&LabelImage>,
    ) -> LabelOutcome {
        match template {
            Template::Compact => self.render_compact(surface, product, cell, image),
            Template::BrandedImage => self.render_branded(surface, product, cell, Some(image)),
            Template::BrandedNoImage => self.render_branded(surface, product, cell, None),
        }
    }

    fn render_compact<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        product: &ProductRecord,
        cell: Rect,
        image: Option<&LabelImage>,
    ) -> LabelOutcome {
        let mut outcome = LabelOutcome::default();
        surface.stroke_rect(cell, BORDER_WIDTH, Color::BORDER);

        let image_rect = Rect::new(
            cell.x + PADDING,
            cell.y + PADDING,
            COMPACT_IMAGE,
            COMPACT_IMAGE,
        );
        outcome.image_placeholder = draw_photo(surface, product, image, image_rect);

        let text_x = image_rect.right() + PADDING;
        let text_width = cell.right() - PADDING - COMPACT_PRICE_RESERVE - text_x;
        draw_fitted(
            surface,
            &product.designation,
            text_x,
            cell.y + COMPACT_DESIGNATION_BASELINE,
            text_width,
            &COMPACT_DESIGNATION,
            Align::Left,
        );
        draw_fitted(
            surface,
            &product.reference,
            text_x,
            cell.y + COMPACT_REFERENCE_BASELINE,
            text_width,
            &COMPACT_REFERENCE,
            Align::Left,
        );

        let right = cell.right() - PADDING;
        let price_text = price::format_with_currency(product.price, &self.style.currency);
        draw_fitted(
            surface,
            &price_text,
            right,
            cell.y + COMPACT_PRICE_BASELINE,
            COMPACT_PRICE_RESERVE - 1.0,
            &COMPACT_PRICE,
            Align::Right,
        );
        if product.quantity > 1 {
            draw_fitted(
                surface,
                &quantity_caption(product.quantity),
                right,
                cell.y + COMPACT_QUANTITY_BASELINE,
                COMPACT_PRICE_RESERVE - 1.0,
                &COMPACT_QUANTITY,
                Align::Right,
            );
        }

        let symbol_rect = Rect::new(
            cell.x + COMPACT_SYMBOL_INSET,
            cell.y + COMPACT_SYMBOL_TOP,
            cell.width - 2.0 * COMPACT_SYMBOL_INSET,
            COMPACT_SYMBOL_HEIGHT,
        );
        match self.symbol(product) {
            Some(symbol) if draw_symbol(surface, product, &symbol, symbol_rect) => {
                draw_fitted(
                    surface,
                    &product.barcode,
                    cell.center_x(),
                    cell.y + COMPACT_CAPTION_BASELINE,
                    symbol_rect.width,
                    &COMPACT_CAPTION,
                    Align::Center,
                );
            }
            _ => outcome.barcode_omitted = true,
        }

        outcome
    }

    /// Shared body of the branded templates. `photo` is `Some` for the
    /// image variant (holding the resolved image, if any) and `None` when the
    /// slot carries the barcode instead.
    fn render_branded<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        product: &ProductRecord,
        cell: Rect,
        photo: Option<Option<&LabelImage>>,
    ) -> LabelOutcome {
        let mut outcome = LabelOutcome::default();
        surface.stroke_rect(cell, BORDER_WIDTH, Color::BORDER);

        let left = cell.x + PADDING;
        draw_fitted(
            surface,
            &self.style.brand_primary,
            left,
            cell.y + BRAND_PRIMARY_BASELINE,
            BRAND_MAX_WIDTH,
            &BRAND_PRIMARY,
            Align::Left,
        );
        draw_fitted(
            surface,
            &self.style.brand_secondary,
            left,
            cell.y + BRAND_SECONDARY_BASELINE,
            BRAND_MAX_WIDTH,
            &BRAND_SECONDARY,
            Align::Left,
        );

        let right = cell.right() - PADDING;
        draw_fitted(
            surface,
            &format!("{REFERENCE_LABEL} {}", product.reference),
            right,
            cell.y + REF_BLOCK_BASELINE,
            REF_BLOCK_MAX_WIDTH,
            &REF_BLOCK,
            Align::Right,
        );

        let symbol = self.symbol(product);

        let slot = Rect::new(left, cell.y + SLOT_TOP, SLOT_WIDTH, SLOT_HEIGHT);
        let symbol_rect = match photo {
            Some(image) => {
                outcome.image_placeholder = draw_photo(surface, product, image, slot);
                Rect::new(
                    right - CORNER_SYMBOL_WIDTH,
                    cell.y + CORNER_SYMBOL_TOP,
                    CORNER_SYMBOL_WIDTH,
                    CORNER_SYMBOL_HEIGHT,
                )
            }
            None => slot,
        };
        let symbol_drawn = match &symbol {
            Some(symbol) => draw_symbol(surface, product, symbol, symbol_rect),
            None => false,
        };
        // The code under the reference goes with the symbol.
        if symbol_drawn {
            draw_fitted(
                surface,
                &product.barcode,
                right,
                cell.y + REF_BLOCK_CODE_BASELINE,
                REF_BLOCK_MAX_WIDTH,
                &REF_BLOCK_CODE,
                Align::Right,
            );
        }
        outcome.barcode_omitted = !symbol_drawn;

        let column = Rect::new(slot.right() + PADDING, cell.y, right - slot.right() - PADDING, cell.height);
        draw_fitted(
            surface,
            &product.designation,
            column.center_x(),
            cell.y + BRANDED_DESIGNATION_BASELINE,
            column.width,
            &BRANDED_DESIGNATION,
            Align::Center,
        );
        self.draw_split_price(surface, product.price, column, cell.y + PRICE_BASELINE);

        if product.quantity > 1 {
            draw_fitted(
                surface,
                &quantity_caption(product.quantity),
                left,
                cell.y + BRANDED_QUANTITY_BASELINE,
                cell.width / 2.0,
                &BRANDED_QUANTITY,
                Align::Left,
            );
        }

        outcome
    }

    /// Large integer, currency symbol, then the raised two-digit fraction,
    /// centred in `column`. Shrinks uniformly when wider than the column.
    fn draw_split_price<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        amount: f64,
        column: Rect,
        baseline: f32,
    ) {
        let parts = price::decompose(amount);
        let currency = self.style.currency.as_str();

        let styles = |scale: f32| {
            (
                TextStyle::bold(BODY_PT * PRICE_INTEGER_SCALE * scale),
                TextStyle::bold(BODY_PT * PRICE_CURRENCY_SCALE * scale),
                TextStyle::bold(BODY_PT * PRICE_FRACTION_SCALE * scale),
            )
        };
        let widths = |scale: f32| {
            let (integer, symbol, fraction) = styles(scale);
            let w_int = surface.measure_text(&parts.integer, &integer);
            let w_cur = surface.measure_text(currency, &symbol);
            let w_frac = if parts.has_fraction {
                surface.measure_text(&parts.fraction, &fraction)
            } else {
                0.0
            };
            (w_int, w_cur, w_frac)
        };

        let (w_int, w_cur, w_frac) = widths(1.0);
        let total = w_int + w_cur + w_frac;
        let scale = if total > column.width && total > 0.0 {
            column.width / total
        } else {
            1.0
        };
        let (w_int, w_cur, _) = widths(scale);
        let (integer, symbol, fraction) = styles(scale);
        let total = total * scale;

        let mut x = column.center_x() - total / 2.0;
        surface.draw_text(&parts.integer, x, baseline, &integer);
        x += w_int;
        if !currency.is_empty() {
            surface.draw_text(currency, x, baseline, &symbol);
        }
        x += w_cur;
        if parts.has_fraction {
            let rise = mm_from_pt(integer.size) * PRICE_FRACTION_RISE;
            surface.draw_text(&parts.fraction, x, baseline - rise, &fraction);
        }
    }

    /// Barcode symbol for `product`, or `None` (logged) when it cannot be
    /// encoded.
    fn symbol(&mut self, product: &ProductRecord) -> Option<LabelImage> {
        match self
            .barcodes
            .symbol(&product.barcode, MODULE_WIDTH_PX, SYMBOL_HEIGHT_PX)
        {
            Ok(symbol) => Some(symbol),
            Err(e) => {
                log::warn!("Label {}: {e}; omitting barcode", product.reference);
                None
            }
        }
    }
}

fn quantity_caption(quantity: u32) -> String {
    format!("Qty: {quantity}")
}

/// Fit `text` into `max_width` and draw it anchored at `x` per `align`.
/// Returns the drawn width.
fn draw_fitted<S: Surface + ?Sized>(
    surface: &mut S,
    text: &str,
    x: f32,
    baseline: f32,
    max_width: f32,
    style: &TextStyle,
    align: Align,
) -> f32 {
    let fit = fit_text(text, max_width, |s| surface.measure_text(s, style));
    if fit.text.is_empty() {
        return 0.0;
    }
    let left = match align {
        Align::Left => x,
        Align::Center => x - fit.width / 2.0,
        Align::Right => x - fit.width,
    };
    surface.draw_text(&fit.text, left, baseline, style);
    fit.width
}

/// Light-gray box with a centred muted caption.
fn draw_placeholder<S: Surface + ?Sized>(surface: &mut S, rect: Rect) {
    surface.fill_rect(rect, Color::PLACEHOLDER);
    let style = TextStyle::regular(PLACEHOLDER_CAPTION_PT).with_color(Color::MUTED);
    let baseline = rect.center_y() + mm_from_pt(style.size) * CAP_HEIGHT / 2.0;
    draw_fitted(
        surface,
        NO_IMAGE,
        rect.center_x(),
        baseline,
        rect.width - 1.0,
        &style,
        Align::Center,
    );
}

/// Draw the product photo scaled to fit inside `slot`, or the placeholder.
/// Returns true when the placeholder was used.
fn draw_photo<S: Surface + ?Sized>(
    surface: &mut S,
    product: &ProductRecord,
    image: Option<&LabelImage>,
    slot: Rect,
) -> bool {
    let Some(image) = image else {
        draw_placeholder(surface, slot);
        return true;
    };
    match surface.draw_image(image, contain(slot, image)) {
        Ok(()) => false,
        Err(e) => {
            log::warn!("Label {}: {e}; drawing placeholder", product.reference);
            draw_placeholder(surface, slot);
            true
        }
    }
}

/// Stretch the symbol over `rect`. Returns false (logged) on failure.
fn draw_symbol<S: Surface + ?Sized>(
    surface: &mut S,
    product: &ProductRecord,
    symbol: &LabelImage,
    rect: Rect,
) -> bool {
    debug_assert_eq!(symbol.kind(), ImageKind::Symbol);
    match surface.draw_image(symbol, rect) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Label {}: {e}; omitting barcode", product.reference);
            false
        }
    }
}

/// Largest rectangle with the image's aspect ratio centred in `slot`.
fn contain(slot: Rect, image: &LabelImage) -> Rect {
    let (w, h) = (image.width() as f32, image.height() as f32);
    if w <= 0.0 || h <= 0.0 {
        return slot;
    }
    let scale = (slot.width / w).min(slot.height / h);
    let (fw, fh) = (w * scale, h * scale);
    Rect::new(
        slot.x + (slot.width - fw) / 2.0,
        slot.y + (slot.height - fh) / 2.0,
        fw,
        fh,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LabelError, Result};
    use crate::surface::{DrawOp, RecordingSurface};
    use image::{DynamicImage, RgbImage};

    const CELL: Rect = Rect {
        x: 0.0,
        y: 4.5,
        width: 70.0,
        height: 36.0,
    };

    fn product() -> ProductRecord {
        ProductRecord::new("OIL-750", "3760123456789", "Extra virgin olive oil")
            .with_price(12.5)
            .with_quantity(3)
    }

    fn photo() -> LabelImage {
        LabelImage::new(
            "photo:OIL-750",
            ImageKind::Photo,
            DynamicImage::ImageRgb8(RgbImage::new(40, 20)),
        )
    }

    fn render(template: Template, product: &ProductRecord, image: Option<&LabelImage>) -> (RecordingSurface, LabelOutcome) {
        let style = LabelStyle::default();
        let mut renderer = LabelRenderer::new(&style);
        let mut surface = RecordingSurface::new();
        let outcome = renderer.render(&mut surface, product, CELL, template, image);
        (surface, outcome)
    }

    fn image_keys(surface: &RecordingSurface) -> Vec<(String, Rect)> {
        surface
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Image { key, rect } => Some((key.clone(), *rect)),
                _ => None,
            })
            .collect()
    }

    /// Surface whose image drawing always fails.
    struct BrokenImages(RecordingSurface);

    impl Surface for BrokenImages {
        fn measure_text(&self, text: &str, style: &TextStyle) -> f32 {
            self.0.measure_text(text, style)
        }
        fn stroke_rect(&mut self, rect: Rect, width: f32, color: Color) {
            self.0.stroke_rect(rect, width, color)
        }
        fn fill_rect(&mut self, rect: Rect, color: Color) {
            self.0.fill_rect(rect, color)
        }
        fn draw_text(&mut self, text: &str, x: f32, baseline: f32, style: &TextStyle) {
            self.0.draw_text(text, x, baseline, style)
        }
        fn draw_image(&mut self, image: &LabelImage, _rect: Rect) -> Result<()> {
            Err(LabelError::ImageDraw(format!("cannot draw {}", image.key())))
        }
    }

    #[test]
    fn template_names_roundtrip() {
        for t in Template::ALL {
            assert_eq!(t.to_string().parse::<Template>().unwrap(), t);
        }
        assert!("fancy".parse::<Template>().is_err());
        assert_eq!("Branded-Image".parse::<Template>().unwrap(), Template::BrandedImage);
    }

    #[test]
    fn compact_draws_everything() {
        let p = product();
        let img = photo();
        let (surface, outcome) = render(Template::Compact, &p, Some(&img));
        assert_eq!(outcome, LabelOutcome::default());

        assert!(matches!(surface.ops[0], DrawOp::StrokeRect { rect, .. } if rect == CELL));
        let texts = surface.texts();
        assert!(texts.contains(&"OIL-750"));
        assert!(texts.contains(&"12.50 \u{20AC}"));
        assert!(texts.contains(&"Qty: 3"));
        assert!(texts.contains(&"3760123456789"));
        assert!(!texts.contains(&NO_IMAGE));

        let images = image_keys(&surface);
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].0, "photo:OIL-750");
        // 40x20 photo contained in the 12 mm square keeps its 2:1 ratio.
        assert!((images[0].1.width - 12.0).abs() < 1e-4);
        assert!((images[0].1.height - 6.0).abs() < 1e-4);
        assert!(images[1].0.starts_with("barcode:"));
        assert!((images[1].1.width - 60.0).abs() < 1e-4);
    }

    #[test]
    fn compact_truncates_long_designation() {
        let p = ProductRecord::new(
            "R",
            "123",
            "An exceptionally long product designation that cannot possibly fit",
        );
        let (surface, _) = render(Template::Compact, &p, None);
        let designation = surface
            .ops
            .iter()
            .find_map(|op| match op {
                DrawOp::Text { text, style, .. } if style.size == 8.0 => Some(text.clone()),
                _ => None,
            })
            .unwrap();
        assert!(designation.ends_with('\u{2026}'));
        assert!(designation.len() < p.designation.len());
        let width = surface.measure_text(&designation, &COMPACT_DESIGNATION);
        assert!(width <= 70.0 - 16.0 - 2.0 - 18.0 + 1e-4);
    }

    #[test]
    fn quantity_hidden_for_single_items() {
        let p = product().with_quantity(1);
        for template in Template::ALL {
            let (surface, _) = render(template, &p, None);
            assert!(
                !surface.texts().iter().any(|t| t.starts_with("Qty")),
                "{template}"
            );
        }
    }

    #[test]
    fn missing_image_draws_placeholder() {
        let p = product();
        for template in [Template::Compact, Template::BrandedImage] {
            let (surface, outcome) = render(template, &p, None);
            assert!(outcome.image_placeholder);
            assert!(surface
                .ops
                .iter()
                .any(|op| matches!(op, DrawOp::FillRect { color, .. } if *color == Color::PLACEHOLDER)));
            assert!(surface.texts().contains(&NO_IMAGE));
            assert!(surface.texts().contains(&"3760123456789"));
        }
    }

    #[test]
    fn image_draw_failure_falls_back_to_placeholder() {
        let style = LabelStyle::default();
        let mut renderer = LabelRenderer::new(&style);
        let mut surface = BrokenImages(RecordingSurface::new());
        let img = photo();
        let outcome = renderer.render(&mut surface, &product(), CELL, Template::Compact, Some(&img));
        assert!(outcome.image_placeholder);
        assert!(outcome.barcode_omitted);
        let texts = surface.0.texts();
        assert!(texts.contains(&NO_IMAGE));
        assert!(texts.contains(&"OIL-750"));
        assert!(texts.contains(&"12.50 \u{20AC}"));
        // Caption goes with the symbol.
        assert!(!texts.contains(&"3760123456789"));
    }

    #[test]
    fn branded_symbol_failure_drops_its_code() {
        let style = LabelStyle::default();
        for template in [Template::BrandedImage, Template::BrandedNoImage] {
            let mut renderer = LabelRenderer::new(&style);
            let mut surface = BrokenImages(RecordingSurface::new());
            let outcome = renderer.render(&mut surface, &product(), CELL, template, None);
            assert!(outcome.barcode_omitted, "{template}");
            let texts = surface.0.texts();
            assert!(!texts.contains(&"3760123456789"), "{template}: {texts:?}");
            assert!(texts.contains(&"Ref: OIL-750"), "{template}");
            assert!(texts.contains(&"Extra virgin olive oil"), "{template}");
        }
    }

    #[test]
    fn unencodable_barcode_is_isolated() {
        for barcode in ["", "caf\u{e9}"] {
            let p = ProductRecord::new("REF-9", barcode, "Coffee beans").with_price(7.0);
            for template in Template::ALL {
                let (surface, outcome) = render(template, &p, None);
                assert!(outcome.barcode_omitted, "{template}");
                assert!(image_keys(&surface).is_empty(), "{template}");
                let texts = surface.texts();
                assert!(texts.iter().any(|t| t.contains("REF-9")), "{template}");
                assert!(texts.contains(&"Coffee beans"), "{template}");
                let price_drawn = match template {
                    Template::Compact => texts.contains(&"7.00 \u{20AC}"),
                    _ => texts.contains(&"7"),
                };
                assert!(price_drawn, "{template}: {texts:?}");
            }
        }
    }

    #[test]
    fn branded_price_is_split() {
        let p = product();
        let (surface, _) = render(Template::BrandedImage, &p, None);
        let price_ops: Vec<(String, f32, f32)> = surface
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, baseline, style, .. } if style.size >= 10.0 => {
                    Some((text.clone(), *baseline, style.size))
                }
                _ => None,
            })
            .collect();
        assert_eq!(price_ops.len(), 3);
        assert_eq!(price_ops[0], ("12".to_string(), 4.5 + 29.0, 28.0));
        assert_eq!(price_ops[1].0, "\u{20AC}");
        assert_eq!(price_ops[1].2, 21.0);
        assert_eq!(price_ops[2].0, "50");
        assert_eq!(price_ops[2].2, 10.5);
        assert!(price_ops[2].1 < price_ops[0].1);
    }

    #[test]
    fn whole_price_has_no_fraction() {
        let p = product().with_price(9.0);
        let (surface, _) = render(Template::BrandedNoImage, &p, None);
        let texts = surface.texts();
        assert!(texts.contains(&"9"));
        assert!(!texts.contains(&"00"));
    }

    #[test]
    fn oversized_price_shrinks_to_column() {
        let p = product().with_price(123456789.99);
        let (surface, _) = render(Template::BrandedImage, &p, None);
        let sizes: Vec<f32> = surface
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, style, .. } if text == "123456789" => Some(style.size),
                _ => None,
            })
            .collect();
        assert_eq!(sizes.len(), 1);
        assert!(sizes[0] < 28.0);
    }

    #[test]
    fn branded_image_puts_symbol_in_corner() {
        let p = product();
        let img = photo();
        let (surface, outcome) = render(Template::BrandedImage, &p, Some(&img));
        assert!(!outcome.image_placeholder);
        let images = image_keys(&surface);
        assert_eq!(images.len(), 2);
        let (_, symbol) = images.iter().find(|(k, _)| k.starts_with("barcode:")).unwrap();
        assert!((symbol.right() - 68.0).abs() < 1e-4);
        assert!((symbol.y - (4.5 + 7.5)).abs() < 1e-4);
        assert!(surface.texts().contains(&"Ref: OIL-750"));
        assert!(surface.texts().contains(&"PRICE"));
    }

    #[test]
    fn branded_no_image_moves_symbol_to_slot() {
        let p = product();
        let img = photo();
        let (surface, outcome) = render(Template::BrandedNoImage, &p, Some(&img));
        assert!(!outcome.image_placeholder);
        let images = image_keys(&surface);
        assert_eq!(images.len(), 1, "photo must not be drawn");
        let (key, rect) = &images[0];
        assert!(key.starts_with("barcode:"));
        assert_eq!(*rect, Rect::new(2.0, 4.5 + 10.0, 22.0, 20.0));
        assert!(!surface.texts().contains(&NO_IMAGE));
        // Reference and code stay in the corner as plain text.
        assert!(surface.texts().contains(&"Ref: OIL-750"));
        assert!(surface.texts().contains(&"3760123456789"));
    }
}
