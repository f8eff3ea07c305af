//! Pipeline – ties together sheet mapping, pagination, label rendering and
//! PDF output into a single function call.
//!
//! Whole-input failures (unparseable sheet, unmapped columns, no products,
//! bad geometry) abort before any page is produced. Per-label problems are
//! absorbed by the renderer and counted in the [`SheetReport`].

use serde::{Deserialize, Serialize};

use crate::error::{LabelError, Result};
use crate::images::ImageCache;
use crate::layout_config::{GridGeometry, LabelStyle};
use crate::pagination::layout_pages;
use crate::product::ProductRecord;
use crate::render::PdfSurface;
use crate::sheet::{map_products, ColumnMapping, MappedProducts, Sheet};
use crate::surface::Surface;
use crate::templates::{LabelRenderer, Template};

/// Configuration for one export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Document title embedded in the PDF metadata (default: "Price tags").
    pub title: String,
    pub template: Template,
    pub geometry: GridGeometry,
    pub style: LabelStyle,
    /// Explicit column choice; detected from the header row when absent.
    pub mapping: Option<ColumnMapping>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            title: "Price tags".to_string(),
            template: Template::default(),
            geometry: GridGeometry::a4_labels(),
            style: LabelStyle::default(),
            mapping: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Summary of an export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SheetReport {
    pub pages: usize,
    pub labels: usize,
    /// Labels drawn with the "No Image" placeholder.
    pub placeholders: usize,
    /// Labels whose barcode symbol was omitted.
    pub barcode_failures: usize,
    /// Data rows dropped during mapping.
    pub skipped_rows: usize,
}

/// Draw every product onto `surface`, one grid page at a time.
///
/// `end_page` is called after each page. Labels are drawn strictly in input
/// order.
pub fn render_sheet<S: Surface + ?Sized>(
    surface: &mut S,
    products: &[ProductRecord],
    images: &ImageCache,
    config: &PipelineConfig,
) -> Result<SheetReport> {
    let pages = layout_pages(products, &config.geometry)?;
    let mut renderer = LabelRenderer::new(&config.style);
    let mut report = SheetReport::default();

    for page in pages {
        for placement in &page.placements {
            let product = placement.product;
            let outcome = renderer.render(
                surface,
                product,
                placement.cell,
                config.template,
                images.resolve(&product.reference),
            );
            report.labels += 1;
            report.placeholders += usize::from(outcome.image_placeholder);
            report.barcode_failures += usize::from(outcome.barcode_omitted);
        }
        surface.end_page();
        report.pages += 1;
        log::debug!(
            "Page {}: {} labels",
            page.page_index + 1,
            page.placements.len()
        );
    }

    log::info!(
        "Rendered {} labels on {} pages ({} placeholders, {} barcode failures)",
        report.labels,
        report.pages,
        report.placeholders,
        report.barcode_failures
    );
    Ok(report)
}

/// Full export: products → PDF bytes.
///
/// Returns `(pdf_bytes, report)`.
pub fn generate_pdf(
    products: &[ProductRecord],
    images: &ImageCache,
    config: &PipelineConfig,
) -> Result<(Vec<u8>, SheetReport)> {
    if products.is_empty() {
        return Err(LabelError::NoProducts);
    }
    let geometry = &config.geometry;
    let mut surface = PdfSurface::new(&config.title, geometry.page_width, geometry.page_height);
    let report = render_sheet(&mut surface, products, images, config)?;
    Ok((surface.finish(), report))
}

/// Parse a JSON cell grid, map it to products and export.
pub fn generate_pdf_from_sheet(
    json: &str,
    images: &ImageCache,
    config: &PipelineConfig,
) -> Result<(Vec<u8>, SheetReport)> {
    let products = products_from_sheet(json, config)?;
    let (bytes, mut report) = generate_pdf(&products.products, images, config)?;
    report.skipped_rows = products.skipped.len();
    Ok((bytes, report))
}

/// Parse and map a sheet with the configured (or detected) columns.
pub fn products_from_sheet(json: &str, config: &PipelineConfig) -> Result<MappedProducts> {
    let sheet = Sheet::from_json(json)?;
    let mapping = match &config.mapping {
        Some(mapping) => mapping.clone(),
        None => ColumnMapping::detect(&sheet.headers),
    };
    let mapped = map_products(&sheet, &mapping)?;
    log::info!(
        "Mapped {} products ({} rows skipped)",
        mapped.products.len(),
        mapped.skipped.len()
    );
    Ok(mapped)
}
