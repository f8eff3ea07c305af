//! # price-tags – barcode price-label layout and rendering
//!
//! Turns a list of product records into printable price labels, either as a
//! paginated PDF sheet or as a single-label preview bitmap. The stages are:
//!
//! 1. **Map** – tabular cell grid → [`product::ProductRecord`]s ([`sheet`])
//! 2. **Paginate** – assign each product a page and grid cell ([`pagination`])
//! 3. **Draw** – render one label per cell with a [`templates::Template`],
//!    using fitted text ([`fonts`]), CODE128 symbols ([`barcode`]), split
//!    prices ([`price`]) and pre-resolved photos ([`images`])
//! 4. **Emit** – PDF bytes via printpdf ([`render`]) or an RGBA bitmap
//!    ([`raster`]), both behind the [`surface::Surface`] trait
//!
//! [`pipeline`] runs the export end to end; [`preview`] drives the
//! one-label-at-a-time view.

pub mod barcode;
pub mod error;
pub mod fonts;
pub mod images;
pub mod layout_config;
pub mod pagination;
pub mod pipeline;
pub mod preview;
pub mod price;
pub mod product;
pub mod raster;
pub mod render;
pub mod sheet;
pub mod surface;
pub mod templates;

// Re-exports for convenience
pub use error::{LabelError, Result};
pub use pipeline::{generate_pdf, generate_pdf_from_sheet, PipelineConfig, SheetReport};
pub use product::ProductRecord;
pub use templates::Template;
