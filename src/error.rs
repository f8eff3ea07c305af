//! Error types shared across the crate.
//!
//! Whole-input failures (unreadable sheet, unmapped columns, empty product
//! list) abort an export. Per-label failures (image, barcode) are absorbed by
//! the renderer and only show up in logs and the export report.

use thiserror::Error;

use crate::sheet::Field;

/// Main error type for label generation.
#[derive(Debug, Error)]
pub enum LabelError {
    /// The tabular source is malformed or empty.
    #[error("Parse error: {0}")]
    Parse(String),

    /// One or more logical fields have no matching column.
    #[error("Missing columns for: {}", join_fields(.0))]
    Mapping(Vec<Field>),

    /// The barcode text cannot be encoded as CODE128.
    #[error("Barcode encoding error: {0}")]
    BarcodeEncoding(String),

    #[error("Image decode error for '{reference}': {message}")]
    ImageDecode { reference: String, message: String },

    #[error("Image draw error: {0}")]
    ImageDraw(String),

    #[error("Font error: {0}")]
    Font(String),

    /// Grid geometry that cannot tile the page.
    #[error("Invalid grid geometry: {0}")]
    Geometry(String),

    #[error("No products to export")]
    NoProducts,

    #[error("Export error: {0}")]
    Export(String),

    /// An input file (sheet, config, font) could not be read.
    #[error("Cannot read '{}': {source}", .path.display())]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LabelError>;

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
