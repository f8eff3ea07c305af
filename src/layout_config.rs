//! Layout config – the grid geometry a sheet of labels is cut into, and the
//! label styling knobs shared by every template. Both serialise to JSON so a
//! run can be configured from a file.

use serde::{Deserialize, Serialize};

use crate::error::{LabelError, Result};

/// A page divided into a centred grid of equal cells. All lengths in mm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub columns: usize,
    pub rows: usize,
    pub cell_width: f32,
    pub cell_height: f32,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self::a4_labels()
    }
}

impl GridGeometry {
    /// A4 portrait sheet with 3 × 8 labels of 70 × 36 mm.
    pub const fn a4_labels() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            columns: 3,
            rows: 8,
            cell_width: 70.0,
            cell_height: 36.0,
        }
    }

    /// Saturates for grids that [`validate`](Self::validate) rejects.
    pub fn cells_per_page(&self) -> usize {
        self.columns.saturating_mul(self.rows)
    }

    /// Left margin that centres the grid horizontally.
    pub fn margin_x(&self) -> f32 {
        (self.page_width - self.columns as f32 * self.cell_width) / 2.0
    }

    /// Top margin that centres the grid vertically.
    pub fn margin_y(&self) -> f32 {
        (self.page_height - self.rows as f32 * self.cell_height) / 2.0
    }

    /// Number of pages needed for `count` labels.
    pub fn page_count(&self, count: usize) -> usize {
        count.div_ceil(self.cells_per_page().max(1))
    }

    /// Check the grid has cells and fits on the page.
    pub fn validate(&self) -> Result<()> {
        if self.columns == 0 || self.rows == 0 {
            return Err(LabelError::Geometry(format!(
                "grid must have at least one row and column, got {}x{}",
                self.columns, self.rows
            )));
        }
        if self.columns.checked_mul(self.rows).is_none() {
            return Err(LabelError::Geometry(format!(
                "{}x{} cells overflow a page count",
                self.columns, self.rows
            )));
        }
        let sizes = [
            self.page_width,
            self.page_height,
            self.cell_width,
            self.cell_height,
        ];
        if sizes.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(LabelError::Geometry("sizes must be positive".into()));
        }
        if self.columns as f32 * self.cell_width > self.page_width + f32::EPSILON {
            return Err(LabelError::Geometry(format!(
                "{} columns of {} mm exceed page width {} mm",
                self.columns, self.cell_width, self.page_width
            )));
        }
        if self.rows as f32 * self.cell_height > self.page_height + f32::EPSILON {
            return Err(LabelError::Geometry(format!(
                "{} rows of {} mm exceed page height {} mm",
                self.rows, self.cell_height, self.page_height
            )));
        }
        Ok(())
    }
}

/// Text choices shared by all templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelStyle {
    /// Currency symbol drawn after prices.
    pub currency: String,
    /// Upper, bold line of the brand wordmark.
    pub brand_primary: String,
    /// Lower, small line of the brand wordmark.
    pub brand_secondary: String,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            currency: "\u{20AC}".to_string(),
            brand_primary: "PRICE".to_string(),
            brand_secondary: "TAGS".to_string(),
        }
    }
}

impl GridGeometry {
    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
