//! Product records – the immutable input rows every label is drawn from.

use serde::{Deserialize, Serialize};

/// One product line from the spreadsheet.
///
/// The product image is not stored here; it is looked up by `reference` in a
/// caller-owned [`crate::images::ImageCache`] at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Unique key, also the image file stem.
    pub reference: String,
    /// Text fed to the CODE128 encoder.
    pub barcode: String,
    /// Number of items, always ≥ 1.
    pub quantity: u32,
    /// Non-negative price, currency agnostic.
    pub price: f64,
    /// Display name, truncated to fit on the label.
    pub designation: String,
}

impl ProductRecord {
    pub fn new(
        reference: impl Into<String>,
        barcode: impl Into<String>,
        designation: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            barcode: barcode.into(),
            quantity: 1,
            price: 0.0,
            designation: designation.into(),
        }
    }

    /// Set the quantity; zero is clamped to 1.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity.max(1);
        self
    }

    /// Set the price; negative and non-finite values become 0.
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = if price.is_finite() && price > 0.0 { price } else { 0.0 };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_clamps_invalid_values() {
        let p = ProductRecord::new("REF1", "123", "Thing")
            .with_quantity(0)
            .with_price(-4.0);
        assert_eq!(p.quantity, 1);
        assert_eq!(p.price, 0.0);
    }
}
