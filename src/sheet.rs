//! Tabular input – a header row plus data rows – and the column mapping that
//! turns it into [`ProductRecord`]s.
//!
//! Sheets arrive as a JSON 2-D cell grid:
//!
//! ```json
//! [["barcode", "quantity", "price", "designation", "reference"],
//!  ["3760123456789", 2, "4,50", "Olive oil 750ml", "OIL-750"]]
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LabelError, Result};
use crate::product::ProductRecord;

/// The five logical fields every sheet must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Barcode,
    Quantity,
    Price,
    Designation,
    Reference,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Barcode,
        Field::Quantity,
        Field::Price,
        Field::Designation,
        Field::Reference,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Barcode => "barcode",
            Field::Quantity => "quantity",
            Field::Price => "price",
            Field::Designation => "designation",
            Field::Reference => "reference",
        }
    }

    /// Lower-case header spellings recognised by [`ColumnMapping::detect`].
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Barcode => &["barcode", "codebar", "code barre", "code-barre", "ean", "gencod"],
            Field::Quantity => &["quantity", "qty", "quantité", "quantite", "qte", "qté"],
            Field::Price => &["price", "prix", "unit price", "prix unitaire"],
            Field::Designation => &["designation", "désignation", "description", "name", "libellé", "libelle"],
            Field::Reference => &["reference", "référence", "ref", "réf", "sku"],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed spreadsheet: header row plus data rows, every cell as text.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Parse a JSON cell grid. Fails on malformed JSON, a non-grid shape, or
    /// a sheet without header or data rows.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| LabelError::Parse(format!("invalid JSON: {e}")))?;
        let Value::Array(raw_rows) = value else {
            return Err(LabelError::Parse("expected an array of rows".into()));
        };

        let mut grid = Vec::with_capacity(raw_rows.len());
        for (i, row) in raw_rows.into_iter().enumerate() {
            let Value::Array(cells) = row else {
                return Err(LabelError::Parse(format!("row {i} is not an array of cells")));
            };
            grid.push(cells.iter().map(cell_text).collect::<Result<Vec<_>>>()?);
        }

        Self::from_grid(grid)
    }

    /// Build from an in-memory grid whose first row is the header.
    pub fn from_grid(mut grid: Vec<Vec<String>>) -> Result<Self> {
        if grid.is_empty() {
            return Err(LabelError::Parse("sheet is empty".into()));
        }
        let headers: Vec<String> = grid.remove(0).into_iter().map(|h| h.trim().to_string()).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(LabelError::Parse("header row is empty".into()));
        }
        let rows: Vec<Vec<String>> = grid
            .into_iter()
            .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
            .collect();
        if rows.is_empty() {
            return Err(LabelError::Parse("sheet has no data rows".into()));
        }
        Ok(Self { headers, rows })
    }

    fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header.trim())
    }
}

fn cell_text(cell: &Value) -> Result<String> {
    Ok(match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => {
            return Err(LabelError::Parse(format!(
                "unsupported cell value: {other}"
            )))
        }
    })
}

/// Which header holds each logical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub barcode: String,
    pub quantity: String,
    pub price: String,
    pub designation: String,
    pub reference: String,
}

impl Default for ColumnMapping {
    /// Columns named after the fields themselves.
    fn default() -> Self {
        Self {
            barcode: Field::Barcode.name().to_string(),
            quantity: Field::Quantity.name().to_string(),
            price: Field::Price.name().to_string(),
            designation: Field::Designation.name().to_string(),
            reference: Field::Reference.name().to_string(),
        }
    }
}

impl ColumnMapping {
    pub fn header(&self, field: Field) -> &str {
        match field {
            Field::Barcode => &self.barcode,
            Field::Quantity => &self.quantity,
            Field::Price => &self.price,
            Field::Designation => &self.designation,
            Field::Reference => &self.reference,
        }
    }

    pub fn set(&mut self, field: Field, header: impl Into<String>) {
        let header = header.into();
        match field {
            Field::Barcode => self.barcode = header,
            Field::Quantity => self.quantity = header,
            Field::Price => self.price = header,
            Field::Designation => self.designation = header,
            Field::Reference => self.reference = header,
        }
    }

    /// Guess a mapping from header spellings (case-insensitive). Fields
    /// without a recognisable header keep their default name, so
    /// [`map_products`] still reports them as missing.
    pub fn detect(headers: &[String]) -> Self {
        let mut mapping = Self::default();
        for field in Field::ALL {
            let found = headers
                .iter()
                .find(|h| field.aliases().contains(&h.trim().to_lowercase().as_str()));
            if let Some(header) = found {
                mapping.set(field, header.trim());
            }
        }
        mapping
    }
}

/// A data row dropped because a required text field was blank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    /// 1-based data row number (header excluded).
    pub row: usize,
    pub missing: Vec<Field>,
}

/// Result of mapping a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedProducts {
    pub products: Vec<ProductRecord>,
    pub skipped: Vec<SkippedRow>,
}

/// Resolve every field to a column, then convert each row.
///
/// All unmatched fields are reported together. Rows missing a reference,
/// barcode or designation are skipped with a warning; blank or invalid
/// quantities default to 1 and invalid prices to 0.
pub fn map_products(sheet: &Sheet, mapping: &ColumnMapping) -> Result<MappedProducts> {
    let mut columns = [0usize; 5];
    let mut missing = Vec::new();
    for (slot, field) in columns.iter_mut().zip(Field::ALL) {
        match sheet.column(mapping.header(field)) {
            Some(idx) => *slot = idx,
            None => missing.push(field),
        }
    }
    if !missing.is_empty() {
        return Err(LabelError::Mapping(missing));
    }
    let [barcode_col, quantity_col, price_col, designation_col, reference_col] = columns;

    let mut products = Vec::with_capacity(sheet.rows.len());
    let mut skipped = Vec::new();

    for (i, row) in sheet.rows.iter().enumerate() {
        let row_no = i + 1;
        let cell = |idx: usize| row.get(idx).map(|s| s.trim()).unwrap_or("");

        let required = [
            (Field::Reference, cell(reference_col)),
            (Field::Barcode, cell(barcode_col)),
            (Field::Designation, cell(designation_col)),
        ];
        let blank: Vec<Field> = required
            .iter()
            .filter(|(_, v)| v.is_empty())
            .map(|(f, _)| *f)
            .collect();
        if !blank.is_empty() {
            log::warn!(
                "Skipping row {row_no}: missing {}",
                blank.iter().map(|f| f.name()).collect::<Vec<_>>().join(", ")
            );
            skipped.push(SkippedRow {
                row: row_no,
                missing: blank,
            });
            continue;
        }

        let product = ProductRecord::new(
            cell(reference_col),
            cell(barcode_col),
            cell(designation_col),
        )
        .with_quantity(parse_quantity(cell(quantity_col)))
        .with_price(parse_price(cell(price_col), row_no));
        products.push(product);
    }

    Ok(MappedProducts { products, skipped })
}

fn parse_quantity(raw: &str) -> u32 {
    if let Ok(q) = raw.parse::<u32>() {
        return q.max(1);
    }
    match raw.replace(',', ".").parse::<f64>() {
        Ok(q) if q.is_finite() && q >= 1.0 => q.floor().min(u32::MAX as f64) as u32,
        _ => 1,
    }
}

fn parse_price(raw: &str, row_no: usize) -> f64 {
    if raw.is_empty() {
        return 0.0;
    }
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect::<String>()
        .replace(',', ".");
    match cleaned.parse::<f64>() {
        Ok(p) if p.is_finite() && p >= 0.0 => p,
        _ => {
            log::warn!("Row {row_no}: invalid price {raw:?}, using 0");
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn parses_mixed_cells() {
        let sheet = Sheet::from_json(
            r#"[["barcode","quantity","price","designation","reference"],
                [3760123456789, 2, 4.5, "Oil", "OIL"],
                [null, null, null, null, null]]"#,
        )
        .unwrap();
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0][0], "3760123456789");
        assert_eq!(sheet.rows[0][2], "4.5");
    }

    #[test]
    fn malformed_sources_are_parse_errors() {
        for json in ["", "{}", "[1,2]", "[]", r#"[["a","b"]]"#, r#"[["a"],[{"x":1}]]"#] {
            assert!(
                matches!(Sheet::from_json(json), Err(LabelError::Parse(_))),
                "{json:?} should fail"
            );
        }
    }

    #[test]
    fn reports_all_missing_fields() {
        let sheet = Sheet::from_grid(grid(&[&["A", "B"], &["1", "2"]])).unwrap();
        let mapping = ColumnMapping {
            barcode: "A".into(),
            quantity: "B".into(),
            price: "C".into(),
            designation: "D".into(),
            reference: "E".into(),
        };
        match map_products(&sheet, &mapping) {
            Err(LabelError::Mapping(missing)) => assert_eq!(
                missing,
                vec![Field::Price, Field::Designation, Field::Reference]
            ),
            other => panic!("expected mapping error, got {other:?}"),
        }
    }

    #[test]
    fn skips_incomplete_rows_and_defaults_values() {
        let sheet = Sheet::from_grid(grid(&[
            &["barcode", "quantity", "price", "designation", "reference"],
            &["111", "", "12,50", "Soap", "S1"],
            &["222", "3", "2", "", "S2"],
            &["333", "0", "abc", "Brush", "S3"],
            &["444", "5"],
        ]))
        .unwrap();
        let mapped = map_products(&sheet, &ColumnMapping::default()).unwrap();

        assert_eq!(mapped.products.len(), 2);
        assert_eq!(mapped.products[0].quantity, 1);
        assert_eq!(mapped.products[0].price, 12.5);
        assert_eq!(mapped.products[1].reference, "S3");
        assert_eq!(mapped.products[1].quantity, 1);
        assert_eq!(mapped.products[1].price, 0.0);

        assert_eq!(mapped.skipped.len(), 2);
        assert_eq!(mapped.skipped[0].row, 2);
        assert_eq!(mapped.skipped[0].missing, vec![Field::Designation]);
        assert_eq!(
            mapped.skipped[1].missing,
            vec![Field::Reference, Field::Designation]
        );
    }

    #[test]
    fn detects_french_headers() {
        let headers: Vec<String> = ["Code barre", "Qté", "Prix", "Désignation", "Réf"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mapping = ColumnMapping::detect(&headers);
        assert_eq!(mapping.barcode, "Code barre");
        assert_eq!(mapping.quantity, "Qté");
        assert_eq!(mapping.price, "Prix");
        assert_eq!(mapping.designation, "Désignation");
        assert_eq!(mapping.reference, "Réf");
    }

    #[test]
    fn quantity_and_price_parsing() {
        assert_eq!(parse_quantity("4"), 4);
        assert_eq!(parse_quantity("2.0"), 2);
        assert_eq!(parse_quantity("-3"), 1);
        assert_eq!(parse_price("€ 3,99", 1), 3.99);
        assert_eq!(parse_price("-1", 1), 0.0);
    }
}
