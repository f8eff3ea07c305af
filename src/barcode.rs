//! CODE128 symbol generation.
//!
//! Encodes with the `barcoders` crate in character set B and rasterises the
//! module pattern into a grayscale image. The human-readable text is never
//! part of the symbol; templates draw it separately.

use std::collections::HashMap;

use barcoders::sym::code128::Code128;
use image::{DynamicImage, GrayImage, Luma};

use crate::error::{LabelError, Result};
use crate::images::{ImageKind, LabelImage};

/// Character-set B selector understood by `barcoders`.
const CHARSET_B: char = '\u{0181}';

/// Module width, in pixels, used for label symbols.
pub const MODULE_WIDTH_PX: u32 = 2;
/// Symbol height, in pixels, used for label symbols.
pub const SYMBOL_HEIGHT_PX: u32 = 80;

/// Encode `text` into CODE128 modules (1 = bar, 0 = space).
///
/// Character set B covers printable ASCII; anything else, or an empty string,
/// is an encoding error.
pub fn encode_modules(text: &str) -> Result<Vec<u8>> {
    if text.is_empty() {
        return Err(LabelError::BarcodeEncoding("empty barcode text".into()));
    }
    if let Some(bad) = text.chars().find(|c| !(' '..='~').contains(c)) {
        return Err(LabelError::BarcodeEncoding(format!(
            "character {bad:?} is not encodable in CODE128 set B"
        )));
    }

    let symbol = Code128::new(format!("{CHARSET_B}{text}"))
        .map_err(|e| LabelError::BarcodeEncoding(format!("{text:?}: {e:?}")))?;
    Ok(symbol.encode())
}

/// Encode `text` and rasterise it: black bars on white, `module_width` pixels
/// per module, `height` pixels tall.
pub fn encode(text: &str, module_width: u32, height: u32) -> Result<GrayImage> {
    if module_width == 0 || height == 0 {
        return Err(LabelError::BarcodeEncoding(format!(
            "invalid symbol size {module_width}x{height}"
        )));
    }
    let modules = encode_modules(text)?;
    let width = modules.len() as u32 * module_width;

    Ok(GrayImage::from_fn(width, height, |x, _| {
        if modules[(x / module_width) as usize] == 1 {
            Luma([0])
        } else {
            Luma([255])
        }
    }))
}

/// Per-session memo of generated symbols.
///
/// Symbols are a pure function of their key, so the cache only saves work.
#[derive(Debug, Default)]
pub struct BarcodeCache {
    symbols: HashMap<(String, u32, u32), LabelImage>,
}

impl BarcodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symbol for `text`, generated on first use.
    pub fn symbol(&mut self, text: &str, module_width: u32, height: u32) -> Result<LabelImage> {
        let key = (text.to_string(), module_width, height);
        if let Some(image) = self.symbols.get(&key) {
            return Ok(image.clone());
        }

        let raster = encode(text, module_width, height)?;
        let image = LabelImage::new(
            format!("barcode:{module_width}x{height}:{text}"),
            ImageKind::Symbol,
            DynamicImage::ImageLuma8(raster),
        );
        self.symbols.insert(key, image.clone());
        Ok(image)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
