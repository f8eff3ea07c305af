//! Preview – one label at a time, navigable with wraparound.
//!
//! The session holds only an index; every call to [`PreviewSession::render`]
//! redraws from the current product and the caller's image cache, so a
//! navigation or an image change is picked up on the next render.

use image::RgbaImage;

use crate::error::Result;
use crate::fonts::FontManager;
use crate::images::ImageCache;
use crate::layout_config::{GridGeometry, LabelStyle};
use crate::product::ProductRecord;
use crate::raster::RasterSurface;
use crate::surface::Rect;
use crate::templates::{LabelRenderer, Template};

/// Resolution of preview bitmaps.
pub const PREVIEW_DPI: f32 = 300.0;

pub struct PreviewSession<'a> {
    products: &'a [ProductRecord],
    index: usize,
    pub template: Template,
    pub style: LabelStyle,
    pub geometry: GridGeometry,
}

impl<'a> PreviewSession<'a> {
    pub fn new(products: &'a [ProductRecord], template: Template) -> Self {
        Self {
            products,
            index: 0,
            template,
            style: LabelStyle::default(),
            geometry: GridGeometry::a4_labels(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn current(&self) -> Option<&'a ProductRecord> {
        self.products.get(self.index)
    }

    /// Jump to `index`, wrapped into range.
    pub fn select(&mut self, index: usize) {
        if !self.products.is_empty() {
            self.index = index % self.products.len();
        }
    }

    pub fn next(&mut self) -> Option<&'a ProductRecord> {
        let count = self.products.len();
        if count > 0 {
            self.index = (self.index + 1) % count;
        }
        self.current()
    }

    pub fn previous(&mut self) -> Option<&'a ProductRecord> {
        let count = self.products.len();
        if count > 0 {
            self.index = (self.index + count - 1) % count;
        }
        self.current()
    }

    /// Draw the current label on a cell-sized canvas at [`PREVIEW_DPI`].
    /// Returns `None` when there is nothing to preview.
    pub fn render(&self, images: &ImageCache, fonts: FontManager) -> Result<Option<RgbaImage>> {
        let Some(product) = self.current() else {
            return Ok(None);
        };
        let (w, h) = (self.geometry.cell_width, self.geometry.cell_height);
        let mut surface = RasterSurface::new(w, h, PREVIEW_DPI, fonts)?;
        let outcome = LabelRenderer::new(&self.style).render(
            &mut surface,
            product,
            Rect::new(0.0, 0.0, w, h),
            self.template,
            images.resolve(&product.reference),
        );
        log::debug!(
            "Preview {}/{} '{}': {:?}",
            self.index + 1,
            self.products.len(),
            product.reference,
            outcome
        );
        Ok(Some(surface.into_image()))
    }
}
