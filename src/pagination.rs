//! Pagination – assigns every product a page and a grid cell.
//!
//! Placement is a pure function of the product's index and the grid
//! geometry, so the page sequence can be recomputed at will and input order
//! is preserved exactly.

use std::iter::Enumerate;
use std::slice::Chunks;

use crate::error::Result;
use crate::layout_config::GridGeometry;
use crate::product::ProductRecord;
use crate::surface::Rect;

/// Where one product's label goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement<'a> {
    pub product: &'a ProductRecord,
    /// Position in the input list.
    pub index: usize,
    pub page: usize,
    pub row: usize,
    pub column: usize,
    /// Cell rectangle in page millimetres.
    pub cell: Rect,
}

/// One page worth of placements, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a> {
    pub page_index: usize,
    pub placements: Vec<Placement<'a>>,
}

/// Cell rectangle for the `local_index`-th label of a page.
pub fn cell_rect(local_index: usize, geometry: &GridGeometry) -> Rect {
    let row = local_index / geometry.columns;
    let column = local_index % geometry.columns;
    Rect::new(
        geometry.margin_x() + column as f32 * geometry.cell_width,
        geometry.margin_y() + row as f32 * geometry.cell_height,
        geometry.cell_width,
        geometry.cell_height,
    )
}

/// Lazy, restartable sequence of pages.
#[derive(Debug, Clone)]
pub struct Pages<'a> {
    chunks: Enumerate<Chunks<'a, ProductRecord>>,
    geometry: GridGeometry,
}

impl<'a> Iterator for Pages<'a> {
    type Item = Page<'a>;

    fn next(&mut self) -> Option<Page<'a>> {
        let (page_index, chunk) = self.chunks.next()?;
        let per_page = self.geometry.cells_per_page();
        let placements = chunk
            .iter()
            .enumerate()
            .map(|(local, product)| Placement {
                product,
                index: page_index * per_page + local,
                page: page_index,
                row: local / self.geometry.columns,
                column: local % self.geometry.columns,
                cell: cell_rect(local, &self.geometry),
            })
            .collect();
        Some(Page {
            page_index,
            placements,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Pages<'_> {}

/// Partition `products` into pages of `geometry.cells_per_page()` labels.
///
/// Yields `ceil(n / cells_per_page)` pages; zero products give zero pages.
pub fn layout_pages<'a>(products: &'a [ProductRecord], geometry: &GridGeometry) -> Result<Pages<'a>> {
    geometry.validate()?;
    Ok(Pages {
        chunks: products.chunks(geometry.cells_per_page()).enumerate(),
        geometry: *geometry,
    })
}
