//! Page geometry and grid layout calculation
//!
//! Physical sizes are PDF points; device sizes are raster pixels. The
//! resolution of a `PageSpec` converts one into the other.

use serde::Serialize;

use crate::error::{SheetError, SheetResult};

/// Blank border around the grid on the raster canvas, in device pixels.
pub const GRID_PADDING: u32 = 20;

/// Physical page description
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpec {
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Device pixels per point
    pub resolution: f32,
    /// Margin on every side in points
    pub margin: f32,
}

impl PageSpec {
    pub fn new(width: f32, height: f32, resolution: f32, margin: f32) -> SheetResult<Self> {
        let all_finite = [width, height, resolution, margin].iter().all(|v| v.is_finite());
        if !all_finite || width <= 0.0 || height <= 0.0 || resolution <= 0.0 {
            return Err(SheetError::validation(format!(
                "Page size and resolution must be positive: {}x{} @ {}",
                width, height, resolution
            )));
        }
        if margin < 0.0 || 2.0 * margin >= width || 2.0 * margin >= height {
            return Err(SheetError::validation(format!(
                "Margin {} leaves no content area on a {}x{} page",
                margin, width, height
            )));
        }
        Ok(Self {
            width,
            height,
            resolution,
            margin,
        })
    }

    /// A4 portrait at 2 px/pt with half-inch margins.
    pub fn a4() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
            resolution: 2.0,
            margin: 36.0,
        }
    }

    /// Content width in points
    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Content height in points
    pub fn content_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }

    /// Content area in device pixels, floored.
    pub fn device_content_size(&self) -> (u32, u32) {
        (
            (self.content_width() * self.resolution).floor() as u32,
            (self.content_height() * self.resolution).floor() as u32,
        )
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::a4()
    }
}

/// Derived grid geometry for one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub cell_size: u32,
    pub total_width: u32,
    pub total_height: u32,
    pub chars_per_row: u32,
    pub row_count: u32,
    pub padding: u32,
}

impl Layout {
    pub fn capacity(&self) -> usize {
        self.chars_per_row as usize * self.row_count as usize
    }

    /// Top-left corner of the cell at `(row, col)`.
    pub fn cell_origin(&self, row: u32, col: u32) -> (u32, u32) {
        (
            self.padding + col * self.cell_size,
            self.padding + row * self.cell_size,
        )
    }

    /// Geometric center of the cell at `(row, col)`.
    pub fn cell_center(&self, row: u32, col: u32) -> (f32, f32) {
        let (x, y) = self.cell_origin(row, col);
        let half = self.cell_size as f32 / 2.0;
        (x as f32 + half, y as f32 + half)
    }
}

/// Fit a `chars_per_row` x `row_count` grid of square cells into a content
/// area of the given device size.
///
/// The binding axis decides the cell size. The returned canvas is exactly as
/// large as the grid plus padding, not as large as the content area.
pub fn compute_layout(
    content_width: u32,
    content_height: u32,
    chars_per_row: u32,
    row_count: u32,
) -> SheetResult<Layout> {
    if chars_per_row == 0 || row_count == 0 {
        return Err(SheetError::render(format!(
            "Grid must have at least one cell, got {}x{}",
            chars_per_row, row_count
        )));
    }

    let usable_width = content_width.saturating_sub(2 * GRID_PADDING);
    let usable_height = content_height.saturating_sub(2 * GRID_PADDING);
    let cell_size = (usable_width / chars_per_row).min(usable_height / row_count);
    if cell_size == 0 {
        return Err(SheetError::render(format!(
            "Content area {}x{} is too small for a {}x{} grid",
            content_width, content_height, chars_per_row, row_count
        )));
    }

    Ok(Layout {
        cell_size,
        total_width: cell_size * chars_per_row + 2 * GRID_PADDING,
        total_height: cell_size * row_count + 2 * GRID_PADDING,
        chars_per_row,
        row_count,
        padding: GRID_PADDING,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_size_is_largest_fitting_square() {
        for &(w, h, cols, rows) in &[
            (1046u32, 1540u32, 10u32, 15u32),
            (1046, 1540, 20, 30),
            (1046, 1540, 1, 1),
            (500, 300, 7, 3),
            (333, 777, 11, 29),
        ] {
            let layout = compute_layout(w, h, cols, rows).unwrap();
            let fits = |size: u32| {
                size * cols + 2 * GRID_PADDING <= w && size * rows + 2 * GRID_PADDING <= h
            };
            assert!(fits(layout.cell_size), "{}x{} grid {}x{}", w, h, cols, rows);
            assert!(!fits(layout.cell_size + 1), "{}x{} grid {}x{}", w, h, cols, rows);
        }
    }

    #[test]
    fn test_canvas_is_content_tight() {
        let layout = compute_layout(1046, 1540, 10, 15).unwrap();
        // width binds: (1046 - 40) / 10 = 100, (1540 - 40) / 15 = 100
        assert_eq!(layout.cell_size, 100);
        assert_eq!(layout.total_width, 1040);
        assert_eq!(layout.total_height, 1540);

        let short = compute_layout(1046, 1540, 10, 2).unwrap();
        assert_eq!(short.cell_size, 100);
        assert_eq!(short.total_height, 240);
    }

    #[test]
    fn test_zero_counts_rejected() {
        assert!(compute_layout(1000, 1000, 0, 5).is_err());
        assert!(compute_layout(1000, 1000, 5, 0).is_err());
    }

    #[test]
    fn test_page_spec_validation() {
        assert!(PageSpec::new(0.0, 842.0, 2.0, 36.0).is_err());
        assert!(PageSpec::new(595.0, 842.0, -1.0, 36.0).is_err());
        assert!(PageSpec::new(100.0, 100.0, 1.0, 50.0).is_err());
        let spec = PageSpec::new(595.0, 842.0, 2.0, 36.0).unwrap();
        assert_eq!(spec, PageSpec::a4());
        assert_eq!(spec.device_content_size(), (1046, 1540));
    }

    #[test]
    fn test_cell_geometry() {
        let layout = compute_layout(440, 440, 4, 4).unwrap();
        assert_eq!(layout.cell_size, 100);
        assert_eq!(layout.cell_origin(0, 0), (20, 20));
        assert_eq!(layout.cell_origin(1, 2), (220, 120));
        assert_eq!(layout.cell_center(0, 0), (70.0, 70.0));
    }
}
