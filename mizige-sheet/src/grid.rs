//! Rice-grid (米字格) drawing

use crate::error::SheetResult;
use crate::layout::Layout;
use crate::surface::{LineStyle, Surface};

/// Draw every cell of `layout` row-major: dashed midlines and diagonals first,
/// then the solid border on top so neighbouring cells share a crisp edge.
pub fn draw_grid(surface: &mut Surface, layout: &Layout) -> SheetResult<()> {
    for row in 0..layout.row_count {
        for col in 0..layout.chars_per_row {
            draw_cell(surface, layout, row, col)?;
        }
    }
    Ok(())
}

fn draw_cell(surface: &mut Surface, layout: &Layout, row: u32, col: u32) -> SheetResult<()> {
    let (x, y) = layout.cell_origin(row, col);
    let (x, y) = (x as f32, y as f32);
    let size = layout.cell_size as f32;
    let half = size / 2.0;

    let guides = [
        ((x, y + half), (x + size, y + half)),
        ((x + half, y), (x + half, y + size)),
        ((x, y), (x + size, y + size)),
        ((x + size, y), (x, y + size)),
    ];
    for (from, to) in guides {
        surface.stroke_line(from, to, &LineStyle::GUIDE)?;
    }

    surface.stroke_square(x, y, size, &LineStyle::BORDER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::compute_layout;

    fn is_white(pixel: Option<[u8; 3]>) -> bool {
        pixel == Some([255, 255, 255])
    }

    #[test]
    fn test_grid_marks_borders_and_guides() {
        let layout = compute_layout(240, 140, 2, 1).unwrap();
        assert_eq!(layout.cell_size, 100);
        let mut surface = Surface::new(layout.total_width, layout.total_height).unwrap();
        draw_grid(&mut surface, &layout).unwrap();

        // padding stays blank
        assert!(is_white(surface.pixel(5, 5)));
        // left border of first cell
        assert!(!is_white(surface.pixel(20, 50)));
        // shared border between the two cells
        assert!(!is_white(surface.pixel(120, 50)));
        // vertical midline of the second cell, inside a dash
        assert!(!is_white(surface.pixel(170, 21)));
        // diagonal of the first cell passes through its center
        assert!(!is_white(surface.pixel(70, 70)));
        // a point off every line
        assert!(is_white(surface.pixel(40, 30)));
    }

    #[test]
    fn test_single_cell_grid() {
        let layout = compute_layout(100, 100, 1, 1).unwrap();
        let mut surface = Surface::new(layout.total_width, layout.total_height).unwrap();
        draw_grid(&mut surface, &layout).unwrap();
        assert!(!is_white(surface.pixel(20, 20)));
    }
}
