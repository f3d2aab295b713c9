//! Character stream tokenization and placement into grid cells

use std::ops::Range;
use unicode_script::{Script, UnicodeScript};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{SheetError, SheetResult};
use crate::fonts::GlyphSource;
use crate::layout::Layout;
use crate::options::FontType;
use crate::surface::{Surface, TEXT_COLOR};

/// Hard cap on renderable units per request.
pub const MAX_CHARACTERS: usize = 2000;

/// Glyph em size as a fraction of the cell size.
pub const GLYPH_SCALE: f32 = 0.9;

/// Ordered visual characters of the input, whitespace removed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CharacterStream {
    units: Vec<String>,
}

impl CharacterStream {
    /// Tokenize and validate request text.
    pub fn from_text(text: &str) -> SheetResult<Self> {
        let stream = Self::tokenize(text);
        if stream.is_empty() {
            return Err(SheetError::validation("Text is empty after removing whitespace"));
        }
        if stream.len() > MAX_CHARACTERS {
            return Err(SheetError::validation(format!(
                "Text has {} characters, the limit is {}",
                stream.len(),
                MAX_CHARACTERS
            )));
        }
        Ok(stream)
    }

    /// Split into extended grapheme clusters with all whitespace dropped.
    pub fn tokenize(text: &str) -> Self {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let units = compact
            .graphemes(true)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect();
        Self { units }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[String] {
        &self.units
    }

    /// Units in `range`, clipped to the stream.
    pub fn slice(&self, range: Range<usize>) -> &[String] {
        let end = range.end.min(self.units.len());
        let start = range.start.min(end);
        &self.units[start..end]
    }

    /// Number of units whose base character is Han script.
    pub fn han_count(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.chars().next().is_some_and(|c| c.script() == Script::Han))
            .count()
    }
}

/// Draw `units` into the cells of `layout`, row-major from the top-left cell.
///
/// Each unit is centred on its cell by ink bounds. Stops when either the
/// cells or the units run out and returns how many units were drawn.
pub fn place_characters(
    surface: &mut Surface,
    layout: &Layout,
    units: &[String],
    glyphs: &dyn GlyphSource,
    font_type: FontType,
    opacity: f32,
) -> SheetResult<usize> {
    let px = layout.cell_size as f32 * GLYPH_SCALE;
    let mut drawn = 0;

    'cells: for row in 0..layout.row_count {
        for col in 0..layout.chars_per_row {
            let Some(unit) = units.get(drawn) else {
                break 'cells;
            };
            let glyph = glyphs.rasterize(font_type, unit, px)?;
            let (cx, cy) = layout.cell_center(row, col);
            let x = (cx - glyph.width as f32 / 2.0).round() as i32;
            let y = (cy - glyph.height as f32 / 2.0).round() as i32;
            surface.draw_glyph(&glyph, x, y, TEXT_COLOR, opacity)?;
            drawn += 1;
        }
    }

    if drawn < units.len() {
        log::warn!(
            "Grid of {} cells truncated {} of {} characters",
            layout.capacity(),
            units.len() - drawn,
            units.len()
        );
    }
    Ok(drawn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::GlyphBitmap;
    use crate::layout::compute_layout;

    /// Solid square glyphs half the requested size.
    struct BlockGlyphs;

    impl GlyphSource for BlockGlyphs {
        fn family_name(&self, _font_type: FontType) -> SheetResult<&str> {
            Ok("Block")
        }

        fn rasterize(&self, _font_type: FontType, _unit: &str, px: f32) -> SheetResult<GlyphBitmap> {
            let side = (px / 2.0) as u32;
            Ok(GlyphBitmap::new(side, side, vec![255; (side * side) as usize]))
        }
    }

    #[test]
    fn test_tokenize_strips_whitespace_and_keeps_order() {
        let stream = CharacterStream::tokenize(" 你好\n世\t界 ");
        assert_eq!(stream.units(), &["你", "好", "世", "界"]);
        assert_eq!(stream.han_count(), 4);
    }

    #[test]
    fn test_tokenize_keeps_grapheme_clusters_whole() {
        let stream = CharacterStream::tokenize("e\u{301}字👍🏽");
        assert_eq!(stream.len(), 3);
        assert_eq!(stream.units()[0], "e\u{301}");
        assert_eq!(stream.han_count(), 1);
    }

    #[test]
    fn test_empty_and_oversized_text_rejected() {
        assert!(matches!(CharacterStream::from_text(" \n\t"), Err(SheetError::Validation(_))));
        assert!(matches!(CharacterStream::from_text(""), Err(SheetError::Validation(_))));

        let at_cap = "字".repeat(MAX_CHARACTERS);
        assert_eq!(CharacterStream::from_text(&at_cap).unwrap().len(), MAX_CHARACTERS);
        let over_cap = "字".repeat(MAX_CHARACTERS + 1);
        assert!(matches!(CharacterStream::from_text(&over_cap), Err(SheetError::Validation(_))));
    }

    #[test]
    fn test_slice_is_clipped() {
        let stream = CharacterStream::tokenize("一二三");
        assert_eq!(stream.slice(1..10), &["二", "三"]);
        assert!(stream.slice(5..8).is_empty());
    }

    #[test]
    fn test_places_into_centre_of_cells_row_major() {
        let layout = compute_layout(240, 240, 2, 2).unwrap();
        let mut surface = Surface::new(layout.total_width, layout.total_height).unwrap();
        let units: Vec<String> = ["一", "二", "三"].iter().map(|s| s.to_string()).collect();

        let drawn = place_characters(&mut surface, &layout, &units, &BlockGlyphs, FontType::Serif, 1.0).unwrap();
        assert_eq!(drawn, 3);
        // 45px block centred at (70, 70), (170, 70), (70, 170)
        assert_eq!(surface.pixel(70, 70), Some(TEXT_COLOR));
        assert_eq!(surface.pixel(170, 70), Some(TEXT_COLOR));
        assert_eq!(surface.pixel(70, 170), Some(TEXT_COLOR));
        assert_eq!(surface.pixel(170, 170), Some([255, 255, 255]));
    }

    #[test]
    fn test_truncates_when_grid_is_full() {
        let layout = compute_layout(240, 140, 2, 1).unwrap();
        let mut surface = Surface::new(layout.total_width, layout.total_height).unwrap();
        let units: Vec<String> = "一二三四五".chars().map(String::from).collect();
        let drawn = place_characters(&mut surface, &layout, &units, &BlockGlyphs, FontType::Serif, 1.0).unwrap();
        assert_eq!(drawn, 2);
    }

    #[test]
    fn test_empty_units_draw_nothing() {
        let layout = compute_layout(240, 140, 2, 1).unwrap();
        let mut surface = Surface::new(layout.total_width, layout.total_height).unwrap();
        let drawn = place_characters(&mut surface, &layout, &[], &BlockGlyphs, FontType::Serif, 1.0).unwrap();
        assert_eq!(drawn, 0);
        assert_eq!(surface.pixel(40, 30), Some([255, 255, 255]));
    }
}
