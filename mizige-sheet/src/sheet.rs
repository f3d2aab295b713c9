//! Single-page practice sheet generation

use serde::Serialize;

use crate::characters::{place_characters, CharacterStream};
use crate::error::SheetResult;
use crate::fonts::GlyphSource;
use crate::grid::draw_grid;
use crate::layout::{compute_layout, Layout, PageSpec};
use crate::options::GridOptions;
use crate::surface::{PageImage, Surface};

/// Layout facts reported alongside a single-page raster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetMetadata {
    pub cell_size: u32,
    pub total_width: u32,
    pub total_height: u32,
    pub characters_drawn: usize,
    pub total_characters: usize,
    pub han_characters: usize,
    pub font_family: String,
}

/// A rendered single-page sheet
#[derive(Debug, Clone)]
pub struct Sheet {
    pub image: PageImage,
    pub layout: Layout,
    pub metadata: SheetMetadata,
}

impl Sheet {
    pub fn to_png(&self) -> SheetResult<Vec<u8>> {
        self.image.to_png()
    }
}

/// Render `text` onto one grid sized for the content area of `page`.
///
/// Characters beyond the grid capacity are dropped; `metadata` reports how
/// many were actually drawn.
pub fn generate_sheet(
    text: &str,
    options: &GridOptions,
    page: &PageSpec,
    glyphs: &dyn GlyphSource,
) -> SheetResult<Sheet> {
    let stream = CharacterStream::from_text(text)?;
    let font_family = glyphs.family_name(options.font_type)?.to_string();

    let (content_width, content_height) = page.device_content_size();
    let layout = compute_layout(content_width, content_height, options.chars_per_row, options.row_count)?;
    let (image, characters_drawn) = render_grid(&layout, stream.units(), options, glyphs)?;

    log::debug!(
        "Sheet {}x{} cells of {}px, drew {}/{} characters in {}",
        layout.chars_per_row,
        layout.row_count,
        layout.cell_size,
        characters_drawn,
        stream.len(),
        font_family
    );

    Ok(Sheet {
        image,
        layout,
        metadata: SheetMetadata {
            cell_size: layout.cell_size,
            total_width: layout.total_width,
            total_height: layout.total_height,
            characters_drawn,
            total_characters: stream.len(),
            han_characters: stream.han_count(),
            font_family,
        },
    })
}

/// Draw one grid with its characters on a fresh surface.
pub(crate) fn render_grid(
    layout: &Layout,
    units: &[String],
    options: &GridOptions,
    glyphs: &dyn GlyphSource,
) -> SheetResult<(PageImage, usize)> {
    let mut surface = Surface::new(layout.total_width, layout.total_height)?;
    draw_grid(&mut surface, layout)?;
    let drawn = place_characters(
        &mut surface,
        layout,
        units,
        glyphs,
        options.font_type,
        options.text_opacity(),
    )?;
    Ok((surface.finish(), drawn))
}
