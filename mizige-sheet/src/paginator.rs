//! Multi-page pagination
//!
//! A long character stream is cut into fixed-size chunks, each chunk gets its
//! own grid raster, and every raster is scaled uniformly and centred on the
//! physical page. The result is an immutable `Document`; turning it into a
//! file is the job of the `pdf` module.

use serde::Serialize;
use std::ops::Range;

use crate::characters::CharacterStream;
use crate::error::{SheetError, SheetResult};
use crate::fonts::GlyphSource;
use crate::layout::{compute_layout, Layout, PageSpec};
use crate::options::{GridOptions, PaginationOptions};
use crate::sheet::render_grid;
use crate::surface::PageImage;

/// Footer font size in points
pub const FOOTER_FONT_SIZE: f32 = 10.0;

/// Which characters go on which page, before anything is drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    /// 1-based page number
    pub index: usize,
    pub range: Range<usize>,
    pub row_count: u32,
}

/// Position of a page raster on the physical page, in points.
/// `y` is measured from the top edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl Placement {
    /// Lower edge in bottom-up page coordinates.
    pub fn bottom(&self, page_height: f32) -> f32 {
        page_height - self.y - self.height
    }
}

/// Page number annotation under the content area
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Footer {
    pub text: String,
    /// Horizontal centre in points
    pub center_x: f32,
    /// Baseline above the bottom edge in points
    pub baseline: f32,
    pub font_size: f32,
}

/// One finished page of a document
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number
    pub index: usize,
    pub range: Range<usize>,
    pub characters: Vec<String>,
    pub layout: Layout,
    pub image: PageImage,
    pub characters_drawn: usize,
    pub placement: Placement,
    pub footer: Footer,
}

/// All pages of one generation request, in order
#[derive(Debug, Clone)]
pub struct Document {
    pub title: String,
    pub page_spec: PageSpec,
    pub font_family: String,
    pub pages: Vec<Page>,
    pub total_pages: usize,
    pub characters_drawn: usize,
    pub total_characters: usize,
    pub han_characters: usize,
}

/// Summary of a document for the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub title: String,
    pub total_pages: usize,
    pub characters_drawn: usize,
    pub total_characters: usize,
    pub han_characters: usize,
    pub font_family: String,
    pub cell_sizes: Vec<u32>,
}

impl Document {
    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            title: self.title.clone(),
            total_pages: self.total_pages,
            characters_drawn: self.characters_drawn,
            total_characters: self.total_characters,
            han_characters: self.han_characters,
            font_family: self.font_family.clone(),
            cell_sizes: self.pages.iter().map(|p| p.layout.cell_size).collect(),
        }
    }
}

/// Split `total` characters into pages of `chars_per_page`.
///
/// The last page only gets as many rows as its characters need.
pub fn plan_pages(total: usize, chars_per_page: usize, chars_per_row: u32, row_count: u32) -> Vec<PagePlan> {
    if total == 0 || chars_per_page == 0 || chars_per_row == 0 {
        return Vec::new();
    }
    let total_pages = total.div_ceil(chars_per_page);

    (0..total_pages)
        .filter_map(|i| {
            let start = i * chars_per_page;
            let end = ((i + 1) * chars_per_page).min(total);
            if start >= end {
                return None;
            }
            let needed_rows = (end - start).div_ceil(chars_per_row as usize);
            let row_count = (row_count as usize).min(needed_rows) as u32;
            Some(PagePlan {
                index: i + 1,
                range: start..end,
                row_count,
            })
        })
        .collect()
}

/// Validate `text` and lay it out over as many pages as it needs.
pub fn generate_document(
    text: &str,
    options: &PaginationOptions,
    page: &PageSpec,
    glyphs: &dyn GlyphSource,
) -> SheetResult<Document> {
    let stream = CharacterStream::from_text(text)?;
    paginate(&stream, page, options, glyphs)
}

/// Render every page of `stream`. Any page failure aborts the whole document.
pub fn paginate(
    stream: &CharacterStream,
    page: &PageSpec,
    options: &PaginationOptions,
    glyphs: &dyn GlyphSource,
) -> SheetResult<Document> {
    let grid = &options.grid;
    let font_family = glyphs.family_name(grid.font_type)?.to_string();
    let plans = plan_pages(stream.len(), options.chars_per_page, grid.chars_per_row, grid.row_count);
    if plans.is_empty() && !stream.is_empty() {
        return Err(SheetError::render(format!(
            "No pages planned for {} characters at {} per page",
            stream.len(),
            options.chars_per_page
        )));
    }
    let total_pages = plans.len();

    let mut pages = Vec::with_capacity(total_pages);
    let mut characters_drawn = 0;
    for plan in plans {
        let rendered = render_page(stream, page, grid, &plan, total_pages, glyphs)?;
        log::debug!(
            "Page {}/{}: characters {}..{}, {} rows, cell {}px",
            rendered.index,
            total_pages,
            rendered.range.start,
            rendered.range.end,
            rendered.layout.row_count,
            rendered.layout.cell_size
        );
        characters_drawn += rendered.characters_drawn;
        pages.push(rendered);
    }

    log::info!(
        "Paginated {} characters into {} pages ({} drawn)",
        stream.len(),
        total_pages,
        characters_drawn
    );

    Ok(Document {
        title: options.title.clone(),
        page_spec: *page,
        font_family,
        total_pages: pages.len(),
        pages,
        characters_drawn,
        total_characters: stream.len(),
        han_characters: stream.han_count(),
    })
}

fn render_page(
    stream: &CharacterStream,
    page: &PageSpec,
    grid: &GridOptions,
    plan: &PagePlan,
    total_pages: usize,
    glyphs: &dyn GlyphSource,
) -> SheetResult<Page> {
    let characters = stream.slice(plan.range.clone()).to_vec();
    let (content_width, content_height) = page.device_content_size();
    let layout = compute_layout(content_width, content_height, grid.chars_per_row, plan.row_count)?;
    let (image, characters_drawn) = render_grid(&layout, &characters, grid, glyphs)?;

    Ok(Page {
        index: plan.index,
        range: plan.range.clone(),
        characters,
        placement: place_on_page(page, &layout),
        footer: footer(page, plan.index, total_pages),
        layout,
        image,
        characters_drawn,
    })
}

/// Scale the raster uniformly to fit the content area and centre it there.
pub fn place_on_page(page: &PageSpec, layout: &Layout) -> Placement {
    let content_width = page.content_width();
    let content_height = page.content_height();
    let scale = (content_width / layout.total_width as f32)
        .min(content_height / layout.total_height as f32);
    let width = layout.total_width as f32 * scale;
    let height = layout.total_height as f32 * scale;

    Placement {
        x: page.margin + (content_width - width) / 2.0,
        y: page.margin + (content_height - height) / 2.0,
        width,
        height,
        scale,
    }
}

fn footer(page: &PageSpec, index: usize, total_pages: usize) -> Footer {
    Footer {
        text: format!("{} / {}", index, total_pages),
        center_x: page.width / 2.0,
        baseline: (page.margin / 2.0 - FOOTER_FONT_SIZE * 0.35).max(2.0),
        font_size: FOOTER_FONT_SIZE,
    }
}
