//! Raster drawing surface for one page
//!
//! Thin wrapper over a `tiny_skia::Pixmap` exposing only what the grid and
//! character placement need. Coordinates are device pixels, origin top-left.

use tiny_skia::{
    Color, Paint, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8, Rect, Stroke,
    StrokeDash, Transform,
};

use crate::error::{SheetError, SheetResult};
use crate::fonts::GlyphBitmap;

/// Stroke style for borders and guide lines
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub color: [u8; 3],
    pub width: f32,
    /// On/off lengths in device pixels, solid when absent
    pub dash: Option<[f32; 2]>,
}

impl LineStyle {
    /// Cell border
    pub const BORDER: LineStyle = LineStyle {
        color: [204, 51, 51],
        width: 2.0,
        dash: None,
    };

    /// Midlines and diagonals inside a cell
    pub const GUIDE: LineStyle = LineStyle {
        color: [236, 170, 170],
        width: 1.0,
        dash: Some([4.0, 3.0]),
    };

    fn paint(&self) -> Paint<'static> {
        let mut paint = Paint::default();
        let [r, g, b] = self.color;
        paint.set_color_rgba8(r, g, b, 255);
        paint.anti_alias = true;
        paint
    }

    fn stroke(&self) -> Stroke {
        Stroke {
            width: self.width,
            dash: self.dash.and_then(|[on, off]| StrokeDash::new(vec![on, off], 0.0)),
            ..Stroke::default()
        }
    }
}

/// Colour of the guide characters
pub const TEXT_COLOR: [u8; 3] = [34, 34, 34];

/// Exclusively owned drawing surface, white background
pub struct Surface {
    pixmap: Pixmap,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> SheetResult<Self> {
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            SheetError::render(format!("Cannot allocate a {}x{} surface", width, height))
        })?;
        pixmap.fill(Color::WHITE);
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Stroke the outline of a square with its top-left corner at `(x, y)`.
    pub fn stroke_square(&mut self, x: f32, y: f32, size: f32, style: &LineStyle) -> SheetResult<()> {
        let rect = Rect::from_xywh(x, y, size, size).ok_or_else(|| {
            SheetError::render(format!("Invalid square at ({}, {}) size {}", x, y, size))
        })?;
        let path = PathBuilder::from_rect(rect);
        self.pixmap
            .stroke_path(&path, &style.paint(), &style.stroke(), Transform::identity(), None);
        Ok(())
    }

    pub fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), style: &LineStyle) -> SheetResult<()> {
        let mut pb = PathBuilder::new();
        pb.move_to(from.0, from.1);
        pb.line_to(to.0, to.1);
        let path = pb.finish().ok_or_else(|| {
            SheetError::render(format!("Degenerate line {:?} -> {:?}", from, to))
        })?;
        self.pixmap
            .stroke_path(&path, &style.paint(), &style.stroke(), Transform::identity(), None);
        Ok(())
    }

    /// Composite a coverage bitmap with its top-left corner at `(x, y)`.
    ///
    /// `opacity` scales the whole glyph uniformly; geometry is unaffected.
    pub fn draw_glyph(
        &mut self,
        glyph: &GlyphBitmap,
        x: i32,
        y: i32,
        color: [u8; 3],
        opacity: f32,
    ) -> SheetResult<()> {
        if glyph.is_blank() {
            return Ok(());
        }
        let mut layer = Pixmap::new(glyph.width, glyph.height).ok_or_else(|| {
            SheetError::render(format!(
                "Cannot allocate a {}x{} glyph layer",
                glyph.width, glyph.height
            ))
        })?;

        let [r, g, b] = color;
        for (pixel, &alpha) in layer.pixels_mut().iter_mut().zip(&glyph.coverage) {
            *pixel = premultiply(r, g, b, alpha);
        }

        let paint = PixmapPaint {
            opacity: opacity.clamp(0.0, 1.0),
            ..PixmapPaint::default()
        };
        self.pixmap
            .draw_pixmap(x, y, layer.as_ref(), &paint, Transform::identity(), None);
        Ok(())
    }

    /// Straight RGB of one pixel, for inspection.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue()])
    }

    /// Freeze the surface into an immutable page image.
    pub fn finish(self) -> PageImage {
        PageImage {
            pixmap: self.pixmap,
        }
    }
}

fn premultiply(r: u8, g: u8, b: u8, alpha: u8) -> PremultipliedColorU8 {
    let scale = |c: u8| ((c as u16 * alpha as u16 + 127) / 255) as u8;
    PremultipliedColorU8::from_rgba(scale(r), scale(g), scale(b), alpha)
        .unwrap_or(PremultipliedColorU8::TRANSPARENT)
}

/// Finalized raster of one page
#[derive(Clone)]
pub struct PageImage {
    pixmap: Pixmap,
}

impl PageImage {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue()])
    }

    /// Packed 8-bit RGB rows, top to bottom.
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.pixmap.pixels().len() * 3);
        for pixel in self.pixmap.pixels() {
            let c = pixel.demultiply();
            rgb.extend_from_slice(&[c.red(), c.green(), c.blue()]);
        }
        rgb
    }

    pub fn to_png(&self) -> SheetResult<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| SheetError::render(format!("PNG encoding failed: {}", e)))
    }
}

impl std::fmt::Debug for PageImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
