//! Mizige Practice Sheet Renderer
//!
//! Renders Chinese handwriting practice sheets: a rice-grid (米字格) with one
//! guide character per cell, either as a single raster page or paginated into
//! a multi-page PDF with every page centred on a fixed physical page.

pub mod characters;
pub mod error;
pub mod fonts;
pub mod grid;
pub mod layout;
pub mod options;
pub mod paginator;
pub mod pdf;
pub mod sheet;
pub mod surface;

// Re-export commonly used functions and types
pub use characters::{CharacterStream, MAX_CHARACTERS};
pub use error::{SheetError, SheetResult};
pub use fonts::{FontConfig, FontLibrary, GlyphBitmap, GlyphSource};
pub use layout::{compute_layout, Layout, PageSpec};
pub use options::{FontType, GridDefaults, GridOptions, PaginationOptions, SheetRequest};
pub use paginator::{generate_document, paginate, Document, DocumentMetadata, Page};
pub use pdf::{save_document, write_document};
pub use sheet::{generate_sheet, Sheet, SheetMetadata};
