//! PDF assembly for paginated documents
//!
//! Streams the finished pages of a `Document` into a PDF in one pass: each page
//! raster becomes a Flate-compressed RGB image XObject drawn at its placement,
//! followed by the footer page number in Helvetica.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{
    content::{Content, Operation},
    Dictionary, Document as PdfDocument, Object, ObjectId, Stream, StringFormat,
};
use std::io::Write;
use std::path::Path;

use crate::error::{SheetError, SheetResult};
use crate::paginator::{Document, Page};

const PRODUCER: &str = "mizige-sheet";
const FOOTER_FONT: &str = "F1";

/// Writes one `Document` into a fresh PDF
struct PdfAssembler {
    document: PdfDocument,
    pages_id: ObjectId,
    footer_font_id: ObjectId,
    kids: Vec<Object>,
}

impl PdfAssembler {
    fn new() -> Self {
        let mut document = PdfDocument::with_version("1.5");
        let pages_id = document.new_object_id();

        let mut font_dict = Dictionary::new();
        font_dict.set("Type", Object::Name(b"Font".to_vec()));
        font_dict.set("Subtype", Object::Name(b"Type1".to_vec()));
        font_dict.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
        font_dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        let footer_font_id = document.add_object(Object::Dictionary(font_dict));

        Self {
            document,
            pages_id,
            footer_font_id,
            kids: Vec::new(),
        }
    }

    fn add_page(&mut self, page: &Page, page_width: f32, page_height: f32) -> SheetResult<()> {
        let image_id = self.add_image(page)?;
        let image_name = format!("Im{}", page.index);

        let placement = &page.placement;
        let footer = &page.footer;
        let footer_x = footer.center_x - helvetica_width(&footer.text, footer.font_size) / 2.0;

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(placement.width),
                        Object::Real(0.0),
                        Object::Real(0.0),
                        Object::Real(placement.height),
                        Object::Real(placement.x),
                        Object::Real(placement.bottom(page_height)),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(image_name.clone().into_bytes())]),
                Operation::new("Q", vec![]),
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![
                        Object::Name(FOOTER_FONT.as_bytes().to_vec()),
                        Object::Real(footer.font_size),
                    ],
                ),
                Operation::new("Td", vec![Object::Real(footer_x), Object::Real(footer.baseline)]),
                Operation::new("Tj", vec![Object::string_literal(footer.text.as_str())]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = self
            .document
            .add_object(Stream::new(Dictionary::new(), content.encode()?));

        let mut fonts = Dictionary::new();
        fonts.set(FOOTER_FONT, Object::Reference(self.footer_font_id));
        let mut x_objects = Dictionary::new();
        x_objects.set(image_name.as_str(), Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));
        resources.set("XObject", Object::Dictionary(x_objects));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page_width),
                Object::Real(page_height),
            ]),
        );
        page_dict.set("Contents", Object::Reference(content_id));

        let page_id = self.document.add_object(Object::Dictionary(page_dict));
        self.kids.push(Object::Reference(page_id));
        Ok(())
    }

    fn add_image(&mut self, page: &Page) -> SheetResult<ObjectId> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&page.image.to_rgb())?;
        let compressed = encoder.finish()?;

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(page.image.width() as i64));
        dict.set("Height", Object::Integer(page.image.height() as i64));
        dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        dict.set("BitsPerComponent", Object::Integer(8));
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));

        // Already deflated; keep lopdf from compressing it a second time.
        let stream = Stream::new(dict, compressed).with_compression(false);
        Ok(self.document.add_object(stream))
    }

    fn finish(mut self, title: &str) -> SheetResult<Vec<u8>> {
        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set("Count", Object::Integer(self.kids.len() as i64));
        pages_dict.set("Kids", Object::Array(self.kids));
        self.document
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let mut info_dict = Dictionary::new();
        info_dict.set("Title", text_string(title));
        info_dict.set("Producer", Object::string_literal(PRODUCER));
        info_dict.set("Creator", Object::string_literal(PRODUCER));
        let info_id = self.document.add_object(Object::Dictionary(info_dict));

        let mut catalog_dict = Dictionary::new();
        catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog_dict.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.document.add_object(Object::Dictionary(catalog_dict));

        self.document.trailer.set("Root", Object::Reference(catalog_id));
        self.document.trailer.set("Info", Object::Reference(info_id));

        self.document.compress();
        let mut bytes = Vec::new();
        self.document.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

/// Serialize every page of `document` into PDF bytes.
pub fn write_document(document: &Document) -> SheetResult<Vec<u8>> {
    if document.pages.is_empty() {
        return Err(SheetError::render("Document has no pages"));
    }

    let spec = &document.page_spec;
    let mut assembler = PdfAssembler::new();
    for page in &document.pages {
        assembler.add_page(page, spec.width, spec.height)?;
    }
    let bytes = assembler.finish(&document.title)?;

    log::debug!(
        "Assembled PDF with {} pages, {} bytes",
        document.pages.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Write `document` as a PDF file at `output_path`.
pub fn save_document(document: &Document, output_path: impl AsRef<Path>) -> SheetResult<()> {
    let bytes = write_document(document)?;
    std::fs::write(output_path, bytes)?;
    Ok(())
}

/// PDF text string: literal for ASCII, UTF-16BE with byte order mark otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Width of `text` in Helvetica at `size` points.
fn helvetica_width(text: &str, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|ch| match ch {
            ' ' | '/' => 278,
            _ => 556,
        })
        .sum();
    units as f32 * size / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{GlyphBitmap, GlyphSource};
    use crate::layout::PageSpec;
    use crate::options::{FontType, GridDefaults, GridOptions, PaginationOptions};
    use crate::paginator::generate_document;

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

    fn sample_document(chars: usize) -> Document {
        let grid = GridOptions::new(GridDefaults::PDF);
        let options = PaginationOptions::new(grid)
            .with_chars_per_page(150)
            .with_title("书法练习");
        generate_document(&"永".repeat(chars), &options, &PageSpec::a4(), &BlockGlyphs).unwrap()
    }

    #[test]
    fn test_pdf_has_one_page_per_document_page() {
        let document = sample_document(320);
        let bytes = write_document(&document).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let parsed = PdfDocument::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 3);
    }

    #[test]
    fn test_pages_use_physical_media_box() {
        let document = sample_document(10);
        let bytes = write_document(&document).unwrap();
        let parsed = PdfDocument::load_mem(&bytes).unwrap();

        let (_, page_id) = parsed.get_pages().into_iter().next().unwrap();
        let page = parsed.get_dictionary(page_id).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_float().unwrap(), 595.0);
        assert_eq!(media_box[3].as_float().unwrap(), 842.0);
    }

    #[test]
    fn test_empty_document_is_render_error() {
        let mut document = sample_document(10);
        document.pages.clear();
        assert!(matches!(write_document(&document), Err(SheetError::Render(_))));
    }

    #[test]
    fn test_text_string_encodes_non_ascii_as_utf16() {
        match text_string("abc") {
            Object::String(bytes, StringFormat::Literal) => assert_eq!(bytes, b"abc".to_vec()),
            other => panic!("unexpected {:?}", other),
        }
        match text_string("字") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(bytes, vec![0xFE, 0xFF, 0x5B, 0x57]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_footer_width_uses_helvetica_metrics() {
        // "1 / 3": 556 + 278 + 278 + 278 + 556
        assert!((helvetica_width("1 / 3", 10.0) - 19.46).abs() < 1e-3);
    }
}
