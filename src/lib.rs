//! Mizige FFI
//!
//! C bridge for host applications: takes a JSON request, writes a PNG sheet
//! or a paginated PDF, and hands back the layout metadata as JSON.

use std::ffi::{CStr, CString};
use std::path::Path;
use std::cell::RefCell;
use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use libc::{c_char, c_int};
use mizige_sheet::{
    generate_document, generate_sheet, write_document, DocumentMetadata, FontConfig, FontLibrary,
    GlyphSource, GridDefaults, PageSpec, SheetMetadata, SheetRequest,
};

static FONTS: OnceLock<Result<FontLibrary, String>> = OnceLock::new();

thread_local! {
    // Per calling thread, like errno.
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Process-wide font library, loaded once from the default configuration
/// plus `MIZIGE_FONT_*` overrides.
pub fn fonts() -> Result<&'static FontLibrary> {
    let loaded = FONTS.get_or_init(|| {
        let config = FontConfig::default().with_env_overrides();
        FontLibrary::load(&config).map_err(|e| e.to_string())
    });
    loaded.as_ref().map_err(|e| anyhow!("Font initialization failed: {}", e))
}

/// Render a single-page sheet request into PNG bytes.
pub fn render_sheet_request(json: &str, glyphs: &dyn GlyphSource) -> Result<(Vec<u8>, SheetMetadata)> {
    let request = SheetRequest::from_json(json)?;
    let options = request.grid_options(GridDefaults::SHEET);
    let sheet = generate_sheet(request.text()?, &options, &PageSpec::a4(), glyphs)?;
    let png = sheet.to_png()?;
    Ok((png, sheet.metadata))
}

/// Render a paginated request into PDF bytes.
pub fn render_pdf_request(json: &str, glyphs: &dyn GlyphSource) -> Result<(Vec<u8>, DocumentMetadata)> {
    let request = SheetRequest::from_json(json)?;
    let options = request.pagination_options(GridDefaults::PDF);
    let document = generate_document(request.text()?, &options, &PageSpec::a4(), glyphs)?;
    let pdf = write_document(&document)?;
    Ok((pdf, document.metadata()))
}

/// Generate a PNG practice sheet.
///
/// On success writes the image to `output_path`, stores a newly allocated
/// metadata JSON string in `out_metadata` (release it with `free_string`)
/// and returns 0. Returns -1 on failure; see `last_error_message`.
#[no_mangle]
pub extern "C" fn generate_sheet_ffi(
    request_json: *const c_char,
    output_path: *const c_char,
    out_metadata: *mut *mut c_char,
) -> c_int {
    run_ffi("Sheet generation", request_json, output_path, out_metadata, |json| {
        let (png, metadata) = render_sheet_request(json, fonts()?)?;
        Ok((png, serde_json::to_string(&metadata)?))
    })
}

/// Generate a paginated PDF practice document.
///
/// Same calling convention as `generate_sheet_ffi`.
#[no_mangle]
pub extern "C" fn generate_pdf_ffi(
    request_json: *const c_char,
    output_path: *const c_char,
    out_metadata: *mut *mut c_char,
) -> c_int {
    run_ffi("PDF generation", request_json, output_path, out_metadata, |json| {
        let (pdf, metadata) = render_pdf_request(json, fonts()?)?;
        Ok((pdf, serde_json::to_string(&metadata)?))
    })
}

/// Message of the most recent failed call on this thread, or null if no
/// call on this thread has failed.
///
/// The returned string must be released with `free_string`.
#[no_mangle]
pub extern "C" fn last_error_message() -> *mut c_char {
    match LAST_ERROR.with(|slot| slot.borrow().clone()) {
        Some(message) => into_c_string(message),
        None => std::ptr::null_mut(),
    }
}

/// Release a string previously returned by this library.
#[no_mangle]
pub extern "C" fn free_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(ptr));
    }
}

fn run_ffi<F>(
    label: &str,
    request_json: *const c_char,
    output_path: *const c_char,
    out_metadata: *mut *mut c_char,
    render: F,
) -> c_int
where
    F: FnOnce(&str) -> Result<(Vec<u8>, String)>,
{
    if request_json.is_null() || output_path.is_null() {
        record_error(format!("{} failed: null argument", label));
        return -1;
    }

    let request_json = unsafe { CStr::from_ptr(request_json).to_string_lossy().into_owned() };
    let output_path = unsafe { CStr::from_ptr(output_path).to_string_lossy().into_owned() };

    let result = render(&request_json).and_then(|(bytes, metadata)| {
        write_output(Path::new(&output_path), &bytes)?;
        Ok(metadata)
    });

    match result {
        Ok(metadata) => {
            if !out_metadata.is_null() {
                unsafe {
                    *out_metadata = into_c_string(metadata);
                }
            }
            0
        }
        Err(e) => {
            record_error(format!("{} failed: {:#}", label, e));
            -1
        }
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

fn into_c_string(text: String) -> *mut c_char {
    // Interior NULs cannot cross the boundary.
    let sanitized = text.replace('\0', "");
    match CString::new(sanitized) {
        Ok(c) => c.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

fn record_error(message: String) {
    log::error!("{}", message);
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

#[cfg(test)]
mod tests {
    use super::*;
    use mizige_sheet::{FontType, GlyphBitmap, SheetError, SheetResult};

    struct BlockGlyphs;

    impl GlyphSource for BlockGlyphs {
        fn family_name(&self, _font_type: FontType) -> SheetResult<&str> {
            Ok("Block")
        }

        fn rasterize(&self, _font_type: FontType, _unit: &str, px: f32) -> SheetResult<GlyphBitmap> {
            let side = (px * 0.6) as u32;
            Ok(GlyphBitmap::new(side, side, vec![255; (side * side) as usize]))
        }
    }

    fn take_string(ptr: *mut c_char) -> String {
        let text = unsafe { CStr::from_ptr(ptr).to_string_lossy().into_owned() };
        free_string(ptr);
        text
    }

    #[test]
    fn test_sheet_request_returns_png_and_metadata() {
        let (png, metadata) =
            render_sheet_request(r#"{ "text": "你好世界", "charsPerRow": 4, "rowCount": 2 }"#, &BlockGlyphs)
                .unwrap();
        assert!(png.starts_with(b"\x89PNG"));
        assert_eq!(metadata.characters_drawn, 4);
        assert_eq!(metadata.font_family, "Block");
    }

    #[test]
    fn test_pdf_request_uses_pdf_defaults() {
        let text = "字".repeat(160);
        let (pdf, metadata) =
            render_pdf_request(&format!(r#"{{ "text": "{}" }}"#, text), &BlockGlyphs).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert_eq!(metadata.total_pages, 2);
        assert_eq!(metadata.characters_drawn, 160);
    }

    #[test]
    fn test_missing_text_is_validation_error() {
        let err = render_sheet_request(r#"{ "charsPerRow": 4 }"#, &BlockGlyphs).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SheetError>(),
            Some(SheetError::Validation(_))
        ));
    }

    #[test]
    fn test_null_arguments_return_error_code() {
        let mut metadata: *mut c_char = std::ptr::null_mut();
        let code = generate_sheet_ffi(std::ptr::null(), std::ptr::null(), &mut metadata);
        assert_eq!(code, -1);
        assert!(metadata.is_null());

        let message = last_error_message();
        assert!(!message.is_null());
        assert!(take_string(message).contains("null argument"));
    }

    #[test]
    fn test_run_ffi_writes_output_and_metadata() {
        let dir = std::env::temp_dir().join(format!("mizige-ffi-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sheet.png");

        let json = CString::new(r#"{ "text": "永" }"#).unwrap();
        let out = CString::new(path.to_string_lossy().into_owned()).unwrap();
        let mut metadata: *mut c_char = std::ptr::null_mut();
        let code = run_ffi("Sheet generation", json.as_ptr(), out.as_ptr(), &mut metadata, |json| {
            let (png, metadata) = render_sheet_request(json, &BlockGlyphs)?;
            Ok((png, serde_json::to_string(&metadata)?))
        });

        assert_eq!(code, 0);
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        let parsed: serde_json::Value = serde_json::from_str(&take_string(metadata)).unwrap();
        assert_eq!(parsed["charactersDrawn"], 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_last_error_is_per_thread() {
        let code = std::thread::spawn(|| {
            let mut metadata: *mut c_char = std::ptr::null_mut();
            let code = generate_pdf_ffi(std::ptr::null(), std::ptr::null(), &mut metadata);
            let message = last_error_message();
            assert!(!message.is_null());
            free_string(message);
            code
        })
        .join()
        .unwrap();

        assert_eq!(code, -1);
        assert!(last_error_message().is_null());
    }

    #[test]
    fn test_pdf_request_keeps_every_character_on_a_shorter_grid() {
        let text = "字".repeat(300);
        let (_, metadata) = render_pdf_request(
            &format!(r#"{{ "text": "{}", "rowCount": 10 }}"#, text),
            &BlockGlyphs,
        )
        .unwrap();
        assert_eq!(metadata.total_pages, 3);
        assert_eq!(metadata.characters_drawn, 300);
        assert_eq!(metadata.total_characters, 300);
    }

    #[test]
    fn test_free_string_accepts_null() {
        free_string(std::ptr::null_mut());
    }
}
