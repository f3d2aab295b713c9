//! Render a single sheet and a paginated PDF with the fonts found on this machine.
//!
//! Set MIZIGE_FONT_SERIF (or another MIZIGE_FONT_* variable) to point at a CJK
//! font file if none of the default locations exist.

use mizige_sheet::{
    generate_document, generate_sheet, save_document, FontConfig, FontLibrary, FontType,
    GridDefaults, GridOptions, PageSpec, PaginationOptions,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let fonts = FontLibrary::load(&FontConfig::default().with_env_overrides())?;
    let page = PageSpec::a4();

    let options = GridOptions::new(GridDefaults::SHEET)
        .with_font_type(FontType::Cursive)
        .with_practice_mode(true, 0.3);
    let sheet = generate_sheet("永字八法", &options, &page, &fonts)?;
    std::fs::write("sheet.png", sheet.to_png()?)?;
    println!("sheet.png: {}", serde_json::to_string_pretty(&sheet.metadata)?);

    let poem = "白日依山尽黄河入海流欲穷千里目更上一层楼".repeat(12);
    let options = PaginationOptions::new(GridOptions::new(GridDefaults::PDF))
        .with_chars_per_page(150)
        .with_title("登鹳雀楼");
    let document = generate_document(&poem, &options, &page, &fonts)?;
    save_document(&document, "practice.pdf")?;
    println!("practice.pdf: {}", serde_json::to_string_pretty(&document.metadata())?);

    Ok(())
}
