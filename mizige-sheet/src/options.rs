//! Request options for sheet and document generation
//!
//! Every recognised option, its default and its clamp rule lives here. Callers
//! hand in loosely typed values (JSON from a form, a query string, an FFI
//! caller); they are coerced once at the entry boundary and the rest of the
//! crate only ever sees the clamped structs below.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SheetError, SheetResult};

pub const CHARS_PER_ROW_MIN: u32 = 1;
pub const CHARS_PER_ROW_MAX: u32 = 20;
pub const ROW_COUNT_MIN: u32 = 1;
pub const ROW_COUNT_MAX: u32 = 30;
pub const GUIDE_OPACITY_MIN: f32 = 0.1;
pub const GUIDE_OPACITY_MAX: f32 = 1.0;
pub const CHARS_PER_PAGE_MIN: usize = 50;
pub const CHARS_PER_PAGE_MAX: usize = 500;
pub const DEFAULT_CHARS_PER_PAGE: usize = 150;
pub const DEFAULT_TITLE: &str = "米字格练习";

/// Font style of the guide characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontType {
    #[default]
    Serif,
    SansSerif,
    Cursive,
    Fantasy,
}

impl FontType {
    pub const ALL: [FontType; 4] = [
        FontType::Serif,
        FontType::SansSerif,
        FontType::Cursive,
        FontType::Fantasy,
    ];

    pub fn key(self) -> &'static str {
        match self {
            FontType::Serif => "serif",
            FontType::SansSerif => "sans-serif",
            FontType::Cursive => "cursive",
            FontType::Fantasy => "fantasy",
        }
    }

    pub fn from_key(key: &str) -> Option<FontType> {
        let key = key.trim();
        FontType::ALL
            .into_iter()
            .find(|ft| ft.key().eq_ignore_ascii_case(key))
    }

    /// Unknown or absent values fall back to serif.
    pub fn from_value(value: Option<&Value>) -> FontType {
        value
            .and_then(Value::as_str)
            .and_then(FontType::from_key)
            .unwrap_or_default()
    }
}

/// Per-call-site defaults. The single-page and PDF paths historically use
/// different values, so the caller picks one instead of the core guessing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridDefaults {
    pub chars_per_row: u32,
    pub row_count: u32,
    pub guide_opacity: f32,
}

impl GridDefaults {
    /// Single-page raster generation.
    pub const SHEET: GridDefaults = GridDefaults {
        chars_per_row: 10,
        row_count: 10,
        guide_opacity: 0.3,
    };

    /// Paginated PDF generation.
    pub const PDF: GridDefaults = GridDefaults {
        chars_per_row: 10,
        row_count: 15,
        guide_opacity: 0.2,
    };
}

/// Clamped grid options for one generation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridOptions {
    pub chars_per_row: u32,
    pub row_count: u32,
    pub font_type: FontType,
    pub practice_mode: bool,
    pub guide_opacity: f32,
}

impl GridOptions {
    pub fn new(defaults: GridDefaults) -> Self {
        Self {
            chars_per_row: clamp_u32(defaults.chars_per_row as i64, CHARS_PER_ROW_MIN, CHARS_PER_ROW_MAX),
            row_count: clamp_u32(defaults.row_count as i64, ROW_COUNT_MIN, ROW_COUNT_MAX),
            font_type: FontType::default(),
            practice_mode: false,
            guide_opacity: defaults.guide_opacity.clamp(GUIDE_OPACITY_MIN, GUIDE_OPACITY_MAX),
        }
    }

    pub fn with_chars_per_row(mut self, chars_per_row: i64) -> Self {
        self.chars_per_row = clamp_u32(chars_per_row, CHARS_PER_ROW_MIN, CHARS_PER_ROW_MAX);
        self
    }

    pub fn with_row_count(mut self, row_count: i64) -> Self {
        self.row_count = clamp_u32(row_count, ROW_COUNT_MIN, ROW_COUNT_MAX);
        self
    }

    pub fn with_font_type(mut self, font_type: FontType) -> Self {
        self.font_type = font_type;
        self
    }

    pub fn with_practice_mode(mut self, practice_mode: bool, guide_opacity: f32) -> Self {
        self.practice_mode = practice_mode;
        if guide_opacity.is_finite() {
            self.guide_opacity = guide_opacity.clamp(GUIDE_OPACITY_MIN, GUIDE_OPACITY_MAX);
        }
        self
    }

    /// Global opacity used for the guide characters.
    pub fn text_opacity(&self) -> f32 {
        if self.practice_mode {
            self.guide_opacity
        } else {
            1.0
        }
    }

    /// Cells available on one full grid.
    pub fn capacity(&self) -> usize {
        self.chars_per_row as usize * self.row_count as usize
    }
}

/// Options for multi-page document generation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationOptions {
    pub grid: GridOptions,
    pub chars_per_page: usize,
    pub title: String,
}

impl PaginationOptions {
    pub fn new(grid: GridOptions) -> Self {
        Self {
            grid,
            chars_per_page: DEFAULT_CHARS_PER_PAGE,
            title: DEFAULT_TITLE.to_string(),
        }
    }

    pub fn with_chars_per_page(mut self, chars_per_page: i64) -> Self {
        self.chars_per_page = chars_per_page
            .clamp(CHARS_PER_PAGE_MIN as i64, CHARS_PER_PAGE_MAX as i64) as usize;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        if !title.trim().is_empty() {
            self.title = title.trim().to_string();
        }
        self
    }
}

/// Raw request as it arrives from an outer layer.
///
/// Fields are kept as untyped JSON so that a bad value degrades to a default
/// instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SheetRequest {
    pub text: Option<Value>,
    pub font_type: Option<Value>,
    pub chars_per_row: Option<Value>,
    pub row_count: Option<Value>,
    pub practice_mode: Option<Value>,
    pub guide_opacity: Option<Value>,
    pub chars_per_page: Option<Value>,
    pub title: Option<Value>,
}

impl SheetRequest {
    pub fn from_json(json: &str) -> SheetResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| SheetError::validation(format!("Malformed request: {}", e)))
    }

    /// The text to practise. Must be present and a string.
    pub fn text(&self) -> SheetResult<&str> {
        match &self.text {
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(_) => Err(SheetError::validation("Text must be a string")),
            None => Err(SheetError::validation("Text is required")),
        }
    }

    pub fn grid_options(&self, defaults: GridDefaults) -> GridOptions {
        let chars_per_row = lenient_int(self.chars_per_row.as_ref())
            .unwrap_or(defaults.chars_per_row as i64);
        let row_count = lenient_int(self.row_count.as_ref())
            .unwrap_or(defaults.row_count as i64);
        let practice_mode = lenient_bool(self.practice_mode.as_ref()).unwrap_or(false);
        let guide_opacity = lenient_float(self.guide_opacity.as_ref())
            .unwrap_or(defaults.guide_opacity as f64) as f32;

        let options = GridOptions::new(defaults)
            .with_chars_per_row(chars_per_row)
            .with_row_count(row_count)
            .with_font_type(FontType::from_value(self.font_type.as_ref()))
            .with_practice_mode(practice_mode, guide_opacity);

        if options.chars_per_row as i64 != chars_per_row || options.row_count as i64 != row_count {
            log::debug!(
                "Grid clamped from {}x{} to {}x{}",
                chars_per_row,
                row_count,
                options.chars_per_row,
                options.row_count
            );
        }
        options
    }

    /// Pagination options for this request.
    ///
    /// `charsPerPage` defaults to the grid capacity and never exceeds it, so
    /// every character of a request lands in some cell.
    pub fn pagination_options(&self, defaults: GridDefaults) -> PaginationOptions {
        let grid = self.grid_options(defaults);
        let capacity = grid.capacity();
        let chars_per_page = lenient_int(self.chars_per_page.as_ref()).unwrap_or(capacity as i64);
        let mut options = PaginationOptions::new(grid).with_chars_per_page(chars_per_page);
        if options.chars_per_page > capacity {
            log::debug!(
                "Chars per page {} capped to grid capacity {}",
                options.chars_per_page,
                capacity
            );
            options.chars_per_page = capacity;
        }
        if let Some(Value::String(title)) = &self.title {
            options = options.with_title(title.as_str());
        }
        options
    }
}

fn clamp_u32(value: i64, min: u32, max: u32) -> u32 {
    value.clamp(min as i64, max as i64) as u32
}

/// Integer coercion in the spirit of a form field: numbers are truncated,
/// strings contribute their leading integer part, anything else is absent.
fn lenient_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => leading_int(s),
        _ => None,
    }
}

fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(digits.len(), |(i, _)| i);
    if end == 0 {
        return None;
    }
    // Saturate rather than fail on absurdly long digit runs; clamping follows anyway.
    let parsed = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * parsed)
}

fn lenient_float(value: Option<&Value>) -> Option<f64> {
    let f = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    f.is_finite().then_some(f)
}

fn lenient_bool(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Some(true),
            "false" | "0" | "off" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
