//! Font management for guide characters
//!
//! Fonts are discovered and parsed once from a `FontConfig` and then shared
//! read-only by every request. Each `FontType` resolves to an ordered chain of
//! loaded faces; a character missing from the first face is taken from the
//! next face that has it.

use fontdue::{Font, FontSettings};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{SheetError, SheetResult};
use crate::options::FontType;

/// 8-bit coverage bitmap of a rendered unit, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<u8>,
}

impl GlyphBitmap {
    pub fn new(width: u32, height: u32, coverage: Vec<u8>) -> Self {
        debug_assert_eq!(coverage.len(), width as usize * height as usize);
        Self {
            width,
            height,
            coverage,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.width == 0 || self.height == 0 || self.coverage.iter().all(|&c| c == 0)
    }
}

/// Renders one character unit in a given font at a given pixel size.
pub trait GlyphSource {
    /// Resolved family name for a font type.
    fn family_name(&self, font_type: FontType) -> SheetResult<&str>;

    /// Rasterize `unit` (one grapheme cluster) at `px` pixels per em.
    fn rasterize(&self, font_type: FontType, unit: &str, px: f32) -> SheetResult<GlyphBitmap>;
}

/// One candidate font file for a font type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontCandidate {
    pub family: String,
    pub path: PathBuf,
}

impl FontCandidate {
    fn new(family: &str, path: &str) -> Self {
        Self {
            family: family.to_string(),
            path: PathBuf::from(path),
        }
    }

    /// A user-supplied font file, named after its file stem.
    fn from_override(path: &str) -> Self {
        let path = PathBuf::from(path);
        let family = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| path.display().to_string());
        Self { family, path }
    }
}

/// Static font metadata for one font type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontFaceConfig {
    pub font_type: FontType,
    pub display_name: String,
    pub candidates: Vec<FontCandidate>,
}

/// Font configuration: candidates per type plus the cross-type fallback order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontConfig {
    pub faces: Vec<FontFaceConfig>,
    pub fallback_order: Vec<FontType>,
}

impl FontConfig {
    pub fn face(&self, font_type: FontType) -> Option<&FontFaceConfig> {
        self.faces.iter().find(|f| f.font_type == font_type)
    }

    pub fn display_name(&self, font_type: FontType) -> &str {
        self.face(font_type)
            .map(|f| f.display_name.as_str())
            .unwrap_or(font_type.key())
    }

    /// Prepend paths from `MIZIGE_FONT_<TYPE>` environment variables.
    pub fn with_env_overrides(mut self) -> Self {
        for face in &mut self.faces {
            let var = format!(
                "MIZIGE_FONT_{}",
                face.font_type.key().to_ascii_uppercase().replace('-', "_")
            );
            if let Ok(path) = std::env::var(&var) {
                if !path.trim().is_empty() {
                    log::info!("Font override from {}: {}", var, path);
                    face.candidates.insert(0, FontCandidate::from_override(path.trim()));
                }
            }
        }
        self
    }

    /// Types to try for `font_type`, itself first.
    fn chain(&self, font_type: FontType) -> Vec<FontType> {
        let mut chain = vec![font_type];
        for &ft in &self.fallback_order {
            if !chain.contains(&ft) {
                chain.push(ft);
            }
        }
        chain
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        let bundled = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/fonts");
        let faces = vec![
            FontFaceConfig {
                font_type: FontType::Serif,
                display_name: "宋体".to_string(),
                candidates: vec![
                    FontCandidate::new("Noto Serif SC", &format!("{}/NotoSerifSC-Regular.otf", bundled)),
                    FontCandidate::new("Noto Serif CJK SC", "/usr/share/fonts/opentype/noto/NotoSerifCJK-Regular.ttc"),
                    FontCandidate::new("Noto Serif CJK SC", "/usr/share/fonts/noto-cjk/NotoSerifCJK-Regular.ttc"),
                    FontCandidate::new("AR PL UMing", "/usr/share/fonts/truetype/arphic/uming.ttc"),
                    FontCandidate::new("SimSun", "C:\\Windows\\Fonts\\simsun.ttc"),
                    FontCandidate::new("Songti SC", "/System/Library/Fonts/Supplemental/Songti.ttc"),
                ],
            },
            FontFaceConfig {
                font_type: FontType::SansSerif,
                display_name: "黑体".to_string(),
                candidates: vec![
                    FontCandidate::new("Noto Sans SC", &format!("{}/NotoSansSC-Regular.otf", bundled)),
                    FontCandidate::new("Noto Sans CJK SC", "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc"),
                    FontCandidate::new("Noto Sans CJK SC", "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc"),
                    FontCandidate::new("WenQuanYi Micro Hei", "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc"),
                    FontCandidate::new("Microsoft YaHei", "C:\\Windows\\Fonts\\msyh.ttc"),
                    FontCandidate::new("SimHei", "C:\\Windows\\Fonts\\simhei.ttf"),
                    FontCandidate::new("PingFang SC", "/System/Library/Fonts/PingFang.ttc"),
                ],
            },
            FontFaceConfig {
                font_type: FontType::Cursive,
                display_name: "楷体".to_string(),
                candidates: vec![
                    FontCandidate::new("LXGW WenKai", &format!("{}/LXGWWenKai-Regular.ttf", bundled)),
                    FontCandidate::new("AR PL UKai CN", "/usr/share/fonts/truetype/arphic/ukai.ttc"),
                    FontCandidate::new("KaiTi", "C:\\Windows\\Fonts\\simkai.ttf"),
                    FontCandidate::new("Kaiti SC", "/System/Library/Fonts/Supplemental/Kaiti.ttc"),
                ],
            },
            FontFaceConfig {
                font_type: FontType::Fantasy,
                display_name: "隶书".to_string(),
                candidates: vec![
                    FontCandidate::new("ZCOOL XiaoWei", &format!("{}/ZCOOLXiaoWei-Regular.ttf", bundled)),
                    FontCandidate::new("LiSu", "C:\\Windows\\Fonts\\SIMLI.TTF"),
                    FontCandidate::new("STLiti", "C:\\Windows\\Fonts\\STLITI.TTF"),
                    FontCandidate::new("Baoli SC", "/System/Library/Fonts/Supplemental/Baoli.ttc"),
                ],
            },
        ];

        Self {
            faces,
            fallback_order: vec![FontType::Serif, FontType::SansSerif, FontType::Cursive, FontType::Fantasy],
        }
    }
}

/// A parsed font file
pub struct LoadedFace {
    pub family: String,
    pub path: PathBuf,
    font: Font,
}

impl LoadedFace {
    pub fn from_bytes(family: &str, path: &Path, data: Vec<u8>) -> SheetResult<Self> {
        let font = Font::from_bytes(data, FontSettings::default()).map_err(|e| {
            SheetError::configuration(format!("Failed to parse font {}: {}", path.display(), e))
        })?;
        Ok(Self {
            family: family.to_string(),
            path: path.to_path_buf(),
            font,
        })
    }

    pub fn has_glyph(&self, ch: char) -> bool {
        self.font.lookup_glyph_index(ch) != 0
    }
}

/// Read-only set of resolved fonts, built once per process
pub struct FontLibrary {
    chains: HashMap<FontType, Vec<Arc<LoadedFace>>>,
}

impl FontLibrary {
    /// Resolve every font type in `config`.
    ///
    /// Types without a loadable file borrow faces from their fallback chain.
    /// Fails only if not a single candidate loads.
    pub fn load(config: &FontConfig) -> SheetResult<Self> {
        let mut primaries: HashMap<FontType, Arc<LoadedFace>> = HashMap::new();
        let mut tried = Vec::new();

        for face in &config.faces {
            for candidate in &face.candidates {
                if !candidate.path.exists() {
                    continue;
                }
                tried.push(candidate.path.display().to_string());
                let loaded = std::fs::read(&candidate.path)
                    .map_err(SheetError::from)
                    .and_then(|data| LoadedFace::from_bytes(&candidate.family, &candidate.path, data));
                match loaded {
                    Ok(loaded) => {
                        log::info!(
                            "Loaded {} font: {} from {}",
                            face.font_type.key(),
                            candidate.family,
                            candidate.path.display()
                        );
                        primaries.insert(face.font_type, Arc::new(loaded));
                        break;
                    }
                    Err(e) => log::warn!("Skipping font candidate: {}", e),
                }
            }
        }

        Self::from_primaries(config, primaries).map_err(|e| match e {
            SheetError::Configuration(msg) if !tried.is_empty() => {
                SheetError::configuration(format!("{} (tried: {})", msg, tried.join(", ")))
            }
            other => other,
        })
    }

    /// Build fallback chains from already parsed faces.
    pub fn from_primaries(
        config: &FontConfig,
        primaries: HashMap<FontType, Arc<LoadedFace>>,
    ) -> SheetResult<Self> {
        if primaries.is_empty() {
            return Err(SheetError::configuration("No usable font found for any font type"));
        }

        let mut chains = HashMap::new();
        for font_type in FontType::ALL {
            let chain: Vec<Arc<LoadedFace>> = config
                .chain(font_type)
                .into_iter()
                .filter_map(|ft| primaries.get(&ft).cloned())
                .collect();
            if chain.is_empty() {
                // Types left out of both the faces and the fallback order still need a face.
                let any = primaries.values().next().cloned();
                chains.insert(font_type, any.into_iter().collect());
            } else {
                if !primaries.contains_key(&font_type) {
                    log::info!(
                        "No {} font available, falling back to {}",
                        font_type.key(),
                        chain[0].family
                    );
                }
                chains.insert(font_type, chain);
            }
        }

        Ok(Self { chains })
    }

    fn chain(&self, font_type: FontType) -> SheetResult<&[Arc<LoadedFace>]> {
        self.chains
            .get(&font_type)
            .map(Vec::as_slice)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                SheetError::configuration(format!("No font resolved for {}", font_type.key()))
            })
    }

    fn face_for_char(&self, font_type: FontType, ch: char) -> SheetResult<&LoadedFace> {
        let chain = self.chain(font_type)?;
        let face = chain
            .iter()
            .find(|face| face.has_glyph(ch))
            .unwrap_or(&chain[0]);
        Ok(&**face)
    }
}

impl GlyphSource for FontLibrary {
    fn family_name(&self, font_type: FontType) -> SheetResult<&str> {
        Ok(self.chain(font_type)?[0].family.as_str())
    }

    fn rasterize(&self, font_type: FontType, unit: &str, px: f32) -> SheetResult<GlyphBitmap> {
        let mut pieces = Vec::new();
        let mut pen_x = 0.0_f32;
        for ch in unit.chars() {
            let face = self.face_for_char(font_type, ch)?;
            let (metrics, coverage) = face.font.rasterize(ch, px);
            pieces.push(PlacedGlyph {
                left: pen_x.round() as i32 + metrics.xmin,
                bottom: metrics.ymin,
                width: metrics.width as i32,
                height: metrics.height as i32,
                coverage,
            });
            pen_x += metrics.advance_width;
        }
        Ok(compose(&pieces))
    }
}

/// A rasterized glyph positioned on a common baseline, y pointing up.
struct PlacedGlyph {
    left: i32,
    bottom: i32,
    width: i32,
    height: i32,
    coverage: Vec<u8>,
}

/// Merge glyphs of one grapheme cluster into a single coverage bitmap.
fn compose(pieces: &[PlacedGlyph]) -> GlyphBitmap {
    let inked: Vec<&PlacedGlyph> = pieces.iter().filter(|p| p.width > 0 && p.height > 0).collect();
    if inked.is_empty() {
        return GlyphBitmap::default();
    }
    if inked.len() == 1 {
        let p = inked[0];
        return GlyphBitmap::new(p.width as u32, p.height as u32, p.coverage.clone());
    }

    let left = inked.iter().map(|p| p.left).min().unwrap_or(0);
    let right = inked.iter().map(|p| p.left + p.width).max().unwrap_or(0);
    let bottom = inked.iter().map(|p| p.bottom).min().unwrap_or(0);
    let top = inked.iter().map(|p| p.bottom + p.height).max().unwrap_or(0);
    let width = (right - left) as usize;
    let height = (top - bottom) as usize;

    let mut coverage = vec![0u8; width * height];
    for p in inked {
        let x0 = (p.left - left) as usize;
        let y0 = (top - (p.bottom + p.height)) as usize;
        for row in 0..p.height as usize {
            for col in 0..p.width as usize {
                let src = p.coverage[row * p.width as usize + col];
                let dst = &mut coverage[(y0 + row) * width + x0 + col];
                *dst = (*dst).max(src);
            }
        }
    }
    GlyphBitmap::new(width as u32, height as u32, coverage)
}
