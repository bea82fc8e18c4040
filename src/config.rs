//! Configuration types for fitting an image onto a paper-sized canvas.
//!
//! Every knob of a conversion lives in one immutable [`ResizeConfig`], built
//! via its [`ResizeConfigBuilder`]. A config is passed by reference to each
//! call and never mutated, so a batch caller can share one across files.

use crate::catalog::SizeCatalog;
use crate::error::PrintSizeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default for [`ResizeConfig::max_canvas_pixels`]: A1 at 600 DPI fits.
pub const DEFAULT_MAX_CANVAS_PIXELS: u64 = 300_000_000;

/// Configuration for one image-to-paper conversion.
///
/// Built via [`ResizeConfig::builder()`] or using [`ResizeConfig::default()`].
///
/// # Example
/// ```rust
/// use printsize::{PlacementMode, ResizeConfig, SizeCatalog};
///
/// let config = ResizeConfig::builder()
///     .catalog(SizeCatalog::FourByFive)
///     .size_key("8x10")
///     .dpi(300)
///     .mode(PlacementMode::Fill)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ResizeConfig {
    /// Size catalog the key is looked up in. Default: A series.
    pub catalog: SizeCatalog,

    /// Size key inside the catalog, case-insensitive. Default: "A4".
    pub size_key: String,

    /// Output resolution; also the rasterization DPI for vector/page inputs. Default: 300.
    pub dpi: u32,

    /// How the image is mapped onto the canvas. Default: [`PlacementMode::Fit`].
    pub mode: PlacementMode,

    /// Paper orientation. Default: [`Orientation::Vertical`].
    pub orientation: Orientation,

    /// Padding colour and the colour transparency is flattened onto. Default: white.
    pub background: Color,

    /// Border colour trimmed by autocrop on opaque images. Default: white.
    pub trim_color: Color,

    /// Turn a missing/failing Ghostscript into a skipped-file record instead
    /// of an error. Default: true.
    pub skip_page_failures: bool,

    /// Turn a failed SVG rasterization into a skipped-file record instead of
    /// an error. Default: true.
    pub skip_vector_failures: bool,

    /// Trim uniform or transparent borders before placement. Default: true.
    pub autocrop: bool,

    /// Composite transparency onto `background` before placement. Default: true.
    pub flatten_alpha: bool,

    /// Where to find Ghostscript. Default: [`ToolLocation::Auto`].
    pub ghostscript: ToolLocation,

    /// Where to find Inkscape. Default: [`ToolLocation::Auto`].
    pub inkscape: ToolLocation,

    /// Directory for rasterizer intermediates. Default: the system temp dir.
    pub temp_dir: Option<PathBuf>,

    /// Kill an external rasterizer after this many seconds. `None` waits
    /// forever. Default: 300.
    pub tool_timeout_secs: Option<u64>,

    /// Extra directory relative source paths are tried against. Default: none.
    pub base_dir: Option<PathBuf>,

    /// Largest canvas (width × height) a conversion may allocate. Larger
    /// size/DPI combinations fail before any decoding with
    /// [`PrintSizeError::InvalidDimensions`]: the canvas and resampling
    /// buffers take several bytes per pixel each, and an allocation failure
    /// aborts the process. Default: [`DEFAULT_MAX_CANVAS_PIXELS`].
    pub max_canvas_pixels: u64,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            catalog: SizeCatalog::default(),
            size_key: "A4".to_string(),
            dpi: 300,
            mode: PlacementMode::default(),
            orientation: Orientation::default(),
            background: Color::WHITE,
            trim_color: Color::WHITE,
            skip_page_failures: true,
            skip_vector_failures: true,
            autocrop: true,
            flatten_alpha: true,
            ghostscript: ToolLocation::Auto,
            inkscape: ToolLocation::Auto,
            temp_dir: None,
            tool_timeout_secs: Some(300),
            base_dir: None,
            max_canvas_pixels: DEFAULT_MAX_CANVAS_PIXELS,
        }
    }
}

impl ResizeConfig {
    /// Create a new builder for `ResizeConfig`.
    pub fn builder() -> ResizeConfigBuilder {
        ResizeConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ResizeConfig`].
#[derive(Debug)]
pub struct ResizeConfigBuilder {
    config: ResizeConfig,
}

impl ResizeConfigBuilder {
    pub fn catalog(mut self, catalog: SizeCatalog) -> Self {
        self.config.catalog = catalog;
        self
    }

    pub fn size_key(mut self, key: impl Into<String>) -> Self {
        self.config.size_key = key.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn mode(mut self, mode: PlacementMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.config.orientation = orientation;
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.config.background = color;
        self
    }

    pub fn trim_color(mut self, color: Color) -> Self {
        self.config.trim_color = color;
        self
    }

    pub fn skip_page_failures(mut self, v: bool) -> Self {
        self.config.skip_page_failures = v;
        self
    }

    pub fn skip_vector_failures(mut self, v: bool) -> Self {
        self.config.skip_vector_failures = v;
        self
    }

    pub fn autocrop(mut self, v: bool) -> Self {
        self.config.autocrop = v;
        self
    }

    pub fn flatten_alpha(mut self, v: bool) -> Self {
        self.config.flatten_alpha = v;
        self
    }

    pub fn ghostscript(mut self, location: ToolLocation) -> Self {
        self.config.ghostscript = location;
        self
    }

    pub fn inkscape(mut self, location: ToolLocation) -> Self {
        self.config.inkscape = location;
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    pub fn tool_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.tool_timeout_secs = secs;
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.base_dir = Some(dir.into());
        self
    }

    pub fn max_canvas_pixels(mut self, pixels: u64) -> Self {
        self.config.max_canvas_pixels = pixels;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ResizeConfig, PrintSizeError> {
        let c = &self.config;
        if c.dpi == 0 {
            return Err(PrintSizeError::InvalidConfig("DPI must be ≥ 1, got 0".into()));
        }
        if c.size_key.trim().is_empty() {
            return Err(PrintSizeError::InvalidConfig("Size key must not be empty".into()));
        }
        if c.tool_timeout_secs == Some(0) {
            return Err(PrintSizeError::InvalidConfig(
                "Tool timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_canvas_pixels == 0 {
            return Err(PrintSizeError::InvalidConfig(
                "Canvas pixel limit must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How decoded content is mapped onto the fixed-size canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementMode {
    /// Non-uniform scale to exactly the canvas; aspect ratio is not kept.
    Stretch,
    /// Uniform scale covering the canvas, then a centred crop.
    Fill,
    /// Uniform scale so the whole image fits, centred on padding. (default)
    #[default]
    Fit,
}

impl PlacementMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementMode::Stretch => "stretch",
            PlacementMode::Fill => "fill",
            PlacementMode::Fit => "fit",
        }
    }
}

impl fmt::Display for PlacementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlacementMode {
    type Err = PrintSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stretch" => Ok(PlacementMode::Stretch),
            "fill" => Ok(PlacementMode::Fill),
            "fit" => Ok(PlacementMode::Fit),
            other => Err(PrintSizeError::InvalidConfig(format!(
                "Unknown placement mode '{other}' (expected fit, fill or stretch)"
            ))),
        }
    }
}

/// Paper orientation. Applied at lookup time; catalogs store portrait sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Catalog width × height as stored. (default)
    #[default]
    Vertical,
    /// Width and height swapped.
    Horizontal,
}

impl Orientation {
    /// Parse a user-supplied orientation.
    ///
    /// `horizontal`, `landscape` and `h` (any case) select
    /// [`Orientation::Horizontal`]; every other value is vertical.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "horizontal" | "landscape" | "h" => Orientation::Horizontal,
            _ => Orientation::Vertical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Vertical => "vertical",
            Orientation::Horizontal => "horizontal",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an external rasterizer executable comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolLocation {
    /// Environment override, then PATH, then well-known install paths. (default)
    #[default]
    Auto,
    /// Use exactly this executable.
    Path(PathBuf),
    /// Never invoke the tool; behaves like a missing install.
    Disabled,
}

/// An opaque 8-bit sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const WHITE: Color = Color([255, 255, 255]);
    pub const BLACK: Color = Color([0, 0, 0]);

    pub fn rgb(&self) -> image::Rgb<u8> {
        image::Rgb(self.0)
    }

    pub fn rgba(&self, alpha: u8) -> image::Rgba<u8> {
        let [r, g, b] = self.0;
        image::Rgba([r, g, b, alpha])
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl FromStr for Color {
    type Err = PrintSizeError;

    /// Accepts `#rrggbb`, `rrggbb`, `r,g,b`, `white` and `black`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let invalid = || {
            PrintSizeError::InvalidConfig(format!(
                "Invalid colour '{s}' (expected #rrggbb, r,g,b, white or black)"
            ))
        };

        match s.as_str() {
            "white" => return Ok(Color::WHITE),
            "black" => return Ok(Color::BLACK),
            _ => {}
        }

        if s.contains(',') {
            let parts: Vec<u8> = s
                .split(',')
                .map(|p| p.trim().parse::<u8>())
                .collect::<Result<_, _>>()
                .map_err(|_| invalid())?;
            return match parts.as_slice() {
                [r, g, b] => Ok(Color([*r, *g, *b])),
                _ => Err(invalid()),
            };
        }

        let hex = s.strip_prefix('#').unwrap_or(&s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Color([channel(0)?, channel(2)?, channel(4)?]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documentation() {
        let c = ResizeConfig::default();
        assert_eq!(c.size_key, "A4");
        assert_eq!(c.dpi, 300);
        assert_eq!(c.mode, PlacementMode::Fit);
        assert_eq!(c.orientation, Orientation::Vertical);
        assert!(c.skip_page_failures && c.skip_vector_failures);
        assert!(c.autocrop && c.flatten_alpha);
        assert_eq!(c.tool_timeout_secs, Some(300));
        assert_eq!(c.max_canvas_pixels, DEFAULT_MAX_CANVAS_PIXELS);
    }

    #[test]
    fn builder_rejects_zero_dpi() {
        let err = ResizeConfig::builder().dpi(0).build().unwrap_err();
        assert!(matches!(err, PrintSizeError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_empty_key_and_zero_timeout() {
        assert!(ResizeConfig::builder().size_key("  ").build().is_err());
        assert!(ResizeConfig::builder()
            .tool_timeout_secs(Some(0))
            .build()
            .is_err());
        assert!(ResizeConfig::builder()
            .tool_timeout_secs(None)
            .build()
            .is_ok());
        assert!(ResizeConfig::builder().max_canvas_pixels(0).build().is_err());
    }

    #[test]
    fn orientation_synonyms() {
        for s in ["horizontal", "Landscape", "H", " h "] {
            assert_eq!(Orientation::parse(s), Orientation::Horizontal, "{s}");
        }
        for s in ["vertical", "portrait", "v", ""] {
            assert_eq!(Orientation::parse(s), Orientation::Vertical, "{s}");
        }
    }

    #[test]
    fn placement_mode_parsing() {
        assert_eq!("FILL".parse::<PlacementMode>().unwrap(), PlacementMode::Fill);
        assert_eq!("stretch".parse::<PlacementMode>().unwrap(), PlacementMode::Stretch);
        assert!("zoom".parse::<PlacementMode>().is_err());
    }

    #[test]
    fn colour_parsing() {
        assert_eq!("#ff8000".parse::<Color>().unwrap(), Color([255, 128, 0]));
        assert_eq!("FF8000".parse::<Color>().unwrap(), Color([255, 128, 0]));
        assert_eq!("10, 20,30".parse::<Color>().unwrap(), Color([10, 20, 30]));
        assert_eq!("white".parse::<Color>().unwrap(), Color::WHITE);
        assert!("#fff".parse::<Color>().is_err());
        assert!("1,2".parse::<Color>().is_err());
        assert!("300,0,0".parse::<Color>().is_err());
        assert_eq!(Color([1, 2, 255]).to_string(), "#0102ff");
    }
}
