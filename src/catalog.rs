//! Paper and photo-print size catalogs.
//!
//! Sizes are stored in millimetres, portrait (width ≤ height), and never
//! mutated: orientation is applied when a size is resolved into pixels.
//!
//! ## Rounding
//!
//! `px = round(mm / 25.4 × dpi)` with halves rounded away from zero
//! ([`f64::round`]). For integral millimetres and integral DPI the product
//! can never land exactly on `.5`, so the convention only matters for
//! custom fractional sizes.

use crate::config::Orientation;
use crate::error::PrintSizeError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// One named physical size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeEntry {
    /// Upper-case key, e.g. `"A4"` or `"8X10"`.
    pub key: Cow<'static, str>,
    pub width_mm: f64,
    pub height_mm: f64,
}

impl SizeEntry {
    pub const fn new(key: &'static str, width_mm: f64, height_mm: f64) -> Self {
        Self {
            key: Cow::Borrowed(key),
            width_mm,
            height_mm,
        }
    }

    /// A caller-defined entry; the key is upper-cased.
    pub fn custom(key: impl AsRef<str>, width_mm: f64, height_mm: f64) -> Self {
        Self {
            key: Cow::Owned(key.as_ref().to_ascii_uppercase()),
            width_mm,
            height_mm,
        }
    }
}

const A_SERIES: &[SizeEntry] = &[
    SizeEntry::new("A1", 594.0, 841.0),
    SizeEntry::new("A2", 420.0, 594.0),
    SizeEntry::new("A3", 297.0, 420.0),
    SizeEntry::new("A4", 210.0, 297.0),
];

const TWO_BY_THREE: &[SizeEntry] = &[
    SizeEntry::new("24X36", 610.0, 910.0),
    SizeEntry::new("20X30", 510.0, 760.0),
    SizeEntry::new("16X24", 410.0, 610.0),
    SizeEntry::new("12X18", 300.0, 460.0),
    SizeEntry::new("8X12", 200.0, 300.0),
];

const FOUR_BY_FIVE: &[SizeEntry] = &[
    SizeEntry::new("24X30", 600.0, 760.0),
    SizeEntry::new("20X25", 510.0, 630.0),
    SizeEntry::new("16X20", 400.0, 500.0),
    SizeEntry::new("12X15", 300.0, 380.0),
    SizeEntry::new("8X10", 200.0, 250.0),
];

const THREE_BY_FOUR: &[SizeEntry] = &[
    SizeEntry::new("18X24", 460.0, 610.0),
    SizeEntry::new("15X20", 380.0, 510.0),
    SizeEntry::new("12X16", 300.0, 400.0),
    SizeEntry::new("9X12", 230.0, 300.0),
];

const ELEVEN_BY_FOURTEEN: &[SizeEntry] = &[SizeEntry::new("11X14", 280.0, 360.0)];

/// A group of named sizes sharing an aspect-ratio family.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SizeCatalog {
    /// ISO A1–A4. (default)
    #[default]
    ASeries,
    /// 2:3 photo prints, 8×12 to 24×36 in.
    TwoByThree,
    /// 4:5 photo prints, 8×10 to 24×30 in.
    FourByFive,
    /// 3:4 photo prints, 9×12 to 18×24 in.
    ThreeByFour,
    /// The single 11×14 in print.
    ElevenByFourteen,
    /// Caller-supplied entries.
    Custom(Vec<SizeEntry>),
}

impl SizeCatalog {
    /// The five built-in catalogs.
    pub fn builtin() -> [SizeCatalog; 5] {
        [
            SizeCatalog::ASeries,
            SizeCatalog::TwoByThree,
            SizeCatalog::FourByFive,
            SizeCatalog::ThreeByFour,
            SizeCatalog::ElevenByFourteen,
        ]
    }

    /// Look up a built-in catalog by its [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<SizeCatalog> {
        let name = name.trim().to_ascii_lowercase();
        Self::builtin().into_iter().find(|c| c.name() == name)
    }

    /// Stable name reported in result records.
    pub fn name(&self) -> &'static str {
        match self {
            SizeCatalog::ASeries => "a",
            SizeCatalog::TwoByThree => "2x3",
            SizeCatalog::FourByFive => "4x5",
            SizeCatalog::ThreeByFour => "3x4",
            SizeCatalog::ElevenByFourteen => "11x14",
            SizeCatalog::Custom(_) => "custom",
        }
    }

    pub fn entries(&self) -> &[SizeEntry] {
        match self {
            SizeCatalog::ASeries => A_SERIES,
            SizeCatalog::TwoByThree => TWO_BY_THREE,
            SizeCatalog::FourByFive => FOUR_BY_FIVE,
            SizeCatalog::ThreeByFour => THREE_BY_FOUR,
            SizeCatalog::ElevenByFourteen => ELEVEN_BY_FOURTEEN,
            SizeCatalog::Custom(entries) => entries,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries().iter().map(|e| e.key.to_string()).collect()
    }

    /// Case-insensitive lookup.
    pub fn lookup(&self, key: &str) -> Option<&SizeEntry> {
        let key = key.trim();
        self.entries()
            .iter()
            .find(|e| e.key.eq_ignore_ascii_case(key))
    }

    /// Resolve `key` at `dpi` and `orientation` into canvas pixels.
    ///
    /// # Errors
    /// - [`PrintSizeError::UnknownSizeKey`] listing every key of this catalog
    /// - [`PrintSizeError::InvalidDimensions`] when `dpi` is 0 or a side
    ///   rounds to 0 px
    pub fn resolve(
        &self,
        key: &str,
        dpi: u32,
        orientation: Orientation,
    ) -> Result<CanvasSize, PrintSizeError> {
        let entry = self
            .lookup(key)
            .ok_or_else(|| PrintSizeError::UnknownSizeKey {
                key: key.to_string(),
                catalog: self.name().to_string(),
                available: self.keys(),
            })?;

        if dpi == 0 {
            return Err(PrintSizeError::InvalidDimensions(
                "DPI must be at least 1".into(),
            ));
        }

        let (mut w_mm, mut h_mm) = (entry.width_mm, entry.height_mm);
        if orientation == Orientation::Horizontal {
            std::mem::swap(&mut w_mm, &mut h_mm);
        }

        let size = CanvasSize {
            width_px: mm_to_px(w_mm, dpi),
            height_px: mm_to_px(h_mm, dpi),
        };
        if size.width_px == 0 || size.height_px == 0 {
            return Err(PrintSizeError::InvalidDimensions(format!(
                "'{}' at {dpi} DPI resolves to {size}",
                entry.key
            )));
        }
        Ok(size)
    }
}

impl fmt::Display for SizeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Target canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width_px: u32,
    pub height_px: u32,
}

impl fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} px", self.width_px, self.height_px)
    }
}

/// Convert millimetres to whole pixels at `dpi`.
///
/// Non-finite or negative lengths map to 0.
pub fn mm_to_px(mm: f64, dpi: u32) -> u32 {
    let px = (mm / MM_PER_INCH * f64::from(dpi)).round();
    if px.is_finite() && px > 0.0 {
        px.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}
