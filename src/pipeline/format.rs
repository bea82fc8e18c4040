//! Format classification by file extension.
//!
//! The bucket decides which decoders the cascade tries and in what order.
//! Page-description files are routed by extension alone because generic
//! raster decoders cannot read them.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Camera RAW extensions (lower-case, no dot).
pub const RAW_EXTENSIONS: &[&str] = &["cr2", "cr3", "nef", "arw", "dng", "rw2", "orf", "raf", "pef"];

/// Vector extensions handled by the SVG rasterizers.
pub const VECTOR_EXTENSIONS: &[&str] = &["svg"];

/// HEIF container extensions, decoded by libheif when compiled in.
pub const HEIF_EXTENSIONS: &[&str] = &["heic", "heif", "hif"];

/// AVIF extensions, decoded natively when the `avif` feature is on.
pub const AVIF_EXTENSIONS: &[&str] = &["avif"];

/// Extensions that need Ghostscript.
pub const PAGE_EXTENSIONS: &[&str] = &["eps", "ps", "ai", "pdf"];

/// Ghostscript option family for a page-description file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    /// EPS, PS, AI: cropped to the EPS bounding box.
    PostScript,
    /// PDF: cropped to the declared CropBox.
    Pdf,
}

/// Decoder bucket for an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatClass {
    /// Rasterized by Ghostscript, before any other decoder.
    PageDescription(PageKind),
    /// Camera RAW; demosaiced only if the native decoder fails.
    Raw,
    /// SVG; rasterized only if the native decoder fails.
    Vector,
    /// HEIF/HEIC; the native decoder cannot read it, libheif can.
    Heif,
    /// AVIF; readable by the native decoder only with the `avif` feature.
    Avif,
    /// An extension the native raster decoder knows.
    Raster,
    /// Anything else; only content sniffing can help.
    Unknown,
}

impl FormatClass {
    /// Classify `path` by its lower-cased extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        Self::from_extension(&ext)
    }

    /// Classify a lower-case extension without the leading dot.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "pdf" => FormatClass::PageDescription(PageKind::Pdf),
            e if PAGE_EXTENSIONS.contains(&e) => FormatClass::PageDescription(PageKind::PostScript),
            e if RAW_EXTENSIONS.contains(&e) => FormatClass::Raw,
            e if VECTOR_EXTENSIONS.contains(&e) => FormatClass::Vector,
            e if HEIF_EXTENSIONS.contains(&e) => FormatClass::Heif,
            e if AVIF_EXTENSIONS.contains(&e) => FormatClass::Avif,
            "" => FormatClass::Unknown,
            e if ImageFormat::from_extension(e).is_some() => FormatClass::Raster,
            _ => FormatClass::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_description_extensions() {
        assert_eq!(
            FormatClass::from_path(Path::new("doc.PDF")),
            FormatClass::PageDescription(PageKind::Pdf)
        );
        for ext in ["eps", "ps", "ai"] {
            assert_eq!(
                FormatClass::from_extension(ext),
                FormatClass::PageDescription(PageKind::PostScript),
                "{ext}"
            );
        }
    }

    #[test]
    fn raw_and_vector_extensions() {
        for ext in RAW_EXTENSIONS {
            assert_eq!(FormatClass::from_extension(ext), FormatClass::Raw, "{ext}");
        }
        assert_eq!(FormatClass::from_path(Path::new("logo.Svg")), FormatClass::Vector);
    }

    #[test]
    fn optional_codec_extensions() {
        for ext in ["heic", "HEIF", "hif"] {
            assert_eq!(FormatClass::from_path(Path::new(&format!("a.{ext}"))), FormatClass::Heif, "{ext}");
        }
        assert_eq!(FormatClass::from_path(Path::new("a.AVIF")), FormatClass::Avif);
    }

    #[test]
    fn raster_and_unknown() {
        assert_eq!(FormatClass::from_path(Path::new("a.jpeg")), FormatClass::Raster);
        assert_eq!(FormatClass::from_path(Path::new("a.png")), FormatClass::Raster);
        assert_eq!(FormatClass::from_path(Path::new("a.webp")), FormatClass::Raster);
        assert_eq!(FormatClass::from_path(Path::new("a.xyz")), FormatClass::Unknown);
        assert_eq!(FormatClass::from_path(Path::new("README")), FormatClass::Unknown);
    }
}
