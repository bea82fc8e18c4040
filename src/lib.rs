//! # printsize
//!
//! Fit any image onto a print-ready canvas sized to a named paper format.
//!
//! Give it a photo, a camera RAW file, an SVG, or a PDF/PostScript page,
//! a paper size (`A4`, `8X10`, …) and a DPI. It writes a raster whose pixel
//! dimensions are exactly `round(mm / 25.4 × dpi)` per side, with the DPI
//! embedded so printers and layout tools pick up the physical size.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source file
//!  │
//!  ├─ 1. Canvas    size catalog + key + DPI + orientation → W×H px
//!  ├─ 2. Decode    native decoder / Ghostscript / rawkit / resvg / Inkscape
//!  ├─ 3. Prepare   EXIF orientation, autocrop, flatten transparency
//!  ├─ 4. Compose   stretch, fill (cover + centre crop) or fit (pad)
//!  └─ 5. Save      PNG, JPEG, TIFF or BMP with the DPI embedded; temp files removed
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use printsize::{process, ResizeConfig, ResultRecord, SizeCatalog};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ResizeConfig::builder()
//!         .catalog(SizeCatalog::FourByFive)
//!         .size_key("8x10")
//!         .dpi(300)
//!         .build()?;
//!
//!     match process("holiday.jpg", "holiday-8x10.png", &config)? {
//!         ResultRecord::Success(r) => println!("wrote {} at {}", r.output.display(), r.target_px),
//!         ResultRecord::Error(e) => eprintln!("skipped: {}", e.message),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `printsize` binary (clap + anyhow + tracing-subscriber) |
//! | `raw`   | on      | Camera RAW decoding via `rawkit` |
//! | `avif`  | off     | AVIF decoding through `image` (needs system dav1d) |
//! | `heif`  | off     | HEIF/HEIC decoding via `libheif-rs` (needs system libheif) |
//!
//! Disable defaults when using only the library:
//! ```toml
//! printsize = { version = "0.1", default-features = false }
//! ```
//!
//! ## External tools
//!
//! | Input            | Needs                                   |
//! |------------------|-----------------------------------------|
//! | PDF, PS, EPS, AI | Ghostscript                             |
//! | SVG              | nothing (resvg), Inkscape as a fallback |
//!
//! Tools are found through [`tool_locate`]; see [`ToolLocation`] to pin or
//! disable them.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::{mm_to_px, CanvasSize, SizeCatalog, SizeEntry};
pub use config::{
    Color, Orientation, PlacementMode, ResizeConfig, ResizeConfigBuilder, ToolLocation, DEFAULT_MAX_CANVAS_PIXELS,
};
pub use convert::{process, process_to_record, target_canvas};
pub use error::{ErrorKind, PrintSizeError, ToolError};
pub use output::{ConversionRecord, ErrorRecord, ResultRecord};
pub use pipeline::format::FormatClass;
