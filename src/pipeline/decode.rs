//! The decoder cascade: open a file of unknown or ambiguous type.
//!
//! ## Order
//!
//! ```text
//! page description ──▶ Ghostscript ──────────────▶ image | skip | PageRasterizationFailed
//! everything else  ──▶ native decoder ─ok─────────▶ image
//!                           │ failed
//!                           ├─ RAW    ──▶ rawkit ──▶ image | RawDecodeFailed (never skipped)
//!                           ├─ SVG    ──▶ resvg ──▶ Inkscape ──▶ image | skip | VectorRasterizationFailed
//!                           ├─ HEIF   ──▶ libheif ──▶ image | UnreadableFile | DecoderUnavailable
//!                           ├─ AVIF   ──▶ UnreadableFile | DecoderUnavailable
//!                           ├─ raster ──▶ UnreadableFile
//!                           └─ other  ──▶ UnsupportedFormat
//! ```
//!
//! Providers are a fixed list tried in priority order; a provider that is
//! not compiled in or not installed is just another failed attempt. The
//! RAW, HEIF and AVIF providers are cargo features; a file that needs one
//! left out of the build fails with `RawDecodeFailed` (RAW) or
//! `DecoderUnavailable` (HEIF, AVIF) naming the feature.
//!
//! Externally rasterized images come back with the [`TempPath`] of their
//! intermediate PNG. The file lives exactly as long as that handle: dropping
//! it deletes the file, and [`release`] does so explicitly with logging.

use crate::config::ResizeConfig;
use crate::error::{PrintSizeError, ToolError};
use crate::pipeline::format::{FormatClass, PageKind};
use crate::pipeline::tools;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, Rgba, RgbaImage};
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;
use tempfile::TempPath;
use tool_locate::{GHOSTSCRIPT, INKSCAPE};
use tracing::{debug, info, warn};

/// SVG user units per inch.
const SVG_UNITS_PER_INCH: f32 = 96.0;

/// Largest side the in-process SVG renderer will allocate.
pub const MAX_SVG_SIDE: u32 = 32_768;

/// A decoded pixel buffer plus everything that must travel with it.
#[derive(Debug)]
pub struct Decoded {
    pub image: DynamicImage,
    /// Embedded orientation, applied by the pre-processor.
    pub orientation: Option<Orientation>,
    /// Intermediate raster written by an external tool.
    pub temp: Option<TempPath>,
}

impl Decoded {
    fn in_memory(image: DynamicImage) -> Self {
        Self {
            image,
            orientation: None,
            temp: None,
        }
    }
}

/// Outcome of [`open`].
#[derive(Debug)]
pub enum Opened {
    Image(Decoded),
    /// A skip flag turned a rasterizer failure into "no image".
    Skipped(FormatClass),
}

/// Open `path` through the cascade.
///
/// # Errors
/// See the module table. Page and vector failures are only returned when the
/// matching skip flag in `config` is off.
pub fn open(path: &Path, config: &ResizeConfig) -> Result<Opened, PrintSizeError> {
    let class = FormatClass::from_path(path);
    debug!("{} classified as {class:?}", path.display());

    if let FormatClass::PageDescription(kind) = class {
        return match rasterize_page(path, kind, config) {
            Ok(decoded) => Ok(Opened::Image(decoded)),
            Err(source) if config.skip_page_failures => {
                warn!("Skipping {}: {source}", path.display());
                Ok(Opened::Skipped(class))
            }
            Err(source) => Err(PrintSizeError::PageRasterizationFailed {
                path: path.to_path_buf(),
                source,
            }),
        };
    }

    let native_error = match decode_native(path) {
        Ok(decoded) => return Ok(Opened::Image(decoded)),
        Err(e) => {
            debug!("Native decoder rejected {}: {e}", path.display());
            e
        }
    };

    match class {
        FormatClass::Raw => decode_raw(path).map(Opened::Image),
        FormatClass::Vector => match rasterize_vector(path, config) {
            Ok(decoded) => Ok(Opened::Image(decoded)),
            Err(attempts) if config.skip_vector_failures => {
                warn!("Skipping {}: {}", path.display(), attempts.join("; "));
                Ok(Opened::Skipped(class))
            }
            Err(attempts) => Err(PrintSizeError::VectorRasterizationFailed {
                path: path.to_path_buf(),
                attempts,
            }),
        },
        FormatClass::Heif => decode_heif(path).map(Opened::Image),
        FormatClass::Avif if !cfg!(feature = "avif") => Err(PrintSizeError::DecoderUnavailable {
            path: path.to_path_buf(),
            format: "AVIF",
            feature: "avif",
        }),
        FormatClass::Raster | FormatClass::Avif => Err(PrintSizeError::UnreadableFile {
            path: path.to_path_buf(),
            detail: native_error.to_string(),
        }),
        FormatClass::Unknown | FormatClass::PageDescription(_) => Err(PrintSizeError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Delete an intermediate file, logging instead of failing.
pub fn release(temp: Option<TempPath>) {
    if let Some(temp) = temp {
        let shown = temp.to_path_buf();
        match temp.close() {
            Ok(()) => debug!("Removed intermediate {}", shown.display()),
            Err(e) => warn!("Could not remove intermediate {}: {e}", shown.display()),
        }
    }
}

// ── Native raster ────────────────────────────────────────────────────────

fn decode_native(path: &Path) -> image::ImageResult<Decoded> {
    let mut decoder = ImageReader::open(path)?.with_guessed_format()?.into_decoder()?;
    let orientation = decoder.orientation().ok();
    let image = DynamicImage::from_decoder(decoder)?;
    Ok(Decoded {
        image,
        orientation,
        temp: None,
    })
}

// ── RAW ──────────────────────────────────────────────────────────────────

fn decode_raw(path: &Path) -> Result<Decoded, PrintSizeError> {
    let image = demosaic(path).map_err(|reason| PrintSizeError::RawDecodeFailed {
        path: path.to_path_buf(),
        reason,
    })?;
    info!("Demosaiced RAW {} ({}x{})", path.display(), image.width(), image.height());
    Ok(Decoded::in_memory(image))
}

#[cfg(feature = "raw")]
fn demosaic(path: &Path) -> Result<DynamicImage, String> {
    use std::io::BufReader;

    let file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let decoded = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut reader = BufReader::new(file);
        rawkit::RawImage::decode(&mut reader).map(|raw| raw.process_8bit())
    }))
    .map_err(|_| "RAW decoder panicked on malformed data".to_string())?
    .map_err(|e| e.to_string())?;

    let (width, height) = (decoded.width as u32, decoded.height as u32);
    let pixels = width as usize * height as usize;
    if pixels == 0 {
        return Err("RAW decoder produced an empty image".into());
    }

    let image = match decoded.data.len() / pixels {
        3 => image::RgbImage::from_raw(width, height, decoded.data).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(width, height, decoded.data).map(DynamicImage::ImageRgba8),
        1 => image::GrayImage::from_raw(width, height, decoded.data).map(DynamicImage::ImageLuma8),
        _ => None,
    };
    image.ok_or_else(|| format!("RAW decoder produced an unexpected buffer for {width}x{height}"))
}

#[cfg(not(feature = "raw"))]
fn demosaic(_path: &Path) -> Result<DynamicImage, String> {
    Err("RAW support was not compiled in (the `raw` feature is disabled)".into())
}

// ── HEIF ─────────────────────────────────────────────────────────────────

fn decode_heif(path: &Path) -> Result<Decoded, PrintSizeError> {
    let image = heif_to_image(path)?;
    info!("Decoded HEIF {} ({}x{})", path.display(), image.width(), image.height());
    Ok(Decoded::in_memory(image))
}

/// Decode the primary image; libheif applies the container's rotation and mirroring.
#[cfg(feature = "heif")]
fn heif_to_image(path: &Path) -> Result<DynamicImage, PrintSizeError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let unreadable = |detail: String| PrintSizeError::UnreadableFile {
        path: path.to_path_buf(),
        detail,
    };

    let name = path
        .to_str()
        .ok_or_else(|| unreadable("path is not valid UTF-8".into()))?;
    let context = HeifContext::read_from_file(name).map_err(|e| unreadable(e.to_string()))?;
    let handle = context
        .primary_image_handle()
        .map_err(|e| unreadable(e.to_string()))?;

    let (chroma, channels) = if handle.has_alpha_channel() {
        (RgbChroma::Rgba, 4)
    } else {
        (RgbChroma::Rgb, 3)
    };
    let decoded = LibHeif::new()
        .decode(&handle, ColorSpace::Rgb(chroma), None)
        .map_err(|e| unreadable(e.to_string()))?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| unreadable("libheif returned no interleaved plane".into()))?;
    let (width, height) = (plane.width, plane.height);
    let row = width as usize * channels;

    let mut data = Vec::with_capacity(row * height as usize);
    for line in plane.data.chunks(plane.stride.max(1)).take(height as usize) {
        let pixels = line
            .get(..row)
            .ok_or_else(|| unreadable("libheif returned a short row".into()))?;
        data.extend_from_slice(pixels);
    }

    let image = match channels {
        4 => RgbaImage::from_raw(width, height, data).map(DynamicImage::ImageRgba8),
        _ => image::RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
    };
    image.ok_or_else(|| unreadable(format!("libheif returned a truncated {width}x{height} image")))
}

#[cfg(not(feature = "heif"))]
fn heif_to_image(path: &Path) -> Result<DynamicImage, PrintSizeError> {
    Err(PrintSizeError::DecoderUnavailable {
        path: path.to_path_buf(),
        format: "HEIF",
        feature: "heif",
    })
}

// ── Page description (Ghostscript) ───────────────────────────────────────

fn rasterize_page(path: &Path, kind: PageKind, config: &ResizeConfig) -> Result<Decoded, ToolError> {
    let gs = tools::resolve_tool(&config.ghostscript, &GHOSTSCRIPT)?;
    let decoded = run_to_temp(GHOSTSCRIPT.name, &gs, config, |out| {
        tools::ghostscript_args(kind, config.dpi, out, path)
    })?;
    info!(
        "Ghostscript rasterized {} at {} DPI ({}x{})",
        path.display(),
        config.dpi,
        decoded.image.width(),
        decoded.image.height()
    );
    Ok(decoded)
}

// ── Vector (resvg, then Inkscape) ────────────────────────────────────────

fn rasterize_vector(path: &Path, config: &ResizeConfig) -> Result<Decoded, Vec<String>> {
    let mut attempts = Vec::new();

    match render_svg(path, config.dpi) {
        Ok(image) => {
            info!("Rendered SVG {} in-process ({}x{})", path.display(), image.width(), image.height());
            return Ok(Decoded::in_memory(image));
        }
        Err(reason) => {
            debug!("In-process SVG render failed for {}: {reason}", path.display());
            attempts.push(format!("resvg: {reason}"));
        }
    }

    let inkscape = tools::resolve_tool(&config.inkscape, &INKSCAPE).and_then(|exe| {
        run_to_temp(INKSCAPE.name, &exe, config, |out| {
            tools::inkscape_args(path, config.dpi, out)
        })
    });
    match inkscape {
        Ok(decoded) => {
            info!("Inkscape rasterized {} at {} DPI", path.display(), config.dpi);
            Ok(decoded)
        }
        Err(e) => {
            attempts.push(format!("Inkscape: {e}"));
            Err(attempts)
        }
    }
}

/// Render an SVG at `dpi` with resvg, returning straight (non-premultiplied) RGBA.
fn render_svg(path: &Path, dpi: u32) -> Result<DynamicImage, String> {
    let data = std::fs::read(path).map_err(|e| e.to_string())?;

    let mut options = usvg::Options {
        resources_dir: path.parent().map(Path::to_path_buf),
        ..usvg::Options::default()
    };
    options.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_data(&data, &options).map_err(|e| e.to_string())?;

    let scale = dpi as f32 / SVG_UNITS_PER_INCH;
    let size = tree.size();
    let (w, h) = ((size.width() * scale).ceil(), (size.height() * scale).ceil());
    if !(w >= 1.0 && h >= 1.0) || w > MAX_SVG_SIDE as f32 || h > MAX_SVG_SIDE as f32 {
        return Err(format!("{w}x{h} px at {dpi} DPI is outside 1..={MAX_SVG_SIDE}"));
    }
    let (width, height) = (w as u32, h as u32);

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| format!("failed to allocate a {width}x{height} pixmap"))?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    let mut rgba = RgbaImage::new(width, height);
    for (dst, src) in rgba.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(DynamicImage::ImageRgba8(rgba))
}

// ── External tool plumbing ───────────────────────────────────────────────

/// Run a rasterizer that writes a PNG to a fresh temp path and load it.
///
/// On any failure the temp path is released before returning, so partial
/// output never outlives the call.
fn run_to_temp(
    tool: &'static str,
    program: &Path,
    config: &ResizeConfig,
    args: impl FnOnce(&Path) -> Vec<OsString>,
) -> Result<Decoded, ToolError> {
    let temp = new_temp_png(config).map_err(|e| ToolError::BadOutput {
        tool,
        detail: format!("could not create a temporary file: {e}"),
    })?;

    let timeout = config.tool_timeout_secs.map(Duration::from_secs);
    if let Err(e) = tools::run(tool, program, &args(&*temp), timeout) {
        release(Some(temp));
        return Err(e);
    }

    match image::open(&temp) {
        Ok(image) => Ok(Decoded {
            image,
            orientation: None,
            temp: Some(temp),
        }),
        Err(e) => {
            release(Some(temp));
            Err(ToolError::BadOutput {
                tool,
                detail: e.to_string(),
            })
        }
    }
}

fn new_temp_png(config: &ResizeConfig) -> std::io::Result<TempPath> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("printsize-").suffix(".png");
    let file = match &config.temp_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    Ok(file.into_temp_path())
}
