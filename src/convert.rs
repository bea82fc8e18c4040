//! Conversion entry points.
//!
//! [`process`] is the primary API: it returns a [`ResultRecord`] for every
//! expected outcome, including files skipped because a rasterizer is
//! missing, and `Err` only for typed failures. [`process_to_record`] folds
//! those failures into error records too.

use crate::catalog::CanvasSize;
use crate::config::ResizeConfig;
use crate::error::PrintSizeError;
use crate::output::{ConversionRecord, ResultRecord};
use crate::pipeline::decode::{self, Decoded, Opened};
use crate::pipeline::encode::{self, OutputFormat};
use crate::pipeline::{compose, input, preprocess};
use image::metadata::Orientation;
use image::DynamicImage;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fit the image at `src` onto the configured paper size and write it to `out`.
///
/// # Arguments
/// * `src`: Source image; relative paths are tried against the working
///   directory, then [`ResizeConfig::base_dir`]
/// * `out`: Destination; its extension selects the output format
/// * `config`: Conversion configuration
///
/// # Returns
/// `Ok(ResultRecord::Success)` when the output was written, or
/// `Ok(ResultRecord::Error)` with `GS_REQUIRED` / `SVG_TOOL_REQUIRED` when a
/// skip flag suppressed a rasterizer failure.
///
/// # Errors
/// Returns `Err(PrintSizeError)` for every other failure:
/// - Unknown size key or zero-sized canvas
/// - Unsupported output extension
/// - Source not found, unreadable, or in an unsupported format
/// - RAW decode failure (regardless of skip flags)
/// - Output write failure
///
/// Intermediate files from external rasterizers are removed before this
/// returns, whether it succeeds or not.
pub fn process(
    src: impl AsRef<Path>,
    out: impl AsRef<Path>,
    config: &ResizeConfig,
) -> Result<ResultRecord, PrintSizeError> {
    let started = Instant::now();
    let (src, out) = (src.as_ref(), out.as_ref());
    info!("Starting conversion: {}", src.display());

    // ── Step 1: Resolve the target canvas ────────────────────────────────
    let canvas = target_canvas(config)?;
    let format = OutputFormat::from_path(out)?;
    info!(
        "Target {} {} @ {} DPI ({}) → {canvas}",
        config.catalog,
        config.size_key,
        config.dpi,
        config.orientation
    );

    // ── Step 2: Resolve the source ───────────────────────────────────────
    let src_path = input::resolve_source(src, config.base_dir.as_deref());
    input::ensure_readable(&src_path)?;

    // ── Step 3: Decode ───────────────────────────────────────────────────
    let Decoded {
        image,
        orientation,
        temp,
    } = match decode::open(&src_path, config)? {
        Opened::Image(decoded) => decoded,
        Opened::Skipped(class) => {
            let record = ResultRecord::skipped(class, &src_path);
            warn!("{record}");
            return Ok(record);
        }
    };
    info!("Decoded {}x{} ({:?})", image.width(), image.height(), image.color());

    // ── Step 4: Pre-process, compose, save ───────────────────────────────
    let written = render_and_save(image, orientation, canvas, format, out, config);
    decode::release(temp);
    written?;

    info!("Wrote {} in {}ms", out.display(), started.elapsed().as_millis());

    Ok(ResultRecord::Success(ConversionRecord {
        size_catalog: config.catalog.name().to_string(),
        size_key: config.size_key.trim().to_ascii_uppercase(),
        dpi: config.dpi,
        mode: config.mode,
        orientation: config.orientation,
        target_px: canvas,
        output: out.to_path_buf(),
        src_path,
    }))
}

/// Like [`process`], but every failure becomes an error record.
///
/// Panics inside decoders are caught and reported as `INTERNAL`.
pub fn process_to_record(
    src: impl AsRef<Path>,
    out: impl AsRef<Path>,
    config: &ResizeConfig,
) -> ResultRecord {
    let (src, out) = (src.as_ref(), out.as_ref());
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| process(src, out, config)))
        .unwrap_or_else(|panic| {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "conversion panicked".to_string());
            Err(PrintSizeError::Internal(detail))
        });

    match outcome {
        Ok(record) => record,
        Err(e) => {
            warn!("Conversion of {} failed: {e}", src.display());
            let src_path = input::resolve_source(src, config.base_dir.as_deref());
            ResultRecord::from_error(&e, &src_path)
        }
    }
}

/// The canvas `config` describes, without touching any file.
///
/// # Errors
/// Besides the catalog errors, [`PrintSizeError::InvalidDimensions`] when
/// the canvas exceeds [`ResizeConfig::max_canvas_pixels`].
pub fn target_canvas(config: &ResizeConfig) -> Result<CanvasSize, PrintSizeError> {
    let canvas = config
        .catalog
        .resolve(&config.size_key, config.dpi, config.orientation)?;

    let pixels = u64::from(canvas.width_px) * u64::from(canvas.height_px);
    if pixels > config.max_canvas_pixels {
        return Err(PrintSizeError::InvalidDimensions(format!(
            "{} at {} DPI needs a {canvas} canvas ({pixels} pixels), over the limit of {}; \
             lower the DPI or raise the limit",
            config.size_key.trim().to_ascii_uppercase(),
            config.dpi,
            config.max_canvas_pixels
        )));
    }
    Ok(canvas)
}

fn render_and_save(
    image: DynamicImage,
    orientation: Option<Orientation>,
    canvas: CanvasSize,
    format: OutputFormat,
    out: &Path,
    config: &ResizeConfig,
) -> Result<(), PrintSizeError> {
    let image = preprocess::normalize(image, orientation, config);
    let keep_alpha = image.color().has_alpha() && format.supports_alpha();
    debug!(
        "Placing {}x{} with mode {} (alpha kept: {keep_alpha})",
        image.width(),
        image.height(),
        config.mode
    );

    let placed = compose::place(&image, canvas, config.mode, config.background, keep_alpha);
    drop(image);

    let finished = compose::finalize(placed, format, config.background);
    encode::save(&finished, out, format, config.dpi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SizeCatalog;
    use crate::config::Orientation as PaperOrientation;
    use crate::error::ErrorKind;

    #[test]
    fn target_canvas_without_files() {
        let config = ResizeConfig::builder()
            .catalog(SizeCatalog::FourByFive)
            .size_key("8x10")
            .orientation(PaperOrientation::Horizontal)
            .build()
            .unwrap();
        let canvas = target_canvas(&config).unwrap();
        assert_eq!((canvas.width_px, canvas.height_px), (2953, 2362));
    }

    #[test]
    fn unknown_size_key_fails_before_touching_the_source() {
        let config = ResizeConfig::builder().size_key("A9").build().unwrap();
        let err = process("/no/such/file.png", "/tmp/out.png", &config).unwrap_err();
        assert!(matches!(err, PrintSizeError::UnknownSizeKey { .. }));
    }

    #[test]
    fn oversized_canvas_fails_before_allocating() {
        let config = ResizeConfig::builder().size_key("A1").dpi(1_000_000).build().unwrap();
        let err = target_canvas(&config).unwrap_err();
        assert!(matches!(err, PrintSizeError::InvalidDimensions(_)), "{err}");

        let err = process("/no/such/file.png", "/tmp/out.png", &config).unwrap_err();
        assert!(matches!(err, PrintSizeError::InvalidDimensions(_)));

        // A4 at 300 DPI is 2480 × 3508 = 8_699_840 pixels.
        let tight = ResizeConfig::builder().max_canvas_pixels(8_699_839).build().unwrap();
        assert!(target_canvas(&tight).is_err());
        let exact = ResizeConfig::builder().max_canvas_pixels(8_699_840).build().unwrap();
        assert!(target_canvas(&exact).is_ok());
    }

    #[test]
    fn bad_output_extension_fails_fast() {
        let err = process("/no/such/file.png", "/tmp/out.svg", &ResizeConfig::default()).unwrap_err();
        assert!(matches!(err, PrintSizeError::UnsupportedOutputFormat { .. }));
    }

    #[test]
    fn missing_source_becomes_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let record = process_to_record(
            dir.path().join("missing.png"),
            dir.path().join("out.png"),
            &ResizeConfig::default(),
        );
        match record {
            ResultRecord::Error(e) => {
                assert_eq!(e.error, ErrorKind::FileNotFound);
                assert_eq!(e.src_path, dir.path().join("missing.png"));
            }
            ResultRecord::Success(_) => panic!("expected an error record"),
        }
        assert!(!dir.path().join("out.png").exists());
    }
}
