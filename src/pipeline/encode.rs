//! Output encoding with embedded resolution.
//!
//! | Extension      | Encoder      | DPI stored as                        |
//! |----------------|--------------|--------------------------------------|
//! | `.png`         | `png`        | pHYs chunk, pixels per metre         |
//! | `.jpg` `.jpeg` | `image`      | JFIF density, dots per inch          |
//! | `.tif` `.tiff` | `tiff`       | XResolution/YResolution, inch unit   |
//! | `.bmp`         | `image`      | biXPelsPerMeter/biYPelsPerMeter      |
//!
//! Formats that cannot record a physical resolution are refused up front,
//! so every written file reproduces its paper size.
//!
//! Files are encoded into a temp file next to the destination and renamed
//! into place, so a failed encode never leaves a truncated output behind.

use crate::error::PrintSizeError;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::{DynamicImage, ExtendedColorType, ImageFormat};
use std::fs;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use tracing::debug;

/// JPEG quality used for `.jpg` / `.jpeg` output.
pub const JPEG_QUALITY: u8 = 95;

const METRES_PER_INCH: f64 = 0.0254;

/// File offset of `biXPelsPerMeter`; `biYPelsPerMeter` follows it.
const BMP_PELS_PER_METER_OFFSET: usize = 38;

/// Output encoding, chosen from the destination extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Tiff,
    Bmp,
}

impl OutputFormat {
    /// Pick the format for `path` by extension.
    ///
    /// # Errors
    /// [`PrintSizeError::UnsupportedOutputFormat`] when the extension is
    /// missing or names a format that cannot carry DPI.
    pub fn from_path(path: &Path) -> Result<Self, PrintSizeError> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension);

        match format {
            Some(ImageFormat::Png) => Ok(OutputFormat::Png),
            Some(ImageFormat::Jpeg) => Ok(OutputFormat::Jpeg),
            Some(ImageFormat::Tiff) => Ok(OutputFormat::Tiff),
            Some(ImageFormat::Bmp) => Ok(OutputFormat::Bmp),
            _ => Err(PrintSizeError::UnsupportedOutputFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Only PNG output keeps transparency.
    pub fn supports_alpha(&self) -> bool {
        matches!(self, OutputFormat::Png)
    }
}

/// PNG pHYs / BMP header value for `dpi`.
pub fn pixels_per_metre(dpi: u32) -> u32 {
    (f64::from(dpi) / METRES_PER_INCH).round() as u32
}

/// Encode `image` to `path` as `format`, embedding `dpi`.
pub fn save(image: &DynamicImage, path: &Path, format: OutputFormat, dpi: u32) -> Result<(), PrintSizeError> {
    let write_failed = |detail: String| PrintSizeError::OutputWriteFailed {
        path: path.to_path_buf(),
        detail,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| write_failed(format!("cannot create {}: {e}", parent.display())))?;

    let mut staged = tempfile::Builder::new()
        .prefix(".printsize-")
        .suffix(".part")
        .tempfile_in(parent)
        .map_err(|e| write_failed(e.to_string()))?;

    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        encode(image, &mut writer, format, dpi).map_err(write_failed)?;
        writer.flush().map_err(|e| write_failed(e.to_string()))?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(staged.path(), fs::Permissions::from_mode(0o644));
    }

    staged
        .persist(path)
        .map_err(|e| write_failed(e.error.to_string()))?;

    debug!("Wrote {} ({:?}, {dpi} DPI)", path.display(), format);
    Ok(())
}

fn encode<W: Write + Seek>(
    image: &DynamicImage,
    writer: &mut W,
    format: OutputFormat,
    dpi: u32,
) -> Result<(), String> {
    match format {
        OutputFormat::Png => write_png(image, writer, dpi).map_err(|e| e.to_string()),
        OutputFormat::Jpeg => {
            let density = u16::try_from(dpi).unwrap_or(u16::MAX);
            let mut encoder = JpegEncoder::new_with_quality(writer, JPEG_QUALITY);
            encoder.set_pixel_density(PixelDensity::dpi(density));
            encoder.encode_image(&image.to_rgb8()).map_err(|e| e.to_string())
        }
        OutputFormat::Tiff => write_tiff(image, writer, dpi).map_err(|e| e.to_string()),
        OutputFormat::Bmp => {
            let bytes = bmp_bytes(image, dpi).map_err(|e| e.to_string())?;
            writer.write_all(&bytes).map_err(|e| e.to_string())
        }
    }
}

fn write_png<W: Write>(image: &DynamicImage, writer: W, dpi: u32) -> Result<(), png::EncodingError> {
    let (width, height) = (image.width(), image.height());
    let (color, data) = if image.color().has_alpha() {
        (png::ColorType::Rgba, image.to_rgba8().into_raw())
    } else {
        (png::ColorType::Rgb, image.to_rgb8().into_raw())
    };

    let ppm = pixels_per_metre(dpi);
    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(color);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: ppm,
        yppu: ppm,
        unit: png::Unit::Meter,
    }));

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&data)?;
    png_writer.finish()
}

fn write_tiff<W: Write + Seek>(image: &DynamicImage, writer: &mut W, dpi: u32) -> tiff::TiffResult<()> {
    use tiff::encoder::{colortype, Rational, TiffEncoder};
    use tiff::tags::ResolutionUnit;

    let rgb = image.to_rgb8();
    let mut encoder = TiffEncoder::new(writer)?;
    let mut page = encoder.new_image::<colortype::RGB8>(rgb.width(), rgb.height())?;
    page.resolution(ResolutionUnit::Inch, Rational { n: dpi, d: 1 });
    page.write_data(rgb.as_raw())
}

/// The `image` BMP encoder leaves the resolution fields at zero; they are
/// filled in after encoding.
fn bmp_bytes(image: &DynamicImage, dpi: u32) -> image::ImageResult<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut bytes = Vec::new();
    BmpEncoder::new(&mut bytes).encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)?;

    let ppm = i32::try_from(pixels_per_metre(dpi)).unwrap_or(i32::MAX).to_le_bytes();
    let fields = BMP_PELS_PER_METER_OFFSET..BMP_PELS_PER_METER_OFFSET + 8;
    if let Some(slot) = bytes.get_mut(fields) {
        slot[..4].copy_from_slice(&ppm);
        slot[4..].copy_from_slice(&ppm);
    }
    Ok(bytes)
}
