//! Canvas composition: map a pre-processed image onto the target canvas.
//!
//! | Mode      | Aspect kept | Crops | Pads |
//! |-----------|-------------|-------|------|
//! | `stretch` | no          | no    | no   |
//! | `fill`    | yes         | yes   | no   |
//! | `fit`     | yes         | no    | yes  |
//!
//! All modes resample with Lanczos3 and return exactly the canvas size.

use crate::catalog::CanvasSize;
use crate::config::{Color, PlacementMode};
use crate::pipeline::encode::OutputFormat;
use crate::pipeline::preprocess::{flatten_alpha, Rect};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use tracing::debug;

const FILTER: FilterType = FilterType::Lanczos3;

/// Place `image` on a `canvas`-sized output according to `mode`.
///
/// `keep_alpha` selects a transparent padding canvas in fit mode; otherwise
/// padding is `background` and the result is opaque.
pub fn place(
    image: &DynamicImage,
    canvas: CanvasSize,
    mode: PlacementMode,
    background: Color,
    keep_alpha: bool,
) -> DynamicImage {
    let (tw, th) = (canvas.width_px, canvas.height_px);
    match mode {
        PlacementMode::Stretch => image.resize_exact(tw, th, FILTER),
        PlacementMode::Fill => {
            let r = fill_crop_rect(image.width(), image.height(), tw, th);
            debug!("Fill: cropping source to {}x{} at ({}, {})", r.width, r.height, r.x, r.y);
            image
                .crop_imm(r.x, r.y, r.width, r.height)
                .resize_exact(tw, th, FILTER)
        }
        PlacementMode::Fit => {
            let (w, h) = fit_dimensions(image.width(), image.height(), tw, th);
            let scaled = if (w, h) == (image.width(), image.height()) {
                image.to_rgba8()
            } else {
                image.resize_exact(w, h, FILTER).to_rgba8()
            };
            let (x, y) = (i64::from((tw - w) / 2), i64::from((th - h) / 2));
            debug!("Fit: {w}x{h} at ({x}, {y}) on {tw}x{th}");

            if keep_alpha {
                let mut out = RgbaImage::from_pixel(tw, th, background.rgba(0));
                imageops::replace(&mut out, &scaled, x, y);
                DynamicImage::ImageRgba8(out)
            } else {
                let mut out = RgbaImage::from_pixel(tw, th, background.rgba(255));
                imageops::overlay(&mut out, &scaled, x, y);
                DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(out).to_rgb8())
            }
        }
    }
}

/// Scaled size for fit mode: `round(side × min(tw/w, th/h))`, at least 1 px
/// and never larger than the canvas.
pub fn fit_dimensions(width: u32, height: u32, tw: u32, th: u32) -> (u32, u32) {
    let ratio = (f64::from(tw) / f64::from(width)).min(f64::from(th) / f64::from(height));
    let scale = |side: u32, limit: u32| ((f64::from(side) * ratio).round() as u32).clamp(1, limit);
    (scale(width, tw), scale(height, th))
}

/// The centred source region with the canvas aspect ratio, for fill mode.
pub fn fill_crop_rect(width: u32, height: u32, tw: u32, th: u32) -> Rect {
    let target = f64::from(tw) / f64::from(th);
    let source = f64::from(width) / f64::from(height);

    if source > target {
        let crop_w = ((f64::from(height) * target).round() as u32).clamp(1, width);
        Rect {
            x: (width - crop_w) / 2,
            y: 0,
            width: crop_w,
            height,
        }
    } else {
        let crop_h = ((f64::from(width) / target).round() as u32).clamp(1, height);
        Rect {
            x: 0,
            y: (height - crop_h) / 2,
            width,
            height: crop_h,
        }
    }
}

/// Make the canvas storable in `format`: transparency is composited over
/// `background` when the format cannot hold it.
pub fn finalize(canvas: DynamicImage, format: OutputFormat, background: Color) -> DynamicImage {
    if format.supports_alpha() || !canvas.color().has_alpha() {
        canvas
    } else {
        flatten_alpha(canvas, background)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};

    const CANVAS: CanvasSize = CanvasSize {
        width_px: 100,
        height_px: 50,
    };

    fn red_square(side: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(side, side, Rgb([255, 0, 0])))
    }

    #[test]
    fn every_mode_hits_the_canvas_exactly() {
        for mode in [PlacementMode::Stretch, PlacementMode::Fill, PlacementMode::Fit] {
            let out = place(&red_square(37), CANVAS, mode, Color::WHITE, false);
            assert_eq!((out.width(), out.height()), (100, 50), "{mode}");
        }
    }

    #[test]
    fn fit_pads_with_background_and_never_crops() {
        let out = place(&red_square(10), CANVAS, PlacementMode::Fit, Color::WHITE, false).to_rgb8();
        // Content is 50x50 centred at x = 25.
        assert_eq!(out.get_pixel(0, 25), &Rgb([255, 255, 255]));
        assert_eq!(out.get_pixel(99, 25), &Rgb([255, 255, 255]));
        assert_eq!(out.get_pixel(50, 25), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(25, 0), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(74, 49), &Rgb([255, 0, 0]));
    }

    #[test]
    fn fit_dimensions_bind_on_the_tighter_axis() {
        assert_eq!(fit_dimensions(10, 10, 100, 50), (50, 50));
        assert_eq!(fit_dimensions(400, 100, 100, 50), (100, 25));
        assert_eq!(fit_dimensions(3, 2000, 100, 50), (1, 50));
        // Upscaling is allowed.
        assert_eq!(fit_dimensions(1, 1, 300, 600), (300, 300));
    }

    #[test]
    fn fit_keeps_transparent_padding_for_png() {
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 255, 255])));
        let out = place(&src, CANVAS, PlacementMode::Fit, Color::WHITE, true);
        let rgba = out.as_rgba8().unwrap();
        assert_eq!(rgba.get_pixel(0, 0)[3], 0);
        assert_eq!(rgba.get_pixel(50, 25), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn fill_shows_no_padding() {
        let out = place(&red_square(10), CANVAS, PlacementMode::Fill, Color::WHITE, false).to_rgb8();
        assert!(out.pixels().all(|p| p[0] > 200 && p[1] < 50 && p[2] < 50));
    }

    #[test]
    fn fill_crop_is_centred() {
        assert_eq!(
            fill_crop_rect(400, 100, 100, 50),
            Rect {
                x: 100,
                y: 0,
                width: 200,
                height: 100
            }
        );
        assert_eq!(
            fill_crop_rect(100, 100, 100, 50),
            Rect {
                x: 0,
                y: 25,
                width: 100,
                height: 50
            }
        );
    }

    #[test]
    fn stretch_is_not_aspect_preserving() {
        let mut src = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        for x in 0..5 {
            for y in 0..10 {
                src.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let out = place(&DynamicImage::ImageRgb8(src), CANVAS, PlacementMode::Stretch, Color::WHITE, false)
            .to_rgb8();
        // The left half of the source covers the left half of the wide canvas.
        assert!(out.get_pixel(10, 25)[0] > 200);
        assert!(out.get_pixel(90, 25)[0] < 50);
    }

    #[test]
    fn finalize_flattens_only_for_opaque_formats() {
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])));
        let png = finalize(src.clone(), OutputFormat::Png, Color::WHITE);
        assert!(png.color().has_alpha());

        let jpg = finalize(src, OutputFormat::Jpeg, Color::WHITE);
        assert!(!jpg.color().has_alpha());
        assert_eq!(jpg.to_rgb8().get_pixel(0, 0), &Rgb([255, 255, 255]));
    }
}
