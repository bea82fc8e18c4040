//! Pre-processing of a decoded image, in fixed order:
//!
//! 1. apply the embedded orientation
//! 2. autocrop (alpha bounding box, or trim-colour bounding box)
//! 3. flatten transparency onto the background colour
//!
//! Autocrop runs on the still-transparent image; flattening first would turn
//! transparent margins into background-coloured ones and hide the bounds.

use crate::config::{Color, ResizeConfig};
use image::metadata::Orientation;
use image::{DynamicImage, Pixel, Rgb, RgbImage};
use tracing::debug;

/// A pixel rectangle inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Run the pre-processing steps enabled in `config`.
pub fn normalize(
    mut image: DynamicImage,
    orientation: Option<Orientation>,
    config: &ResizeConfig,
) -> DynamicImage {
    if let Some(orientation) = orientation {
        if orientation != Orientation::NoTransforms {
            debug!("Applying embedded orientation {orientation:?}");
            image.apply_orientation(orientation);
        }
    }

    if config.autocrop {
        image = autocrop(image, config.trim_color);
    }

    if config.flatten_alpha {
        image = flatten_alpha(image, config.background);
    }

    image
}

/// Crop to [`content_bounds`]; images with no content are returned as-is.
pub fn autocrop(image: DynamicImage, trim: Color) -> DynamicImage {
    match content_bounds(&image, trim) {
        Some(r) if (r.width, r.height) != (image.width(), image.height()) => {
            debug!(
                "Autocrop {}x{} → {}x{} at ({}, {})",
                image.width(),
                image.height(),
                r.width,
                r.height,
                r.x,
                r.y
            );
            image.crop_imm(r.x, r.y, r.width, r.height)
        }
        _ => image,
    }
}

/// Bounding box of the image's content.
///
/// With an alpha channel, content is every pixel that is not fully
/// transparent. Without one, content is every pixel that differs from `trim`.
/// `None` when the whole image is background.
pub fn content_bounds(image: &DynamicImage, trim: Color) -> Option<Rect> {
    if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        bounding_box(rgba.width(), rgba.height(), |x, y| rgba.get_pixel(x, y)[3] != 0)
    } else {
        let rgb = image.to_rgb8();
        let trim = trim.rgb();
        bounding_box(rgb.width(), rgb.height(), |x, y| *rgb.get_pixel(x, y) != trim)
    }
}

fn bounding_box(width: u32, height: u32, is_content: impl Fn(u32, u32) -> bool) -> Option<Rect> {
    let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
    let (mut max_x, mut max_y) = (0, 0);
    let mut found = false;

    for y in 0..height {
        for x in 0..width {
            if is_content(x, y) {
                found = true;
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }
    }

    found.then(|| Rect {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    })
}

/// Composite over a solid `background`; opaque images are returned unchanged.
pub fn flatten_alpha(image: DynamicImage, background: Color) -> DynamicImage {
    if !image.color().has_alpha() {
        return image;
    }

    let rgba = image.to_rgba8();
    let bg = background.0;
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let a = u32::from(src[3]);
        let channels = src.to_rgb().0;
        *dst = Rgb(std::array::from_fn(|i| {
            ((u32::from(channels[i]) * a + u32::from(bg[i]) * (255 - a) + 127) / 255) as u8
        }));
    }
    DynamicImage::ImageRgb8(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn white_with_block() -> DynamicImage {
        let mut img = RgbImage::from_pixel(20, 10, Rgb([255, 255, 255]));
        for y in 2..5 {
            for x in 3..9 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn opaque_autocrop_trims_white_border() {
        let cropped = autocrop(white_with_block(), Color::WHITE);
        assert_eq!((cropped.width(), cropped.height()), (6, 3));
    }

    #[test]
    fn autocrop_is_idempotent() {
        let once = autocrop(white_with_block(), Color::WHITE);
        let first = content_bounds(&once, Color::WHITE).unwrap();
        let twice = autocrop(once, Color::WHITE);
        assert_eq!(content_bounds(&twice, Color::WHITE).unwrap(), first);
        assert_eq!((twice.width(), twice.height()), (first.width, first.height));
    }

    #[test]
    fn uniform_image_is_left_alone() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 5, Rgb([255, 255, 255])));
        assert_eq!(content_bounds(&img, Color::WHITE), None);
        let out = autocrop(img, Color::WHITE);
        assert_eq!((out.width(), out.height()), (5, 5));
    }

    #[test]
    fn alpha_bounds_ignore_colour() {
        // White but opaque pixels count as content when alpha is present.
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 0]));
        img.put_pixel(4, 6, Rgba([255, 255, 255, 255]));
        img.put_pixel(7, 2, Rgba([255, 255, 255, 1]));
        let bounds = content_bounds(&DynamicImage::ImageRgba8(img), Color::WHITE).unwrap();
        assert_eq!(
            bounds,
            Rect {
                x: 4,
                y: 2,
                width: 4,
                height: 5
            }
        );
    }

    #[test]
    fn fully_transparent_image_is_not_cropped() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(4, 3));
        let out = autocrop(img, Color::WHITE);
        assert_eq!((out.width(), out.height()), (4, 3));
    }

    #[test]
    fn flatten_blends_onto_background() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let flat = flatten_alpha(DynamicImage::ImageRgba8(img), Color([200, 100, 50]));
        let rgb = flat.as_rgb8().unwrap();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([200, 100, 50]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([0, 0, 0]));

        let half = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let flat = flatten_alpha(DynamicImage::ImageRgba8(half), Color::WHITE);
        assert_eq!(flat.as_rgb8().unwrap().get_pixel(0, 0), &Rgb([127, 127, 127]));
    }

    #[test]
    fn autocrop_runs_before_flatten() {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 0]));
        img.put_pixel(5, 5, Rgba([255, 0, 0, 255]));
        let config = ResizeConfig::default();
        let out = normalize(DynamicImage::ImageRgba8(img), None, &config);
        assert_eq!((out.width(), out.height()), (1, 1));
        assert!(!out.color().has_alpha());
    }

    #[test]
    fn orientation_is_applied() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 2, Rgb([0, 0, 0])));
        let config = ResizeConfig::builder().autocrop(false).build().unwrap();
        let out = normalize(img, Some(Orientation::Rotate90), &config);
        assert_eq!((out.width(), out.height()), (2, 4));
    }
}
