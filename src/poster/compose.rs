//! Poster image composition: overlay the generated image onto a template at
//! a fixed offset and re-encode as PNG.

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Fixed placement of the generated image on the template.
pub const OVERLAY_X: i64 = 120;
pub const OVERLAY_Y: i64 = 260;

/// Composite `overlay` onto `template` at the fixed offset. Both inputs are
/// decoded by content (PNG templates, PNG or JPEG overlays); output is PNG.
pub fn compose_poster(template: &[u8], overlay: &[u8]) -> Result<Vec<u8>> {
    compose_at(template, overlay, OVERLAY_X, OVERLAY_Y)
}

fn compose_at(template: &[u8], overlay: &[u8], x: i64, y: i64) -> Result<Vec<u8>> {
    let template = image::load_from_memory(template).context("failed to decode template image")?;
    let overlay = image::load_from_memory(overlay).context("failed to decode overlay image")?;

    let mut canvas = template.to_rgba8();
    image::imageops::overlay(&mut canvas, &overlay.to_rgba8(), x, y);

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut out, ImageFormat::Png)
        .context("failed to encode poster PNG")?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png(width: u32, height: u32, pixel: Rgba<u8>) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, pixel);
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn overlay_lands_at_the_fixed_offset() {
        let template = png(800, 1200, WHITE);
        let overlay = png(10, 10, RED);

        let poster = compose_poster(&template, &overlay).unwrap();
        let decoded = image::load_from_memory(&poster).unwrap().to_rgba8();

        assert_eq!(decoded.dimensions(), (800, 1200));
        assert_eq!(
            *decoded.get_pixel(OVERLAY_X as u32, OVERLAY_Y as u32),
            RED
        );
        // just outside the overlay the template shows through
        assert_eq!(*decoded.get_pixel(OVERLAY_X as u32 - 1, OVERLAY_Y as u32), WHITE);
        assert_eq!(
            *decoded.get_pixel(OVERLAY_X as u32 + 10, OVERLAY_Y as u32),
            WHITE
        );
    }

    #[test]
    fn output_is_valid_png() {
        let poster = compose_poster(&png(50, 50, WHITE), &png(5, 5, RED)).unwrap();
        assert_eq!(&poster[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn oversized_overlay_is_clipped_not_an_error() {
        let poster = compose_poster(&png(200, 300, WHITE), &png(500, 500, RED)).unwrap();
        let decoded = image::load_from_memory(&poster).unwrap();
        assert_eq!(decoded.width(), 200);
        assert_eq!(decoded.height(), 300);
    }

    #[test]
    fn undecodable_input_is_an_error() {
        assert!(compose_poster(b"not an image", &png(5, 5, RED)).is_err());
        assert!(compose_poster(&png(5, 5, WHITE), b"junk").is_err());
    }
}
