//! Image encoding: downscale-and-JPEG for object detection, base64 for the
//! inline request body.
//!
//! Gemini accepts inline media as base64 inside the JSON request. Object
//! detection only needs coarse shapes, so those uploads are shrunk to a fixed
//! width and stored as JPEG; charts and flowcharts keep their original bytes
//! because small labels have to stay legible.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

/// Decode `bytes`, shrink to at most `target_width` pixels wide and
/// re-encode as JPEG at `quality`.
///
/// Aspect ratio is kept. Images already narrower than `target_width` are
/// not enlarged. Alpha is dropped since JPEG has no alpha channel.
pub fn recompress_jpeg(
    bytes: &[u8],
    target_width: u32,
    quality: u8,
) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let resized = shrink_to_width(img, target_width);

    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(resized.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;

    debug!(
        "Recompressed image {} → {} bytes ({}x{})",
        bytes.len(),
        buf.len(),
        resized.width(),
        resized.height()
    );
    Ok(buf)
}

fn shrink_to_width(img: DynamicImage, target_width: u32) -> DynamicImage {
    if img.width() <= target_width {
        return img;
    }
    let height = ((img.height() as u64 * target_width as u64) / img.width() as u64).max(1) as u32;
    img.resize_exact(target_width, height, FilterType::Triangle)
}

/// Base64-encode media bytes for an inline request part.
pub fn to_base64(bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded media → {} bytes base64", b64.len());
    b64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([255, 0, 0, 255]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("png encode");
        buf
    }

    #[test]
    fn wide_image_is_shrunk_keeping_aspect() {
        let out = recompress_jpeg(&png(1600, 400), 800, 80).expect("recompress");
        let decoded = image::load_from_memory(&out).expect("valid jpeg");
        assert_eq!(decoded.width(), 800);
        assert_eq!(decoded.height(), 200);
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn narrow_image_is_not_enlarged() {
        let out = recompress_jpeg(&png(120, 60), 800, 80).expect("recompress");
        let decoded = image::load_from_memory(&out).expect("valid jpeg");
        assert_eq!((decoded.width(), decoded.height()), (120, 60));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(recompress_jpeg(b"definitely not an image", 800, 80).is_err());
    }

    #[test]
    fn base64_round_trips() {
        let b64 = to_base64(b"hello");
        assert_eq!(b64, "aGVsbG8=");
    }
}
