use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};

/// Longest edge of a shared frame, in pixels.
pub const MAX_FRAME_DIMENSION: u32 = 512;
pub const JPEG_QUALITY: u8 = 70;

/// Fits `(width, height)` inside a `max` square, keeping the aspect ratio.
pub fn scaled_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
    let long_edge = width.max(height);
    if long_edge <= max {
        return (width, height);
    }
    let scale = max as f64 / long_edge as f64;
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Downscales and JPEG-encodes a captured frame, returning base64.
///
/// A frame with a zero dimension is not ready yet and yields `Ok(None)`.
pub fn encode_jpeg_frame(frame: &RgbaImage, max_dimension: u32, quality: u8) -> anyhow::Result<Option<String>> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Ok(None);
    }

    let (w, h) = scaled_dimensions(width, height, max_dimension);
    let img = DynamicImage::ImageRgba8(frame.clone());
    let img = if (w, h) == (width, height) {
        img
    } else {
        img.resize_exact(w, h, image::imageops::FilterType::Triangle)
    };

    // JPEG has no alpha channel.
    let img = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    img.write_with_encoder(encoder)?;

    tracing::debug!("Encoded {}x{} frame as {}x{} JPEG ({} bytes)", width, height, w, h, buf.len());
    Ok(Some(base64::engine::general_purpose::STANDARD.encode(&buf)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(1920, 1080, 512), (512, 288));
        assert_eq!(scaled_dimensions(720, 1280, 512), (288, 512));
        assert_eq!(scaled_dimensions(320, 240, 512), (320, 240));
        assert_eq!(scaled_dimensions(4000, 1, 512), (512, 1));
    }

    #[test]
    fn test_encode_jpeg_frame() {
        let frame = RgbaImage::from_pixel(1024, 768, image::Rgba([200, 40, 40, 255]));
        let encoded = encode_jpeg_frame(&frame, MAX_FRAME_DIMENSION, JPEG_QUALITY).unwrap().unwrap();
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (512, 384));
    }

    #[test]
    fn test_empty_frame_is_skipped() {
        let frame = RgbaImage::new(0, 0);
        assert!(encode_jpeg_frame(&frame, MAX_FRAME_DIMENSION, JPEG_QUALITY).unwrap().is_none());
    }
}
