//! JPEG and data URI encoding for outbound images.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageFormat, RgbImage};

pub const DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Baseline JPEG quality for outbound images.
pub const JPEG_QUALITY: u8 = 75;

/// Encode an RGB image as a baseline JPEG.
pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .with_context(|| format!("failed to encode {}x{} JPEG", image.width(), image.height()))?;
    Ok(buf)
}

/// `data:image/jpeg;base64,<...>` for an RGB image.
pub fn jpeg_data_uri(image: &RgbImage) -> Result<String> {
    let jpeg = encode_jpeg(image)?;
    let mut uri = String::with_capacity(DATA_URI_PREFIX.len() + jpeg.len() * 4 / 3 + 4);
    uri.push_str(DATA_URI_PREFIX);
    STANDARD.encode_string(&jpeg, &mut uri);
    Ok(uri)
}

/// Raw JPEG bytes carried by a data URI.
pub fn data_uri_bytes(uri: &str) -> Result<Vec<u8>> {
    let encoded = uri
        .strip_prefix(DATA_URI_PREFIX)
        .ok_or_else(|| anyhow!("not a JPEG data URI"))?;
    STANDARD
        .decode(encoded)
        .context("data URI payload is not valid base64")
}

/// Decode a JPEG data URI back into pixels.
pub fn decode_data_uri(uri: &str) -> Result<RgbImage> {
    let bytes = data_uri_bytes(uri)?;
    let image = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)
        .context("data URI payload is not a valid JPEG")?;
    Ok(image.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn jpeg_starts_with_soi_marker() -> Result<()> {
        let image = RgbImage::from_pixel(16, 8, Rgb([200, 10, 10]));
        let jpeg = encode_jpeg(&image)?;
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        Ok(())
    }

    #[test]
    fn data_uri_preserves_dimensions() -> Result<()> {
        let image = RgbImage::from_fn(64, 48, |x, y| Rgb([x as u8 * 4, y as u8 * 5, 90]));
        let uri = jpeg_data_uri(&image)?;
        assert!(uri.starts_with(DATA_URI_PREFIX));
        assert!(uri.len() > DATA_URI_PREFIX.len());

        let decoded = decode_data_uri(&uri)?;
        assert_eq!(decoded.dimensions(), (64, 48));
        Ok(())
    }

    #[test]
    fn rejects_foreign_uris() {
        assert!(decode_data_uri("data:image/png;base64,AAAA").is_err());
        assert!(decode_data_uri("data:image/jpeg;base64,!!!").is_err());
        assert!(decode_data_uri("data:image/jpeg;base64,AAAA").is_err());
    }
}
