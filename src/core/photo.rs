//! Decoding and format checks for base64-embedded photos.

use std::io::Cursor;
use base64::Engine;
use image::{io::Reader as ImageReader, DynamicImage, ImageFormat};
use crate::common::{AttendanceError, Result};

/// Formats accepted for reference and candidate photos.
pub const ACCEPTED_FORMATS: [ImageFormat; 2] = [ImageFormat::Jpeg, ImageFormat::Png];

/// Drops a data-URI header such as `data:image/png;base64,` if present.
pub fn strip_data_uri(payload: &str) -> &str {
    match payload.split_once(',') {
        Some((_, rest)) => rest,
        None => payload,
    }
}

pub fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(strip_data_uri(payload).trim())
        .map_err(|e| AttendanceError::InvalidEncoding(e.to_string()))
}

/// Checks that the payload is a JPEG or PNG by reading its headers only.
pub fn validate_image(payload: &str) -> Result<ImageFormat> {
    let bytes = decode_base64(payload)?;
    let (reader, format) = open_reader(&bytes)?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| AttendanceError::InvalidImage(e.to_string()))?;
    if width == 0 || height == 0 {
        return Err(AttendanceError::InvalidImage(format!("empty image {}x{}", width, height)));
    }

    Ok(format)
}

/// Fully decodes the payload into pixels.
pub fn decode_image(payload: &str) -> Result<DynamicImage> {
    let bytes = decode_base64(payload)?;
    let (reader, _) = open_reader(&bytes)?;

    let image = reader
        .decode()
        .map_err(|e| AttendanceError::InvalidImage(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(AttendanceError::InvalidImage("empty image".into()));
    }

    Ok(image)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn open_reader(bytes: &[u8]) -> Result<(ImageReader<Cursor<&[u8]>>, ImageFormat)> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AttendanceError::InvalidImage(e.to_string()))?;

    let format = reader
        .format()
        .ok_or_else(|| AttendanceError::InvalidImage("unrecognised image data".into()))?;

    if !ACCEPTED_FORMATS.contains(&format) {
        let name = format.extensions_str().first().copied().unwrap_or("unknown");
        return Err(AttendanceError::UnsupportedFormat(name.to_string()));
    }

    Ok((reader, format))
}

#[cfg(test)]
pub(crate) mod test_images {
    use image::{ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;

    pub fn encode(img: &RgbImage, format: ImageOutputFormat) -> String {
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img.clone())
            .write_to(&mut buf, format)
            .unwrap();
        super::encode_base64(buf.get_ref())
    }

    /// Horizontal red gradient over a blue-ish background.
    pub fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 120])
        })
    }

    pub fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::test_images::*;
    use image::ImageOutputFormat;

    #[test]
    fn accepts_png_and_jpeg() {
        let img = gradient(16, 12);
        let png = encode(&img, ImageOutputFormat::Png);
        let jpeg = encode(&img, ImageOutputFormat::Jpeg(90));

        assert_eq!(validate_image(&png).unwrap(), ImageFormat::Png);
        assert_eq!(validate_image(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn strips_data_uri_prefix() {
        let png = encode(&gradient(8, 8), ImageOutputFormat::Png);
        let with_prefix = format!("data:image/png;base64,{}", png);
        assert_eq!(validate_image(&with_prefix).unwrap(), ImageFormat::Png);
        assert_eq!(strip_data_uri("abc"), "abc");
    }

    #[test]
    fn rejects_gif_as_unsupported() {
        let gif = encode(&gradient(8, 8), ImageOutputFormat::Gif);
        let err = validate_image(&gif).unwrap_err();
        assert!(matches!(err, AttendanceError::UnsupportedFormat(ref f) if f == "gif"), "{err}");
    }

    #[test]
    fn rejects_bad_base64() {
        let err = validate_image("this is not base64!!").unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidEncoding(_)));
    }

    #[test]
    fn rejects_plain_text_payload() {
        let text = encode_base64(b"just some words, nothing to see");
        let err = validate_image(&text).unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidImage(_)));
    }

    #[test]
    fn rejects_truncated_png() {
        let png = encode(&gradient(8, 8), ImageOutputFormat::Png);
        let bytes = decode_base64(&png).unwrap();
        let truncated = encode_base64(&bytes[..12]);
        let err = validate_image(&truncated).unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidImage(_)));
    }

    #[test]
    fn decode_returns_pixels() {
        let img = solid(5, 3, [10, 20, 30]);
        let decoded = decode_image(&encode(&img, ImageOutputFormat::Png)).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 3));
    }
}
