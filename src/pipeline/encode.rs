//! Inline encoding of artifact bytes for transport to a UI tier.
//!
//! Artifacts travel as JSON, so their image bytes are base64-wrapped. The
//! MIME type in a data URI is sniffed from the content rather than taken from
//! the artifact name: every artifact is *named* `.png`, but a picture pulled
//! out of a page by `pdfimages` or a remote service may really be a JPEG.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Base64-encode raw artifact bytes.
pub fn encode_inline(bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} bytes → {} bytes base64", bytes.len(), b64.len());
    b64
}

/// Decode a base64 string produced by [`encode_inline`].
pub fn decode_inline(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(encoded)
}

/// Best-effort MIME type for image bytes; falls back to `image/png`.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or("image/png")
}

/// `data:<mime>;base64,<payload>` form, ready for an `<img src>`.
pub fn data_uri(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", sniff_mime(bytes), encode_inline(bytes))
}

/// `#[serde(with = "...")]` adapter that stores `Vec<u8>` as a base64 string.
pub mod serde_inline {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_inline(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::decode_inline(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn tiny_png() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .expect("encode png");
        buf
    }

    #[test]
    fn inline_round_trip_is_byte_exact() {
        let png = tiny_png();
        let decoded = decode_inline(&encode_inline(&png)).expect("valid base64");
        assert_eq!(decoded, png);
    }

    #[test]
    fn sniffs_png_and_jpeg() {
        assert_eq!(sniff_mime(&tiny_png()), "image/png");
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), "image/jpeg");
        assert_eq!(sniff_mime(b"not an image"), "image/png");
    }

    #[test]
    fn data_uri_prefix() {
        let uri = data_uri(&tiny_png());
        assert!(uri.starts_with("data:image/png;base64,"));
    }
}
