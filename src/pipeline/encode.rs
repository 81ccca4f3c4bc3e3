//! Encoding helpers: base64 `data:` URIs and lossless PNG serialisation.
//!
//! The rasteriser receives the SVG as a `data:image/svg+xml;base64,…` URI and
//! the assembler receives the bitmap as PNG bytes, so both hand-offs go
//! through this module.

use crate::error::Svg2PdfError;
use crate::pipeline::intake::SVG_MIME;
use crate::pipeline::rasterize::Bitmap;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, RgbaImage};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Cursor;
use tracing::debug;

/// `data:<mime>[;param…][;base64],<payload>`
static RE_DATA_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^data:([^;,]*)((?:;[^;,]*)*),(.*)$").unwrap());

/// A decoded `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Build a base64 `data:` URI.
pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Build the `data:image/svg+xml;base64,…` URI for SVG text.
pub fn svg_data_uri(svg: &str) -> String {
    encode_data_uri(SVG_MIME, svg.as_bytes())
}

/// Parse a `data:` URI.
///
/// Base64 payloads are decoded; other payloads are returned verbatim.
pub fn decode_data_uri(uri: &str) -> Result<DataUri, Svg2PdfError> {
    let caps = RE_DATA_URI
        .captures(uri)
        .ok_or_else(|| Svg2PdfError::DecodeFailed {
            detail: "not a data: URI".to_string(),
        })?;

    let mime_type = match caps[1].trim() {
        "" => "text/plain".to_string(),
        m => m.to_string(),
    };
    let is_base64 = caps[2]
        .split(';')
        .any(|p| p.trim().eq_ignore_ascii_case("base64"));
    let payload = &caps[3];

    let data = if is_base64 {
        STANDARD
            .decode(payload.trim())
            .map_err(|e| Svg2PdfError::DecodeFailed {
                detail: format!("invalid base64 in data URI: {}", e),
            })?
    } else {
        payload.as_bytes().to_vec()
    };

    Ok(DataUri { mime_type, data })
}

/// Serialise a bitmap as PNG.
///
/// tiny-skia stores premultiplied alpha; PNG wants straight alpha, so every
/// pixel is demultiplied first.
pub fn encode_png(bitmap: &Bitmap) -> Result<Vec<u8>, Svg2PdfError> {
    let pixmap = bitmap.pixmap();
    let mut raw = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        raw.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    let rgba = RgbaImage::from_raw(pixmap.width(), pixmap.height(), raw).ok_or_else(|| {
        Svg2PdfError::EncodeFailed {
            detail: "pixel buffer does not match surface size".to_string(),
        }
    })?;

    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(rgba)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| Svg2PdfError::EncodeFailed {
            detail: e.to_string(),
        })?;

    debug!("Encoded bitmap → {} bytes PNG", buf.len());
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionConfig;
    use crate::pipeline::rasterize::rasterize_svg;

    #[test]
    fn svg_uri_decodes_back_to_text() {
        let svg = "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"1\" height=\"1\"/>";
        let uri = svg_data_uri(svg);
        assert!(uri.starts_with("data:image/svg+xml;base64,"));
        let decoded = decode_data_uri(&uri).unwrap();
        assert_eq!(decoded.mime_type, SVG_MIME);
        assert_eq!(decoded.data, svg.as_bytes());
    }

    #[test]
    fn non_base64_payload_is_verbatim() {
        let d = decode_data_uri("data:text/plain;charset=utf-8,hello").unwrap();
        assert_eq!(d.mime_type, "text/plain");
        assert_eq!(d.data, b"hello");
    }

    #[test]
    fn missing_mime_defaults_to_text_plain() {
        let d = decode_data_uri("data:,x").unwrap();
        assert_eq!(d.mime_type, "text/plain");
    }

    #[test]
    fn rejects_non_data_uri_and_bad_base64() {
        assert!(decode_data_uri("https://example.com/a.svg").is_err());
        assert!(decode_data_uri("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn png_round_trip_keeps_size_and_colour() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="12" height="7">
            <rect width="12" height="7" fill="#0000ff" fill-opacity="0.5"/>
        </svg>"##;
        let cfg = ConversionConfig::builder().load_system_fonts(false).build().unwrap();
        let bmp = rasterize_svg(svg, &cfg).unwrap();
        let png = encode_png(&bmp).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");

        let img = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .unwrap()
            .to_rgba8();
        assert_eq!(img.dimensions(), (12, 7));
        let p = img.get_pixel(3, 3);
        assert_eq!(p[2], 255, "blue channel is demultiplied");
        assert!((126..=129).contains(&p[3]), "alpha ≈ 50%, got {}", p[3]);
    }
}
