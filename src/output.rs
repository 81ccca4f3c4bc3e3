//! Conversion results and statistics.

use serde::{Deserialize, Serialize};

/// MIME type of every produced document.
pub const PDF_MIME: &str = "application/pdf";

/// A finished conversion: the PDF bytes plus everything needed to save them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The complete PDF document.
    #[serde(skip)]
    pub pdf: Vec<u8>,
    /// Suggested filename (`converted-svg.pdf` unless configured otherwise).
    pub filename: String,
    /// Always [`PDF_MIME`].
    pub mime_type: String,
    pub stats: ConversionStats,
}

/// Measurements collected while converting one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Bitmap (and page) width in pixels / points.
    pub width: u32,
    /// Bitmap (and page) height in pixels / points.
    pub height: u32,
    /// How the intrinsic size was decided.
    pub size_source: SizeSource,
    /// True when the bitmap has any non-opaque pixel (a soft mask was embedded).
    pub has_transparency: bool,
    pub png_bytes: usize,
    pub pdf_bytes: usize,
    pub rasterize_duration_ms: u64,
    pub encode_duration_ms: u64,
    pub assemble_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Where the rasteriser took the surface size from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeSource {
    /// Absolute `width` and `height` attributes on the root element.
    #[default]
    Explicit,
    /// Derived from the root `viewBox`.
    ViewBox,
    /// No viewBox and at most one absolute edge; missing edges took the
    /// configured default size.
    Fallback,
}

/// Facts about an SVG gathered without producing a PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvgMetadata {
    pub width: u32,
    pub height: u32,
    pub size_source: SizeSource,
    /// Root `viewBox` as `[min-x, min-y, width, height]`, if any.
    pub view_box: Option<[f32; 4]>,
    /// Text of the root `<title>` element, if any.
    pub title: Option<String>,
    /// Size of the SVG source in bytes.
    pub source_bytes: usize,
}
