//! Configuration types for SVG-to-PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Setters clamp obviously bad values;
//! [`ConversionConfigBuilder::build`] rejects the ones that cannot be clamped.

use crate::error::Svg2PdfError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Filename suggested for every produced PDF.
pub const DEFAULT_OUTPUT_FILENAME: &str = "converted-svg.pdf";

/// Configuration for an SVG-to-PDF conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_svg2pdf::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .decode_timeout_secs(10)
///     .default_size(640, 480)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Upper bound on SVG decode + rasterisation. Default: 30 s.
    ///
    /// A decode that never completes is reported as
    /// [`Svg2PdfError::DecodeTimeout`] instead of hanging the caller.
    pub decode_timeout: Duration,

    /// Surface width used when the SVG declares neither a usable
    /// `width`/`height` pair nor a `viewBox`. Default: 300.
    pub default_width: u32,

    /// Surface height for the same fallback. Default: 150.
    pub default_height: u32,

    /// Largest accepted surface edge in pixels. Default: 16384.
    ///
    /// Larger intrinsic sizes fail with [`Svg2PdfError::SurfaceUnavailable`]
    /// rather than attempting a multi-gigabyte allocation.
    pub max_dimension: u32,

    /// RGBA colour painted under the SVG. Default: None (transparent).
    pub background: Option<[u8; 4]>,

    /// Load system fonts so `<text>` elements render. Default: true.
    pub load_system_fonts: bool,

    /// zlib effort for the embedded image streams. Default: [`CompressionLevel::Default`].
    pub compression: CompressionLevel,

    /// Suggested filename of the produced document. Default: `converted-svg.pdf`.
    pub output_filename: String,

    /// Optional stage-by-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            decode_timeout: Duration::from_secs(30),
            default_width: 300,
            default_height: 150,
            max_dimension: 16_384,
            background: None,
            load_system_fonts: true,
            compression: CompressionLevel::default(),
            output_filename: DEFAULT_OUTPUT_FILENAME.to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("decode_timeout", &self.decode_timeout)
            .field("default_width", &self.default_width)
            .field("default_height", &self.default_height)
            .field("max_dimension", &self.max_dimension)
            .field("background", &self.background)
            .field("load_system_fonts", &self.load_system_fonts)
            .field("compression", &self.compression)
            .field("output_filename", &self.output_filename)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn decode_timeout_secs(mut self, secs: u64) -> Self {
        self.config.decode_timeout = Duration::from_secs(secs.max(1));
        self
    }

    /// Sub-second timeouts; clamped to at least 1 ms.
    pub fn decode_timeout(mut self, limit: Duration) -> Self {
        self.config.decode_timeout = limit.max(Duration::from_millis(1));
        self
    }

    pub fn default_size(mut self, width: u32, height: u32) -> Self {
        self.config.default_width = width.max(1);
        self.config.default_height = height.max(1);
        self
    }

    pub fn max_dimension(mut self, px: u32) -> Self {
        self.config.max_dimension = px.max(1);
        self
    }

    pub fn background(mut self, rgba: [u8; 4]) -> Self {
        self.config.background = Some(rgba);
        self
    }

    pub fn load_system_fonts(mut self, v: bool) -> Self {
        self.config.load_system_fonts = v;
        self
    }

    pub fn compression(mut self, level: CompressionLevel) -> Self {
        self.config.compression = level;
        self
    }

    pub fn output_filename(mut self, name: impl Into<String>) -> Self {
        self.config.output_filename = name.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Svg2PdfError> {
        let c = &self.config;
        if c.default_width > c.max_dimension || c.default_height > c.max_dimension {
            return Err(Svg2PdfError::InvalidConfig(format!(
                "Default size {}x{} exceeds max dimension {}",
                c.default_width, c.default_height, c.max_dimension
            )));
        }
        let name = c.output_filename.trim();
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(Svg2PdfError::InvalidConfig(format!(
                "Output filename must be a bare file name, got '{}'",
                c.output_filename
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// zlib effort used for FlateDecode image streams.
///
/// All levels are lossless; only output size and CPU time change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Fastest, largest output.
    Fast,
    /// zlib level 6. (default)
    #[default]
    Default,
    /// Smallest output.
    Best,
}

impl CompressionLevel {
    pub fn to_flate(self) -> flate2::Compression {
        match self {
            CompressionLevel::Fast => flate2::Compression::fast(),
            CompressionLevel::Default => flate2::Compression::default(),
            CompressionLevel::Best => flate2::Compression::best(),
        }
    }
}

/// Parse a `#rgb`, `#rrggbb` or `#rrggbbaa` colour into RGBA.
///
/// Also accepts the keywords `white`, `black` and `transparent`.
pub fn parse_color(s: &str) -> Option<[u8; 4]> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "white" => return Some([255, 255, 255, 255]),
        "black" => return Some([0, 0, 0, 255]),
        "transparent" => return Some([0, 0, 0, 0]),
        _ => {}
    }

    let hex = s.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => {
            let nib = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
            Some([nib(0)?, nib(1)?, nib(2)?, 255])
        }
        6 => Some([byte(0)?, byte(2)?, byte(4)?, 255]),
        8 => Some([byte(0)?, byte(2)?, byte(4)?, byte(6)?]),
        _ => None,
    }
}
