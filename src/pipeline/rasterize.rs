//! SVG rasterisation: SVG text → `tiny_skia::Pixmap` at intrinsic size.
//!
//! The SVG is handed to the decoder as a base64 `data:` URI, decoded with
//! `usvg` and drawn with `resvg` onto a pixmap of exactly the intrinsic size,
//! at the origin and unscaled.
//!
//! Decoding runs in `spawn_blocking` under `tokio::time::timeout`, so a
//! malformed or pathological SVG surfaces as [`Svg2PdfError::DecodeFailed`]
//! or [`Svg2PdfError::DecodeTimeout`] instead of stalling the caller.
//!
//! ## Intrinsic size
//!
//! 1. absolute `width` and `height` on the root → those (units resolved by usvg)
//! 2. otherwise a root `viewBox` → its size
//! 3. otherwise the configured default surface (300×150 unless changed),
//!    applied per axis: a lone absolute `width` or `height` is kept

use crate::config::ConversionConfig;
use crate::error::Svg2PdfError;
use crate::output::{SizeSource, SvgMetadata};
use crate::pipeline::encode;
use crate::pipeline::intake::SourceFile;
use once_cell::sync::Lazy;
use resvg::tiny_skia::{Color, Pixmap};
use resvg::usvg::{self, fontdb, Transform, Tree};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// System fonts are scanned once per process; the scan takes far longer
/// than rendering a typical SVG.
static SYSTEM_FONTS: Lazy<Arc<fontdb::Database>> = Lazy::new(|| {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    debug!("Loaded {} system font faces", db.len());
    Arc::new(db)
});

/// A rendered SVG.
#[derive(Debug)]
pub struct Bitmap {
    pixmap: Pixmap,
    size_source: SizeSource,
}

impl Bitmap {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn size_source(&self) -> SizeSource {
        self.size_source
    }

    /// True when any pixel is not fully opaque.
    pub fn has_transparency(&self) -> bool {
        self.pixmap.pixels().iter().any(|p| p.alpha() != u8::MAX)
    }
}

/// The parts of [`ConversionConfig`] the blocking renderer needs.
#[derive(Debug, Clone)]
struct RasterOptions {
    default_width: u32,
    default_height: u32,
    max_dimension: u32,
    background: Option<[u8; 4]>,
    load_system_fonts: bool,
}

impl From<&ConversionConfig> for RasterOptions {
    fn from(c: &ConversionConfig) -> Self {
        Self {
            default_width: c.default_width,
            default_height: c.default_height,
            max_dimension: c.max_dimension,
            background: c.background,
            load_system_fonts: c.load_system_fonts,
        }
    }
}

/// Rasterise the active source file.
///
/// Dropping the returned future abandons the conversion; a decode already
/// running on the blocking pool finishes and its result is discarded.
pub async fn rasterize(source: &SourceFile, config: &ConversionConfig) -> Result<Bitmap, Svg2PdfError> {
    let uri = encode::svg_data_uri(source.text()?);
    let opts = RasterOptions::from(config);

    run_with_timeout(config.decode_timeout, move || rasterize_uri(&uri, &opts)).await
}

/// Run a blocking decode job on the blocking pool, bounded by `limit`.
async fn run_with_timeout<F>(limit: Duration, job: F) -> Result<Bitmap, Svg2PdfError>
where
    F: FnOnce() -> Result<Bitmap, Svg2PdfError> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(job);

    match tokio::time::timeout(limit, task).await {
        Err(_) => {
            warn!("SVG decode exceeded {:?}, abandoning it", limit);
            Err(Svg2PdfError::DecodeTimeout { timeout: limit })
        }
        Ok(Err(e)) => Err(Svg2PdfError::Internal(format!("Rasterise task panicked: {}", e))),
        Ok(Ok(result)) => result,
    }
}

/// Blocking rasterisation of SVG text. No timeout applies.
pub fn rasterize_svg(svg: &str, config: &ConversionConfig) -> Result<Bitmap, Svg2PdfError> {
    rasterize_uri(&encode::svg_data_uri(svg), &RasterOptions::from(config))
}

/// Read size, viewBox and title without rendering.
pub fn probe(source: &SourceFile, config: &ConversionConfig) -> Result<SvgMetadata, Svg2PdfError> {
    let text = source.text()?;
    let opts = RasterOptions::from(config);
    // Fonts do not affect the intrinsic size.
    let tree = parse_tree(text, false)?;
    let root = RootAttributes::parse(text)?;
    let (width, height) = surface_size(&tree, &root, &opts);

    Ok(SvgMetadata {
        width,
        height,
        size_source: root.size_source(),
        view_box: root.view_box,
        title: root.title,
        source_bytes: source.content().len(),
    })
}

fn rasterize_uri(uri: &str, opts: &RasterOptions) -> Result<Bitmap, Svg2PdfError> {
    let data = encode::decode_data_uri(uri)?;
    let text = String::from_utf8(data.data).map_err(|e| Svg2PdfError::DecodeFailed {
        detail: format!("SVG is not valid UTF-8: {}", e),
    })?;

    let tree = parse_tree(&text, opts.load_system_fonts)?;
    let root = RootAttributes::parse(&text)?;
    let size_source = root.size_source();
    let (width, height) = surface_size(&tree, &root, opts);
    debug!("Intrinsic size {}x{} ({:?})", width, height, size_source);

    let mut pixmap = allocate_surface(width, height, opts.max_dimension)?;
    if let Some([r, g, b, a]) = opts.background {
        pixmap.fill(Color::from_rgba8(r, g, b, a));
    }
    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());

    info!("Rasterised SVG → {}x{} px", width, height);
    Ok(Bitmap { pixmap, size_source })
}

fn parse_tree(text: &str, with_fonts: bool) -> Result<Tree, Svg2PdfError> {
    let mut opt = usvg::Options::default();
    if with_fonts {
        opt.fontdb = Arc::clone(&SYSTEM_FONTS);
    }
    Tree::from_str(text, &opt).map_err(|e| Svg2PdfError::DecodeFailed {
        detail: e.to_string(),
    })
}

fn surface_size(tree: &Tree, root: &RootAttributes, opts: &RasterOptions) -> (u32, u32) {
    let size = tree.size();
    match root.size_source() {
        SizeSource::Explicit | SizeSource::ViewBox => (to_px(size.width()), to_px(size.height())),
        // Per axis: a declared edge is kept, a missing one takes the default.
        SizeSource::Fallback => (
            if root.has_width { to_px(size.width()) } else { opts.default_width },
            if root.has_height { to_px(size.height()) } else { opts.default_height },
        ),
    }
}

fn to_px(v: f32) -> u32 {
    if v.is_finite() && v > 0.0 {
        v.round() as u32
    } else {
        0
    }
}

fn allocate_surface(width: u32, height: u32, max_dimension: u32) -> Result<Pixmap, Svg2PdfError> {
    let unavailable = |reason: &str| Svg2PdfError::SurfaceUnavailable {
        width,
        height,
        reason: reason.to_string(),
    };

    if width == 0 || height == 0 {
        return Err(unavailable("zero-sized surface"));
    }
    if width > max_dimension || height > max_dimension {
        return Err(unavailable(&format!("exceeds max dimension {}", max_dimension)));
    }
    Pixmap::new(width, height).ok_or_else(|| unavailable("allocation refused"))
}

/// Root `<svg>` attributes relevant to sizing, read with roxmltree.
struct RootAttributes {
    has_width: bool,
    has_height: bool,
    view_box: Option<[f32; 4]>,
    title: Option<String>,
}

impl RootAttributes {
    fn parse(text: &str) -> Result<Self, Svg2PdfError> {
        // Editor exports carry a DOCTYPE; usvg accepts those, so must we.
        let opt = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(text, opt).map_err(|e| {
            Svg2PdfError::DecodeFailed {
                detail: e.to_string(),
            }
        })?;
        let root = doc.root_element();

        let absolute = |name: &str| {
            root.attribute(name)
                .map(|v| {
                    let v = v.trim();
                    !v.is_empty() && !v.ends_with('%')
                })
                .unwrap_or(false)
        };

        let title = root
            .children()
            .find(|n| n.has_tag_name("title"))
            .and_then(|n| n.text())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Self {
            has_width: absolute("width"),
            has_height: absolute("height"),
            view_box: root.attribute("viewBox").and_then(parse_view_box),
            title,
        })
    }

    fn size_source(&self) -> SizeSource {
        if self.has_width && self.has_height {
            SizeSource::Explicit
        } else if self.view_box.is_some() {
            SizeSource::ViewBox
        } else {
            SizeSource::Fallback
        }
    }
}

fn parse_view_box(v: &str) -> Option<[f32; 4]> {
    let nums: Vec<f32> = v
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f32>())
        .collect::<Result<_, _>>()
        .ok()?;
    match nums.as_slice() {
        &[x, y, w, h] if w > 0.0 && h > 0.0 => Some([x, y, w, h]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::intake::SVG_MIME;

    fn config() -> ConversionConfig {
        ConversionConfig::builder().load_system_fonts(false).build().unwrap()
    }

    const RECT_200X100: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100">
        <rect width="200" height="100" fill="red"/>
    </svg>"#;

    #[test]
    fn explicit_dimensions() {
        let bmp = rasterize_svg(RECT_200X100, &config()).unwrap();
        assert_eq!((bmp.width(), bmp.height()), (200, 100));
        assert_eq!(bmp.size_source(), SizeSource::Explicit);
        assert!(!bmp.has_transparency());
    }

    #[test]
    fn draws_at_origin_unscaled() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
            <rect x="0" y="0" width="5" height="10" fill="#00ff00"/>
        </svg>"##;
        let bmp = rasterize_svg(svg, &config()).unwrap();
        let px = bmp.pixmap().pixel(0, 0).unwrap();
        assert_eq!((px.red(), px.green(), px.alpha()), (0, 255, 255));
        let px = bmp.pixmap().pixel(9, 0).unwrap();
        assert_eq!(px.alpha(), 0);
        assert!(bmp.has_transparency());
    }

    #[test]
    fn view_box_dimensions() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 64 32"/>"#;
        let bmp = rasterize_svg(svg, &config()).unwrap();
        assert_eq!((bmp.width(), bmp.height()), (64, 32));
        assert_eq!(bmp.size_source(), SizeSource::ViewBox);
    }

    #[test]
    fn fallback_dimensions() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><circle cx="5" cy="5" r="5"/></svg>"#;
        let bmp = rasterize_svg(svg, &config()).unwrap();
        assert_eq!((bmp.width(), bmp.height()), (300, 150));
        assert_eq!(bmp.size_source(), SizeSource::Fallback);
    }

    #[test]
    fn percentage_size_without_view_box_falls_back() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100%" height="100%"/>"#;
        let cfg = ConversionConfig::builder()
            .load_system_fonts(false)
            .default_size(40, 20)
            .build()
            .unwrap();
        let bmp = rasterize_svg(svg, &cfg).unwrap();
        assert_eq!((bmp.width(), bmp.height()), (40, 20));
    }

    #[test]
    fn background_fills_surface() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"/>"#;
        let cfg = ConversionConfig::builder()
            .load_system_fonts(false)
            .background([255, 255, 255, 255])
            .build()
            .unwrap();
        let bmp = rasterize_svg(svg, &cfg).unwrap();
        assert!(!bmp.has_transparency());
    }

    #[test]
    fn malformed_svg_is_decode_failure() {
        let err = rasterize_svg("<svg><unclosed></svg>", &config()).unwrap_err();
        assert!(matches!(err, Svg2PdfError::DecodeFailed { .. }), "got {err:?}");
        let err = rasterize_svg("not an svg", &config()).unwrap_err();
        assert!(matches!(err, Svg2PdfError::DecodeFailed { .. }), "got {err:?}");
    }

    #[test]
    fn oversized_surface_is_unavailable() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="5000" height="10"/>"#;
        let cfg = ConversionConfig::builder()
            .load_system_fonts(false)
            .max_dimension(1000)
            .build()
            .unwrap();
        let err = rasterize_svg(svg, &cfg).unwrap_err();
        assert!(
            matches!(err, Svg2PdfError::SurfaceUnavailable { width: 5000, height: 10, .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn view_box_parsing() {
        assert_eq!(parse_view_box("0 0 10 20"), Some([0.0, 0.0, 10.0, 20.0]));
        assert_eq!(parse_view_box("0,0,10,20"), Some([0.0, 0.0, 10.0, 20.0]));
        assert_eq!(parse_view_box("0 0 0 20"), None);
        assert_eq!(parse_view_box("0 0 10"), None);
        assert_eq!(parse_view_box("a b c d"), None);
    }

    #[test]
    fn probe_reads_title_and_view_box() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 30 10">
            <title> Logo </title>
        </svg>"#;
        let src = SourceFile::new("logo.svg", svg.as_bytes().to_vec(), SVG_MIME);
        let meta = probe(&src, &config()).unwrap();
        assert_eq!((meta.width, meta.height), (30, 10));
        assert_eq!(meta.size_source, SizeSource::ViewBox);
        assert_eq!(meta.view_box, Some([0.0, 0.0, 30.0, 10.0]));
        assert_eq!(meta.title.as_deref(), Some("Logo"));
        assert_eq!(meta.source_bytes, svg.len());
    }

    #[test]
    fn doctype_header_is_accepted() {
        let svg = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100">
  <title>Exported</title>
  <rect width="200" height="100" fill="red"/>
</svg>"#;
        let bmp = rasterize_svg(svg, &config()).unwrap();
        assert_eq!((bmp.width(), bmp.height()), (200, 100));
        assert_eq!(bmp.size_source(), SizeSource::Explicit);

        let src = SourceFile::new("exported.svg", svg.as_bytes().to_vec(), SVG_MIME);
        let meta = probe(&src, &config()).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Exported"));
    }

    #[test]
    fn lone_width_keeps_declared_edge() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="200"/>"#;
        let bmp = rasterize_svg(svg, &config()).unwrap();
        assert_eq!((bmp.width(), bmp.height()), (200, 150));
        assert_eq!(bmp.size_source(), SizeSource::Fallback);

        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" height="40"/>"#;
        let bmp = rasterize_svg(svg, &config()).unwrap();
        assert_eq!((bmp.width(), bmp.height()), (300, 40));
    }

    #[tokio::test]
    async fn slow_decode_times_out() {
        let err = run_with_timeout(Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(300));
            rasterize_svg(RECT_200X100, &config())
        })
        .await
        .err()
        .unwrap();
        assert!(
            matches!(err, Svg2PdfError::DecodeTimeout { timeout } if timeout == Duration::from_millis(20)),
            "got {err:?}"
        );
        assert!(err.is_decode_failure());
    }

    #[tokio::test]
    async fn fast_decode_beats_timeout() {
        let bmp = run_with_timeout(Duration::from_secs(5), || rasterize_svg(RECT_200X100, &config()))
            .await
            .unwrap();
        assert_eq!(bmp.width(), 200);
    }

    #[tokio::test]
    async fn async_rasterize_matches_blocking() {
        let src = SourceFile::new("r.svg", RECT_200X100.as_bytes().to_vec(), SVG_MIME);
        let bmp = rasterize(&src, &config()).await.unwrap();
        assert_eq!((bmp.width(), bmp.height()), (200, 100));
    }
}
