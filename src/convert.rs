//! Conversion entry points.
//!
//! [`convert`] runs the three post-intake stages on one [`SourceFile`] and
//! returns the finished document as a value. The `convert_*` helpers cover
//! the common ways of getting a source file in and a PDF out.

use crate::config::ConversionConfig;
use crate::error::Svg2PdfError;
use crate::output::{ConversionOutput, ConversionStats, SvgMetadata};
use crate::pipeline::intake::{self, SourceFile};
use crate::pipeline::{assemble, download, encode, rasterize};
use crate::progress::Stage;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Convert an SVG source file to a single-page PDF.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// - [`Svg2PdfError::InvalidFileType`] if the declared type is not SVG
/// - [`Svg2PdfError::DecodeFailed`] / [`Svg2PdfError::DecodeTimeout`] for bad content
/// - [`Svg2PdfError::SurfaceUnavailable`] if no surface of the intrinsic size can be made
/// - [`Svg2PdfError::EncodeFailed`] / [`Svg2PdfError::PdfAssemblyFailed`] if the document cannot be built
pub async fn convert(
    source: &SourceFile,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Svg2PdfError> {
    intake::validate(source)?;
    info!("Starting conversion: {}", source.name());

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(source.name());
    }

    match run_pipeline(source, config).await {
        Ok(output) => {
            info!(
                "Conversion complete: {}x{} pt, {} bytes, {}ms total",
                output.stats.width,
                output.stats.height,
                output.stats.pdf_bytes,
                output.stats.total_duration_ms
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_conversion_complete(output.pdf.len());
            }
            Ok(output)
        }
        Err(e) => {
            warn!("Conversion of '{}' failed: {}", source.name(), e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_conversion_error(&e.to_string());
            }
            Err(e)
        }
    }
}

/// Read an SVG from disk and convert it.
pub async fn convert_file(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Svg2PdfError> {
    let source = SourceFile::open(path).await?;
    convert(&source, config).await
}

/// Convert in-memory SVG bytes with an explicitly declared MIME type.
pub async fn convert_bytes(
    name: &str,
    bytes: &[u8],
    mime_type: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Svg2PdfError> {
    let source = SourceFile::new(name, bytes.to_vec(), mime_type);
    convert(&source, config).await
}

/// Convert an SVG and write the PDF to `output_path` atomically.
pub async fn convert_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<(PathBuf, ConversionStats), Svg2PdfError> {
    let output = convert_file(path, config).await?;
    let saved = output.save_as(output_path).await?;
    Ok((saved, output.stats))
}

/// Synchronous wrapper around [`convert_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Svg2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Svg2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_file(path, config))
}

/// Report an SVG's intrinsic size, viewBox and title without converting.
pub async fn inspect(path: impl AsRef<Path>) -> Result<SvgMetadata, Svg2PdfError> {
    let source = SourceFile::open(path).await?;
    inspect_source(&source, &ConversionConfig::default())
}

/// Like [`inspect`] for an already loaded file.
pub fn inspect_source(source: &SourceFile, config: &ConversionConfig) -> Result<SvgMetadata, Svg2PdfError> {
    intake::validate(source)?;
    rasterize::probe(source, config)
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_pipeline(
    source: &SourceFile,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Svg2PdfError> {
    let total_start = Instant::now();

    // ── Step 1: Rasterise ────────────────────────────────────────────────
    let started = stage_start(config, Stage::Rasterize);
    let bitmap = rasterize::rasterize(source, config).await?;
    let rasterize_duration_ms = stage_complete(config, Stage::Rasterize, started);

    // ── Step 2: Encode PNG ───────────────────────────────────────────────
    let started = stage_start(config, Stage::Encode);
    let png = encode::encode_png(&bitmap)?;
    let encode_duration_ms = stage_complete(config, Stage::Encode, started);
    let size_source = bitmap.size_source();
    drop(bitmap);

    // ── Step 3: Assemble PDF ─────────────────────────────────────────────
    let started = stage_start(config, Stage::Assemble);
    let png_bytes = png.len();
    let compression = config.compression;
    let pdf = tokio::task::spawn_blocking(move || assemble::assemble_pdf(&png, compression))
        .await
        .map_err(|e| Svg2PdfError::Internal(format!("Assemble task panicked: {}", e)))??;
    let assemble_duration_ms = stage_complete(config, Stage::Assemble, started);

    // ── Step 4: Hand off ─────────────────────────────────────────────────
    let stats = ConversionStats {
        width: pdf.width,
        height: pdf.height,
        size_source,
        has_transparency: pdf.has_transparency,
        png_bytes,
        pdf_bytes: pdf.bytes.len(),
        rasterize_duration_ms,
        encode_duration_ms,
        assemble_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    Ok(download::prepare(pdf.bytes, &config.output_filename, stats))
}

fn stage_start(config: &ConversionConfig, stage: Stage) -> Instant {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
    Instant::now()
}

fn stage_complete(config: &ConversionConfig, stage: Stage, started: Instant) -> u64 {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage, elapsed_ms);
    }
    elapsed_ms
}
