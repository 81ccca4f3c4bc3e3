//! # edgequake-svg2pdf
//!
//! Convert a single SVG image into a one-page PDF.
//!
//! The SVG is rasterised at its intrinsic size, serialised as a lossless PNG
//! and placed on a PDF page of exactly the same dimensions (1 pt per pixel),
//! covering the page edge to edge. The resulting document is handed back as
//! bytes with the suggested filename `converted-svg.pdf`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! SVG file
//!  │
//!  ├─ 1. Intake     accept the first selected file if its type is image/svg+xml
//!  ├─ 2. Rasterize  data: URI → usvg tree → resvg pixmap (spawn_blocking + timeout)
//!  ├─ 3. Encode     pixmap → PNG
//!  ├─ 4. Assemble   PNG → one W×H page with a full-page image XObject
//!  └─ 5. Download   bytes + application/pdf + converted-svg.pdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_svg2pdf::{convert_file, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert_file("drawing.svg", &config).await?;
//!     let path = output.save_to_dir(".").await?;
//!     eprintln!("{}x{} pt → {}", output.stats.width, output.stats.height, path.display());
//!     Ok(())
//! }
//! ```
//!
//! For an interactive flow (select a file, then press "download"), use
//! [`Session`], which enforces the single-active-file rules.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `svg2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-svg2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{parse_color, CompressionLevel, ConversionConfig, ConversionConfigBuilder, DEFAULT_OUTPUT_FILENAME};
pub use convert::{convert, convert_bytes, convert_file, convert_sync, convert_to_file, inspect, inspect_source};
pub use error::Svg2PdfError;
pub use output::{ConversionOutput, ConversionStats, SizeSource, SvgMetadata, PDF_MIME};
pub use pipeline::intake::{Selection, SourceFile, SVG_MIME};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use session::{Session, SessionState};
