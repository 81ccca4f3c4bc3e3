//! Pipeline stages for SVG-to-PDF conversion.
//!
//! Each submodule implements exactly one step.
//!
//! ## Data Flow
//!
//! ```text
//! intake ──▶ rasterize ──▶ encode ──▶ assemble ──▶ download
//! (MIME)     (resvg)       (PNG)      (pdf-writer)  (bytes + filename)
//! ```
//!
//! 1. [`intake`]: accept the selected file if its declared type is SVG
//! 2. [`rasterize`]: decode the SVG and draw it on a pixmap at intrinsic size;
//!    runs in `spawn_blocking` under a timeout
//! 3. [`encode`]: `data:` URIs and lossless PNG serialisation
//! 4. [`assemble`]: one page, W×H points, image covering the page
//! 5. [`download`]: wrap the bytes with MIME + filename, atomic save

pub mod assemble;
pub mod download;
pub mod encode;
pub mod intake;
pub mod rasterize;
