//! Error types for the edgequake-svg2pdf library.
//!
//! Every stage of the pipeline returns [`Svg2PdfError`]. The variants are
//! grouped by the stage that raises them so a caller can tell at a glance
//! whether the input was rejected (intake), the image could not be drawn
//! (rasteriser), or the document could not be built or saved.
//!
//! Only [`Svg2PdfError::InvalidFileType`] is raised before any work starts;
//! it leaves the active file of a [`crate::session::Session`] untouched.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// All errors returned by the edgequake-svg2pdf library.
#[derive(Debug, Error)]
pub enum Svg2PdfError {
    // ── Intake errors ─────────────────────────────────────────────────────
    /// The selected file does not declare the SVG MIME type.
    #[error("Please upload a valid SVG file (got type '{mime}', expected 'image/svg+xml').")]
    InvalidFileType { mime: String },

    /// A conversion was requested while no SVG file is selected.
    #[error("No SVG file selected.\nSelect an .svg file before converting.")]
    NoActiveFile,

    /// Input file was not found at the given path.
    #[error("SVG file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Rasteriser errors ─────────────────────────────────────────────────
    /// The SVG text could not be decoded into a render tree.
    #[error("Failed to decode SVG: {detail}")]
    DecodeFailed { detail: String },

    /// Decoding did not finish within the configured timeout.
    #[error("SVG decode timed out after {timeout:?}\nIncrease --decode-timeout.")]
    DecodeTimeout { timeout: Duration },

    /// An offscreen surface of the requested size could not be allocated.
    #[error("Drawing surface unavailable for {width}x{height} px: {reason}")]
    SurfaceUnavailable {
        width: u32,
        height: u32,
        reason: String,
    },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// The bitmap could not be serialised as PNG (or read back).
    #[error("PNG encoding failed: {detail}")]
    EncodeFailed { detail: String },

    /// The PDF document could not be constructed.
    #[error("PDF assembly failed: {detail}")]
    PdfAssemblyFailed { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Svg2PdfError {
    /// True for failures caused by the SVG content itself.
    ///
    /// A session drops its active file on these, since converting the same
    /// content again cannot succeed.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            Svg2PdfError::DecodeFailed { .. } | Svg2PdfError::DecodeTimeout { .. }
        )
    }
}
