//! Download hand-off: wrap finished PDF bytes and save them.
//!
//! The pipeline itself only produces a [`ConversionOutput`] value. Saving is a
//! separate step so callers decide where the bytes go. Files are written to a
//! temporary path in the destination directory and renamed into place; if
//! anything fails the temporary file is removed when it is dropped.

use crate::error::Svg2PdfError;
use crate::output::{ConversionOutput, ConversionStats, PDF_MIME};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Wrap PDF bytes with their MIME type and suggested filename.
pub fn prepare(pdf: Vec<u8>, filename: &str, stats: ConversionStats) -> ConversionOutput {
    ConversionOutput {
        pdf,
        filename: filename.to_string(),
        mime_type: PDF_MIME.to_string(),
        stats,
    }
}

impl ConversionOutput {
    /// Save into `dir` under the suggested filename.
    pub async fn save_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, Svg2PdfError> {
        let path = dir.as_ref().join(&self.filename);
        self.save_as(path).await
    }

    /// Save to an explicit path, replacing any existing file atomically.
    pub async fn save_as(&self, path: impl AsRef<Path>) -> Result<PathBuf, Svg2PdfError> {
        let path = path.as_ref().to_path_buf();
        let bytes = self.pdf.clone();

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&target, &bytes))
            .await
            .map_err(|e| Svg2PdfError::Internal(format!("Save task panicked: {}", e)))??;

        info!("Saved {} bytes → {}", self.pdf.len(), path.display());
        Ok(path)
    }

    /// Write the PDF bytes to any writer (e.g. stdout).
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writer.write_all(&self.pdf)?;
        writer.flush()
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Svg2PdfError> {
    let write_failed = |source: std::io::Error| Svg2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(write_failed)?;

    let mut tmp = NamedTempFile::new_in(&parent).map_err(write_failed)?;
    debug!("Writing via temp file {}", tmp.path().display());
    tmp.write_all(bytes).map_err(write_failed)?;
    tmp.as_file().sync_all().map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;
    Ok(())
}
