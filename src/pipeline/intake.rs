//! File intake: accept a selected file and validate its declared type.
//!
//! Validation is by declared MIME type only; the content is not sniffed here.
//! Files opened from disk carry no declared type, so one is derived from the
//! file extension, the same way a browser file picker labels a selection.

use crate::error::Svg2PdfError;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The only accepted MIME type.
pub const SVG_MIME: &str = "image/svg+xml";

/// A user-selected file: name, raw content and declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    content: Vec<u8>,
    mime_type: String,
}

impl SourceFile {
    /// Create a file with an explicitly declared MIME type.
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Create a file whose MIME type is derived from `name`'s extension.
    pub fn from_bytes(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        let mime_type = mime_from_extension(Path::new(&name)).to_string();
        Self {
            name,
            content: content.into(),
            mime_type,
        }
    }

    /// Read a file from disk; the declared type comes from its extension.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Svg2PdfError> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await.map_err(|e| read_error(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        debug!("Read {} ({} bytes)", path.display(), content.len());
        Ok(Self {
            mime_type: mime_from_extension(path).to_string(),
            name,
            content,
        })
    }

    /// Replace the declared MIME type.
    pub fn with_mime(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn is_svg(&self) -> bool {
        is_svg_mime(&self.mime_type)
    }

    /// The content as UTF-8 text.
    pub fn text(&self) -> Result<&str, Svg2PdfError> {
        std::str::from_utf8(&self.content).map_err(|e| Svg2PdfError::DecodeFailed {
            detail: format!("'{}' is not valid UTF-8: {}", self.name, e),
        })
    }
}

/// Outcome of a selection that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Nothing was selected; state unchanged.
    Empty,
    /// The first file was accepted and is now active.
    Accepted,
}

/// Handle a file-selection event.
///
/// Only the first file is considered. On an invalid type `active` keeps its
/// previous value and [`Svg2PdfError::InvalidFileType`] is returned.
pub fn accept_selection<I>(files: I, active: &mut Option<SourceFile>) -> Result<Selection, Svg2PdfError>
where
    I: IntoIterator<Item = SourceFile>,
{
    let Some(file) = files.into_iter().next() else {
        debug!("Empty selection, keeping current file");
        return Ok(Selection::Empty);
    };

    validate(&file)?;
    info!("Selected SVG: {} ({} bytes)", file.name, file.content.len());
    *active = Some(file);
    Ok(Selection::Accepted)
}

/// Check the declared type is exactly `image/svg+xml`.
pub fn validate(file: &SourceFile) -> Result<(), Svg2PdfError> {
    if file.is_svg() {
        Ok(())
    } else {
        warn!("Rejected '{}': declared type '{}'", file.name, file.mime_type);
        Err(Svg2PdfError::InvalidFileType {
            mime: file.mime_type.clone(),
        })
    }
}

/// Compare a declared type against [`SVG_MIME`].
///
/// Case-insensitive; parameters after `;` are ignored.
pub fn is_svg_mime(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or("").trim();
    essence.eq_ignore_ascii_case(SVG_MIME)
}

/// Map a file extension to the MIME type a file picker would declare.
pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "svg" => SVG_MIME,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        _ => "application/octet-stream",
    }
}

fn read_error(path: &Path, e: std::io::Error) -> Svg2PdfError {
    let path = PathBuf::from(path);
    match e.kind() {
        std::io::ErrorKind::NotFound => Svg2PdfError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => Svg2PdfError::PermissionDenied { path },
        _ => Svg2PdfError::ReadFailed { path, source: e },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svg(name: &str) -> SourceFile {
        SourceFile::new(name, b"<svg/>".to_vec(), SVG_MIME)
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_from_extension(Path::new("a.svg")), SVG_MIME);
        assert_eq!(mime_from_extension(Path::new("A.SVG")), SVG_MIME);
        assert_eq!(mime_from_extension(Path::new("a.png")), "image/png");
        assert_eq!(mime_from_extension(Path::new("noext")), "application/octet-stream");
        assert_eq!(mime_from_extension(Path::new("a.svgz")), "application/octet-stream");
    }

    #[test]
    fn test_is_svg_mime() {
        assert!(is_svg_mime("image/svg+xml"));
        assert!(is_svg_mime("IMAGE/SVG+XML"));
        assert!(is_svg_mime("image/svg+xml; charset=utf-8"));
        assert!(!is_svg_mime("image/svg"));
        assert!(!is_svg_mime("image/png"));
        assert!(!is_svg_mime(""));
    }

    #[test]
    fn test_empty_selection_keeps_state() {
        let mut active = Some(svg("keep.svg"));
        let r = accept_selection(Vec::new(), &mut active).unwrap();
        assert_eq!(r, Selection::Empty);
        assert_eq!(active.unwrap().name(), "keep.svg");
    }

    #[test]
    fn test_invalid_selection_keeps_previous_file() {
        let mut active = Some(svg("first.svg"));
        let png = SourceFile::new("photo.png", vec![0x89, b'P'], "image/png");
        let err = accept_selection(vec![png], &mut active).unwrap_err();
        assert!(matches!(err, Svg2PdfError::InvalidFileType { ref mime } if mime == "image/png"));
        assert_eq!(active.unwrap().name(), "first.svg");
    }

    #[test]
    fn test_first_invalid_selection_leaves_unset() {
        let mut active = None;
        let txt = SourceFile::from_bytes("notes.txt", b"hello".to_vec());
        assert!(accept_selection(vec![txt], &mut active).is_err());
        assert!(active.is_none());
    }

    #[test]
    fn test_only_first_file_is_considered() {
        let mut active = None;
        let files = vec![svg("one.svg"), svg("two.svg")];
        accept_selection(files, &mut active).unwrap();
        assert_eq!(active.unwrap().name(), "one.svg");
    }

    #[test]
    fn test_valid_selection_replaces_previous() {
        let mut active = Some(svg("old.svg"));
        accept_selection(vec![svg("new.svg")], &mut active).unwrap();
        assert_eq!(active.unwrap().name(), "new.svg");
    }

    #[test]
    fn test_declared_type_wins_over_content() {
        // PNG bytes declared as SVG are accepted: validation is type-only.
        let mut active = None;
        let f = SourceFile::new("x.png", vec![0x89, b'P', b'N', b'G'], SVG_MIME);
        assert_eq!(accept_selection(vec![f], &mut active).unwrap(), Selection::Accepted);
    }

    #[test]
    fn test_text_rejects_invalid_utf8() {
        let f = SourceFile::new("bad.svg", vec![0xff, 0xfe, 0x00], SVG_MIME);
        assert!(matches!(f.text(), Err(Svg2PdfError::DecodeFailed { .. })));
    }

    #[test]
    fn test_open_missing_file() {
        let r = tokio_test::block_on(SourceFile::open("/definitely/not/here.svg"));
        assert!(matches!(r, Err(Svg2PdfError::FileNotFound { .. })));
    }

    #[tokio::test]
    async fn test_open_sniffs_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.svg");
        std::fs::write(&path, "<svg/>").unwrap();
        let f = SourceFile::open(&path).await.unwrap();
        assert_eq!(f.name(), "logo.svg");
        assert_eq!(f.mime_type(), SVG_MIME);
        assert_eq!(f.content(), b"<svg/>");
    }
}
