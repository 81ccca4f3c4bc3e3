//! Interactive conversion session.
//!
//! A [`Session`] owns the single active [`SourceFile`] and tracks where the
//! user is in the flow:
//!
//! ```text
//! Idle ──select(svg)──▶ FileSelected ──convert──▶ Converting ──ok──▶ Downloaded
//!  ▲  select(other)         ▲    ▲                    │                 │
//!  └──── stays ─────┘       │    └──── other error ───┘                 │
//!  ▲                        └───────────── select(svg) ─────────────────┘
//!  └───────── decode failure / timeout (active file dropped) ───────────
//! ```
//!
//! Both `select_file` and `convert` take `&mut self`, so a session cannot run
//! two conversions at once or swap its file mid-conversion.

use crate::config::ConversionConfig;
use crate::convert;
use crate::error::Svg2PdfError;
use crate::output::ConversionOutput;
use crate::pipeline::intake::{self, Selection, SourceFile};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    FileSelected,
    Converting,
    Downloaded,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::FileSelected => write!(f, "file-selected"),
            SessionState::Converting => write!(f, "converting"),
            SessionState::Downloaded => write!(f, "downloaded"),
        }
    }
}

/// One user's conversion session.
#[derive(Debug)]
pub struct Session {
    config: ConversionConfig,
    active: Option<SourceFile>,
    state: SessionState,
}

impl Session {
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            config,
            active: None,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn active_file(&self) -> Option<&SourceFile> {
        self.active.as_ref()
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Whether a conversion may be requested (the "download" button).
    pub fn can_convert(&self) -> bool {
        self.active.is_some()
    }

    /// Handle a file-selection event; only the first file counts.
    ///
    /// An invalid type returns [`Svg2PdfError::InvalidFileType`] and leaves
    /// both the active file and the state untouched.
    pub fn select_file<I>(&mut self, files: I) -> Result<Selection, Svg2PdfError>
    where
        I: IntoIterator<Item = SourceFile>,
    {
        let selection = intake::accept_selection(files, &mut self.active)?;
        if selection == Selection::Accepted {
            self.transition(SessionState::FileSelected);
        }
        Ok(selection)
    }

    /// Convert the active file.
    ///
    /// On a decode failure the active file is dropped and the session
    /// returns to `Idle`; on any other failure it stays selected.
    pub async fn convert(&mut self) -> Result<ConversionOutput, Svg2PdfError> {
        if self.active.is_none() {
            return Err(Svg2PdfError::NoActiveFile);
        }
        self.transition(SessionState::Converting);

        let result = match self.active.as_ref() {
            Some(source) => convert::convert(source, &self.config).await,
            None => Err(Svg2PdfError::NoActiveFile),
        };

        match result {
            Ok(output) => {
                self.transition(SessionState::Downloaded);
                Ok(output)
            }
            Err(e) if e.is_decode_failure() => {
                info!("Dropping undecodable file");
                self.active = None;
                self.transition(SessionState::Idle);
                Err(e)
            }
            Err(e) => {
                self.transition(SessionState::FileSelected);
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!("Session state {} → {}", self.state, next);
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::intake::SVG_MIME;
    use std::time::Duration;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10"/>"#;

    /// A large blurred surface; rendering takes far longer than a millisecond.
    const HEAVY_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="3000" height="3000">
        <filter id="b"><feGaussianBlur stdDeviation="60"/></filter>
        <g filter="url(#b)"><rect width="3000" height="3000" fill="navy"/><circle cx="1500" cy="1500" r="900" fill="gold"/></g>
    </svg>"#;

    fn session() -> Session {
        Session::new(
            ConversionConfig::builder()
                .load_system_fonts(false)
                .build()
                .unwrap(),
        )
    }

    fn svg_file(name: &str, body: &str) -> SourceFile {
        SourceFile::new(name, body.as_bytes().to_vec(), SVG_MIME)
    }

    #[test]
    fn starts_idle_and_cannot_convert() {
        let s = session();
        assert_eq!(s.state(), SessionState::Idle);
        assert!(!s.can_convert());
    }

    #[test]
    fn invalid_first_selection_stays_idle() {
        let mut s = session();
        let png = SourceFile::from_bytes("a.png", vec![1, 2, 3]);
        assert!(s.select_file(vec![png]).is_err());
        assert_eq!(s.state(), SessionState::Idle);
        assert!(!s.can_convert());
    }

    #[test]
    fn invalid_selection_keeps_selected_file() {
        let mut s = session();
        s.select_file(vec![svg_file("a.svg", SVG)]).unwrap();
        let png = SourceFile::from_bytes("b.png", vec![1]);
        assert!(s.select_file(vec![png]).is_err());
        assert_eq!(s.state(), SessionState::FileSelected);
        assert_eq!(s.active_file().unwrap().name(), "a.svg");
    }

    #[tokio::test]
    async fn convert_without_file_is_rejected() {
        let mut s = session();
        let err = s.convert().await.unwrap_err();
        assert!(matches!(err, Svg2PdfError::NoActiveFile));
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn successful_conversion_reaches_downloaded() {
        let mut s = session();
        s.select_file(vec![svg_file("a.svg", SVG)]).unwrap();
        let out = s.convert().await.unwrap();
        assert_eq!(out.filename, "converted-svg.pdf");
        assert_eq!(s.state(), SessionState::Downloaded);
        assert!(s.can_convert(), "file stays selected after download");

        s.select_file(vec![svg_file("b.svg", SVG)]).unwrap();
        assert_eq!(s.state(), SessionState::FileSelected);
    }

    #[tokio::test]
    async fn decode_failure_resets_to_idle() {
        let mut s = session();
        s.select_file(vec![svg_file("broken.svg", "<svg><g></svg>")]).unwrap();
        let err = s.convert().await.unwrap_err();
        assert!(err.is_decode_failure());
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.active_file().is_none());
    }

    #[tokio::test]
    async fn decode_timeout_resets_to_idle() {
        let mut s = Session::new(
            ConversionConfig::builder()
                .load_system_fonts(false)
                .decode_timeout(Duration::from_millis(1))
                .build()
                .unwrap(),
        );
        s.select_file(vec![svg_file("heavy.svg", HEAVY_SVG)]).unwrap();
        let err = s.convert().await.unwrap_err();
        assert!(matches!(err, Svg2PdfError::DecodeTimeout { .. }), "got {err:?}");
        assert_eq!(s.state(), SessionState::Idle);
        assert!(!s.can_convert());
    }

    #[tokio::test]
    async fn converting_again_after_download() {
        let mut s = session();
        s.select_file(vec![svg_file("a.svg", SVG)]).unwrap();
        let first = s.convert().await.unwrap();
        assert_eq!(s.state(), SessionState::Downloaded);
        let second = s.convert().await.unwrap();
        assert_eq!(s.state(), SessionState::Downloaded);
        assert_eq!(first.pdf, second.pdf);
    }

    #[tokio::test]
    async fn surface_failure_keeps_file_selected() {
        let mut s = Session::new(
            ConversionConfig::builder()
                .load_system_fonts(false)
                .max_dimension(10)
                .default_size(10, 10)
                .build()
                .unwrap(),
        );
        s.select_file(vec![svg_file("big.svg", SVG)]).unwrap();
        let err = s.convert().await.unwrap_err();
        assert!(matches!(err, Svg2PdfError::SurfaceUnavailable { .. }));
        assert_eq!(s.state(), SessionState::FileSelected);
        assert!(s.can_convert());
    }
}
