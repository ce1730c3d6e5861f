//! Certificate rendering: fixed-layout raster canvas and PNG export.
//!
//! Fonts are loaded once into a [`RendererConfig`] at startup and shared by
//! reference with every render call.

mod layout;
mod raster;

pub use layout::{draw_certificate, CANVAS_HEIGHT, CANVAS_WIDTH};
pub use raster::{encode_png, write_artifact};

use ab_glyph::FontArc;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DISPLAY_FONT_FILE: &str = "PlayfairDisplay-Bold.ttf";
const BODY_FONT_FILE: &str = "OpenSans-Regular.ttf";
const ITALIC_FONT_FILE: &str = "OpenSans-Italic.ttf";

// Checked when the bundled faces are missing from the font directory.
const SYSTEM_FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/TTF",
    "/System/Library/Fonts/Supplemental",
    "/Library/Fonts",
];

// (body, display, italic); the italic face is optional
const SYSTEM_FONT_SETS: &[(&str, &str, &str)] = &[
    ("LiberationSans-Regular.ttf", "LiberationSans-Bold.ttf", "LiberationSans-Italic.ttf"),
    ("DejaVuSans.ttf", "DejaVuSans-Bold.ttf", "DejaVuSans-Oblique.ttf"),
    ("Arial.ttf", "Arial Bold.ttf", "Arial Italic.ttf"),
];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no usable fonts found; install fonts-liberation or set FONT_DIR")]
    FontsUnavailable,

    #[error("invalid font file {0}")]
    InvalidFont(PathBuf),

    #[error("png encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("pdf rendering failed: {0}")]
    Pdf(String),

    #[error("artifact write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("render task aborted: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Content drawn onto a certificate.
#[derive(Debug, Clone)]
pub struct CertificateDetails {
    pub student_name: String,
    pub course_name: String,
    pub issue_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub unique_id: String,
}

/// Font faces used by the layout renderer and the PDF wrapper.
#[derive(Clone)]
pub struct RendererConfig {
    display: FontArc,
    body: FontArc,
    italic: FontArc,
    body_data: Vec<u8>,
}

impl std::fmt::Debug for RendererConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererConfig")
            .field("body_font_bytes", &self.body_data.len())
            .finish_non_exhaustive()
    }
}

impl RendererConfig {
    /// Load the bundled faces from `font_dir`, falling back to a system sans family.
    pub fn load(font_dir: &Path) -> Result<Self, RenderError> {
        let display = font_dir.join(DISPLAY_FONT_FILE);
        let body = font_dir.join(BODY_FONT_FILE);
        if display.is_file() && body.is_file() {
            tracing::info!("Loading certificate fonts from {}", font_dir.display());
            return Self::from_files(&display, &body, &font_dir.join(ITALIC_FONT_FILE));
        }

        let (display, body, italic) = SYSTEM_FONT_DIRS
            .iter()
            .map(Path::new)
            .filter(|dir| dir.exists())
            .find_map(|dir| {
                SYSTEM_FONT_SETS.iter().find_map(|(body, display, italic)| {
                    let body = dir.join(body);
                    let display = dir.join(display);
                    (body.is_file() && display.is_file()).then(|| (display, body, dir.join(italic)))
                })
            })
            .ok_or(RenderError::FontsUnavailable)?;

        tracing::warn!(
            "Bundled fonts not found in {}, using {}",
            font_dir.display(),
            body.display()
        );
        Self::from_files(&display, &body, &italic)
    }

    /// Load using the default `assets/fonts` directory.
    pub fn discover() -> Result<Self, RenderError> {
        Self::load(Path::new("assets/fonts"))
    }

    fn from_files(
        display_path: &Path,
        body_path: &Path,
        italic_path: &Path,
    ) -> Result<Self, RenderError> {
        let display_data = std::fs::read(display_path)?;
        let body_data = std::fs::read(body_path)?;

        let display = FontArc::try_from_vec(display_data)
            .map_err(|_| RenderError::InvalidFont(display_path.to_path_buf()))?;
        let body = FontArc::try_from_vec(body_data.clone())
            .map_err(|_| RenderError::InvalidFont(body_path.to_path_buf()))?;

        let italic = if italic_path.is_file() {
            FontArc::try_from_vec(std::fs::read(italic_path)?)
                .map_err(|_| RenderError::InvalidFont(italic_path.to_path_buf()))?
        } else {
            tracing::warn!("No italic face at {}, using the body face", italic_path.display());
            body.clone()
        };

        Ok(Self {
            display,
            body,
            italic,
            body_data,
        })
    }

    pub(crate) fn display(&self) -> &FontArc {
        &self.display
    }

    pub(crate) fn body(&self) -> &FontArc {
        &self.body
    }

    pub(crate) fn italic(&self) -> &FontArc {
        &self.italic
    }

    /// Raw body face, used as the PDF document font.
    pub(crate) fn body_font_data(&self) -> &[u8] {
        &self.body_data
    }
}
