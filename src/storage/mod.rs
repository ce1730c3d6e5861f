use chrono::Utc;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const VIDEO_DIR: &str = "videos";
pub const MAX_VIDEO_BYTES: usize = 100 * 1024 * 1024;
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv"];

/// Where a rendered certificate lands on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactName {
    /// Durable artifacts keyed by the certificate's unique id.
    Issued(String),
    /// Ephemeral preview keyed by creation time in milliseconds plus the
    /// preview id, so concurrent previews never share a file.
    Preview { stamp: i64, id: String },
}

impl ArtifactName {
    pub fn preview_now(preview_id: &str) -> Self {
        Self::Preview {
            stamp: Utc::now().timestamp_millis(),
            id: preview_id.to_string(),
        }
    }

    pub fn stem(&self) -> String {
        match self {
            Self::Issued(unique_id) => format!("cert-{unique_id}"),
            Self::Preview { stamp, id } => format!("preview-{stamp}-{id}"),
        }
    }

    pub fn png_path(&self, upload_folder: &Path) -> PathBuf {
        upload_folder.join(format!("{}.png", self.stem()))
    }

    pub fn pdf_path(&self, upload_folder: &Path) -> PathBuf {
        upload_folder.join(format!("{}.pdf", self.stem()))
    }
}

pub fn ensure_dirs(upload_folder: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(upload_folder)?;
    std::fs::create_dir_all(upload_folder.join(VIDEO_DIR))?;
    Ok(())
}

/// File name component of a stored path, for building public URLs.
pub fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}

pub fn is_allowed_video(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

/// `<millis>-<original name>` with whitespace runs collapsed to `_` and any
/// directory components dropped.
pub fn video_file_name(original: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex"));

    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original);
    format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        whitespace.replace_all(base, "_")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_paths_share_a_stem() {
        let dir = Path::new("/srv/uploads");
        let issued = ArtifactName::Issued("abc".to_string());

        assert_eq!(issued.png_path(dir), Path::new("/srv/uploads/cert-abc.png"));
        assert_eq!(issued.pdf_path(dir), Path::new("/srv/uploads/cert-abc.pdf"));
        let preview = ArtifactName::Preview {
            stamp: 1700000000000,
            id: "p1".to_string(),
        };
        assert_eq!(
            preview.png_path(dir),
            Path::new("/srv/uploads/preview-1700000000000-p1.png")
        );
    }

    #[test]
    fn only_video_extensions_are_allowed() {
        assert!(is_allowed_video("lecture.mp4"));
        assert!(is_allowed_video("Lecture One.MOV"));
        assert!(is_allowed_video("clip.mkv"));
        assert!(!is_allowed_video("notes.pdf"));
        assert!(!is_allowed_video("mp4"));
    }

    #[test]
    fn video_names_are_sanitized() {
        let name = video_file_name("../My  First\tLecture.mp4");

        let (stamp, rest) = name.split_once('-').expect("stamp prefix");
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(rest, "My_First_Lecture.mp4");
    }

    #[test]
    fn file_name_strips_directories() {
        assert_eq!(file_name("/srv/uploads/cert-abc.png"), "cert-abc.png");
        assert_eq!(file_name("cert-abc.pdf"), "cert-abc.pdf");
    }
}
