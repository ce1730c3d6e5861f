use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::Path;

use super::RenderError;

/// Serialize the canvas to PNG bytes.
pub fn encode_png(canvas: &RgbImage) -> Result<Vec<u8>, RenderError> {
    let mut buffer = Cursor::new(Vec::new());
    canvas.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Write an artifact, creating the parent directory when it does not exist yet.
pub async fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use testresult::TestResult;

    #[test]
    fn encodes_a_decodable_png() -> TestResult {
        let canvas = RgbImage::from_pixel(40, 20, Rgb([1, 2, 3]));
        let png = encode_png(&canvas)?;

        assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)?;
        assert_eq!((decoded.width(), decoded.height()), (40, 20));
        Ok(())
    }

    #[tokio::test]
    async fn creates_missing_output_directory() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("uploads").join("cert-x.png");

        write_artifact(&path, b"payload").await?;

        assert_eq!(std::fs::read(&path)?, b"payload");
        Ok(())
    }
}
