use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::pdf::wrap_png;
use crate::render::{
    draw_certificate, encode_png, write_artifact, CertificateDetails, RenderError, RendererConfig,
};
use crate::storage::ArtifactName;

/// Paths of a rendered PNG/PDF pair.
#[derive(Debug, Clone)]
pub struct GeneratedCertificate {
    pub png_path: PathBuf,
    pub pdf_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CertificatePipeline {
    fonts: Arc<RendererConfig>,
    output_dir: PathBuf,
}

impl CertificatePipeline {
    pub fn new(fonts: Arc<RendererConfig>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            fonts,
            output_dir: output_dir.into(),
        }
    }

    /// Render the layout, export PNG, wrap it as PDF and write both files.
    ///
    /// Returns only after both files are fully written.
    pub async fn generate(
        &self,
        details: CertificateDetails,
        name: &ArtifactName,
    ) -> Result<GeneratedCertificate, RenderError> {
        let png_path = name.png_path(&self.output_dir);
        let pdf_path = name.pdf_path(&self.output_dir);

        let fonts = self.fonts.clone();
        let (png, pdf) = tokio::task::spawn_blocking(move || {
            let canvas = draw_certificate(&fonts, &details);
            let png = encode_png(&canvas)?;
            let pdf = wrap_png(&png, &fonts)?;
            Ok::<_, RenderError>((png, pdf))
        })
        .await??;

        write_artifact(&png_path, &png).await?;
        write_artifact(&pdf_path, &pdf).await?;
        debug!(
            "Wrote {} ({} bytes) and {} ({} bytes)",
            png_path.display(),
            png.len(),
            pdf_path.display(),
            pdf.len()
        );

        Ok(GeneratedCertificate { png_path, pdf_path })
    }
}
