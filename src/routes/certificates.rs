use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;

use crate::auth::{AdminUser, AuthError};
use crate::certificates::CertificateForm;
use crate::config::Config;
use crate::db::Certificate;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage;

/// Certificate as returned to admins and students.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateView {
    pub id: i32,
    pub student_email: String,
    pub student_name: String,
    pub course_name: String,
    pub issue_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub unique_id: String,
    pub hash: String,
    pub png_url: Option<String>,
    pub pdf_url: Option<String>,
    pub verified: bool,
}

impl CertificateView {
    pub fn new(certificate: Certificate, config: &Config) -> Self {
        let url = |link: &Option<String>| {
            link.as_deref()
                .map(|path| config.upload_url(storage::file_name(path)))
        };
        Self {
            png_url: url(&certificate.image_link),
            pdf_url: url(&certificate.pdf_link),
            id: certificate.id,
            student_email: certificate.student_email,
            student_name: certificate.student_name,
            course_name: certificate.course_name,
            issue_date: certificate.issue_date,
            expiry_date: certificate.expiry_date,
            unique_id: certificate.unique_id,
            hash: certificate.hash,
            verified: certificate.verified,
        }
    }
}

pub(crate) fn views(certificates: Vec<Certificate>, config: &Config) -> Vec<CertificateView> {
    certificates
        .into_iter()
        .map(|c| CertificateView::new(c, config))
        .collect()
}

pub async fn preview(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    payload: Result<Json<CertificateForm>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(form) = payload?;
    let preview = state.certificates.preview(&form).await?;

    let png_url = state
        .config
        .upload_url(storage::file_name(&preview.png_path.to_string_lossy()));
    let pdf_url = state
        .config
        .upload_url(storage::file_name(&preview.pdf_path.to_string_lossy()));

    Ok(Json(json!({
        "success": true,
        "previewLink": format!("{}?token={}", png_url, preview.token),
        "pdfPreview": pdf_url,
        "previewId": preview.preview_id,
    })))
}

pub async fn issue(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    payload: Result<Json<CertificateForm>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(form) = payload?;
    let certificate = state.certificates.issue(admin.id, &form).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Certificate generated and emailed successfully",
            "certificate": CertificateView::new(certificate, &state.config),
        })),
    ))
}

pub async fn list_mine(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let certificates = state.certificates.list_by_issuer(admin.id).await?;
    Ok(Json(json!({
        "success": true,
        "count": certificates.len(),
        "certificates": views(certificates, &state.config),
    })))
}

pub async fn list_all(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    admin.require_super_admin()?;
    let certificates = state.certificates.list_all().await?;
    Ok(Json(json!({
        "success": true,
        "count": certificates.len(),
        "certificates": views(certificates, &state.config),
    })))
}

/// Zip of the certificate's PNG and PDF.
pub async fn bundle(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(unique_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let certificate = state.certificates.lookup(&unique_id).await?;
    if !admin.is_super_admin && certificate.issuer_admin_id != admin.id {
        return Err(AuthError::Forbidden.into());
    }

    let mut files = Vec::new();
    for link in [&certificate.image_link, &certificate.pdf_link].into_iter().flatten() {
        match tokio::fs::read(link).await {
            Ok(content) => files.push((storage::file_name(link).to_string(), content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Artifact {} missing for certificate {}", link, unique_id);
            }
            Err(e) => return Err(AppError::internal(e)),
        }
    }
    if files.is_empty() {
        return Err(AppError::NotFound("Certificate file"));
    }

    let mut zip_data = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut zip_data));
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
        for (name, content) in &files {
            zip.start_file(name.as_str(), options)
                .map_err(AppError::internal)?;
            zip.write_all(content).map_err(AppError::internal)?;
        }
        zip.finish().map_err(AppError::internal)?;
    }

    let download_name = format!(
        "{}_{}_Certificate.zip",
        certificate.student_name.replace(' ', "_"),
        certificate.unique_id
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download_name),
            ),
        ],
        zip_data,
    ))
}
