use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tera::Context;
use tracing::{error, info};
use uuid::Uuid;

use super::identity::{mint_unique_id, Identity};
use super::janitor::PreviewJanitor;
use super::pipeline::CertificatePipeline;
use super::CertificateError;
use crate::db::{Certificate, CertificateStore, NewCertificate};
use crate::mail::Mailer;
use crate::render::CertificateDetails;
use crate::storage::ArtifactName;
use crate::templates;

pub const CERTIFICATE_EMAIL_SUBJECT: &str = "Your Course Certificate";

/// Raw issuance/preview fields as submitted by the admin console.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateForm {
    pub student_email: Option<String>,
    pub student_name: Option<String>,
    pub course_name: Option<String>,
    pub issue_date: Option<String>,
    pub expiry_date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PreviewOutcome {
    pub png_path: PathBuf,
    pub pdf_path: PathBuf,
    pub preview_id: String,
    /// Cosmetic query token for the preview links; never checked.
    pub token: String,
}

#[derive(Clone)]
pub struct CertificateService {
    store: Arc<dyn CertificateStore>,
    pipeline: CertificatePipeline,
    mailer: Arc<dyn Mailer>,
    janitor: PreviewJanitor,
    preview_ttl: Duration,
    verify_url: String,
}

impl CertificateService {
    pub fn new(
        store: Arc<dyn CertificateStore>,
        pipeline: CertificatePipeline,
        mailer: Arc<dyn Mailer>,
        janitor: PreviewJanitor,
        preview_ttl: Duration,
        verify_url: String,
    ) -> Self {
        Self {
            store,
            pipeline,
            mailer,
            janitor,
            preview_ttl,
            verify_url,
        }
    }

    /// Render a throwaway certificate and schedule its removal.
    pub async fn preview(&self, form: &CertificateForm) -> Result<PreviewOutcome, CertificateError> {
        let details = CertificateDetails {
            student_name: required(&form.student_name, "studentName")?,
            course_name: required(&form.course_name, "courseName")?,
            issue_date: required_date(&form.issue_date, "issueDate")?,
            expiry_date: required_date(&form.expiry_date, "expiryDate")?,
            unique_id: mint_unique_id(),
        };
        let preview_id = details.unique_id.clone();

        let generated = self
            .pipeline
            .generate(details, &ArtifactName::preview_now(&preview_id))
            .await?;

        self.janitor.schedule(
            [generated.png_path.clone(), generated.pdf_path.clone()],
            self.preview_ttl,
        );
        info!(
            "Preview {} rendered, expires in {}s ({} files pending)",
            generated.png_path.display(),
            self.preview_ttl.as_secs(),
            self.janitor.pending_count()
        );

        Ok(PreviewOutcome {
            png_path: generated.png_path,
            pdf_path: generated.pdf_path,
            preview_id,
            token: Uuid::new_v4().simple().to_string(),
        })
    }

    /// Mint identity, render, persist, then notify the student.
    ///
    /// The record is committed before the email goes out; a delivery failure
    /// is logged and leaves the certificate in place.
    pub async fn issue(
        &self,
        issuer_admin_id: i32,
        form: &CertificateForm,
    ) -> Result<Certificate, CertificateError> {
        let student_email = required(&form.student_email, "studentEmail")?;
        let student_name = required(&form.student_name, "studentName")?;
        let course_name = required(&form.course_name, "courseName")?;
        let issue_date = required_date(&form.issue_date, "issueDate")?;
        let expiry_date = required_date(&form.expiry_date, "expiryDate")?;

        let identity = Identity::mint(&student_email, &course_name);
        let artifact = ArtifactName::Issued(identity.unique_id.clone());

        let generated = self
            .pipeline
            .generate(
                CertificateDetails {
                    student_name: student_name.clone(),
                    course_name: course_name.clone(),
                    issue_date,
                    expiry_date,
                    unique_id: identity.unique_id.clone(),
                },
                &artifact,
            )
            .await?;

        let certificate = self
            .store
            .create_certificate(NewCertificate {
                issuer_admin_id,
                student_email,
                student_name,
                course_name,
                issue_date,
                expiry_date,
                unique_id: identity.unique_id,
                hash: identity.hash,
                image_link: generated.png_path.to_string_lossy().into_owned(),
                pdf_link: generated.pdf_path.to_string_lossy().into_owned(),
            })
            .await?;
        info!(
            "Issued certificate {} by admin {}",
            certificate.unique_id, issuer_admin_id
        );

        self.notify(&certificate, &generated.pdf_path).await;
        Ok(certificate)
    }

    async fn notify(&self, certificate: &Certificate, pdf_path: &std::path::Path) {
        let mut ctx = Context::new();
        ctx.insert("student_name", &certificate.student_name);
        ctx.insert("course_name", &certificate.course_name);
        ctx.insert("unique_id", &certificate.unique_id);
        ctx.insert("verify_url", &self.verify_url);

        let body = match templates::render(templates::CERTIFICATE_EMAIL, &ctx) {
            Ok(body) => body,
            Err(e) => {
                error!("Certificate email template failed: {}", e);
                return;
            }
        };

        if let Err(e) = self
            .mailer
            .send_certificate_email(
                &certificate.student_email,
                CERTIFICATE_EMAIL_SUBJECT,
                &body,
                pdf_path,
            )
            .await
        {
            error!(
                "Certificate {} saved but email to {} failed: {}",
                certificate.unique_id, certificate.student_email, e
            );
        }
    }

    /// Public view of a certificate; never mutates.
    pub async fn lookup(&self, unique_id: &str) -> Result<Certificate, CertificateError> {
        let unique_id = unique_id.trim();
        if unique_id.is_empty() {
            return Err(CertificateError::Validation("uniqueId is required".to_string()));
        }
        self.store
            .find_by_unique_id(unique_id)
            .await?
            .ok_or(CertificateError::NotFound)
    }

    /// Simulated payment that always succeeds, then marks the certificate verified.
    ///
    /// Calling this again on a verified certificate overwrites the payment
    /// fields; `verified` never goes back to false.
    pub async fn confirm_and_verify(
        &self,
        unique_id: &str,
        payment_details: Option<serde_json::Value>,
    ) -> Result<Certificate, CertificateError> {
        let mut certificate = self.lookup(unique_id).await?;

        certificate.verified = true;
        certificate.payment_details = payment_details.filter(|v| !v.is_null());

        let saved = self.store.save_certificate(&certificate).await?;
        info!("Certificate {} verified", saved.unique_id);
        Ok(saved)
    }

    pub async fn list_by_issuer(&self, issuer_admin_id: i32) -> Result<Vec<Certificate>, CertificateError> {
        Ok(self.store.list_by_issuer(issuer_admin_id).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Certificate>, CertificateError> {
        Ok(self.store.list_all().await?)
    }

    pub async fn list_for_student(&self, email: &str) -> Result<Vec<Certificate>, CertificateError> {
        Ok(self.store.find_by_student_email(email).await?)
    }
}

fn required(value: &Option<String>, field: &str) -> Result<String, CertificateError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CertificateError::Validation(format!("{field} is required")))
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn required_date(value: &Option<String>, field: &str) -> Result<NaiveDate, CertificateError> {
    let raw = required(value, field)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(&raw).map(|dt| dt.date_naive()))
        .map_err(|_| CertificateError::Validation(format!("{field} is not a valid date")))
}
