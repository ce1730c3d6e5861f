//! Certificate persistence.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;

use super::models::{Certificate, NewCertificate};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("certificate {0} already exists")]
    Duplicate(String),

    #[error("storage error")]
    Sql(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        Self::Sql(error)
    }
}

/// Document store holding issued certificates, keyed by `unique_id`.
#[async_trait]
pub trait CertificateStore: Send + Sync {
    async fn find_by_unique_id(&self, unique_id: &str) -> Result<Option<Certificate>, StoreError>;

    async fn find_by_student_email(&self, email: &str) -> Result<Vec<Certificate>, StoreError>;

    /// Insert a new record. Fails with [`StoreError::Duplicate`] when the
    /// `unique_id` is already taken.
    async fn create_certificate(&self, new: NewCertificate) -> Result<Certificate, StoreError>;

    /// Upsert by `unique_id`, replacing every mutable field.
    async fn save_certificate(&self, certificate: &Certificate) -> Result<Certificate, StoreError>;

    async fn list_by_issuer(&self, issuer_admin_id: i32) -> Result<Vec<Certificate>, StoreError>;

    async fn list_all(&self) -> Result<Vec<Certificate>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgCertificateStore {
    pool: Arc<PgPool>,
}

impl PgCertificateStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CertificateStore for PgCertificateStore {
    async fn find_by_unique_id(&self, unique_id: &str) -> Result<Option<Certificate>, StoreError> {
        let certificate =
            sqlx::query_as::<_, Certificate>("SELECT * FROM certificates WHERE unique_id = $1")
                .bind(unique_id)
                .fetch_optional(self.pool.as_ref())
                .await?;
        Ok(certificate)
    }

    async fn find_by_student_email(&self, email: &str) -> Result<Vec<Certificate>, StoreError> {
        let certificates = sqlx::query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE student_email = $1 ORDER BY created_at DESC",
        )
        .bind(email)
        .fetch_all(self.pool.as_ref())
        .await?;
        Ok(certificates)
    }

    async fn create_certificate(&self, new: NewCertificate) -> Result<Certificate, StoreError> {
        sqlx::query_as::<_, Certificate>(
            r#"
            INSERT INTO certificates (
                issuer_admin_id, student_email, student_name, course_name,
                issue_date, expiry_date, unique_id, hash, image_link, pdf_link
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(new.issuer_admin_id)
        .bind(&new.student_email)
        .bind(&new.student_name)
        .bind(&new.course_name)
        .bind(new.issue_date)
        .bind(new.expiry_date)
        .bind(&new.unique_id)
        .bind(&new.hash)
        .bind(&new.image_link)
        .bind(&new.pdf_link)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Duplicate(new.unique_id.clone())
            }
            other => StoreError::Sql(other),
        })
    }

    async fn save_certificate(&self, certificate: &Certificate) -> Result<Certificate, StoreError> {
        let saved = sqlx::query_as::<_, Certificate>(
            r#"
            INSERT INTO certificates (
                issuer_admin_id, student_email, student_name, course_name,
                issue_date, expiry_date, unique_id, hash, image_link, pdf_link,
                verified, payment_details
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (unique_id) DO UPDATE SET
                student_email = EXCLUDED.student_email,
                student_name = EXCLUDED.student_name,
                course_name = EXCLUDED.course_name,
                issue_date = EXCLUDED.issue_date,
                expiry_date = EXCLUDED.expiry_date,
                image_link = EXCLUDED.image_link,
                pdf_link = EXCLUDED.pdf_link,
                verified = EXCLUDED.verified,
                payment_details = EXCLUDED.payment_details,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(certificate.issuer_admin_id)
        .bind(&certificate.student_email)
        .bind(&certificate.student_name)
        .bind(&certificate.course_name)
        .bind(certificate.issue_date)
        .bind(certificate.expiry_date)
        .bind(&certificate.unique_id)
        .bind(&certificate.hash)
        .bind(&certificate.image_link)
        .bind(&certificate.pdf_link)
        .bind(certificate.verified)
        .bind(&certificate.payment_details)
        .fetch_one(self.pool.as_ref())
        .await?;
        Ok(saved)
    }

    async fn list_by_issuer(&self, issuer_admin_id: i32) -> Result<Vec<Certificate>, StoreError> {
        let certificates = sqlx::query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE issuer_admin_id = $1 ORDER BY created_at DESC",
        )
        .bind(issuer_admin_id)
        .fetch_all(self.pool.as_ref())
        .await?;
        Ok(certificates)
    }

    async fn list_all(&self) -> Result<Vec<Certificate>, StoreError> {
        let certificates =
            sqlx::query_as::<_, Certificate>("SELECT * FROM certificates ORDER BY created_at DESC")
                .fetch_all(self.pool.as_ref())
                .await?;
        Ok(certificates)
    }
}
