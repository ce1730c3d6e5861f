use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::certificates::{CertificateStore, StoreError};
use super::models::{Certificate, NewCertificate};

/// In-process store with the same uniqueness rules as the Postgres table.
#[derive(Debug, Default)]
pub struct MemoryCertificateStore {
    records: RwLock<HashMap<String, Certificate>>,
}

impl MemoryCertificateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut certificates: Vec<Certificate>) -> Vec<Certificate> {
        certificates.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        certificates
    }
}

#[async_trait]
impl CertificateStore for MemoryCertificateStore {
    async fn find_by_unique_id(&self, unique_id: &str) -> Result<Option<Certificate>, StoreError> {
        Ok(self.records.read().await.get(unique_id).cloned())
    }

    async fn find_by_student_email(&self, email: &str) -> Result<Vec<Certificate>, StoreError> {
        let records = self.records.read().await;
        Ok(Self::sorted(
            records
                .values()
                .filter(|c| c.student_email == email)
                .cloned()
                .collect(),
        ))
    }

    async fn create_certificate(&self, new: NewCertificate) -> Result<Certificate, StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&new.unique_id) {
            return Err(StoreError::Duplicate(new.unique_id));
        }

        let now = Utc::now();
        let certificate = Certificate {
            id: records.len() as i32 + 1,
            issuer_admin_id: new.issuer_admin_id,
            student_email: new.student_email,
            student_name: new.student_name,
            course_name: new.course_name,
            issue_date: new.issue_date,
            expiry_date: new.expiry_date,
            unique_id: new.unique_id,
            hash: new.hash,
            image_link: Some(new.image_link),
            pdf_link: Some(new.pdf_link),
            verified: false,
            payment_details: None,
            created_at: now,
            updated_at: now,
        };
        records.insert(certificate.unique_id.clone(), certificate.clone());
        Ok(certificate)
    }

    async fn save_certificate(&self, certificate: &Certificate) -> Result<Certificate, StoreError> {
        let mut records = self.records.write().await;
        let mut saved = certificate.clone();
        saved.updated_at = Utc::now();
        if let Some(existing) = records.get(&certificate.unique_id) {
            saved.id = existing.id;
            saved.created_at = existing.created_at;
        } else {
            saved.id = records.len() as i32 + 1;
        }
        records.insert(saved.unique_id.clone(), saved.clone());
        Ok(saved)
    }

    async fn list_by_issuer(&self, issuer_admin_id: i32) -> Result<Vec<Certificate>, StoreError> {
        let records = self.records.read().await;
        Ok(Self::sorted(
            records
                .values()
                .filter(|c| c.issuer_admin_id == issuer_admin_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_all(&self) -> Result<Vec<Certificate>, StoreError> {
        Ok(Self::sorted(self.records.read().await.values().cloned().collect()))
    }
}
