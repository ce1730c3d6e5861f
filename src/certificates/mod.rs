//! Certificate issuance, preview, and verification.

mod identity;
mod janitor;
mod pipeline;
mod service;

pub use janitor::PreviewJanitor;
pub use pipeline::CertificatePipeline;
pub use service::{CertificateForm, CertificateService};

use thiserror::Error;

use crate::db::StoreError;
use crate::render::RenderError;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("certificate not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
