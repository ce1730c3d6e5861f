use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Mint a fresh opaque certificate identifier.
pub fn mint_unique_id() -> String {
    Uuid::new_v4().to_string()
}

/// Integrity digest over `email ++ course ++ unique_id`, lowercase hex SHA-256.
pub fn certificate_hash(student_email: &str, course_name: &str, unique_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(student_email.as_bytes());
    hasher.update(course_name.as_bytes());
    hasher.update(unique_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Identifier and hash minted together for one issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub unique_id: String,
    pub hash: String,
}

impl Identity {
    pub fn mint(student_email: &str, course_name: &str) -> Self {
        let unique_id = mint_unique_id();
        let hash = certificate_hash(student_email, course_name, &unique_id);
        Self { unique_id, hash }
    }
}
