use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: i32,
    pub issuer_admin_id: i32,
    pub student_email: String,
    pub student_name: String,
    pub course_name: String,
    pub issue_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub unique_id: String,
    pub hash: String,
    pub image_link: Option<String>,
    pub pdf_link: Option<String>,
    pub verified: bool,
    pub payment_details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when a certificate is first recorded.
#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub issuer_admin_id: i32,
    pub student_email: String,
    pub student_name: String,
    pub course_name: String,
    pub issue_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub unique_id: String,
    pub hash: String,
    pub image_link: String,
    pub pdf_link: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_verified: bool,
    pub verification_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub second_password_hash: Option<String>,
    pub is_super_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: i32,
    pub course_id: i32,
    pub title: String,
    pub video_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetails {
    #[serde(flatten)]
    pub course: Course,
    pub videos: Vec<Video>,
}
