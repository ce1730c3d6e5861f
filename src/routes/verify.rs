use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default)]
    pub unique_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[serde(default)]
    pub unique_id: String,
    /// Opaque payment fields, stored as submitted.
    #[serde(default)]
    pub payment_details: Option<serde_json::Value>,
}

pub async fn lookup(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload?;
    let cert = state.certificates.lookup(&request.unique_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Certificate found. Please proceed to payment.",
        "cert": {
            "studentName": cert.student_name,
            "courseName": cert.course_name,
            "issueDate": cert.issue_date,
            "expiryDate": cert.expiry_date,
            "uniqueId": cert.unique_id,
            "verified": cert.verified,
        },
    })))
}

pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload?;
    let cert = state
        .certificates
        .confirm_and_verify(&request.unique_id, request.payment_details)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Payment successful & certificate verified.",
        "cert": {
            "studentName": cert.student_name,
            "courseName": cert.course_name,
            "issueDate": cert.issue_date,
            "expiryDate": cert.expiry_date,
            "uniqueId": cert.unique_id,
            "verified": cert.verified,
            "paymentDetails": cert.payment_details,
        },
    })))
}
