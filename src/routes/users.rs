use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::certificates::views;
use crate::auth::{self, AuthError, AuthUser, Role};
use crate::db;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn verification_token() -> String {
    let bytes: [u8; 32] = rand::random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload?;
    let (Some(name), Some(email), Some(password)) = (
        present(request.name),
        present(request.email).map(|e| e.to_lowercase()),
        request.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::Validation("Please fill all the fields".to_string()));
    };
    let role = match present(request.role) {
        None => Role::Individual,
        Some(role) => Role::parse_user_role(&role)
            .ok_or_else(|| AppError::Validation(format!("Invalid role: {role}")))?,
    };

    if db::find_user_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Validation("User already exists".to_string()));
    }

    let password_hash = auth::hash_password(&password).await?;
    let token = verification_token();
    let user = match db::create_user(&state.pool, &name, &email, &password_hash, role.as_str(), &token)
        .await
    {
        Ok(user) => user,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppError::Validation("User already exists".to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    info!(
        "Registered user {}; verify at /api/v1/users/verify/{}",
        user.email, token
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "user": { "id": user.id, "name": user.name, "email": user.email, "role": user.role },
        })),
    ))
}

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> AppResult<impl IntoResponse> {
    if !db::verify_user_token(&state.pool, &token).await? {
        return Err(AppError::Validation(
            "Invalid or expired verification token".to_string(),
        ));
    }
    Ok(Json(json!({ "success": true, "message": "Email verified successfully" })))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload?;
    let (Some(email), Some(password)) = (
        present(request.email).map(|e| e.to_lowercase()),
        request.password,
    ) else {
        return Err(AppError::Validation("Email and password are required".to_string()));
    };

    let user = db::find_user_by_email(&state.pool, &email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    if !auth::verify_password(&password, &user.password_hash).await? {
        return Err(AuthError::InvalidCredentials.into());
    }
    if !user.is_verified {
        return Err(AuthError::NotVerified.into());
    }

    let role = Role::parse_user_role(&user.role).unwrap_or(Role::Individual);
    let token = auth::issue_token(&state.config.jwt_secret, user.id, role, &user.email)?;
    info!("User {} logged in", user.email);

    Ok((
        jar.add(auth::session_cookie(token.clone(), state.config.cookie_secure)),
        Json(json!({
            "success": true,
            "message": "Login successful",
            "token": token,
            "user": { "id": user.id, "name": user.name, "email": user.email, "role": user.role },
        })),
    ))
}

pub async fn logout(_user: AuthUser, jar: CookieJar) -> impl IntoResponse {
    (
        auth::clear_session(jar),
        Json(json!({ "success": true, "message": "Logged out successfully" })),
    )
}

pub async fn my_certificates(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> AppResult<impl IntoResponse> {
    let certificates = state.certificates.list_for_student(&claims.name).await?;
    Ok(Json(json!({
        "success": true,
        "count": certificates.len(),
        "certificates": views(certificates, &state.config),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_tokens_are_64_hex_chars() {
        let token = verification_token();

        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, verification_token());
    }
}
