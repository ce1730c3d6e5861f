use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::auth::{self, AdminUser, AuthError, Role};
use crate::config::SuperAdminSeed;
use crate::db::{self, Admin};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Plain admins send `username`/`password`; the super admin sends
/// `userId` with both of its passwords.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub user_id: Option<String>,
    pub password1: Option<String>,
    pub password2: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

async fn authenticate(pool: &PgPool, request: AdminLoginRequest) -> AppResult<(Admin, Role)> {
    if let (Some(user_id), Some(password1), Some(password2)) =
        (request.user_id, request.password1, request.password2)
    {
        let admin = db::find_admin(pool, user_id.trim(), true)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let second_hash = admin
            .second_password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        if !auth::verify_password(&password1, &admin.password_hash).await?
            || !auth::verify_password(&password2, second_hash).await?
        {
            return Err(AuthError::InvalidCredentials.into());
        }
        return Ok((admin, Role::SuperAdmin));
    }

    let (Some(username), Some(password)) = (request.username, request.password) else {
        return Err(AppError::Validation(
            "username and password are required".to_string(),
        ));
    };
    let admin = db::find_admin(pool, username.trim(), false)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    if !auth::verify_password(&password, &admin.password_hash).await? {
        return Err(AuthError::InvalidCredentials.into());
    }
    Ok((admin, Role::Admin))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<AdminLoginRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload?;
    let (admin, role) = authenticate(&state.pool, request).await?;

    let token = auth::issue_token(&state.config.jwt_secret, admin.id, role, &admin.username)?;
    info!("{} {} logged in", role.as_str(), admin.username);

    Ok((
        jar.add(auth::session_cookie(token.clone(), state.config.cookie_secure)),
        Json(json!({
            "success": true,
            "message": "Login successful",
            "token": token,
            "admin": { "id": admin.id, "username": admin.username, "role": role },
        })),
    ))
}

pub async fn create_admin(
    State(state): State<Arc<AppState>>,
    caller: AdminUser,
    payload: Result<Json<CreateAdminRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    caller.require_super_admin()?;
    let Json(request) = payload?;
    let (Some(username), Some(password)) = (
        request.username.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
        request.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::Validation(
            "username and password are required".to_string(),
        ));
    };

    let hash = auth::hash_password(&password).await?;
    let admin = match db::create_admin(&state.pool, &username, &hash, None, false).await {
        Ok(admin) => admin,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppError::Conflict(format!("Admin {username} already exists")));
        }
        Err(e) => return Err(e.into()),
    };
    info!("Super admin {} created admin {}", caller.username, admin.username);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "admin": { "id": admin.id, "username": admin.username, "role": Role::Admin },
        })),
    ))
}

/// Create the configured super admin if it does not exist yet.
pub async fn bootstrap_super_admin(pool: &PgPool, seed: &SuperAdminSeed) -> AppResult<()> {
    if db::find_admin(pool, &seed.user_id, true).await?.is_some() {
        return Ok(());
    }

    let first = auth::hash_password(&seed.password1).await?;
    let second = auth::hash_password(&seed.password2).await?;
    db::create_admin(pool, &seed.user_id, &first, Some(&second), true).await?;
    info!("Created super admin {}", seed.user_id);
    Ok(())
}
