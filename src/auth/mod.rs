//! Session tokens, password hashing, and the request extractors that guard
//! user and admin routes.

pub mod google;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::error::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "token";
const TOKEN_LIFETIME_HOURS: i64 = 24;
const BCRYPT_COST: u32 = 10;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingToken,

    #[error("Invalid or expired session")]
    InvalidToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Please verify your email before logging in")]
    NotVerified,

    #[error("Access denied")]
    Forbidden,

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("hashing task aborted: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::NotVerified | AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Hash(_) | AuthError::Signing(_) | AuthError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Individual,
    Corporate,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Roles a user may pick at registration.
    pub fn parse_user_role(value: &str) -> Option<Self> {
        match value {
            "individual" => Some(Role::Individual),
            "corporate" => Some(Role::Corporate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Individual => "individual",
            Role::Corporate => "corporate",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub role: Role,
    /// Email for users, username for admins.
    pub name: String,
    pub exp: usize,
}

pub fn issue_token(secret: &str, sub: i32, role: Role, name: &str) -> Result<String, AuthError> {
    let exp = (Utc::now() + chrono::Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp() as usize;
    let claims = Claims {
        sub,
        role,
        name: name.to_string(),
        exp,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::InvalidToken)
}

pub async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_string();
    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST)).await??)
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    Ok(tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??)
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Always emits an expired `token` cookie, even for Bearer-authenticated callers.
pub fn clear_session(jar: CookieJar) -> CookieJar {
    let mut cookie = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    cookie.make_removal();
    jar.add(cookie)
}

/// Session token from the `token` cookie, or a `Bearer` header as fallback.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Any signed-in principal.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or(AuthError::MissingToken)?;
        let claims = decode_token(&state.config.jwt_secret, &token)?;
        Ok(AuthUser(claims))
    }
}

/// A signed-in admin or super admin.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: i32,
    pub username: String,
    pub is_super_admin: bool,
}

impl AdminUser {
    pub fn require_super_admin(&self) -> Result<(), AuthError> {
        if self.is_super_admin {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if !claims.role.is_admin() {
            return Err(AuthError::Forbidden.into());
        }
        Ok(AdminUser {
            id: claims.sub,
            username: claims.name,
            is_super_admin: claims.role == Role::SuperAdmin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderValue};
    use testresult::TestResult;

    #[test]
    fn tokens_round_trip_claims() -> TestResult {
        let token = issue_token("secret", 42, Role::Corporate, "acme@example.com")?;

        let claims = decode_token("secret", &token)?;

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, Role::Corporate);
        assert_eq!(claims.name, "acme@example.com");
        assert!(claims.exp as i64 > Utc::now().timestamp());
        Ok(())
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() -> TestResult {
        let token = issue_token("secret", 1, Role::Admin, "root")?;

        assert!(matches!(decode_token("other", &token), Err(AuthError::InvalidToken)));
        Ok(())
    }

    #[test]
    fn expired_tokens_are_rejected() -> TestResult {
        let claims = Claims {
            sub: 1,
            role: Role::Individual,
            name: "ada@example.com".to_string(),
            exp: (Utc::now().timestamp() - 3600) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )?;

        assert!(matches!(decode_token("secret", &token), Err(AuthError::InvalidToken)));
        Ok(())
    }

    #[tokio::test]
    async fn passwords_verify_against_their_hash() -> TestResult {
        let hash = hash_password("correct horse").await?;

        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash).await?);
        assert!(!verify_password("battery staple", &hash).await?);
        Ok(())
    }

    #[test]
    fn cookie_wins_over_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; token=from-cookie"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));

        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn bearer_header_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));

        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc.def"));
        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn only_individual_and_corporate_can_register() {
        assert_eq!(Role::parse_user_role("individual"), Some(Role::Individual));
        assert_eq!(Role::parse_user_role("corporate"), Some(Role::Corporate));
        assert_eq!(Role::parse_user_role("admin"), None);
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie("abc".to_string(), true);

        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
