use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{self, Role};
use crate::db;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

pub async fn google_start(State(state): State<Arc<AppState>>) -> AppResult<Redirect> {
    let google = state
        .google
        .as_ref()
        .ok_or(AppError::NotFound("Google sign-in"))?;
    Ok(Redirect::to(&google.authorize_url()))
}

pub async fn google_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    let frontend = &state.config.frontend_url;
    let failed = || Redirect::to(&format!("{frontend}?error=oauth_failed"));

    let (Some(google), Some(code)) = (state.google.as_ref(), params.code) else {
        warn!("Google callback without code: {:?}", params.error);
        return (jar, failed());
    };

    let profile = match google.fetch_profile(&code).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!("Google sign-in failed: {}", e);
            return (jar, failed());
        }
    };

    let email = profile.email.trim().to_lowercase();
    let user = match db::find_user_by_email(&state.pool, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            info!("Google sign-in for unregistered {}", email);
            return (
                jar,
                Redirect::to(&format!("{frontend}/register?error=not_registered")),
            );
        }
        Err(e) => {
            warn!("User lookup failed during Google sign-in: {}", e);
            return (jar, failed());
        }
    };

    let role = Role::parse_user_role(&user.role).unwrap_or(Role::Individual);
    match auth::issue_token(&state.config.jwt_secret, user.id, role, &user.email) {
        Ok(token) => (
            jar.add(auth::session_cookie(token, state.config.cookie_secure)),
            Redirect::to(&format!("{frontend}/dashboard")),
        ),
        Err(e) => {
            warn!("Could not sign session for {}: {}", user.email, e);
            (jar, failed())
        }
    }
}
