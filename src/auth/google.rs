use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::GoogleConfig;

const AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("google request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("google rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("google account has no verified email")]
    UnverifiedEmail,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub name: Option<String>,
}

pub struct GoogleClient {
    client: Client,
    config: GoogleConfig,
}

impl GoogleClient {
    pub fn new(config: GoogleConfig) -> Result<Self, GoogleError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self { client, config })
    }

    /// Consent screen URL requesting the `profile` and `email` scopes.
    pub fn authorize_url(&self) -> String {
        Url::parse_with_params(
            AUTHORIZE_ENDPOINT,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("response_type", "code"),
                ("scope", "openid profile email"),
                ("prompt", "select_account"),
            ],
        )
        .map(String::from)
        .unwrap_or_else(|_| AUTHORIZE_ENDPOINT.to_string())
    }

    /// Trade the callback `code` for the signed-in account's profile.
    pub async fn fetch_profile(&self, code: &str) -> Result<GoogleProfile, GoogleError> {
        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .ok()
                .and_then(|e| e.error_description.or(e.error))
                .unwrap_or(text);
            warn!("Google token exchange failed with {}", status);
            return Err(GoogleError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        let token: TokenResponse = serde_json::from_str(&text).map_err(|e| GoogleError::Rejected {
            status: status.as_u16(),
            message: format!("Parse error: {}", e),
        })?;

        let profile: GoogleProfile = self
            .client
            .get(USERINFO_ENDPOINT)
            .bearer_auth(&token.access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !profile.email_verified {
            return Err(GoogleError::UnverifiedEmail);
        }
        info!("Google sign-in for {}", profile.email);
        Ok(profile)
    }
}
