//! Firebase Authentication REST client
//!
//! Speaks the Identity Toolkit interface used by the hosted auth
//! provider: account creation, password sign-in, and ID-token refresh.
//! The provider owns accounts and passwords; this server only holds
//! the issued tokens inside its session rows.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Auth provider client errors
#[derive(Debug, Error)]
pub enum FirebaseAuthError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("An account with this email already exists")]
    EmailExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    WeakPassword(String),

    #[error("Account disabled")]
    UserDisabled,

    #[error("Too many attempts, try again later")]
    TooManyAttempts,

    #[error("Auth provider error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Tokens issued by the provider on sign-up or sign-in
#[derive(Debug, Clone)]
pub struct AuthTokens {
    /// Provider-assigned user id (`localId`)
    pub uid: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
    /// Seconds until `id_token` expires
    pub expires_in: i64,
}

/// Tokens issued by the token-refresh endpoint
///
/// The secure-token response carries no email, so this is a distinct
/// type: a refresh can only replace the tokens on an existing session,
/// never open one.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub uid: String,
    pub id_token: String,
    pub refresh_token: String,
    /// Seconds until `id_token` expires
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Map a provider error code (e.g. "EMAIL_EXISTS", "WEAK_PASSWORD :
/// Password should be at least 6 characters") to a typed error
fn map_error_code(status: u16, message: &str) -> FirebaseAuthError {
    let code = message.split(':').next().unwrap_or(message).trim();

    match code {
        "EMAIL_EXISTS" => FirebaseAuthError::EmailExists,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS"
        | "INVALID_EMAIL" => FirebaseAuthError::InvalidCredentials,
        "WEAK_PASSWORD" => {
            let detail = message
                .split_once(':')
                .map(|(_, rest)| rest.trim().to_string())
                .unwrap_or_else(|| "Password is too weak".to_string());
            FirebaseAuthError::WeakPassword(detail)
        }
        "USER_DISABLED" => FirebaseAuthError::UserDisabled,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => FirebaseAuthError::TooManyAttempts,
        // Refresh endpoint variants
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => {
            FirebaseAuthError::InvalidCredentials
        }
        _ => FirebaseAuthError::ApiError(status, message.to_string()),
    }
}

/// Firebase Authentication client
pub struct FirebaseAuthClient {
    http_client: reqwest::Client,
    api_key: String,
}

impl FirebaseAuthClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, FirebaseAuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FirebaseAuthError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
        })
    }

    /// Create a new account (accounts:signUp)
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthTokens, FirebaseAuthError> {
        self.password_request("accounts:signUp", email, password)
            .await
    }

    /// Sign in with email and password (accounts:signInWithPassword)
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthTokens, FirebaseAuthError> {
        self.password_request("accounts:signInWithPassword", email, password)
            .await
    }

    async fn password_request(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthTokens, FirebaseAuthError> {
        let url = format!("{}/{}?key={}", IDENTITY_BASE_URL, endpoint, self.api_key);

        let response = self
            .http_client
            .post(&url)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(|e| FirebaseAuthError::NetworkError(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            return Err(self.parse_error(status.as_u16(), response).await);
        }

        let body: SignInResponse = response
            .json()
            .await
            .map_err(|e| FirebaseAuthError::ParseError(e.to_string()))?;

        let expires_in = body
            .expires_in
            .parse::<i64>()
            .map_err(|e| FirebaseAuthError::ParseError(format!("expiresIn: {}", e)))?;

        tracing::info!(uid = %body.local_id, "Auth provider issued tokens");

        Ok(AuthTokens {
            uid: body.local_id,
            email: body.email,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_in,
        })
    }

    /// Exchange a refresh token for a fresh ID token
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, FirebaseAuthError> {
        let url = format!("{}?key={}", SECURE_TOKEN_URL, self.api_key);

        let response = self
            .http_client
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| FirebaseAuthError::NetworkError(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            return Err(self.parse_error(status.as_u16(), response).await);
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| FirebaseAuthError::ParseError(e.to_string()))?;

        let expires_in = body
            .expires_in
            .parse::<i64>()
            .map_err(|e| FirebaseAuthError::ParseError(format!("expires_in: {}", e)))?;

        tracing::debug!(uid = %body.user_id, "Refreshed ID token");

        Ok(RefreshedTokens {
            uid: body.user_id,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_in,
        })
    }

    async fn parse_error(&self, status: u16, response: reqwest::Response) -> FirebaseAuthError {
        let text = response.text().await.unwrap_or_default();

        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => map_error_code(status, &body.error.message),
            Err(_) => FirebaseAuthError::ApiError(status, text),
        }
    }
}
