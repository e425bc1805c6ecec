//! Identity provider client — the single point of entry for all identity
//! provider calls in DriveHouse.
//!
//! ARCHITECTURAL RULE: no other module may call the provider's REST surface
//! directly. Everything goes through `IdentityProvider`, carried in
//! `AppState` as `Arc<dyn IdentityProvider>` so tests can swap in a mock.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::auth::session::Session;
use crate::errors::AppError;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Api(String),

    #[error("invalid or expired credential")]
    InvalidCredential,
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e.to_string())
    }
}

/// The identity provider seam. One long-lived client per process.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_anonymously(&self) -> Result<Session, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError>;

    /// Exchanges a federated provider's credential (e.g. a Google OAuth id
    /// token) for a provider session. The interactive part of the flow
    /// happens in the caller's browser; this is the terminal exchange.
    async fn sign_in_with_idp(
        &self,
        provider_id: &str,
        provider_token: &str,
    ) -> Result<Session, AuthError>;

    /// One-time bootstrap for hosting environments that inject a custom
    /// token at startup.
    async fn sign_in_with_custom_token(&self, token: &str) -> Result<Session, AuthError>;

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;

    async fn update_profile(
        &self,
        session: &Session,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<(), AuthError>;

    /// Re-fetches the account behind a session so observers see fresh data.
    async fn reload(&self, session: &Session) -> Result<Session, AuthError>;

    /// Verifies a bearer credential against the provider and returns the
    /// external id it belongs to. Used for requester extraction in the
    /// access gate.
    async fn verify_token(&self, id_token: &str) -> Result<String, AuthError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types (Identity Toolkit REST API)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordSignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpSignInRequest<'a> {
    request_uri: &'a str,
    post_body: String,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomTokenRequest<'a> {
    token: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

/// Common shape of the sign-in responses. `localId` is absent from the
/// custom-token variant, so every flow resolves the account via `lookup`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    provider_user_info: Vec<serde_json::Value>,
    #[serde(default)]
    custom_auth: Option<bool>,
}

impl AccountInfo {
    /// Anonymous means no federated or password provider and not a
    /// custom-token account.
    fn is_anonymous(&self) -> bool {
        self.provider_user_info.is_empty() && !self.custom_auth.unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Maps the provider's SCREAMING_SNAKE error codes to the human-readable
/// messages surfaced to UI actions.
fn friendly_auth_message(code: &str) -> String {
    if code.starts_with("WEAK_PASSWORD") {
        return "Password is too weak".to_string();
    }
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "Invalid email or password".to_string()
        }
        "EMAIL_EXISTS" => "An account already exists for this email".to_string(),
        "USER_DISABLED" => "This account has been disabled".to_string(),
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" => {
            "Session has expired, please sign in again".to_string()
        }
        "OPERATION_NOT_ALLOWED" => "This sign-in method is not enabled".to_string(),
        "INVALID_CUSTOM_TOKEN" | "CREDENTIAL_MISMATCH" => {
            "The bootstrap token was rejected".to_string()
        }
        other => other.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Production client
// ────────────────────────────────────────────────────────────────────────────

/// REST client for the hosted identity provider (Identity Toolkit surface).
#[derive(Clone)]
pub struct IdentityToolkitClient {
    client: reqwest::Client,
    api_key: String,
}

impl IdentityToolkitClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{IDENTITY_TOOLKIT_URL}/accounts:{method}?key={}", self.api_key)
    }

    async fn post<Req, Resp>(&self, method: &str, body: &Req) -> Result<Resp, AuthError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        debug!("identity provider call: accounts:{method}");
        let response = self
            .client
            .post(self.endpoint(method))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| friendly_auth_message(&e.error.message))
                .unwrap_or_else(|_| format!("identity provider returned status {status}"));
            return Err(AuthError::Api(message));
        }

        Ok(response.json::<Resp>().await?)
    }

    /// Resolves the account behind an id token into a full session.
    async fn lookup_session(
        &self,
        id_token: &str,
        refresh_token: Option<String>,
    ) -> Result<Session, AuthError> {
        let resp: LookupResponse = self
            .post("lookup", &LookupRequest { id_token })
            .await?;
        let account = resp.users.into_iter().next().ok_or(AuthError::InvalidCredential)?;

        Ok(Session {
            is_anonymous: account.is_anonymous(),
            external_id: account.local_id,
            email: account.email,
            display_name: account.display_name,
            photo_url: account.photo_url,
            id_token: id_token.to_string(),
            refresh_token,
        })
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    async fn sign_in_anonymously(&self) -> Result<Session, AuthError> {
        let resp: SignInResponse = self
            .post(
                "signUp",
                &SignUpRequest {
                    email: None,
                    password: None,
                    return_secure_token: true,
                },
            )
            .await?;
        self.lookup_session(&resp.id_token, resp.refresh_token).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let resp: SignInResponse = self
            .post(
                "signUp",
                &SignUpRequest {
                    email: Some(email),
                    password: Some(password),
                    return_secure_token: true,
                },
            )
            .await?;
        self.lookup_session(&resp.id_token, resp.refresh_token).await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let resp: SignInResponse = self
            .post(
                "signInWithPassword",
                &PasswordSignInRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        self.lookup_session(&resp.id_token, resp.refresh_token).await
    }

    async fn sign_in_with_idp(
        &self,
        provider_id: &str,
        provider_token: &str,
    ) -> Result<Session, AuthError> {
        let resp: SignInResponse = self
            .post(
                "signInWithIdp",
                &IdpSignInRequest {
                    request_uri: "http://localhost",
                    post_body: format!("id_token={provider_token}&providerId={provider_id}"),
                    return_secure_token: true,
                    return_idp_credential: true,
                },
            )
            .await?;
        self.lookup_session(&resp.id_token, resp.refresh_token).await
    }

    async fn sign_in_with_custom_token(&self, token: &str) -> Result<Session, AuthError> {
        let resp: SignInResponse = self
            .post(
                "signInWithCustomToken",
                &CustomTokenRequest {
                    token,
                    return_secure_token: true,
                },
            )
            .await?;
        self.lookup_session(&resp.id_token, resp.refresh_token).await
    }

    async fn sign_out(&self, _session: &Session) -> Result<(), AuthError> {
        // The REST surface has no server-side session revocation; dropping
        // the tokens is the sign-out. Kept on the trait so implementations
        // that do revoke (and the mock) can fail here.
        Ok(())
    }

    async fn update_profile(
        &self,
        session: &Session,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<(), AuthError> {
        let _: serde_json::Value = self
            .post(
                "update",
                &UpdateRequest {
                    id_token: &session.id_token,
                    display_name,
                    photo_url,
                    return_secure_token: false,
                },
            )
            .await?;
        Ok(())
    }

    async fn reload(&self, session: &Session) -> Result<Session, AuthError> {
        self.lookup_session(&session.id_token, session.refresh_token.clone())
            .await
    }

    async fn verify_token(&self, id_token: &str) -> Result<String, AuthError> {
        let resp: LookupResponse = self
            .post("lookup", &LookupRequest { id_token })
            .await?;
        resp.users
            .into_iter()
            .next()
            .map(|a| a.local_id)
            .ok_or(AuthError::InvalidCredential)
    }
}
