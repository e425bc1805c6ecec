use axum::{extract::State, Json};
use serde::Deserialize;

use crate::auth::session::SessionSnapshot;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct FederatedRequest {
    /// Federated provider identifier, e.g. `google.com`.
    pub provider_id: String,
    /// The OAuth credential obtained from the provider's interactive flow.
    pub provider_token: String,
}

/// POST /api/v1/auth/anonymous
pub async fn handle_sign_in_anonymous(
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.sessions.sign_in_anonymously().await?))
}

/// POST /api/v1/auth/sign-in
pub async fn handle_sign_in(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(
        state
            .sessions
            .sign_in_with_credentials(&req.email, &req.password)
            .await?,
    ))
}

/// POST /api/v1/auth/sign-up
pub async fn handle_sign_up(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(
        state
            .sessions
            .sign_up_with_credentials(&req.email, &req.password)
            .await?,
    ))
}

/// POST /api/v1/auth/federated
pub async fn handle_sign_in_federated(
    State(state): State<AppState>,
    Json(req): Json<FederatedRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(
        state
            .sessions
            .sign_in_with_federated(&req.provider_id, &req.provider_token)
            .await?,
    ))
}

/// POST /api/v1/auth/sign-out
pub async fn handle_sign_out(
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.sessions.sign_out().await?))
}

/// GET /api/v1/auth/session
pub async fn handle_get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.sessions.snapshot())
}
