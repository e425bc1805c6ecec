pub mod auth;
pub mod health;
pub mod profile;
pub mod users;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;
use crate::storage::MAX_PHOTO_BYTES;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth actions
        .route("/api/v1/auth/anonymous", post(auth::handle_sign_in_anonymous))
        .route("/api/v1/auth/sign-in", post(auth::handle_sign_in))
        .route("/api/v1/auth/sign-up", post(auth::handle_sign_up))
        .route("/api/v1/auth/federated", post(auth::handle_sign_in_federated))
        .route("/api/v1/auth/sign-out", post(auth::handle_sign_out))
        .route("/api/v1/auth/session", get(auth::handle_get_session))
        // Profile edit (multipart: the photo alone may be 5 MB)
        .route(
            "/api/v1/profile",
            put(profile::handle_update_profile)
                .layer(DefaultBodyLimit::max(MAX_PHOTO_BYTES + 64 * 1024)),
        )
        // User records
        .route("/api/v1/users/:external_id", get(users::handle_get_user))
        .with_state(state)
}
