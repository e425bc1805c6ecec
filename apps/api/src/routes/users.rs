use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use crate::acl::{assert_can_access, current_requester_id};
use crate::errors::AppError;
use crate::records::User;
use crate::state::AppState;

/// GET /api/v1/users/:external_id
/// Record lookup gated on the verified requester identity: users can read
/// their own record only (group sharing is planned but still denied).
pub async fn handle_get_user(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<User>, AppError> {
    let requester = current_requester_id(&headers, state.provider.as_ref())
        .await?
        .ok_or(AppError::AccessDenied)?;
    assert_can_access(&requester, &external_id, None)?;

    let Some(records) = &state.records else {
        return Err(AppError::RecordStore(
            "record store is not configured".to_string(),
        ));
    };
    let user = records.get_current_user(&external_id).await?;
    Ok(Json(user))
}
