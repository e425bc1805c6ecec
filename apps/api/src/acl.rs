//! Access gate over (requester id, owner id, optional group id).
//!
//! Private resources are owner-only. Group-shared access is planned but
//! the membership check is not implemented yet, so shared access is always
//! denied; callers must not rely on it.

use axum::http::{header, HeaderMap};

use crate::auth::provider::IdentityProvider;
use crate::errors::AppError;

/// True iff the requester may access the resource.
pub fn can_access_resource(requester_id: &str, owner_id: &str, group_id: Option<&str>) -> bool {
    // Private resource: must own it.
    if requester_id == owner_id {
        return true;
    }

    if let Some(_group_id) = group_id {
        // TODO: check workspace membership once workspaces are durable
        // entities; until then shared access falls through to deny.
    }

    false
}

pub fn assert_can_access(
    requester_id: &str,
    owner_id: &str,
    group_id: Option<&str>,
) -> Result<(), AppError> {
    if can_access_resource(requester_id, owner_id, group_id) {
        Ok(())
    } else {
        Err(AppError::AccessDenied)
    }
}

/// Derives the verified requester identity from the request: reads the
/// bearer credential and validates it against the identity provider once,
/// so the id can be threaded explicitly through every gate call.
///
/// `Ok(None)` means the request carried no credential; an invalid or
/// expired credential is an auth error.
pub async fn current_requester_id(
    headers: &HeaderMap,
    provider: &dyn IdentityProvider,
) -> Result<Option<String>, AppError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let Some(token) = value.to_str().ok().and_then(|v| v.strip_prefix("Bearer ")) else {
        return Ok(None);
    };

    let external_id = provider.verify_token(token).await?;
    Ok(Some(external_id))
}
