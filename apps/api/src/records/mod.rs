//! User Record Store — the backend-as-a-service users table, mirrored from
//! observed identity-provider sessions.
//!
//! At most one record exists per `external_id`. The record is created on the
//! first observed session for that identity; later sessions overwrite the
//! contact fields and bump `last_login_at` (last write wins), while
//! `created_at`, `total_points` and `premium_status` stay untouched.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AppError;

/// A row of the users table. Timestamps are milliseconds since epoch, as
/// stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "userId")]
    pub external_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
    pub total_points: i64,
    pub premium_status: bool,
    pub created_at: i64,
    pub last_login_at: i64,
}

/// Arguments for the upsert: everything the session carries about the
/// identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[serde(rename = "userId")]
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertOutcome {
    #[serde(rename = "userId")]
    pub external_id: String,
    pub is_new: bool,
}

/// Patch for the profile-edit flow. Only the provided fields change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(rename = "userId")]
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("user record not found")]
    NotFound,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("record store rejected the call: {0}")]
    Api(String),
}

impl From<RecordStoreError> for AppError {
    fn from(e: RecordStoreError) -> Self {
        match e {
            RecordStoreError::NotFound => AppError::NotFound("user record not found".to_string()),
            other => AppError::RecordStore(other.to_string()),
        }
    }
}

/// The record store seam. Carried in `AppState` as
/// `Option<Arc<dyn RecordStore>>`; `None` is the degraded (unconfigured)
/// mode where sync is skipped entirely.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Upsert-by-external-id. Idempotent: the first call for an id inserts
    /// the record with zeroed counters, later calls only overwrite the
    /// mutable contact fields and `last_login_at`.
    async fn create_user(&self, new: NewUser) -> Result<UpsertOutcome, RecordStoreError>;

    /// Patch-by-external-id. `NotFound` if no record exists for the id.
    async fn update_user_profile(&self, patch: ProfilePatch) -> Result<(), RecordStoreError>;

    async fn get_user_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<User>, RecordStoreError>;

    /// Like `get_user_by_external_id` but absence is an error.
    async fn get_current_user(&self, external_id: &str) -> Result<User, RecordStoreError>;
}
