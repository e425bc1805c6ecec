//! HTTP client for the hosted backend-as-a-service deployment.
//!
//! The backend exposes its table operations as named functions behind
//! `POST /api/query` and `POST /api/mutation`; results come back in a
//! `{status, value | errorMessage}` envelope.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{NewUser, ProfilePatch, RecordStore, RecordStoreError, UpsertOutcome, User};
use async_trait::async_trait;

const CREATE_USER_FN: &str = "users:createUser";
const UPDATE_USER_PROFILE_FN: &str = "users:updateUserProfile";
const GET_USER_BY_ID_FN: &str = "users:getUserByUserId";
const GET_CURRENT_USER_FN: &str = "users:getCurrentUser";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionResponse {
    status: String,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Maps a function-level error message to the store error taxonomy.
fn map_function_error(message: String) -> RecordStoreError {
    if message.contains("User not found") {
        RecordStoreError::NotFound
    } else {
        RecordStoreError::Api(message)
    }
}

/// One long-lived client per process, constructed in `main` only when the
/// deployment URL is real (not the placeholder).
#[derive(Clone)]
pub struct BaasClient {
    client: reqwest::Client,
    deployment_url: String,
}

impl BaasClient {
    pub fn new(deployment_url: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            deployment_url,
        }
    }

    async fn call<Resp>(
        &self,
        kind: &str,
        path: &str,
        args: impl Serialize + Sync,
    ) -> Result<Resp, RecordStoreError>
    where
        Resp: DeserializeOwned,
    {
        debug!("record store call: {path}");
        let url = format!("{}/api/{kind}", self.deployment_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .json(&json!({ "path": path, "args": [args], "format": "json" }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecordStoreError::Api(format!(
                "record store returned status {status}"
            )));
        }

        let envelope: FunctionResponse = response.json().await?;
        if envelope.status == "success" {
            serde_json::from_value(envelope.value.unwrap_or(serde_json::Value::Null))
                .map_err(|e| RecordStoreError::Api(format!("unexpected response shape: {e}")))
        } else {
            Err(map_function_error(
                envelope
                    .error_message
                    .unwrap_or_else(|| "unknown function error".to_string()),
            ))
        }
    }

    async fn mutation<Resp: DeserializeOwned>(
        &self,
        path: &str,
        args: impl Serialize + Sync,
    ) -> Result<Resp, RecordStoreError> {
        self.call("mutation", path, args).await
    }

    async fn query<Resp: DeserializeOwned>(
        &self,
        path: &str,
        args: impl Serialize + Sync,
    ) -> Result<Resp, RecordStoreError> {
        self.call("query", path, args).await
    }
}

#[async_trait]
impl RecordStore for BaasClient {
    async fn create_user(&self, new: NewUser) -> Result<UpsertOutcome, RecordStoreError> {
        self.mutation(CREATE_USER_FN, new).await
    }

    async fn update_user_profile(&self, patch: ProfilePatch) -> Result<(), RecordStoreError> {
        // Returns `{success, userId}`; nothing the caller needs.
        let _: serde_json::Value = self.mutation(UPDATE_USER_PROFILE_FN, patch).await?;
        Ok(())
    }

    async fn get_user_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<User>, RecordStoreError> {
        self.query(GET_USER_BY_ID_FN, json!({ "userId": external_id }))
            .await
    }

    async fn get_current_user(&self, external_id: &str) -> Result<User, RecordStoreError> {
        self.query(GET_CURRENT_USER_FN, json!({ "userId": external_id }))
            .await
    }
}
