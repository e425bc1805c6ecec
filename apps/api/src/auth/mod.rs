//! Identity Session Manager — owns the process-wide provider session,
//! reconciles every observed session into the user record store, and
//! publishes snapshots to subscribers.
//!
//! Concurrency note: all writes to the session happen in the action
//! handlers below; there is no cancellation or coalescing, so two in-flight
//! actions both run to completion (a double-clicked sign-in races, last
//! write wins).

pub mod provider;
pub mod session;

use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::records::{NewUser, ProfilePatch, RecordStore};
use crate::storage::{PhotoStorage, PhotoUpload};
use provider::IdentityProvider;
use session::{Session, SessionSnapshot, SessionState};

pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    /// `None` is the degraded mode: the backend-as-a-service is not
    /// configured and reconciliation is skipped entirely.
    records: Option<Arc<dyn RecordStore>>,
    storage: Arc<dyn PhotoStorage>,
    session: RwLock<Option<Session>>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        records: Option<Arc<dyn RecordStore>>,
        storage: Arc<dyn PhotoStorage>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::initial());
        Self {
            provider,
            records,
            storage,
            session: RwLock::new(None),
            snapshot_tx,
        }
    }

    /// Subscribes to session snapshots. Publication is decoupled from the
    /// store's write path: a new snapshot goes out on every actual session
    /// transition, after reconciliation has completed.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Startup bootstrap: a custom token injected by the hosting
    /// environment wins; otherwise the process starts on a fresh anonymous
    /// session. A provider failure here leaves the manager in the terminal
    /// `Error` state until the next explicit sign-in action.
    pub async fn initialize(&self, custom_token: Option<&str>) -> Result<SessionSnapshot, AppError> {
        let result = match custom_token {
            Some(token) => {
                info!("Bootstrap token found, signing in with custom token");
                self.provider.sign_in_with_custom_token(token).await
            }
            None => {
                info!("No bootstrap token, signing in anonymously");
                self.provider.sign_in_anonymously().await
            }
        };

        match result {
            Ok(session) => {
                self.install_session(session).await;
                Ok(self.snapshot())
            }
            Err(e) => {
                self.publish_error(&e.to_string()).await;
                Err(e.into())
            }
        }
    }

    pub async fn sign_in_anonymously(&self) -> Result<SessionSnapshot, AppError> {
        let session = self.provider.sign_in_anonymously().await?;
        self.install_session(session).await;
        Ok(self.snapshot())
    }

    pub async fn sign_in_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionSnapshot, AppError> {
        let session = self.provider.sign_in_with_password(email, password).await?;
        self.install_session(session).await;
        Ok(self.snapshot())
    }

    pub async fn sign_up_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionSnapshot, AppError> {
        let session = self.provider.sign_up(email, password).await?;
        self.install_session(session).await;
        Ok(self.snapshot())
    }

    pub async fn sign_in_with_federated(
        &self,
        provider_id: &str,
        provider_token: &str,
    ) -> Result<SessionSnapshot, AppError> {
        let session = self
            .provider
            .sign_in_with_idp(provider_id, provider_token)
            .await?;
        self.install_session(session).await;
        Ok(self.snapshot())
    }

    /// Destroys the current session, then immediately re-establishes an
    /// anonymous one so the process is never without a session. If the
    /// fallback sign-in fails too, the manager publishes an explicit
    /// no-session `Error` snapshot instead of retrying.
    pub async fn sign_out(&self) -> Result<SessionSnapshot, AppError> {
        let current = self.session.read().await.clone();
        if let Some(session) = &current {
            self.provider.sign_out(session).await?;
        }
        *self.session.write().await = None;

        match self.provider.sign_in_anonymously().await {
            Ok(session) => {
                self.install_session(session).await;
                Ok(self.snapshot())
            }
            Err(e) => {
                let message = format!("signed out, but anonymous re-authentication failed: {e}");
                self.publish_error(&message).await;
                Err(AppError::Auth(message))
            }
        }
    }

    /// Edits the provider-side profile and mirrors the change into the user
    /// record. Anonymous identities are not allowed to carry profile data;
    /// that precondition (and the no-session one) is checked before any
    /// network call.
    pub async fn update_profile(
        &self,
        display_name: Option<String>,
        photo: Option<PhotoUpload>,
    ) -> Result<SessionSnapshot, AppError> {
        let session = self.session.read().await.clone();
        let Some(session) = session else {
            return Err(AppError::Precondition("no user is signed in".to_string()));
        };
        if session.is_anonymous {
            return Err(AppError::Precondition(
                "anonymous users cannot update their profile".to_string(),
            ));
        }

        let mut uploaded_url = None;
        if let Some(photo) = &photo {
            uploaded_url = Some(
                self.storage
                    .upload_profile_photo(&session.external_id, photo)
                    .await?,
            );
        }

        // The provider keeps whichever fields the caller left out.
        let provider_name = display_name.clone().or_else(|| session.display_name.clone());
        let provider_photo = uploaded_url.clone().or_else(|| session.photo_url.clone());
        self.provider
            .update_profile(&session, provider_name.as_deref(), provider_photo.as_deref())
            .await?;

        // Record-store patch is best effort: a failure is logged and
        // surfaced as a snapshot warning, never rolled back.
        let mut sync_warning = None;
        if let Some(records) = &self.records {
            let patch = ProfilePatch {
                external_id: session.external_id.clone(),
                display_name: display_name.clone(),
                photo_url: uploaded_url.clone(),
            };
            if let Err(e) = records.update_user_profile(patch).await {
                warn!("Failed to sync profile to user record: {e}");
                sync_warning = Some(format!("user record sync failed: {e}"));
            }
        }

        // Reload so observers see the provider's view, not our guess.
        let refreshed = self.provider.reload(&session).await?;
        self.replace_session(refreshed, sync_warning).await;
        Ok(self.snapshot())
    }

    /// Session-change reconciliation: installs the session and publishes a
    /// snapshot only after the user record upsert has completed, so a
    /// non-loading snapshot never carries an unsynced record.
    async fn install_session(&self, session: Session) {
        let sync_warning = self.reconcile(&session).await;
        self.replace_session(session, sync_warning).await;
    }

    /// Installs a session without reconciling. Used where no state
    /// transition happened (profile reload); reconciliation runs at most
    /// once per actual transition.
    async fn replace_session(&self, session: Session, sync_warning: Option<String>) {
        *self.session.write().await = Some(session.clone());
        self.snapshot_tx.send_replace(SessionSnapshot {
            state: session.state(),
            session: Some(session),
            loading: false,
            error: None,
            sync_warning,
        });
    }

    async fn publish_error(&self, message: &str) {
        *self.session.write().await = None;
        self.snapshot_tx.send_replace(SessionSnapshot {
            state: SessionState::Error,
            session: None,
            loading: false,
            error: Some(message.to_string()),
            sync_warning: None,
        });
    }

    /// Upserts a user record for the observed session. Best effort: a
    /// failure leaves the session valid and comes back as a warning.
    async fn reconcile(&self, session: &Session) -> Option<String> {
        let Some(records) = &self.records else {
            debug!("Record store not configured, skipping user sync");
            return None;
        };

        let result = records
            .create_user(NewUser {
                external_id: session.external_id.clone(),
                email: session.email.clone(),
                display_name: session.display_name.clone(),
                photo_url: session.photo_url.clone(),
            })
            .await;

        match result {
            Ok(outcome) if outcome.is_new => {
                info!(external_id = %outcome.external_id, "New user record created");
                None
            }
            Ok(outcome) => {
                debug!(external_id = %outcome.external_id, "User record refreshed");
                None
            }
            Err(e) => {
                warn!("Failed to sync user record: {e}");
                Some(format!("user record sync failed: {e}"))
            }
        }
    }
}
