use serde::Serialize;

/// A live identity-provider session. Transient: owned by the session
/// manager, never persisted by this service. The provider creates it on
/// sign-in and it dies on sign-out.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Stable provider identifier for the account (`localId`).
    pub external_id: String,
    pub is_anonymous: bool,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    /// Bearer credential for provider-side calls on behalf of this session.
    pub id_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
}

/// Session lifecycle: `Uninitialized → Anonymous ⇄ Authenticated`, with a
/// terminal `Error` reachable when provider calls fail during
/// initialization or when sign-out loses its anonymous fallback.
/// `Authenticated → Anonymous` happens only via explicit sign-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Anonymous,
    Authenticated,
    Error,
}

/// What subscribers observe. Published on every actual session transition,
/// after reconciliation with the user record store has completed, so a
/// non-loading snapshot never carries an unsynced record (outside the
/// deliberate degraded mode).
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub session: Option<Session>,
    /// True until the first sign-in attempt (and its reconciliation) has
    /// finished, matching the app-level loading screen of the UI.
    pub loading: bool,
    pub error: Option<String>,
    /// Non-fatal notice that the last record-store sync failed. The session
    /// itself is still valid.
    pub sync_warning: Option<String>,
}

impl SessionSnapshot {
    pub fn initial() -> Self {
        Self {
            state: SessionState::Uninitialized,
            session: None,
            loading: true,
            error: None,
            sync_warning: None,
        }
    }
}

impl Session {
    pub fn state(&self) -> SessionState {
        if self.is_anonymous {
            SessionState::Anonymous
        } else {
            SessionState::Authenticated
        }
    }
}
