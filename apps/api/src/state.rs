use std::sync::Arc;

use crate::auth::provider::IdentityProvider;
use crate::auth::SessionManager;
use crate::config::Config;
use crate::records::RecordStore;

/// Shared application state injected into all route handlers via Axum
/// extractors. Constructed once at startup; the one long-lived client per
/// external service lives here, never in module-level globals.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub provider: Arc<dyn IdentityProvider>,
    /// `None` when the backend-as-a-service is unconfigured (degraded
    /// mode): record sync is skipped, direct lookups are unavailable.
    pub records: Option<Arc<dyn RecordStore>>,
    pub config: Config,
}
