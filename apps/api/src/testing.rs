//! Test doubles for the two external seams: a scriptable identity provider
//! and an in-memory user record store mirroring the backend's upsert
//! semantics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::auth::provider::{AuthError, IdentityProvider};
use crate::auth::session::Session;
use crate::errors::AppError;
use crate::records::{NewUser, ProfilePatch, RecordStore, RecordStoreError, UpsertOutcome, User};
use crate::storage::{PhotoStorage, PhotoUpload};

#[derive(Clone)]
struct MockAccount {
    external_id: String,
    email: Option<String>,
    password: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    is_anonymous: bool,
}

struct ProviderState {
    counter: u64,
    accounts: HashMap<String, MockAccount>,
    /// Minted id tokens, keyed back to the account they belong to.
    tokens: HashMap<String, String>,
}

pub struct MockIdentityProvider {
    state: Mutex<ProviderState>,
    fail_anonymous: AtomicBool,
    fail_sign_out: AtomicBool,
    profile_updates: AtomicU64,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProviderState {
                counter: 0,
                accounts: HashMap::new(),
                tokens: HashMap::new(),
            }),
            fail_anonymous: AtomicBool::new(false),
            fail_sign_out: AtomicBool::new(false),
            profile_updates: AtomicU64::new(0),
        }
    }

    /// Registers a password account fixture with a pinned external id.
    pub fn with_password_account(self, email: &str, password: &str, external_id: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.accounts.insert(
                external_id.to_string(),
                MockAccount {
                    external_id: external_id.to_string(),
                    email: Some(email.to_string()),
                    password: Some(password.to_string()),
                    display_name: None,
                    photo_url: None,
                    is_anonymous: false,
                },
            );
        }
        self
    }

    pub fn set_fail_anonymous(&self, fail: bool) {
        self.fail_anonymous.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    pub fn profile_update_count(&self) -> u64 {
        self.profile_updates.load(Ordering::SeqCst)
    }

    /// Synchronous anonymous sign-in, for tests that only need a minted
    /// token (no failure scripting).
    pub fn sign_in_anonymously_sync(&self) -> Session {
        let mut state = self.state.lock().unwrap();
        state.counter += 1;
        let external_id = format!("anon-{}", state.counter);
        let account = MockAccount {
            external_id: external_id.clone(),
            email: None,
            password: None,
            display_name: None,
            photo_url: None,
            is_anonymous: true,
        };
        state.accounts.insert(external_id.clone(), account.clone());
        Self::mint_session(&mut state, account)
    }

    fn mint_session(state: &mut ProviderState, account: MockAccount) -> Session {
        state.counter += 1;
        let id_token = format!("token-{}", state.counter);
        state
            .tokens
            .insert(id_token.clone(), account.external_id.clone());
        Session {
            external_id: account.external_id,
            is_anonymous: account.is_anonymous,
            email: account.email,
            display_name: account.display_name,
            photo_url: account.photo_url,
            id_token,
            refresh_token: None,
        }
    }

    fn get_or_create(state: &mut ProviderState, external_id: String, email: Option<String>) -> MockAccount {
        state
            .accounts
            .entry(external_id.clone())
            .or_insert_with(|| MockAccount {
                external_id,
                email,
                password: None,
                display_name: None,
                photo_url: None,
                is_anonymous: false,
            })
            .clone()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn sign_in_anonymously(&self) -> Result<Session, AuthError> {
        if self.fail_anonymous.load(Ordering::SeqCst) {
            return Err(AuthError::Api("anonymous sign-in unavailable".to_string()));
        }
        Ok(self.sign_in_anonymously_sync())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let mut state = self.state.lock().unwrap();
        if state
            .accounts
            .values()
            .any(|a| a.email.as_deref() == Some(email))
        {
            return Err(AuthError::Api(
                "An account already exists for this email".to_string(),
            ));
        }
        state.counter += 1;
        let external_id = format!("user-{}", state.counter);
        let account = MockAccount {
            external_id: external_id.clone(),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            display_name: None,
            photo_url: None,
            is_anonymous: false,
        };
        state.accounts.insert(external_id, account.clone());
        Ok(Self::mint_session(&mut state, account))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let mut state = self.state.lock().unwrap();
        let account = state
            .accounts
            .values()
            .find(|a| a.email.as_deref() == Some(email) && a.password.as_deref() == Some(password))
            .cloned()
            .ok_or_else(|| AuthError::Api("Invalid email or password".to_string()))?;
        Ok(Self::mint_session(&mut state, account))
    }

    async fn sign_in_with_idp(
        &self,
        provider_id: &str,
        provider_token: &str,
    ) -> Result<Session, AuthError> {
        let mut state = self.state.lock().unwrap();
        let external_id = format!("idp-{provider_token}");
        let email = Some(format!("{provider_token}@{provider_id}.example"));
        let account = Self::get_or_create(&mut state, external_id, email);
        Ok(Self::mint_session(&mut state, account))
    }

    async fn sign_in_with_custom_token(&self, token: &str) -> Result<Session, AuthError> {
        let mut state = self.state.lock().unwrap();
        let external_id = format!("custom-{token}");
        let account = Self::get_or_create(&mut state, external_id, None);
        Ok(Self::mint_session(&mut state, account))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AuthError::Api("sign-out rejected".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.tokens.remove(&session.id_token);
        Ok(())
    }

    async fn update_profile(
        &self,
        session: &Session,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();
        let account = state
            .accounts
            .get_mut(&session.external_id)
            .ok_or(AuthError::InvalidCredential)?;
        if let Some(name) = display_name {
            account.display_name = Some(name.to_string());
        }
        if let Some(url) = photo_url {
            account.photo_url = Some(url.to_string());
        }
        self.profile_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reload(&self, session: &Session) -> Result<Session, AuthError> {
        let state = self.state.lock().unwrap();
        let account = state
            .accounts
            .get(&session.external_id)
            .ok_or(AuthError::InvalidCredential)?;
        Ok(Session {
            external_id: account.external_id.clone(),
            is_anonymous: account.is_anonymous,
            email: account.email.clone(),
            display_name: account.display_name.clone(),
            photo_url: account.photo_url.clone(),
            id_token: session.id_token.clone(),
            refresh_token: session.refresh_token.clone(),
        })
    }

    async fn verify_token(&self, id_token: &str) -> Result<String, AuthError> {
        let state = self.state.lock().unwrap();
        state
            .tokens
            .get(id_token)
            .cloned()
            .ok_or(AuthError::InvalidCredential)
    }
}

pub struct MemoryRecordStore {
    users: Mutex<HashMap<String, User>>,
    fail: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn record_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn grant_points(&self, external_id: &str, points: i64) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.get_mut(external_id) {
            user.total_points = points;
        }
    }

    fn check_available(&self) -> Result<(), RecordStoreError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(RecordStoreError::Api("record store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create_user(&self, new: NewUser) -> Result<UpsertOutcome, RecordStoreError> {
        self.check_available()?;
        let now = Utc::now().timestamp_millis();
        let mut users = self.users.lock().unwrap();

        if let Some(existing) = users.get_mut(&new.external_id) {
            // Last write wins for the contact fields; counters and
            // created_at are untouched.
            existing.email = new.email;
            existing.display_name = new.display_name;
            existing.photo_url = new.photo_url;
            existing.last_login_at = now;
            Ok(UpsertOutcome {
                external_id: new.external_id,
                is_new: false,
            })
        } else {
            users.insert(
                new.external_id.clone(),
                User {
                    external_id: new.external_id.clone(),
                    email: new.email,
                    display_name: new.display_name,
                    photo_url: new.photo_url,
                    total_points: 0,
                    premium_status: false,
                    created_at: now,
                    last_login_at: now,
                },
            );
            Ok(UpsertOutcome {
                external_id: new.external_id,
                is_new: true,
            })
        }
    }

    async fn update_user_profile(&self, patch: ProfilePatch) -> Result<(), RecordStoreError> {
        self.check_available()?;
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&patch.external_id)
            .ok_or(RecordStoreError::NotFound)?;
        if let Some(name) = patch.display_name {
            user.display_name = Some(name);
        }
        if let Some(url) = patch.photo_url {
            user.photo_url = Some(url);
        }
        Ok(())
    }

    async fn get_user_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<User>, RecordStoreError> {
        self.check_available()?;
        Ok(self.users.lock().unwrap().get(external_id).cloned())
    }

    async fn get_current_user(&self, external_id: &str) -> Result<User, RecordStoreError> {
        self.get_user_by_external_id(external_id)
            .await?
            .ok_or(RecordStoreError::NotFound)
    }
}

pub struct MemoryPhotoStorage {
    uploads: Mutex<Vec<String>>,
}

impl MemoryPhotoStorage {
    pub fn new() -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl PhotoStorage for MemoryPhotoStorage {
    async fn upload_profile_photo(
        &self,
        external_id: &str,
        photo: &PhotoUpload,
    ) -> Result<String, AppError> {
        let mut uploads = self.uploads.lock().unwrap();
        let url = format!(
            "https://photos.test/{external_id}/{}-{}",
            uploads.len(),
            photo.filename
        );
        uploads.push(url.clone());
        Ok(url)
    }
}
