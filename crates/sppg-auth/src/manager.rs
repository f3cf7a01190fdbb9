//! Session Manager
//!
//! Single source of truth for the logged-in user and their credentials.
//! Every change is written to durable storage before it becomes visible in
//! memory, and user + tokens always change together under one write lock.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use sppg_api::{endpoints, ApiRequest, ApiResponse, Envelope, Transport};
use sppg_storage::KeyValueStore;

use crate::client::AuthorizedClient;
use crate::error::AuthError;
use crate::session::{keys, non_empty, Session};
use crate::token;
use crate::user::{PasswordChange, Permission, ProfileUpdate, Role, User};
use crate::wire::{LoginPayload, LoginRequest, ProfilePayload, RefreshPayload, RefreshRequest};
use crate::Result;

pub struct SessionManager {
    /// In-memory session, replaced as a whole
    state: Arc<RwLock<Session>>,
    /// Durable mirror of `state`
    store: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
    /// Serializes refreshes and logins so only one credential exchange is in flight
    refresh_gate: Arc<Mutex<()>>,
    initialized: Arc<watch::Sender<bool>>,
    disposed: Arc<AtomicBool>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>, transport: Arc<dyn Transport>) -> Self {
        let (initialized, _) = watch::channel(false);

        Self {
            state: Arc::new(RwLock::new(Session::default())),
            store,
            transport,
            refresh_gate: Arc::new(Mutex::new(())),
            initialized: Arc::new(initialized),
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Restore the persisted session. Always marks initialization complete,
    /// whatever the outcome, so a UI waiting on startup can proceed.
    pub async fn initialize(&self) -> Result<()> {
        let outcome = self.restore().await;
        self.initialized.send_replace(true);

        match &outcome {
            Ok(()) => tracing::info!(
                authenticated = self.is_authenticated(),
                "Initialized session"
            ),
            Err(e) => tracing::error!(error = %e, "Session initialization failed"),
        }

        outcome
    }

    async fn restore(&self) -> Result<()> {
        let Some(session) = self.load_persisted()? else {
            return Ok(());
        };
        let access_token = session.access_token.clone().unwrap_or_default();

        *self.state.write() = session;

        if !token::local_token_is_valid(&access_token) {
            tracing::info!("Stored access token expired; refreshing");
            if let Err(e) = self.refresh().await {
                // Keep the session; the next 401 will retry the refresh
                tracing::warn!(error = %e, "Startup refresh failed");
            }
        }

        Ok(())
    }

    /// Read the persisted session. A token without a readable user is
    /// discarded and `None` returned.
    fn load_persisted(&self) -> Result<Option<Session>> {
        let Some(access_token) = non_empty(self.store.get(keys::TOKEN)?) else {
            return Ok(None);
        };
        let refresh_token = non_empty(self.store.get(keys::REFRESH_TOKEN)?);

        let user = match self.store.get(keys::USER)?.map(|raw| serde_json::from_str::<User>(&raw)) {
            Some(Ok(user)) => user,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Stored user is corrupted; discarding session");
                self.clear()?;
                return Ok(None);
            }
            None => {
                tracing::warn!("Stored token has no user; discarding session");
                self.clear()?;
                return Ok(None);
            }
        };

        Ok(Some(Session::new(user, access_token, refresh_token)))
    }

    pub fn is_initialized(&self) -> bool {
        *self.initialized.borrow()
    }

    /// Resolve once `initialize` has finished.
    pub async fn wait_initialized(&self) {
        let mut rx = self.initialized.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close
        let _ = rx.wait_for(|done| *done).await;
    }

    /// Exchange credentials for a new session, replacing any existing one.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<User> {
        let _gate = self.refresh_gate.lock().await;

        let request = ApiRequest::post(endpoints::LOGIN).json(&LoginRequest {
            username: identifier.trim(),
            password: secret,
        })?;

        let response = self.transport.send(request).await.map_err(|e| {
            tracing::warn!(error = %e, "Login request failed");
            AuthError::from(e)
        })?;

        let payload = match Envelope::<LoginPayload>::decode(&response) {
            Envelope::Ok(payload) => payload,
            Envelope::Rejected(message) => {
                tracing::info!(status = response.status, "Login rejected");
                return Err(AuthError::Rejected(message));
            }
            Envelope::Malformed => return Err(AuthError::UnexpectedResponse),
        };

        let (Some(access_token), Some(user)) = (non_empty(payload.token), payload.user) else {
            return Err(AuthError::UnexpectedResponse);
        };
        let user = user.normalized();

        if payload.refresh_token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            tracing::warn!(user_id = %user.id, "Login issued no refresh token");
        }

        self.commit(Session::new(user.clone(), access_token, payload.refresh_token))?;
        self.disposed.store(false, Ordering::SeqCst);

        tracing::info!(user_id = %user.id, role = %user.role, "Logged in");

        Ok(user)
    }

    /// Current access token. Falls back to storage when memory is still empty,
    /// so calls racing `initialize` see the persisted token.
    pub fn get_access_token(&self) -> Result<Option<String>> {
        if let Some(token) = self.state.read().access_token.clone() {
            return Ok(Some(token));
        }
        if self.disposed.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(non_empty(self.store.get(keys::TOKEN)?))
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.read().refresh_token.clone()
    }

    /// Mint a new token pair from the refresh token.
    ///
    /// Returns `Ok(None)` when the session is unrecoverable (no refresh token,
    /// or the backend rejected it); the session has been cleared in that case.
    /// Transport failures are returned as errors and leave the session intact.
    pub async fn refresh(&self) -> Result<Option<String>> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// Refresh on behalf of a request that failed with the session token
    /// `failed_token`. If another caller already replaced that token while we
    /// waited for the gate, the newer token is returned without contacting
    /// the backend. `None` always refreshes.
    pub(crate) async fn refresh_after(&self, failed_token: Option<&str>) -> Result<Option<String>> {
        let _gate = self.refresh_gate.lock().await;

        let current = self.state.read().access_token.clone();
        if let (Some(failed), Some(current)) = (failed_token, current) {
            if failed != current {
                tracing::debug!("Token already refreshed by a concurrent request");
                return Ok(Some(current));
            }
        }

        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<Option<String>> {
        if self.disposed.load(Ordering::SeqCst) {
            return Ok(None);
        }

        // A request may race `initialize`; load the stored session first
        // rather than treating it as absent.
        let empty = self.state.read().is_empty();
        if empty {
            if let Some(session) = self.load_persisted()? {
                tracing::debug!("Loaded stored session for refresh");
                *self.state.write() = session;
            }
        }

        let Some(refresh_token) = self.refresh_token() else {
            tracing::warn!("No refresh token available; clearing session");
            self.clear()?;
            return Ok(None);
        };

        let request = ApiRequest::post(endpoints::REFRESH).json(&RefreshRequest {
            refresh_token: &refresh_token,
        })?;
        let response = self.transport.send(request).await?;

        match Envelope::<RefreshPayload>::decode(&response) {
            Envelope::Ok(payload) => {
                let Some(access_token) = non_empty(payload.token) else {
                    return Err(AuthError::UnexpectedResponse);
                };
                // Backends that do not rotate refresh tokens omit the field
                let refresh_token = non_empty(payload.refresh_token).or(Some(refresh_token));

                let Some(user) = self.current_user() else {
                    tracing::warn!("Session cleared during refresh");
                    return Ok(None);
                };

                self.commit(Session::new(user, access_token.clone(), refresh_token))?;
                tracing::info!("Refreshed access token");

                Ok(Some(access_token))
            }
            Envelope::Rejected(message) if rejects_credentials(response.status) => {
                tracing::warn!(
                    status = response.status,
                    reason = %message,
                    "Refresh token rejected; clearing session"
                );
                self.clear()?;
                Ok(None)
            }
            Envelope::Rejected(message) => Err(AuthError::Rejected(message)),
            Envelope::Malformed => Err(AuthError::UnexpectedResponse),
        }
    }

    /// Best-effort server logout, then unconditional local clear.
    pub async fn logout(&self) -> Result<()> {
        let _gate = self.refresh_gate.lock().await;

        let access_token = self.state.read().access_token.clone();
        if let Some(token) = access_token {
            let request = ApiRequest::post(endpoints::LOGOUT).bearer(&token);
            match self.transport.send(request).await {
                Ok(response) if !response.is_success() => {
                    tracing::warn!(status = response.status, "Server logout returned an error");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Server logout failed"),
            }
        }

        self.clear()?;
        tracing::info!("Logged out");

        Ok(())
    }

    /// Drop every in-memory field and every stored entry. Idempotent.
    pub fn clear(&self) -> Result<()> {
        let was_authenticated = {
            let mut state = self.state.write();
            let was = state.is_authenticated();
            *state = Session::default();
            was
        };

        self.store.remove_many(&keys::ALL)?;

        if was_authenticated {
            tracing::info!("Session cleared");
        }

        Ok(())
    }

    /// Release the in-memory session and stop refreshing. Persisted entries
    /// are kept for the next start.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        *self.state.write() = Session::default();
        tracing::debug!("Session manager disposed");
    }

    /// Pure offline check; see [`token::token_is_valid_at`].
    pub fn local_token_is_valid(token: &str) -> bool {
        token::local_token_is_valid(token)
    }

    pub fn session(&self) -> Session {
        self.state.read().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated()
    }

    pub fn client(&self) -> AuthorizedClient {
        AuthorizedClient::new(self.clone())
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Fetch the profile from the backend and store it.
    pub async fn get_current_user(&self) -> Result<User> {
        let response = self.client().send(ApiRequest::get(endpoints::ME)).await?;
        let user = decode_profile(&response)?;
        self.replace_user(user)
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<User> {
        let response = self
            .client()
            .send(ApiRequest::put(endpoints::ME).json(&update)?)
            .await?;
        let user = decode_profile(&response)?;

        tracing::info!(user_id = %user.id, "Updated profile");

        self.replace_user(user)
    }

    pub async fn change_password(&self, change: PasswordChange) -> Result<()> {
        let response = self
            .client()
            .send(ApiRequest::put(endpoints::CHANGE_PASSWORD).json(&change)?)
            .await?;

        match Envelope::<serde::de::IgnoredAny>::decode(&response) {
            Envelope::Ok(_) => {
                tracing::info!("Password changed");
                Ok(())
            }
            Envelope::Rejected(message) => Err(AuthError::Rejected(message)),
            Envelope::Malformed => Err(AuthError::UnexpectedResponse),
        }
    }

    pub fn is_owner(&self) -> bool {
        self.has_role(Role::Owner)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn is_pic(&self) -> bool {
        self.has_role(Role::Pic)
    }

    fn has_role(&self, role: Role) -> bool {
        self.state.read().user.as_ref().is_some_and(|u| u.role == role)
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        let state = self.state.read();
        state.is_authenticated()
            && state
                .user
                .as_ref()
                .is_some_and(|u| u.has_permission(permission))
    }

    /// Persist then publish a whole session.
    fn commit(&self, session: Session) -> Result<()> {
        let user_json = match &session.user {
            Some(user) => Some(serde_json::to_string(user)?),
            None => None,
        };

        let mut set: Vec<(&str, &str)> = Vec::with_capacity(3);
        let mut remove: Vec<&str> = Vec::new();
        for (key, value) in [
            (keys::TOKEN, session.access_token.as_deref()),
            (keys::REFRESH_TOKEN, session.refresh_token.as_deref()),
            (keys::USER, user_json.as_deref()),
        ] {
            match value {
                Some(value) => set.push((key, value)),
                None => remove.push(key),
            }
        }

        self.store.write_batch(&set, &remove)?;
        *self.state.write() = session;

        Ok(())
    }

    /// Swap in a fresh profile while keeping the tokens. A session that was
    /// cleared meanwhile stays cleared.
    fn replace_user(&self, user: User) -> Result<User> {
        let user = user.normalized();
        let mut session = self.session();
        if !session.is_authenticated() {
            return Err(AuthError::Unauthenticated);
        }

        session.user = Some(user.clone());
        self.commit(session)?;

        Ok(user)
    }
}

/// Statuses with which the refresh endpoint says the refresh token itself is
/// no good. 2xx appears here for `{success: false}` bodies.
fn rejects_credentials(status: u16) -> bool {
    matches!(status, 200..=299 | 400 | 401 | 403)
}

fn decode_profile(response: &ApiResponse) -> Result<User> {
    match Envelope::<ProfilePayload>::decode(response) {
        Envelope::Ok(payload) => Ok(payload.into_user()),
        Envelope::Rejected(message) => Err(AuthError::Rejected(message)),
        Envelope::Malformed => Err(AuthError::UnexpectedResponse),
    }
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            store: Arc::clone(&self.store),
            transport: Arc::clone(&self.transport),
            refresh_gate: Arc::clone(&self.refresh_gate),
            initialized: Arc::clone(&self.initialized),
            disposed: Arc::clone(&self.disposed),
        }
    }
}
