use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use super::session::{ProfileSource, Session, SessionState};
use super::strategy::{should_fall_back, CredentialStrategy};
use crate::error::AuthError;
use crate::models::User;
use crate::notify::{Notifier, Observable};
use crate::storage::{SessionStore, USER_KEY};

/// Owns the client session: loads it from storage, logs in through an ordered
/// list of credential strategies, logs out, and tells subscribers after every
/// observable change (exactly one notification per call).
///
/// Construct one per application and share it by `Arc`.
pub struct AuthSessionManager {
    store: SessionStore,
    strategies: Vec<Arc<dyn CredentialStrategy>>,
    profile: Option<Arc<dyn ProfileSource>>,
    session: RwLock<Session>,
    initialized: OnceCell<()>,
    /// Single-flight guard: at most one login attempt per manager.
    login_flight: Mutex<()>,
    notifier: Notifier,
}

impl AuthSessionManager {
    pub fn new(store: SessionStore, strategies: Vec<Arc<dyn CredentialStrategy>>) -> Self {
        Self {
            store,
            strategies,
            profile: None,
            session: RwLock::new(Session::default()),
            initialized: OnceCell::new(),
            login_flight: Mutex::new(()),
            notifier: Notifier::new(),
        }
    }

    pub fn with_profile_source(mut self, profile: Arc<dyn ProfileSource>) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn store(&self) -> &SessionStore { &self.store }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn state(&self) -> SessionState {
        if !self.initialized.initialized() && !self.session.read().is_authenticated() {
            return SessionState::Uninitialized;
        }
        if self.session.read().is_authenticated() { SessionState::Authenticated } else { SessionState::Anonymous }
    }

    pub fn is_authenticated(&self) -> bool { self.session.read().is_authenticated() }
    pub fn token(&self) -> Option<String> { self.session.read().token.clone() }
    pub fn current_user(&self) -> Option<User> { self.session.read().user.clone() }
    pub fn session(&self) -> Session { self.session.read().clone() }

    /// Load the persisted session once. Later (or concurrent) calls wait for
    /// the first one and change nothing. Notifies only if a token was restored.
    pub async fn initialize(&self) -> SessionState {
        self.initialized
            .get_or_init(|| async {
                let Some(token) = self.store.load_token().await else {
                    debug!("session_restore_none");
                    return;
                };
                let user = self.store.load_user().await;
                let restored = {
                    let mut s = self.session.write();
                    // A login that finished first wins over the stored copy.
                    let vacant = s.token.is_none();
                    if vacant {
                        *s = Session::authenticated(token, user);
                    }
                    vacant
                };
                if !restored {
                    debug!("session_restore_superseded_by_login");
                    return;
                }
                info!("session_restored");
                self.notifier.notify();
            })
            .await;
        self.state()
    }

    /// Best-effort adapter over `try_login`: failures are logged, never raised.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        match self.try_login(email, password).await {
            Ok(_) => true,
            Err(e) => {
                warn!(code = e.code_str(), error = %e, "login_failed");
                false
            }
        }
    }

    /// Try each strategy in order. A strategy failure moves on to the next one
    /// only when the request apparently never reached the server (connection
    /// failure or a CORS block); any other failure ends the attempt. Every call
    /// starts again from the first strategy.
    pub async fn try_login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let _flight = self.login_flight.try_lock().map_err(|_| AuthError::LoginInFlight)?;
        let mut last_retryable = None;
        for strategy in self.strategies.iter() {
            let name = strategy.name();
            debug!(strategy = name, "login_attempt");
            match strategy.authenticate(email, password).await {
                Ok(resp) => {
                    let Some(token) = resp.token() else {
                        return Err(AuthError::MissingToken { strategy: name });
                    };
                    let session = self.establish(token.to_string()).await;
                    info!(strategy = name, user = session.user.as_ref().map(|u| u.id), "login_ok");
                    return Ok(session);
                }
                Err(e) if should_fall_back(&e) => {
                    warn!(strategy = name, code = e.code_str(), error = %e, "login_strategy_fallback");
                    last_retryable = Some(e);
                }
                Err(e) => return Err(AuthError::Rejected { strategy: name, source: e }),
            }
        }
        Err(match last_retryable {
            Some(e) => AuthError::Exhausted(e),
            None => AuthError::NoStrategy,
        })
    }

    async fn establish(&self, token: String) -> Session {
        // Login supersedes whatever initialize() would have restored.
        let _ = self.initialized.set(());
        *self.session.write() = Session::authenticated(token.clone(), None);
        if let Err(e) = self.store.save_token(&token).await {
            warn!(code = e.code_str(), error = %e, "session_token_persist_failed");
        }
        let user = self.fetch_profile(&token).await;
        match &user {
            Some(u) => {
                self.session.write().user = Some(u.clone());
                if let Err(e) = self.store.save_user(u).await {
                    warn!(code = e.code_str(), error = %e, "session_user_persist_failed");
                }
            }
            None => {
                if let Err(e) = self.store.remove(USER_KEY).await {
                    warn!(code = e.code_str(), error = %e, "session_user_clear_failed");
                }
            }
        }
        self.notifier.notify();
        self.session()
    }

    async fn fetch_profile(&self, token: &str) -> Option<User> {
        let profile = self.profile.as_ref()?;
        match profile.current_user(token).await {
            Ok(u) => u,
            Err(e) => {
                debug!(code = e.code_str(), error = %e, "profile_lookup_failed");
                None
            }
        }
    }

    /// Drop the session in memory and in storage. Always notifies, even when
    /// there was nothing to drop.
    pub async fn logout(&self) {
        let was = std::mem::take(&mut *self.session.write());
        if let Err(e) = self.store.clear().await {
            warn!(code = e.code_str(), error = %e, "session_clear_failed");
        }
        if was.is_authenticated() { info!("logout"); }
        self.notifier.notify();
    }

    /// Replace the user ref (e.g. after a separate profile fetch). It is only
    /// persisted alongside a token; an anonymous session keeps it in memory.
    pub async fn set_current_user(&self, user: User) {
        let persist = {
            let mut s = self.session.write();
            s.user = Some(user.clone());
            s.is_authenticated()
        };
        if persist {
            if let Err(e) = self.store.save_user(&user).await {
                warn!(code = e.code_str(), error = %e, "session_user_persist_failed");
            }
        } else {
            debug!(user = user.id, "session_user_not_persisted_without_token");
        }
        self.notifier.notify();
    }
}

impl Observable for AuthSessionManager {
    fn notifier(&self) -> &Notifier { &self.notifier }
}
