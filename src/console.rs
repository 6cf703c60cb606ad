//! `AdminConsole`: the single observable surface a presentation layer talks to.
//! It mirrors the session manager's state and the directory's operations,
//! refuses directory calls without a token (no request is sent), and re-emits
//! every notification of either collaborator. It keeps no state of its own.

use std::sync::Arc;

use tracing::debug;

use crate::auth::{default_strategies, AuthSessionManager, Session, SessionState};
use crate::config::ClientConfig;
use crate::directory::DirectoryClient;
use crate::error::{AuthError, ClientError, ClientResult};
use crate::models::{Role, RoleCreate, RoleUpdate, User, UserCreate, UserUpdate};
use crate::notify::{Notifier, Observable, SubscriptionId};
use crate::storage::SessionStore;

pub struct AdminConsole {
    auth: Arc<AuthSessionManager>,
    directory: Arc<DirectoryClient>,
    notifier: Arc<Notifier>,
    auth_sub: SubscriptionId,
    directory_sub: SubscriptionId,
}

impl AdminConsole {
    pub fn new(auth: Arc<AuthSessionManager>, directory: Arc<DirectoryClient>) -> Self {
        let notifier = Arc::new(Notifier::new());
        let n = notifier.clone();
        let auth_sub = auth.subscribe(move || n.notify());
        let n = notifier.clone();
        let directory_sub = directory.subscribe(move || n.notify());
        Self { auth, directory, notifier, auth_sub, directory_sub }
    }

    /// Wire the default stack: one HTTP client, primary + alternative credential
    /// strategies, the directory as profile source, file or memory session storage.
    pub fn from_config(cfg: &ClientConfig) -> ClientResult<Self> {
        let http = cfg.http_client()?;
        let store = match &cfg.store_path {
            Some(p) => SessionStore::file(p),
            None => SessionStore::in_memory(),
        };
        let directory = Arc::new(DirectoryClient::new(cfg.clone(), http.clone()));
        let auth = AuthSessionManager::new(store, default_strategies(cfg, http)?)
            .with_profile_source(directory.clone());
        Ok(Self::new(Arc::new(auth), directory))
    }

    pub fn auth(&self) -> &Arc<AuthSessionManager> { &self.auth }
    pub fn directory(&self) -> &Arc<DirectoryClient> { &self.directory }

    // ---- session mirror ----

    pub fn is_authenticated(&self) -> bool { self.auth.is_authenticated() }
    pub fn current_user(&self) -> Option<User> { self.auth.current_user() }
    pub fn token(&self) -> Option<String> { self.auth.token() }
    pub fn session(&self) -> Session { self.auth.session() }
    pub fn state(&self) -> SessionState { self.auth.state() }

    pub async fn initialize(&self) -> SessionState { self.auth.initialize().await }
    pub async fn login(&self, email: &str, password: &str) -> bool { self.auth.login(email, password).await }
    pub async fn try_login(&self, email: &str, password: &str) -> Result<Session, AuthError> { self.auth.try_login(email, password).await }
    pub async fn logout(&self) { self.auth.logout().await }
    pub async fn set_current_user(&self, user: User) { self.auth.set_current_user(user).await }

    fn bearer(&self, op: &'static str) -> Option<String> {
        let token = self.auth.token();
        if token.is_none() { debug!(op, "directory_call_without_token"); }
        token
    }

    fn require(&self, op: &'static str) -> ClientResult<String> {
        self.bearer(op).ok_or(ClientError::NotAuthenticated)
    }

    // ---- users ----

    pub async fn list_users(&self) -> Vec<User> {
        let Some(t) = self.bearer("list_users") else { return Vec::new() };
        self.directory.list_users(&t).await
    }

    pub async fn get_user(&self, id: i64) -> Option<User> {
        let t = self.bearer("get_user")?;
        self.directory.get_user(&t, id).await
    }

    pub async fn create_user(&self, user: &UserCreate) -> bool {
        let Some(t) = self.bearer("create_user") else { return false };
        self.directory.create_user(&t, user).await
    }

    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> bool {
        let Some(t) = self.bearer("update_user") else { return false };
        self.directory.update_user(&t, id, update).await
    }

    pub async fn delete_user(&self, id: i64) -> bool {
        let Some(t) = self.bearer("delete_user") else { return false };
        self.directory.delete_user(&t, id).await
    }

    pub async fn fetch_users(&self) -> ClientResult<Vec<User>> {
        let t = self.require("fetch_users")?;
        self.directory.fetch_users(&t).await
    }

    pub async fn fetch_user(&self, id: i64) -> ClientResult<User> {
        let t = self.require("fetch_user")?;
        self.directory.fetch_user(&t, id).await
    }

    pub async fn submit_user_create(&self, user: &UserCreate) -> ClientResult<()> {
        let t = self.require("submit_user_create")?;
        self.directory.submit_user_create(&t, user).await
    }

    pub async fn submit_user_update(&self, id: i64, update: &UserUpdate) -> ClientResult<()> {
        let t = self.require("submit_user_update")?;
        self.directory.submit_user_update(&t, id, update).await
    }

    pub async fn submit_user_delete(&self, id: i64) -> ClientResult<()> {
        let t = self.require("submit_user_delete")?;
        self.directory.submit_user_delete(&t, id).await
    }

    /// Re-read the signed-in user from the backend and store it on the session.
    pub async fn refresh_current_user(&self) -> ClientResult<Option<User>> {
        let t = self.require("refresh_current_user")?;
        let user = self.directory.fetch_current_user(&t).await?;
        if let Some(u) = &user {
            self.auth.set_current_user(u.clone()).await;
        }
        Ok(user)
    }

    // ---- roles ----

    pub async fn list_roles(&self) -> Vec<Role> {
        let Some(t) = self.bearer("list_roles") else { return Vec::new() };
        self.directory.list_roles(&t).await
    }

    pub async fn get_role(&self, id: i64) -> Option<Role> {
        let t = self.bearer("get_role")?;
        self.directory.get_role(&t, id).await
    }

    pub async fn create_role(&self, role: &RoleCreate) -> bool {
        let Some(t) = self.bearer("create_role") else { return false };
        self.directory.create_role(&t, role).await
    }

    pub async fn update_role(&self, id: i64, update: &RoleUpdate) -> bool {
        let Some(t) = self.bearer("update_role") else { return false };
        self.directory.update_role(&t, id, update).await
    }

    pub async fn delete_role(&self, id: i64) -> bool {
        let Some(t) = self.bearer("delete_role") else { return false };
        self.directory.delete_role(&t, id).await
    }

    pub async fn fetch_roles(&self) -> ClientResult<Vec<Role>> {
        let t = self.require("fetch_roles")?;
        self.directory.fetch_roles(&t).await
    }

    pub async fn fetch_role(&self, id: i64) -> ClientResult<Role> {
        let t = self.require("fetch_role")?;
        self.directory.fetch_role(&t, id).await
    }

    pub async fn submit_role_create(&self, role: &RoleCreate) -> ClientResult<()> {
        let t = self.require("submit_role_create")?;
        self.directory.submit_role_create(&t, role).await
    }

    pub async fn submit_role_update(&self, id: i64, update: &RoleUpdate) -> ClientResult<()> {
        let t = self.require("submit_role_update")?;
        self.directory.submit_role_update(&t, id, update).await
    }

    pub async fn submit_role_delete(&self, id: i64) -> ClientResult<()> {
        let t = self.require("submit_role_delete")?;
        self.directory.submit_role_delete(&t, id).await
    }
}

impl Observable for AdminConsole {
    fn notifier(&self) -> &Notifier { &self.notifier }
}

impl Drop for AdminConsole {
    fn drop(&mut self) {
        self.auth.notifier().unsubscribe(self.auth_sub);
        self.directory.notifier().unsubscribe(self.directory_sub);
    }
}
