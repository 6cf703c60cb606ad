//! Bearer-authorized CRUD client for the backend's `/users` and `/roles` resources.
//!
//! Each operation exists twice: a `fetch_*`/`submit_*` form returning
//! `ClientResult` so callers can tell "not found" from "server unreachable", and
//! a best-effort form (`list_users`, `delete_user`, ...) that logs the failure
//! and returns an empty list, `None` or `false`.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::ProfileSource;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::models::{Role, RoleCreate, RoleUpdate, User, UserCreate, UserUpdate};
use crate::notify::{Notifier, Observable};

pub struct DirectoryClient {
    cfg: ClientConfig,
    http: reqwest::Client,
    notifier: Notifier,
}

fn settle<T>(op: &'static str, res: ClientResult<T>, fallback: T) -> T {
    match res {
        Ok(v) => v,
        Err(e) => {
            warn!(op, code = e.code_str(), status = e.status(), error = %e, "directory_call_failed");
            fallback
        }
    }
}

impl DirectoryClient {
    pub fn new(cfg: ClientConfig, http: reqwest::Client) -> Self {
        Self { cfg, http, notifier: Notifier::new() }
    }

    pub fn from_config(cfg: &ClientConfig) -> ClientResult<Self> {
        Ok(Self::new(cfg.clone(), cfg.http_client()?))
    }

    fn request(&self, method: Method, path: &str, token: &str) -> ClientResult<RequestBuilder> {
        Ok(self.http.request(method, self.cfg.endpoint(path)?).bearer_auth(token))
    }

    /// Send and require exactly `expect`; anything else becomes a protocol error.
    async fn send(&self, req: RequestBuilder, expect: StatusCode) -> ClientResult<reqwest::Response> {
        let resp = req.send().await?;
        let status = resp.status();
        if status != expect {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::protocol(status.as_u16(), body));
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, token: &str, path: &str) -> ClientResult<T> {
        let resp = self.send(self.request(Method::GET, path, token)?, StatusCode::OK).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(format!("GET {}: {}", path, e)))
    }

    async fn write_json<B: Serialize + ?Sized>(&self, method: Method, token: &str, path: &str, body: &B, expect: StatusCode) -> ClientResult<()> {
        let req = self.request(method.clone(), path, token)?.json(body);
        self.send(req, expect).await?;
        debug!(method = %method, path, "directory_write_ok");
        self.notifier.notify();
        Ok(())
    }

    async fn delete(&self, token: &str, path: &str) -> ClientResult<()> {
        self.send(self.request(Method::DELETE, path, token)?, StatusCode::OK).await?;
        debug!(path, "directory_delete_ok");
        self.notifier.notify();
        Ok(())
    }

    // ---- users, explicit results ----

    pub async fn fetch_users(&self, token: &str) -> ClientResult<Vec<User>> {
        self.get_json(token, "/users").await
    }

    pub async fn fetch_user(&self, token: &str, id: i64) -> ClientResult<User> {
        self.get_json(token, &format!("/users/{}", id)).await
    }

    /// The signed-in user via the configured profile path. A backend without
    /// that endpoint (404/405) or with the lookup disabled yields `Ok(None)`.
    pub async fn fetch_current_user(&self, token: &str) -> ClientResult<Option<User>> {
        let Some(path) = self.cfg.profile_path.as_deref() else { return Ok(None) };
        match self.get_json::<User>(token, path).await {
            Ok(u) => Ok(Some(u)),
            Err(ClientError::Protocol { status: 404 | 405, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn submit_user_create(&self, token: &str, user: &UserCreate) -> ClientResult<()> {
        self.write_json(Method::POST, token, "/users", user, StatusCode::CREATED).await
    }

    pub async fn submit_user_update(&self, token: &str, id: i64, update: &UserUpdate) -> ClientResult<()> {
        self.write_json(Method::PUT, token, &format!("/users/{}", id), update, StatusCode::OK).await
    }

    pub async fn submit_user_delete(&self, token: &str, id: i64) -> ClientResult<()> {
        self.delete(token, &format!("/users/{}", id)).await
    }

    // ---- users, best effort ----

    pub async fn list_users(&self, token: &str) -> Vec<User> {
        settle("list_users", self.fetch_users(token).await, Vec::new())
    }

    pub async fn get_user(&self, token: &str, id: i64) -> Option<User> {
        settle("get_user", self.fetch_user(token, id).await.map(Some), None)
    }

    pub async fn create_user(&self, token: &str, user: &UserCreate) -> bool {
        settle("create_user", self.submit_user_create(token, user).await.map(|_| true), false)
    }

    pub async fn update_user(&self, token: &str, id: i64, update: &UserUpdate) -> bool {
        settle("update_user", self.submit_user_update(token, id, update).await.map(|_| true), false)
    }

    pub async fn delete_user(&self, token: &str, id: i64) -> bool {
        settle("delete_user", self.submit_user_delete(token, id).await.map(|_| true), false)
    }

    // ---- roles ----

    pub async fn fetch_roles(&self, token: &str) -> ClientResult<Vec<Role>> {
        self.get_json(token, "/roles").await
    }

    pub async fn fetch_role(&self, token: &str, id: i64) -> ClientResult<Role> {
        self.get_json(token, &format!("/roles/{}", id)).await
    }

    pub async fn submit_role_create(&self, token: &str, role: &RoleCreate) -> ClientResult<()> {
        self.write_json(Method::POST, token, "/roles", role, StatusCode::CREATED).await
    }

    pub async fn submit_role_update(&self, token: &str, id: i64, update: &RoleUpdate) -> ClientResult<()> {
        self.write_json(Method::PUT, token, &format!("/roles/{}", id), update, StatusCode::OK).await
    }

    pub async fn submit_role_delete(&self, token: &str, id: i64) -> ClientResult<()> {
        self.delete(token, &format!("/roles/{}", id)).await
    }

    pub async fn list_roles(&self, token: &str) -> Vec<Role> {
        settle("list_roles", self.fetch_roles(token).await, Vec::new())
    }

    pub async fn get_role(&self, token: &str, id: i64) -> Option<Role> {
        settle("get_role", self.fetch_role(token, id).await.map(Some), None)
    }

    pub async fn create_role(&self, token: &str, role: &RoleCreate) -> bool {
        settle("create_role", self.submit_role_create(token, role).await.map(|_| true), false)
    }

    pub async fn update_role(&self, token: &str, id: i64, update: &RoleUpdate) -> bool {
        settle("update_role", self.submit_role_update(token, id, update).await.map(|_| true), false)
    }

    pub async fn delete_role(&self, token: &str, id: i64) -> bool {
        settle("delete_role", self.submit_role_delete(token, id).await.map(|_| true), false)
    }
}

impl Observable for DirectoryClient {
    fn notifier(&self) -> &Notifier { &self.notifier }
}

#[async_trait]
impl ProfileSource for DirectoryClient {
    async fn current_user(&self, token: &str) -> ClientResult<Option<User>> {
        self.fetch_current_user(token).await
    }
}
