//! In-process mock of the admin backend used by the integration tests.
//! Bound to 127.0.0.1:0; every request is recorded so tests can assert on
//! what was (or was not) sent.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub enum LoginReply {
    /// Check credentials and answer with the given token.
    Token(String),
    /// 200 without an access_token.
    NoToken,
    /// Fixed status, empty body.
    Status(u16),
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Debug)]
pub struct BackendState {
    pub email: String,
    pub password: String,
    pub login: LoginReply,
    pub profile_enabled: bool,
    pub users: BTreeMap<i64, Value>,
    pub roles: BTreeMap<i64, Value>,
    pub requests: Vec<Recorded>,
}

#[derive(Clone)]
pub struct Backend(pub Arc<Mutex<BackendState>>);

impl Default for Backend {
    fn default() -> Self { Self::new() }
}

impl Backend {
    pub fn new() -> Self {
        let admin = json!({"id": 1, "name": "admin"});
        let mut users = BTreeMap::new();
        users.insert(1, json!({"id": 1, "email": "a@b.com", "full_name": "Ada", "profile_image_url": null, "profile_image_base64": null, "role": admin}));
        users.insert(42, json!({"id": 42, "email": "bob@b.com", "full_name": null, "role": {"id": 2, "name": "viewer"}}));
        let mut roles = BTreeMap::new();
        roles.insert(1, json!({"id": 1, "name": "admin"}));
        roles.insert(2, json!({"id": 2, "name": "viewer"}));
        Self(Arc::new(Mutex::new(BackendState {
            email: "a@b.com".into(),
            password: "x".into(),
            login: LoginReply::Token("T1".into()),
            profile_enabled: false,
            users,
            roles,
            requests: Vec::new(),
        })))
    }

    pub fn with_login(self, reply: LoginReply) -> Self {
        self.0.lock().login = reply;
        self
    }

    pub fn with_profile(self) -> Self {
        self.0.lock().profile_enabled = true;
        self
    }

    pub fn requests(&self) -> Vec<Recorded> { self.0.lock().requests.clone() }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.0.lock().requests.iter().filter(|r| r.method == method && r.path == path).count()
    }

    pub fn last(&self, method: &str, path: &str) -> Option<Recorded> {
        self.0.lock().requests.iter().rev().find(|r| r.method == method && r.path == path).cloned()
    }

    fn record(&self, method: &str, path: String, headers: &HeaderMap, body: String) {
        let h = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(|s| s.to_string());
        self.0.lock().requests.push(Recorded {
            method: method.to_string(),
            path,
            authorization: h("authorization"),
            content_type: h("content-type"),
            body,
        });
    }

    /// The token the backend currently accepts, if login issues one.
    fn issued_token(&self) -> Option<String> {
        match &self.0.lock().login {
            LoginReply::Token(t) => Some(t.clone()),
            _ => None,
        }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(token) = self.issued_token() else { return false };
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {}", token))
            .unwrap_or(false)
    }
}

pub fn parse_form(body: &str) -> BTreeMap<String, String> {
    body.split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| {
            let v = v.replace('+', " ");
            (k.to_string(), urlencoding::decode(&v).map(|c| c.into_owned()).unwrap_or(v))
        })
        .collect()
}

async fn login(State(b): State<Backend>, headers: HeaderMap, body: String) -> Response {
    b.record("POST", "/auth/login".into(), &headers, body.clone());
    let (reply, email, password) = {
        let s = b.0.lock();
        (s.login.clone(), s.email.clone(), s.password.clone())
    };
    match reply {
        LoginReply::Status(code) => StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR).into_response(),
        LoginReply::NoToken => Json(json!({"token_type": "bearer"})).into_response(),
        LoginReply::Token(token) => {
            let form = parse_form(&body);
            let ok = form.get("grant_type").map(|s| s.as_str()) == Some("password")
                && form.get("username") == Some(&email)
                && form.get("password") == Some(&password);
            if !ok {
                return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Incorrect email or password"}))).into_response();
            }
            Json(json!({"access_token": token, "token_type": "bearer"})).into_response()
        }
    }
}

async fn me(State(b): State<Backend>, headers: HeaderMap) -> Response {
    b.record("GET", "/users/me".into(), &headers, String::new());
    if !b.authorized(&headers) { return StatusCode::UNAUTHORIZED.into_response(); }
    let s = b.0.lock();
    if !s.profile_enabled { return StatusCode::NOT_FOUND.into_response(); }
    let email = s.email.clone();
    match s.users.values().find(|u| u["email"] == json!(email)) {
        Some(u) => Json(u.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn collection(b: &Backend, kind: &str) -> Vec<Value> {
    let s = b.0.lock();
    let map = if kind == "users" { &s.users } else { &s.roles };
    map.values().cloned().collect()
}

async fn list(b: Backend, kind: &'static str, headers: HeaderMap) -> Response {
    b.record("GET", format!("/{}", kind), &headers, String::new());
    if !b.authorized(&headers) { return StatusCode::UNAUTHORIZED.into_response(); }
    Json(Value::Array(collection(&b, kind))).into_response()
}

async fn fetch(b: Backend, kind: &'static str, id: i64, headers: HeaderMap) -> Response {
    b.record("GET", format!("/{}/{}", kind, id), &headers, String::new());
    if !b.authorized(&headers) { return StatusCode::UNAUTHORIZED.into_response(); }
    let s = b.0.lock();
    let map = if kind == "users" { &s.users } else { &s.roles };
    match map.get(&id) {
        Some(v) => Json(v.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn create(b: Backend, kind: &'static str, headers: HeaderMap, body: String) -> Response {
    b.record("POST", format!("/{}", kind), &headers, body.clone());
    if !b.authorized(&headers) { return StatusCode::UNAUTHORIZED.into_response(); }
    let Ok(mut v) = serde_json::from_str::<Value>(&body) else { return StatusCode::UNPROCESSABLE_ENTITY.into_response() };
    let mut s = b.0.lock();
    let roles = s.roles.clone();
    let map = if kind == "users" { &mut s.users } else { &mut s.roles };
    let id = map.keys().next_back().copied().unwrap_or(0) + 1;
    v["id"] = json!(id);
    if kind == "users" {
        let role_id = v["role_id"].as_i64().unwrap_or(0);
        let Some(role) = roles.get(&role_id) else { return StatusCode::UNPROCESSABLE_ENTITY.into_response() };
        v["role"] = role.clone();
        if let Some(obj) = v.as_object_mut() {
            obj.remove("role_id");
            obj.remove("password");
        }
    }
    map.insert(id, v.clone());
    (StatusCode::CREATED, Json(v)).into_response()
}

async fn update(b: Backend, kind: &'static str, id: i64, headers: HeaderMap, body: String) -> Response {
    b.record("PUT", format!("/{}/{}", kind, id), &headers, body.clone());
    if !b.authorized(&headers) { return StatusCode::UNAUTHORIZED.into_response(); }
    let Ok(patch) = serde_json::from_str::<Value>(&body) else { return StatusCode::UNPROCESSABLE_ENTITY.into_response() };
    let mut s = b.0.lock();
    let map = if kind == "users" { &mut s.users } else { &mut s.roles };
    let Some(cur) = map.get_mut(&id) else { return StatusCode::NOT_FOUND.into_response() };
    if let (Some(dst), Some(src)) = (cur.as_object_mut(), patch.as_object()) {
        for (k, val) in src { if k != "password" && k != "role_id" { dst.insert(k.clone(), val.clone()); } }
    }
    Json(cur.clone()).into_response()
}

async fn remove(b: Backend, kind: &'static str, id: i64, headers: HeaderMap) -> Response {
    b.record("DELETE", format!("/{}/{}", kind, id), &headers, String::new());
    if !b.authorized(&headers) { return StatusCode::UNAUTHORIZED.into_response(); }
    let mut s = b.0.lock();
    let map = if kind == "users" { &mut s.users } else { &mut s.roles };
    match map.remove(&id) {
        Some(_) => Json(json!({"ok": true})).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn resource(r: Router<Backend>, kind: &'static str) -> Router<Backend> {
    r.route(
        &format!("/{}", kind),
        get(move |State(b): State<Backend>, h: HeaderMap| list(b, kind, h))
            .post(move |State(b): State<Backend>, h: HeaderMap, body: String| create(b, kind, h, body)),
    )
    .route(
        &format!("/{}/{{id}}", kind),
        get(move |State(b): State<Backend>, Path(id): Path<i64>, h: HeaderMap| fetch(b, kind, id, h))
            .put(move |State(b): State<Backend>, Path(id): Path<i64>, h: HeaderMap, body: String| update(b, kind, id, h, body))
            .delete(move |State(b): State<Backend>, Path(id): Path<i64>, h: HeaderMap| remove(b, kind, id, h)),
    )
}

pub fn router(b: Backend) -> Router {
    let r = Router::new()
        .route("/auth/login", post(login))
        .route("/users/me", get(me));
    let r = resource(r, "users");
    resource(r, "roles").with_state(b)
}

/// Serve the mock on an ephemeral port; returns its base URL.
pub async fn spawn(b: Backend) -> String {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router(b)).await;
    });
    format!("http://{}", addr)
}

/// A base URL nobody listens on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}
