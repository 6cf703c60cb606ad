use async_trait::async_trait;

use crate::error::ClientResult;
use crate::models::User;

/// In-memory session. A present token is the only thing that makes it authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
}

impl Session {
    pub fn authenticated(token: impl Into<String>, user: Option<User>) -> Self {
        Self { token: Some(token.into()), user }
    }

    pub fn is_authenticated(&self) -> bool { self.token.is_some() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Anonymous,
    Authenticated,
}

/// "Who am I" lookup used right after a login to fill in the user ref.
/// `Ok(None)` means the backend has no such endpoint or no matching user.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn current_user(&self, token: &str) -> ClientResult<Option<User>>;
}
