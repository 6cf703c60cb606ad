//! Client-side authentication: credential exchange strategies, the session
//! model and the manager that ties them to persistent storage.
//! Keep the public surface thin and split implementation across sub-modules.

mod manager;
mod session;
mod strategy;

pub use manager::AuthSessionManager;
pub use session::{ProfileSource, Session, SessionState};
pub use strategy::{default_strategies, should_fall_back, CredentialStrategy, FormPasswordGrant, RawQueryPasswordGrant};
