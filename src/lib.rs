pub mod error;
pub mod config;
pub mod models;
pub mod notify;
pub mod storage;
pub mod auth;
pub mod directory;
pub mod console;

pub use auth::{AuthSessionManager, CredentialStrategy, Session, SessionState};
pub use config::ClientConfig;
pub use console::AdminConsole;
pub use directory::DirectoryClient;
pub use error::{AuthError, ClientError, ClientResult, StorageError};
pub use models::{Role, RoleCreate, RoleUpdate, TokenResponse, User, UserCreate, UserUpdate};
pub use notify::{Notifier, Observable, SubscriptionId};
pub use storage::SessionStore;
