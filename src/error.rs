//! Unified client error model.
//! Every I/O boundary in the crate (HTTP transport, backend status, local storage)
//! reports through these enums; best-effort adapters downgrade them to
//! empty/absent/false results after logging.

use thiserror::Error;

/// Failures of the local key-value backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(String),
    #[error("stored value for '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn code_str(&self) -> &'static str {
        match self {
            StorageError::Io(_) => "storage_io",
            StorageError::Corrupt { .. } => "storage_corrupt",
            StorageError::Unavailable(_) => "storage_unavailable",
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self { StorageError::Io(err.to_string()) }
}

/// Failures talking to the backend or to local storage.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Network/connection-level failure. `connect` is set when no connection
    /// was ever established (refused, DNS, blocked preflight).
    #[error("transport error: {message}")]
    Transport { connect: bool, message: String },
    /// The server answered with a status other than the expected one.
    #[error("unexpected HTTP status {status}: {body}")]
    Protocol { status: u16, body: String },
    #[error("invalid response payload: {0}")]
    Decode(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("no bearer token present")]
    NotAuthenticated,
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn transport<S: Into<String>>(msg: S) -> Self { ClientError::Transport { connect: false, message: msg.into() } }
    pub fn connect<S: Into<String>>(msg: S) -> Self { ClientError::Transport { connect: true, message: msg.into() } }
    pub fn protocol<S: Into<String>>(status: u16, body: S) -> Self { ClientError::Protocol { status, body: body.into() } }

    pub fn code_str(&self) -> &'static str {
        match self {
            ClientError::Transport { connect: true, .. } => "connect_error",
            ClientError::Transport { .. } => "transport_error",
            ClientError::Protocol { .. } => "protocol_error",
            ClientError::Decode(_) => "decode_error",
            ClientError::Storage(e) => e.code_str(),
            ClientError::NotAuthenticated => "not_authenticated",
            ClientError::Config(_) => "config_error",
        }
    }

    /// HTTP status carried by a protocol error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_connection_failure(&self) -> bool {
        matches!(self, ClientError::Transport { connect: true, .. })
    }

    /// Browsers surface blocked cross-origin requests only through the error text.
    pub fn mentions_cors(&self) -> bool {
        self.to_string().to_ascii_lowercase().contains("cors")
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ClientError::Decode(err.to_string());
        }
        if let Some(status) = err.status() {
            return ClientError::protocol(status.as_u16(), err.to_string());
        }
        if err.is_connect() {
            return ClientError::connect(err.to_string());
        }
        ClientError::transport(err.to_string())
    }
}

/// Outcome of a failed login.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The last strategy tried failed with a non-retryable error.
    #[error("login rejected by {strategy}: {source}")]
    Rejected { strategy: &'static str, #[source] source: ClientError },
    /// The server answered successfully but without an `access_token`.
    #[error("login response from {strategy} carried no access_token")]
    MissingToken { strategy: &'static str },
    /// Every strategy failed with a retryable error.
    #[error("all credential strategies failed, last: {0}")]
    Exhausted(#[source] ClientError),
    #[error("another login is already in flight")]
    LoginInFlight,
    #[error("no credential strategy configured")]
    NoStrategy,
}

impl AuthError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AuthError::Rejected { .. } => "login_rejected",
            AuthError::MissingToken { .. } => "missing_token",
            AuthError::Exhausted(_) => "strategies_exhausted",
            AuthError::LoginInFlight => "login_in_flight",
            AuthError::NoStrategy => "no_strategy",
        }
    }
}
