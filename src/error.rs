//! Error types for warren operations.
//!
//! Errors are grouped per subsystem and wrapped by the top-level [`Error`].
//! Every terminal failure maps onto the agent's exit-code contract via
//! [`Error::exit_code`] so the CLI can surface a stable process status.

use thiserror::Error;

/// Top-level error for all warren operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("confirmation required; re-run with --yes")]
    ConfirmationRequired,

    #[error("prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("{0}")]
    Other(String),
}

/// Authentication and credential-store failures.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("authentication required")]
    Required,

    #[error("credential expired or revoked")]
    Expired,

    #[error("authorization denied")]
    Denied,

    #[error("device authorization expired before it was approved")]
    FlowExpired,

    #[error("authentication cancelled")]
    Interrupted,

    #[error("credential store error: {0}")]
    Store(String),
}

/// Failures talking to the vault service or a linked provider.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("permission denied: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

/// Project configuration problems.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("not linked: no .warren.toml in this directory")]
    NotInitialized,

    #[error("already linked: .warren.toml exists")]
    AlreadyInitialized,

    #[error("no repository configured and none detected from git remotes")]
    NoRepository,

    #[error("no provider link configured")]
    NoProvider,

    #[error("failed to read config: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to write config: {0}")]
    WriteFile(#[source] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// User-input and snapshot validation failures.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("secret key cannot be empty")]
    EmptyKey,

    #[error("invalid secret key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("malformed line {line} in {path}: expected KEY=VALUE")]
    MalformedLine { path: String, line: usize },

    #[error("invalid environment name '{0}'")]
    InvalidEnvironment(String),

    #[error("invalid repository '{0}': expected owner/repo")]
    InvalidRepository(String),

    #[error("no command specified")]
    NoCommand,

    #[error("command not found: {0}")]
    CommandNotFound(String),
}

/// Synchronization failures.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Some keys applied, some failed. Key names only, never values.
    #[error("partial sync: {} applied, {} failed ({})", succeeded.len(), failed.len(), failed_keys(failed))]
    Partial {
        succeeded: Vec<String>,
        failed: Vec<(String, String)>,
    },
}

fn failed_keys(failed: &[(String, String)]) -> String {
    failed
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Map this error onto the agent's process exit-code contract.
    ///
    /// 1 general, 2 authentication required, 3 not found,
    /// 4 permission denied, 5 network error.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Cancelling a login is not an auth failure; report it the way
            // shells report an interrupt.
            Error::Auth(AuthError::Interrupted) => 130,
            Error::Auth(_) => 2,
            Error::Api(ApiError::Unauthorized) => 2,
            Error::Api(ApiError::NotFound(_)) => 3,
            Error::Api(ApiError::Forbidden(_)) => 4,
            Error::Api(ApiError::Network(_)) => 5,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
