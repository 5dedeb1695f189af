//! Constants used throughout warren.
//!
//! Centralizes magic strings and configuration values.

/// Configuration file name (.warren.toml).
pub const CONFIG_FILE: &str = ".warren.toml";

/// Default environment variables file name (.env).
pub const ENV_FILE: &str = ".env";

/// Default environment name when none is configured or given.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Default vault service URL, overridable via WARREN_API_URL.
pub const DEFAULT_API_URL: &str = "https://api.warren.dev";

/// Environment variable carrying a bearer token (CI override for the keychain).
pub const TOKEN_ENV_VAR: &str = "WARREN_TOKEN";

/// Per-request timeout for vault and provider calls.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum concurrent per-key writes during a push/sync APPLY phase.
pub const MAX_IN_FLIGHT_WRITES: usize = 8;

/// Gitignore entries to protect secrets.
///
/// These entries ensure that .env files are not accidentally committed.
pub const GITIGNORE_ENTRIES: &[&str] = &[".env", ".env.*", "!.env.example"];
