//! Device authentication, credential storage, and 401 recovery.

pub mod credentials;
pub mod device;
pub mod session;

pub use credentials::{CredentialStore, Keyring};
pub use session::Session;
