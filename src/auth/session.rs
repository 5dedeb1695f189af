//! Authenticated sessions and 401 recovery.
//!
//! The stored credential is loaded once per command and passed explicitly to
//! every authenticated operation. When an operation comes back unauthorized,
//! an interactive session clears the credential, repeats the device flow,
//! and retries the operation exactly once; a non-interactive session fails
//! immediately with instructions. A second unauthorized result is terminal.

use std::io::IsTerminal;

use tracing::{info, warn};

use crate::api::VaultApi;
use crate::auth::credentials::CredentialStore;
use crate::auth::device;
use crate::cli::output;
use crate::error::{ApiError, AuthError, Error, Result};

/// One command invocation's authentication context.
pub struct Session<'a> {
    api: &'a dyn VaultApi,
    store: &'a dyn CredentialStore,
    interactive: bool,
}

impl<'a> Session<'a> {
    pub fn new(api: &'a dyn VaultApi, store: &'a dyn CredentialStore) -> Self {
        Self {
            api,
            store,
            interactive: detect_interactive(),
        }
    }

    /// Override interactivity detection (tests, `--yes`-style flags).
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// The vault collaborator this session talks to.
    pub fn api(&self) -> &'a dyn VaultApi {
        self.api
    }

    /// Run an authenticated operation with the recovery contract.
    ///
    /// The operation receives the bearer token and may be retried once with
    /// a fresh token after a successful re-authentication.
    pub fn run<T>(&self, op: impl Fn(&str) -> Result<T>) -> Result<T> {
        let token = self.obtain_token()?;

        match op(&token) {
            Err(Error::Api(ApiError::Unauthorized)) => {
                warn!("credential rejected, entering recovery");
                self.store.delete()?;

                if !self.interactive {
                    return Err(AuthError::Expired.into());
                }

                output::warn("your session expired, re-authenticating");
                let fresh = device::login(self.api, self.store)?;
                info!("retrying after re-authentication");

                match op(&fresh) {
                    // Still rejected with a brand-new credential: terminal.
                    Err(Error::Api(ApiError::Unauthorized)) => Err(AuthError::Expired.into()),
                    other => other,
                }
            }
            other => other,
        }
    }

    /// Load the stored token, or start a login when interactive.
    fn obtain_token(&self) -> Result<String> {
        if let Some(token) = self.store.load()? {
            return Ok(token);
        }

        if self.interactive {
            device::login(self.api, self.store)
        } else {
            Err(AuthError::Required.into())
        }
    }
}

/// Interactive means a controlling terminal on stdin and no CI marker.
fn detect_interactive() -> bool {
    std::io::stdin().is_terminal() && std::env::var_os("CI").is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Account, DeviceAuthorization, PollOutcome};
    use crate::auth::credentials::MemoryStore;
    use crate::core::reference::VaultRef;
    use crate::core::snapshot::Snapshot;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fake vault that rejects the first N authenticated calls.
    struct FlakyAuthApi {
        reject_first: usize,
        calls: AtomicUsize,
        device_flows: AtomicUsize,
    }

    impl FlakyAuthApi {
        fn new(reject_first: usize) -> Self {
            Self {
                reject_first,
                calls: AtomicUsize::new(0),
                device_flows: AtomicUsize::new(0),
            }
        }

        fn authed(&self, token: &str) -> Result<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.reject_first || token.is_empty() {
                Err(ApiError::Unauthorized.into())
            } else {
                Ok(())
            }
        }
    }

    impl VaultApi for FlakyAuthApi {
        fn fetch_snapshot(&self, token: &str, _: &VaultRef) -> Result<Snapshot> {
            self.authed(token)?;
            Ok(Snapshot::default())
        }
        fn put_key(&self, token: &str, _: &VaultRef, _: &str, _: &str) -> Result<()> {
            self.authed(token)
        }
        fn delete_key(&self, token: &str, _: &VaultRef, _: &str) -> Result<()> {
            self.authed(token)
        }
        fn request_device_code(&self) -> Result<DeviceAuthorization> {
            Ok(DeviceAuthorization {
                device_code: "dev".to_string(),
                user_code: "CODE".to_string(),
                verification_url: "https://warren.dev/activate".to_string(),
                expires_in: 60,
                interval: 0,
            })
        }
        fn exchange_device_code(&self, _: &str) -> Result<PollOutcome> {
            self.device_flows.fetch_add(1, Ordering::SeqCst);
            Ok(PollOutcome::Authorized("fresh-token".to_string()))
        }
        fn whoami(&self, _: &str) -> Result<Account> {
            Ok(Account {
                login: "octocat".to_string(),
                name: None,
            })
        }
    }

    fn vref() -> VaultRef {
        VaultRef::new(
            crate::core::reference::RepoSlug::parse("acme/api").unwrap(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_unauthorized_recovers_with_single_retry() {
        let api = FlakyAuthApi::new(1);
        let store = MemoryStore::new(Some("stale-token"));
        let session = Session::new(&api, &store).with_interactive(true);

        let vault = vref();
        session.run(|t| api.fetch_snapshot(t, &vault)).unwrap();

        // One rejected call, one device flow, one retry.
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
        assert_eq!(api.device_flows.load(Ordering::SeqCst), 1);
        // The fresh credential replaced the stale one.
        assert_eq!(store.load().unwrap(), Some("fresh-token".to_string()));
    }

    #[test]
    fn test_second_unauthorized_is_terminal() {
        let api = FlakyAuthApi::new(2);
        let store = MemoryStore::new(Some("stale-token"));
        let session = Session::new(&api, &store).with_interactive(true);

        let vault = vref();
        let err = session.run(|t| api.fetch_snapshot(t, &vault)).unwrap_err();

        assert!(matches!(err, Error::Auth(AuthError::Expired)));
        // Exactly one retry: two authenticated calls total, no third.
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
        assert_eq!(api.device_flows.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_non_interactive_fails_fast_on_unauthorized() {
        let api = FlakyAuthApi::new(1);
        let store = MemoryStore::new(Some("stale-token"));
        let session = Session::new(&api, &store).with_interactive(false);

        let vault = vref();
        let err = session.run(|t| api.fetch_snapshot(t, &vault)).unwrap_err();

        assert!(matches!(err, Error::Auth(AuthError::Expired)));
        assert_eq!(api.device_flows.load(Ordering::SeqCst), 0);
        // The rejected credential was cleared so the next run starts clean.
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_non_interactive_without_credential() {
        let api = FlakyAuthApi::new(0);
        let store = MemoryStore::new(None);
        let session = Session::new(&api, &store).with_interactive(false);

        let vault = vref();
        let err = session.run(|t| api.fetch_snapshot(t, &vault)).unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::Required)));
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_interactive_without_credential_logs_in_first() {
        let api = FlakyAuthApi::new(0);
        let store = MemoryStore::new(None);
        let session = Session::new(&api, &store).with_interactive(true);

        let vault = vref();
        session.run(|t| api.fetch_snapshot(t, &vault)).unwrap();
        assert_eq!(api.device_flows.load(Ordering::SeqCst), 1);
        assert_eq!(store.load().unwrap(), Some("fresh-token".to_string()));
    }
}
