//! Blocking HTTP client for the vault service.
//!
//! One short-lived client per invocation. Every request carries a bounded
//! timeout; nothing here retries; the single post-re-authentication retry
//! lives in `auth::session`, and mutating calls must not be repeated blindly.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::api::{Account, DeviceAuthorization, PollOutcome, ProviderApi, VaultApi};
use crate::core::config::ProviderLink;
use crate::core::constants;
use crate::core::reference::VaultRef;
use crate::core::snapshot::Snapshot;
use crate::error::{ApiError, Error, Result};

/// HTTP client for the vault service and its provider proxy.
pub struct HttpClient {
    http: Client,
    base_url: String,
}

/// Error payload the service returns alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

/// Snapshot payload: `{"secrets": {"KEY": "value", ...}}`.
#[derive(Debug, Deserialize)]
struct SnapshotBody {
    secrets: HashMap<String, String>,
}

/// Token-exchange payload for a completed authorization.
#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: String,
}

impl HttpClient {
    /// Build a client against the configured service URL.
    ///
    /// `WARREN_API_URL` overrides the default, mainly for staging setups.
    pub fn new() -> Result<Self> {
        let base_url = std::env::var("WARREN_API_URL")
            .unwrap_or_else(|_| constants::DEFAULT_API_URL.to_string());
        Self::with_base_url(base_url)
    }

    /// Build a client against an explicit service URL.
    pub fn with_base_url(base_url: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(constants::REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("warren/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn env_url(&self, vault: &VaultRef) -> String {
        format!(
            "{}/v1/repos/{}/{}/environments/{}",
            self.base_url, vault.slug.owner, vault.slug.repo, vault.environment
        )
    }

    fn provider_url(&self, vault: &VaultRef, provider: &ProviderLink) -> String {
        format!(
            "{}/v1/repos/{}/{}/providers/{}/{}/environments/{}",
            self.base_url,
            vault.slug.owner,
            vault.slug.repo,
            provider.name,
            provider.project,
            provider.environment
        )
    }

    /// Classify a non-success response into the error taxonomy.
    fn classify(&self, response: Response, subject: &str) -> Error {
        let status = response.status();
        let message = response
            .json::<ErrorBody>()
            .map(|b| if b.message.is_empty() { b.error } else { b.message })
            .unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized.into(),
            StatusCode::FORBIDDEN => ApiError::Forbidden(subject.to_string()).into(),
            StatusCode::NOT_FOUND => ApiError::NotFound(subject.to_string()).into(),
            _ => ApiError::Server {
                status: status.as_u16(),
                message,
            }
            .into(),
        }
    }

    fn network(e: reqwest::Error) -> Error {
        ApiError::Network(e.to_string()).into()
    }

    fn fetch_snapshot_from(&self, token: &str, url: &str, subject: &str) -> Result<Snapshot> {
        debug!(url, "fetching snapshot");
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .map_err(Self::network)?;

        if !response.status().is_success() {
            return Err(self.classify(response, subject));
        }

        let body: SnapshotBody = response
            .json()
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(Snapshot::from_pairs(body.secrets))
    }

    fn put_key_at(
        &self,
        token: &str,
        url: &str,
        subject: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let mut payload = HashMap::new();
        payload.insert(key, value);

        let response = self
            .http
            .patch(format!("{url}/secrets"))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .map_err(Self::network)?;

        if !response.status().is_success() {
            return Err(self.classify(response, subject));
        }
        Ok(())
    }

    fn delete_key_at(&self, token: &str, url: &str, subject: &str, key: &str) -> Result<()> {
        let response = self
            .http
            .delete(format!("{url}/secrets/{key}"))
            .bearer_auth(token)
            .send()
            .map_err(Self::network)?;

        if !response.status().is_success() {
            return Err(self.classify(response, subject));
        }
        Ok(())
    }
}

impl VaultApi for HttpClient {
    fn fetch_snapshot(&self, token: &str, vault: &VaultRef) -> Result<Snapshot> {
        self.fetch_snapshot_from(token, &self.env_url(vault), &vault.to_string())
    }

    fn put_key(&self, token: &str, vault: &VaultRef, key: &str, value: &str) -> Result<()> {
        self.put_key_at(token, &self.env_url(vault), &vault.to_string(), key, value)
    }

    fn delete_key(&self, token: &str, vault: &VaultRef, key: &str) -> Result<()> {
        self.delete_key_at(token, &self.env_url(vault), &vault.to_string(), key)
    }

    fn request_device_code(&self) -> Result<DeviceAuthorization> {
        let response = self
            .http
            .post(format!("{}/v1/auth/device", self.base_url))
            .send()
            .map_err(Self::network)?;

        if !response.status().is_success() {
            return Err(self.classify(response, "device authorization"));
        }

        let mut auth: DeviceAuthorization = response
            .json()
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        // A zero interval would hammer the service.
        auth.interval = auth.interval.max(1);
        Ok(auth)
    }

    fn exchange_device_code(&self, device_code: &str) -> Result<PollOutcome> {
        let mut payload = HashMap::new();
        payload.insert("device_code", device_code);

        let response = self
            .http
            .post(format!("{}/v1/auth/device/token", self.base_url))
            .json(&payload)
            .send()
            .map_err(Self::network)?;

        if response.status().is_success() {
            let body: TokenBody = response
                .json()
                .map_err(|e| ApiError::Decode(e.to_string()))?;
            return Ok(PollOutcome::Authorized(body.access_token));
        }

        // RFC 8628 reports flow state as a 400 with an error field. Anything
        // else (a 502 from a proxy, say) is a plain transport problem and
        // goes through the usual taxonomy.
        if response.status() != StatusCode::BAD_REQUEST {
            return Err(self.classify(response, "device authorization"));
        }

        let body: ErrorBody = response
            .json()
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        match poll_state(&body.error) {
            Some(outcome) => Ok(outcome),
            None => Err(ApiError::Decode(format!("unknown token state '{}'", body.error)).into()),
        }
    }

    fn whoami(&self, token: &str) -> Result<Account> {
        let response = self
            .http
            .get(format!("{}/v1/user", self.base_url))
            .bearer_auth(token)
            .send()
            .map_err(Self::network)?;

        if !response.status().is_success() {
            return Err(self.classify(response, "account"));
        }

        response.json().map_err(|e| ApiError::Decode(e.to_string()).into())
    }
}

impl ProviderApi for HttpClient {
    fn fetch_snapshot(
        &self,
        token: &str,
        vault: &VaultRef,
        provider: &ProviderLink,
    ) -> Result<Snapshot> {
        let subject = format!("provider {}", provider.name);
        self.fetch_snapshot_from(token, &self.provider_url(vault, provider), &subject)
            .map_err(|e| provider_failure(e, &provider.name))
    }

    fn put_key(
        &self,
        token: &str,
        vault: &VaultRef,
        provider: &ProviderLink,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let subject = format!("provider {}", provider.name);
        self.put_key_at(token, &self.provider_url(vault, provider), &subject, key, value)
            .map_err(|e| provider_failure(e, &provider.name))
    }

    fn delete_key(
        &self,
        token: &str,
        vault: &VaultRef,
        provider: &ProviderLink,
        key: &str,
    ) -> Result<()> {
        let subject = format!("provider {}", provider.name);
        self.delete_key_at(token, &self.provider_url(vault, provider), &subject, key)
            .map_err(|e| provider_failure(e, &provider.name))
    }
}

/// Map an RFC 8628 error field to the matching poll outcome.
fn poll_state(error: &str) -> Option<PollOutcome> {
    match error {
        "authorization_pending" => Some(PollOutcome::Pending),
        "slow_down" => Some(PollOutcome::SlowDown),
        "access_denied" => Some(PollOutcome::Denied),
        "expired_token" => Some(PollOutcome::Expired),
        _ => None,
    }
}

/// Keep provider failures distinguishable from vault failures, but let
/// auth errors through untouched so 401 recovery still fires.
fn provider_failure(e: Error, provider: &str) -> Error {
    match e {
        Error::Api(ApiError::Unauthorized) | Error::Api(ApiError::Network(_)) => e,
        Error::Api(inner) => ApiError::Provider(format!("{provider}: {inner}")).into(),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let client = HttpClient::with_base_url("https://api.example.com/".to_string()).unwrap();
        let vault = VaultRef::new(
            crate::core::reference::RepoSlug::parse("acme/api").unwrap(),
            Some("production"),
        )
        .unwrap();

        assert_eq!(
            client.env_url(&vault),
            "https://api.example.com/v1/repos/acme/api/environments/production"
        );

        let link = ProviderLink {
            name: "vercel".to_string(),
            project: "prj_1".to_string(),
            environment: "preview".to_string(),
        };
        assert_eq!(
            client.provider_url(&vault, &link),
            "https://api.example.com/v1/repos/acme/api/providers/vercel/prj_1/environments/preview"
        );
    }

    #[test]
    fn test_poll_state_covers_the_rfc_8628_states() {
        assert!(matches!(
            poll_state("authorization_pending"),
            Some(PollOutcome::Pending)
        ));
        assert!(matches!(poll_state("slow_down"), Some(PollOutcome::SlowDown)));
        assert!(matches!(poll_state("access_denied"), Some(PollOutcome::Denied)));
        assert!(matches!(poll_state("expired_token"), Some(PollOutcome::Expired)));
        // A proxy error page is not a flow state.
        assert!(poll_state("").is_none());
        assert!(poll_state("<html>502 Bad Gateway</html>").is_none());
    }

    #[test]
    fn test_provider_failure_mapping() {
        let e = provider_failure(Error::Api(ApiError::Unauthorized), "vercel");
        assert!(matches!(e, Error::Api(ApiError::Unauthorized)));

        let e = provider_failure(
            Error::Api(ApiError::NotFound("env".into())),
            "vercel",
        );
        assert!(matches!(e, Error::Api(ApiError::Provider(_))));
    }
}
