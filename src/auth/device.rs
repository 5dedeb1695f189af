//! Device authorization flow.
//!
//! `REQUEST -> DISPLAY -> POLL` against the vault service, RFC 8628 style.
//! The poll loop is an explicit state machine: only a `SlowDown` response may
//! grow the interval, the deadline is absolute, and no request is issued
//! after it passes. Ctrl-C aborts the poll cleanly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::api::{DeviceAuthorization, PollOutcome, VaultApi};
use crate::auth::credentials::CredentialStore;
use crate::cli::output;
use crate::error::{AuthError, Result};

/// Added to the interval on every `SlowDown` response (RFC 8628 §3.5).
const SLOW_DOWN_INCREMENT: Duration = Duration::from_secs(5);

/// Run the full device flow and persist the resulting credential.
pub fn login(api: &dyn VaultApi, store: &dyn CredentialStore) -> Result<String> {
    let auth = api.request_device_code()?;

    output::header("Device authorization");
    output::kv("code", &auth.user_code);
    output::kv("url", &auth.verification_url);
    println!();

    if open::that(&auth.verification_url).is_ok() {
        output::dimmed("opened the verification URL in your browser");
    } else {
        output::hint("open the URL above and enter the code");
    }

    let interrupted = interrupt_flag();
    let token = poll(api, &auth, &interrupted)?;

    store.store(&token)?;
    info!("device authorization complete");
    Ok(token)
}

/// Set up a Ctrl-C handler that flips a shared flag.
fn interrupt_flag() -> Arc<AtomicBool> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    // Ignore the error if a handler is already installed.
    let _ = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    });
    interrupted
}

/// Poll the token exchange until a terminal state.
///
/// Terminal states: `Authorized` (token), `Denied`, `Expired`, deadline
/// reached, or interrupt. `Pending` keeps the current interval; `SlowDown`
/// widens it before the next attempt.
pub fn poll(
    api: &dyn VaultApi,
    auth: &DeviceAuthorization,
    interrupted: &Arc<AtomicBool>,
) -> Result<String> {
    let mut interval = Duration::from_secs(auth.interval);
    let deadline = Instant::now() + Duration::from_secs(auth.expires_in);

    loop {
        if Instant::now() >= deadline {
            return Err(AuthError::FlowExpired.into());
        }

        if interruptible_sleep(interval, interrupted) {
            return Err(AuthError::Interrupted.into());
        }

        // The sleep may have carried us past the deadline.
        if Instant::now() >= deadline {
            return Err(AuthError::FlowExpired.into());
        }

        match api.exchange_device_code(&auth.device_code)? {
            PollOutcome::Authorized(token) => return Ok(token),
            PollOutcome::Pending => {
                debug!("authorization pending");
            }
            PollOutcome::SlowDown => {
                interval = widen(interval);
                debug!(interval_secs = interval.as_secs(), "slowing down poll");
            }
            PollOutcome::Denied => return Err(AuthError::Denied.into()),
            PollOutcome::Expired => return Err(AuthError::FlowExpired.into()),
        }
    }
}

/// The only transition allowed to grow the poll interval.
fn widen(interval: Duration) -> Duration {
    interval + SLOW_DOWN_INCREMENT
}

/// Sleep for `duration`, checking the interrupt flag every 100ms.
/// Returns `true` if interrupted.
fn interruptible_sleep(duration: Duration, interrupted: &Arc<AtomicBool>) -> bool {
    const CHECK_INTERVAL: Duration = Duration::from_millis(100);
    let start = Instant::now();

    loop {
        if interrupted.load(Ordering::SeqCst) {
            return true;
        }
        let remaining = duration.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            return interrupted.load(Ordering::SeqCst);
        }
        std::thread::sleep(remaining.min(CHECK_INTERVAL));
    }
}
