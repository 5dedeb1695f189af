//! Secure injection runtime.
//!
//! Runs a user command with a secret snapshot overlaid on the inherited
//! environment. Secrets exist only in the child's process memory; nothing
//! touches the filesystem or the log. Termination signals received while the
//! child runs are forwarded to it, and the child's exit status becomes ours.

use std::process::Command;

use tracing::debug;
use zeroize::Zeroizing;

use crate::core::snapshot::Snapshot;
use crate::error::{Result, ValidationError};

/// Build the child command with the snapshot overlaid last, so a secret
/// overrides any inherited variable of the same name.
pub fn build_command(argv: &[String], snapshot: &Snapshot) -> Result<Command> {
    let Some((program, args)) = argv.split_first() else {
        return Err(ValidationError::NoCommand.into());
    };

    let mut cmd = Command::new(program);
    cmd.args(args);

    for (key, value) in snapshot.iter() {
        let value = Zeroizing::new(value.to_string());
        cmd.env(key, value.as_str());
    }

    Ok(cmd)
}

/// Run the command and block until it exits, forwarding signals.
///
/// Returns the child's exit code; a child killed by a signal yields
/// `128 + signo` on Unix. A nonexistent program fails up front with a
/// command-not-found error instead of a spawn/wait failure.
pub fn run(argv: &[String], snapshot: &Snapshot) -> Result<i32> {
    let mut cmd = build_command(argv, snapshot)?;

    // PATH lookup up front, so a typo fails before secrets reach a child.
    if which::which(&argv[0]).is_err() {
        return Err(ValidationError::CommandNotFound(argv[0].clone()).into());
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ValidationError::CommandNotFound(argv[0].clone()).into());
        }
        Err(e) => return Err(e.into()),
    };

    debug!(pid = child.id(), command = %argv[0], "child started");

    let forwarder = signals::forward_to(child.id());
    let status = child.wait();
    signals::stop(forwarder);

    let status = status?;
    Ok(exit_code_of(status))
}

/// Map an exit status to the agent's own exit code.
#[cfg(unix)]
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match status.code() {
        Some(code) => code,
        // Killed by a signal: reflect it the way shells do.
        None => 128 + status.signal().unwrap_or(0),
    }
}

#[cfg(not(unix))]
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[cfg(unix)]
mod signals {
    //! Background listener that forwards termination signals to the child.

    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
    use signal_hook::iterator::Signals;
    use tracing::debug;

    pub struct Forwarder {
        handle: signal_hook::iterator::Handle,
        thread: std::thread::JoinHandle<()>,
    }

    /// Forward SIGINT/SIGTERM/SIGHUP/SIGQUIT to `pid` until stopped.
    ///
    /// The parent stays alive while the listener runs, so an interactive
    /// Ctrl-C reaches the child first and its cleanup is not cut short.
    pub fn forward_to(pid: u32) -> Option<Forwarder> {
        let mut signals = match Signals::new([SIGINT, SIGTERM, SIGHUP, SIGQUIT]) {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, "signal forwarding unavailable");
                return None;
            }
        };
        let handle = signals.handle();
        let target = Pid::from_raw(pid as i32);

        let thread = std::thread::spawn(move || {
            for signum in signals.forever() {
                if let Ok(sig) = Signal::try_from(signum) {
                    debug!(signal = %sig, "forwarding to child");
                    let _ = signal::kill(target, sig);
                }
            }
        });

        Some(Forwarder { handle, thread })
    }

    /// Shut the listener down and join it before the command returns.
    pub fn stop(forwarder: Option<Forwarder>) {
        if let Some(f) = forwarder {
            f.handle.close();
            let _ = f.thread.join();
        }
    }
}

#[cfg(not(unix))]
mod signals {
    pub struct Forwarder;

    pub fn forward_to(_pid: u32) -> Option<Forwarder> {
        None
    }

    pub fn stop(_forwarder: Option<Forwarder>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn snap(pairs: &[(&str, &str)]) -> Snapshot {
        Snapshot::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_empty_command_rejected() {
        let err = run(&[], &Snapshot::default()).unwrap_err();
        assert!(err.to_string().contains("no command"));
    }

    #[test]
    fn test_missing_command_is_distinguishable() {
        let err = run(
            &argv(&["warren-test-does-not-exist-9aa1"]),
            &Snapshot::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("command not found"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_propagates() {
        let code = run(&argv(&["sh", "-c", "exit 7"]), &Snapshot::default()).unwrap();
        assert_eq!(code, 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_death_reflected_in_exit_code() {
        let code = run(
            &argv(&["sh", "-c", "kill -TERM $$"]),
            &Snapshot::default(),
        )
        .unwrap();
        assert_eq!(code, 128 + 15);
    }

    #[cfg(unix)]
    #[test]
    fn test_injected_secret_visible_to_child() {
        let code = run(
            &argv(&["sh", "-c", "[ \"$INJECTED\" = hello ]"]),
            &snap(&[("INJECTED", "hello")]),
        )
        .unwrap();
        assert_eq!(code, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_injected_secret_overrides_inherited() {
        std::env::set_var("WARREN_TEST_SHADOWED", "inherited");
        let mut cmd = build_command(
            &argv(&["sh", "-c", "printf %s \"$WARREN_TEST_SHADOWED\""]),
            &snap(&[("WARREN_TEST_SHADOWED", "injected")]),
        )
        .unwrap();
        let output = cmd.output().unwrap();
        std::env::remove_var("WARREN_TEST_SHADOWED");
        assert_eq!(String::from_utf8_lossy(&output.stdout), "injected");
    }

    #[cfg(unix)]
    #[test]
    fn test_inherited_environment_passes_through() {
        let mut cmd = build_command(
            &argv(&["sh", "-c", "printf %s \"$KEPT\""]),
            &snap(&[("OTHER", "x")]),
        )
        .unwrap();
        cmd.env("KEPT", "from-parent");
        let output = cmd.output().unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), "from-parent");
    }
}
