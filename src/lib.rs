//! Warren - a GitHub-permission-gated secrets manager agent.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── login         # Device authorization / token import
//! │   ├── push          # Local → vault sync
//! │   ├── pull          # Vault → local .env
//! │   ├── diff          # Compare local/remote or two environments
//! │   ├── run           # Run a command with secrets injected
//! │   ├── sync          # Keep a linked provider in step with the vault
//! │   └── completions   # Shell completions
//! ├── core/             # Domain logic
//! │   ├── snapshot      # Secret snapshot + .env codec
//! │   ├── diff          # Four-way reconciliation engine
//! │   ├── sync          # Push/pull/provider sync engine
//! │   ├── runner        # Secure injection runtime
//! │   ├── reference     # (owner, repo, environment) addressing
//! │   └── config        # .warren.toml management
//! ├── auth/             # Device flow, credential store, 401 recovery
//! └── api/              # Vault and provider HTTP collaborators
//! ```
//!
//! # Features
//!
//! - Additive-by-default push with explicit `--prune`
//! - All-or-nothing pull that never truncates the local file
//! - Subprocess injection without touching the filesystem
//! - Headless device-code login stored in the OS keychain

pub mod api;
pub mod auth;
pub mod cli;
pub mod core;
pub mod error;
