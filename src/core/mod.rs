//! Core library components.
//!
//! This module contains the reusable business logic for snapshot handling,
//! reconciliation, synchronization, and subprocess injection.

pub mod config;
pub mod constants;
pub mod diff;
pub mod reference;
pub mod runner;
pub mod snapshot;
pub mod sync;
pub mod validation;
