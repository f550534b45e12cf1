//! Configuration module — process-level settings.
//!
//! This module provides:
//! - `Settings` loaded from `credvault.toml` with per-field defaults
//! - `RunMode` (production vs. development key-loading behavior)

pub mod settings;

pub use settings::{RunMode, Settings};
