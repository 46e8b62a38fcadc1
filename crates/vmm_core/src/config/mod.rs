//! Configuration management for Video Music Merger.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Defaults for anything missing from the file
//!
//! # Example
//!
//! ```no_run
//! use vmm_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/vmm.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Scratch root: {}", config.settings().paths.temp_root);
//!
//! config.settings_mut().job.timeout_secs = 600;
//! config.update_section(ConfigSection::Job).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, EngineSettings, JobSettings, LoggingSettings, MuxSettings, NormalizeSettings,
    PathSettings, Settings,
};
