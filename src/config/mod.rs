//! Configuration management
//!
//! Handles loading user settings.

pub mod settings;

pub use settings::{DEFAULT_API_VERSION, Settings, load_settings, load_settings_from};
