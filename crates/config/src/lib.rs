//! Configuration loading and validation.
//!
//! Config files: `lungscan.toml`, `lungscan.yaml`, or `lungscan.json`
//! Searched in `./` then `~/.config/lungscan/`.

pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{
        BackendKind, ClassifierConfig, LocalModelConfig, LungscanConfig, RemoteConfig, ReplyStyle,
        TelegramConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
