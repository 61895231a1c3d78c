//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading settings or the record manifest.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file exists but could not be read.
    #[error("failed to read settings file {path}")]
    SettingsIo {
        /// Settings file that was opened.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// The settings file is not valid TOML for [`crate::LoaderSettings`].
    #[error("invalid settings file {path}: {message}")]
    InvalidSettings {
        /// Settings file that was parsed.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
    /// An environment override could not be parsed.
    #[error("invalid value for {var}: {message}")]
    InvalidOverride {
        /// Environment variable name.
        var: &'static str,
        /// Why the value was rejected.
        message: String,
    },
    /// The manifest is not a JSON array of records.
    #[error("manifest is not a JSON array of records: {0}")]
    Manifest(#[source] serde_json::Error),
    /// Building a loader component failed.
    #[error(transparent)]
    Loader(#[from] glint_core::LoaderError),
}
