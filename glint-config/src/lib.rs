//! Configuration collaborators for glint: the record manifest and the
//! loader settings.

pub mod error;
pub mod manifest;
pub mod settings;

pub use error::ConfigError;
pub use manifest::{load_manifest, parse_manifest};
pub use settings::{LoaderSettings, SettingsSource};
