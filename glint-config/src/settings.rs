//! Loader settings: where the cache lives and how images are transferred.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use glint_core::{
    ContentStore, Fetcher, HttpTransport, KeyStrategy, Transport,
};
use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

/// Environment variable naming an explicit settings file.
pub const CONFIG_PATH_VAR: &str = "GLINT_CONFIG_PATH";
/// Overrides [`LoaderSettings::cache_dir`].
pub const CACHE_DIR_VAR: &str = "GLINT_CACHE_DIR";
/// Overrides [`LoaderSettings::request_timeout`]; humantime syntax.
pub const REQUEST_TIMEOUT_VAR: &str = "GLINT_REQUEST_TIMEOUT";
/// Overrides [`LoaderSettings::user_agent`].
pub const USER_AGENT_VAR: &str = "GLINT_USER_AGENT";
/// Overrides [`LoaderSettings::key_strategy`].
pub const KEY_STRATEGY_VAR: &str = "GLINT_KEY_STRATEGY";

/// Where the settings came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SettingsSource {
    /// No file found; built-in defaults.
    #[default]
    Default,
    /// File named by [`CONFIG_PATH_VAR`].
    EnvPath(PathBuf),
    /// File discovered in the working directory.
    File(PathBuf),
}

/// Everything needed to build a [`Fetcher`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderSettings {
    /// Flat directory holding one file per cached image.
    pub cache_dir: PathBuf,
    /// Per-transfer timeout, written as a humantime string (`"15s"`).
    #[serde(deserialize_with = "de_duration")]
    pub request_timeout: Duration,
    /// `User-Agent` header; reqwest's default when unset.
    pub user_agent: Option<String>,
    /// `"last-segment"` (filename of the URL) or `"sha256"` (URL hash).
    #[serde(deserialize_with = "de_key_strategy")]
    pub key_strategy: KeyStrategy,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            request_timeout: glint_core::transport::DEFAULT_TIMEOUT,
            user_agent: None,
            key_strategy: KeyStrategy::default(),
        }
    }
}

/// Platform cache directory + `glint/images`, else under the temp dir.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("glint")
        .join("images")
}

impl LoaderSettings {
    /// Resolve settings from the process environment.
    ///
    /// Evaluation order:
    /// 1) `$GLINT_CONFIG_PATH` (TOML file),
    /// 2) `glint.toml` or `config/glint.toml` in the working directory,
    /// 3) defaults;
    ///
    /// then `GLINT_*` variables override individual fields.
    pub fn load_from_env() -> Result<(Self, SettingsSource), ConfigError> {
        let lookup = |var: &str| env::var(var).ok();

        let env_path = lookup(CONFIG_PATH_VAR);
        let (mut settings, source) = if let Some(path) = env_path
            && !path.trim().is_empty()
        {
            let path = PathBuf::from(path);
            (Self::load_from_file(&path)?, SettingsSource::EnvPath(path))
        } else if let Some(path) = Self::find_default_file() {
            (Self::load_from_file(&path)?, SettingsSource::File(path))
        } else {
            (Self::default(), SettingsSource::Default)
        };

        settings.apply_overrides(lookup)?;
        Ok((settings, source))
    }

    /// Read and parse a TOML settings file. No environment overrides.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::SettingsIo {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::parse(&contents, path)
    }

    /// Parse TOML text; `origin` only labels errors.
    pub fn parse(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|err| ConfigError::InvalidSettings {
            path: origin.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Apply `GLINT_*` overrides read through `lookup`. Empty values are
    /// ignored.
    pub fn apply_overrides<F>(
        &mut self,
        lookup: F,
    ) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get =
            |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        if let Some(dir) = get(CACHE_DIR_VAR) {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(raw) = get(REQUEST_TIMEOUT_VAR) {
            self.request_timeout = humantime::parse_duration(raw.trim())
                .map_err(|err| ConfigError::InvalidOverride {
                    var: REQUEST_TIMEOUT_VAR,
                    message: err.to_string(),
                })?;
        }
        if let Some(agent) = get(USER_AGENT_VAR) {
            self.user_agent = Some(agent);
        }
        if let Some(raw) = get(KEY_STRATEGY_VAR) {
            self.key_strategy =
                raw.parse().map_err(|message| ConfigError::InvalidOverride {
                    var: KEY_STRATEGY_VAR,
                    message,
                })?;
        }
        Ok(())
    }

    /// Content store over the configured cache directory.
    pub fn store(&self) -> ContentStore {
        ContentStore::new(&self.cache_dir)
    }

    /// Fetcher over the configured cache directory using `transport`.
    pub fn fetcher_with(&self, transport: Arc<dyn Transport>) -> Fetcher {
        Fetcher::new(self.store(), transport)
            .with_key_strategy(self.key_strategy)
    }

    /// Fetcher backed by an HTTP transport built from these settings.
    pub fn fetcher(&self) -> Result<Fetcher, ConfigError> {
        let transport = HttpTransport::with_config(
            self.request_timeout,
            self.user_agent.as_deref(),
        )?;
        Ok(self.fetcher_with(Arc::new(transport)))
    }

    fn find_default_file() -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &["glint.toml", "config/glint.toml"];

        CANDIDATES
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }
}

fn de_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}

fn de_key_strategy<'de, D>(deserializer: D) -> Result<KeyStrategy, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}
