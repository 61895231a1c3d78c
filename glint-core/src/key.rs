//! Cache keys derived from resource identities.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::error::{LoaderError, Result};

/// How a resource identity is turned into an on-disk cache filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStrategy {
    /// Last path segment of the URL (`http://x/icons/a.png` -> `a.png`).
    ///
    /// Two URLs sharing a final segment alias to the same entry.
    #[default]
    LastSegment,
    /// Hex SHA-256 of the full identity string.
    Sha256,
}

impl KeyStrategy {
    /// Name used in settings files and environment overrides.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStrategy::LastSegment => "last-segment",
            KeyStrategy::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for KeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last-segment" | "last_segment" | "filename" => {
                Ok(KeyStrategy::LastSegment)
            }
            "sha256" | "hash" => Ok(KeyStrategy::Sha256),
            other => Err(format!(
                "unknown key strategy '{other}' \
                 (expected 'last-segment' or 'sha256')"
            )),
        }
    }
}

/// Cache lookup key for a resource identity; doubles as the entry filename.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ContentKey(String);

impl ContentKey {
    /// Derive the key for `identity` using `strategy`.
    pub fn derive(identity: &str, strategy: KeyStrategy) -> Result<Self> {
        match strategy {
            KeyStrategy::LastSegment => Self::from_last_segment(identity),
            KeyStrategy::Sha256 => {
                if identity.trim().is_empty() {
                    return Err(LoaderError::InvalidIdentity(
                        identity.to_string(),
                    ));
                }
                let digest = Sha256::digest(identity.as_bytes());
                Ok(Self(hex::encode(digest)))
            }
        }
    }

    fn from_last_segment(identity: &str) -> Result<Self> {
        let segment = match url::Url::parse(identity) {
            Ok(parsed) => parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .map(str::to_string),
            // Not an absolute URL; treat it as a plain path.
            Err(_) => identity
                .split(['?', '#'])
                .next()
                .and_then(|path| path.rsplit('/').next())
                .map(str::to_string),
        };

        let segment = segment.unwrap_or_default();
        if !Self::is_valid(&segment) {
            return Err(LoaderError::InvalidIdentity(identity.to_string()));
        }
        Ok(Self(segment))
    }

    /// A key must be usable as a single filename inside the cache directory.
    pub fn is_valid(key: &str) -> bool {
        !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\', '\0'])
    }

    /// The key as a filename.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContentKey").field(&self.0).finish()
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
