//! TOML-based preference persistence.
//!
//! The only durable preference is the IPv4 of the most recently configured
//! TV, used for automatic reconnection at startup and after wake. It is
//! written only after a control-port configuration completes; no failure
//! path touches it.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Error type for preference file operations.
#[derive(Debug, Error)]
pub enum PrefsError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing preferences at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse preferences TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The preferences could not be serialized to TOML.
    #[error("failed to serialize preferences: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Durable user preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// IPv4 of the most recently configured TV.
    #[serde(default)]
    pub last_device: Option<Ipv4Addr>,
}

/// Reads and writes [`Preferences`] at a fixed path.
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    /// Store under the platform config directory
    /// (e.g. `~/.config/atvremote/preferences.toml` on Linux).
    pub fn at_default_location() -> Result<Self, PrefsError> {
        let dirs = directories::ProjectDirs::from("", "", "atvremote")
            .ok_or(PrefsError::NoPlatformConfigDir)?;
        Ok(Self {
            path: dirs.config_dir().join("preferences.toml"),
        })
    }

    /// Store at an explicit path (tests, portable installs).
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load preferences; a missing file yields the defaults.
    pub fn load(&self) -> Result<Preferences, PrefsError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Preferences::default()),
            Err(source) => Err(PrefsError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Persist the given preferences, creating parent directories as needed.
    pub fn save(&self, prefs: &Preferences) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| PrefsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let text = toml::to_string_pretty(prefs)?;
        std::fs::write(&self.path, text).map_err(|source| PrefsError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Record `ip` as the last connected device.
    pub fn set_last_device(&self, ip: Ipv4Addr) -> Result<(), PrefsError> {
        let mut prefs = self.load()?;
        prefs.last_device = Some(ip);
        debug!(%ip, "persisting last device");
        self.save(&prefs)
    }

    /// The last connected device, if any.
    pub fn last_device(&self) -> Option<Ipv4Addr> {
        self.load().ok().and_then(|p| p.last_device)
    }
}
