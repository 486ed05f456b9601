//! Config extraction errors.

use crate::VaultConfig;
use figment::{Metadata, Provider, Source, providers::Env};
use std::{collections::HashSet, error::Error, fmt, path::PathBuf};

/// Header printed above every extraction failure.
pub const FAILED_TO_EXTRACT_CONFIG_MSG: &str = "failed to extract vault config:";

/// Represents a failed attempt to extract a [`VaultConfig`] from a `Figment`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractConfigError {
    pub(crate) error: figment::Error,
}

impl ExtractConfigError {
    pub fn new(error: figment::Error) -> Self {
        Self { error }
    }

    /// Every rejected setting, once each, in the order figment reported them.
    pub fn errors(&self) -> Vec<SettingError> {
        let env = env_provider_name();
        let mut seen = HashSet::new();
        self.error
            .clone()
            .into_iter()
            .map(|error| SettingError::new(error, &env))
            .filter(|err| seen.insert(err.to_string()))
            .collect()
    }
}

impl fmt::Display for ExtractConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(FAILED_TO_EXTRACT_CONFIG_MSG)?;
        for err in self.errors() {
            write!(f, "\n  {err}")?;
        }
        Ok(())
    }
}

impl Error for ExtractConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Error::source(&self.error)
    }
}

/// Where a rejected value was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingOrigin {
    /// A config file, usually `vault.toml`.
    File(PathBuf),
    /// A `VAULT_` environment variable.
    Env,
    /// Any other provider, by name.
    Provider(String),
}

/// A single setting the config could not be built from.
#[derive(Clone, Debug, PartialEq)]
pub struct SettingError {
    pub origin: SettingOrigin,
    /// Key path of the setting, e.g. `["networks", "base", "vault"]`. Empty when the whole
    /// source was rejected.
    pub path: Vec<String>,
    pub error: figment::Error,
}

impl SettingError {
    fn new(error: figment::Error, env: &str) -> Self {
        let origin = match &error.metadata {
            Some(Metadata { source: Some(Source::File(path)), .. }) => {
                SettingOrigin::File(path.clone())
            }
            Some(meta) if meta.name == env => SettingOrigin::Env,
            Some(meta) => SettingOrigin::Provider(meta.name.to_string()),
            None => SettingOrigin::Provider("vault config".to_string()),
        };
        Self { origin, path: error.path.clone(), error }
    }

    /// Dotted key as written in `vault.toml`.
    pub fn key(&self) -> String {
        self.path.join(".")
    }

    /// Name of the environment variable that sets this key.
    pub fn env_var(&self) -> String {
        format!("{}{}", VaultConfig::ENV_PREFIX, self.path.join("__").to_ascii_uppercase())
    }
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            SettingOrigin::File(path) => write!(f, "{}: {}", path.display(), self.error.kind)?,
            SettingOrigin::Env => {
                return write!(f, "environment: {} in `{}`", self.error.kind, self.env_var());
            }
            SettingOrigin::Provider(name) => write!(f, "{name}: {}", self.error.kind)?,
        }
        if !self.path.is_empty() {
            write!(f, " for `{}`", self.key())?;
        }
        Ok(())
    }
}

impl Error for SettingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Error::source(&self.error)
    }
}

/// Metadata name of the env provider built by [`VaultConfig::figment`].
fn env_provider_name() -> String {
    Env::prefixed(VaultConfig::ENV_PREFIX).metadata().name.into_owned()
}
