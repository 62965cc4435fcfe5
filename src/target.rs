//! Deployment targets and their configuration.
//!
//! A target names the environment a plan runs against and carries the
//! package-scoped configuration handed to providers at plan start. Secret
//! values stay encrypted at rest and are decrypted through the target's
//! decrypter only when providers are configured.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A configuration key of the form `package:name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigKey(String);

impl ConfigKey {
    /// Creates a configuration key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the package component (everything before the first `:`).
    #[must_use]
    pub fn package(&self) -> &str {
        self.0.split(':').next().unwrap_or(self.0.as_str())
    }

    /// Returns the full key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConfigKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// A configuration value, possibly encrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue {
    /// The raw value: plaintext, or ciphertext when `secret` is set.
    pub value: String,
    /// True if `value` is encrypted and must pass through a decrypter.
    #[serde(default)]
    pub secret: bool,
}

impl ConfigValue {
    /// Creates a plaintext configuration value.
    #[must_use]
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            secret: false,
        }
    }

    /// Creates an encrypted configuration value.
    #[must_use]
    pub fn secret(ciphertext: impl Into<String>) -> Self {
        Self {
            value: ciphertext.into(),
            secret: true,
        }
    }

    /// Returns the plaintext value, decrypting through `decrypter` if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is secret and decryption fails.
    pub fn value(&self, decrypter: &dyn Decrypter) -> Result<String, DecryptError> {
        if self.secret {
            decrypter.decrypt(&self.value)
        } else {
            Ok(self.value.clone())
        }
    }
}

/// Error raised when a secret value cannot be decrypted.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DecryptError {
    /// Description of the decryption failure.
    pub message: String,
}

impl DecryptError {
    /// Creates a new decryption error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Decrypts secret configuration values.
pub trait Decrypter: fmt::Debug + Send + Sync {
    /// Decrypts a ciphertext into its plaintext value.
    fn decrypt(&self, ciphertext: &str) -> Result<String, DecryptError>;
}

/// A decrypter for targets whose config holds no encrypted values.
///
/// Returns its input unchanged; secret-flagged values pass through as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextDecrypter;

impl Decrypter for PlaintextDecrypter {
    fn decrypt(&self, ciphertext: &str) -> Result<String, DecryptError> {
        Ok(ciphertext.to_string())
    }
}

/// The environment a plan runs against.
#[derive(Debug, Clone)]
pub struct Target {
    /// Target name; part of every resource URN.
    pub name: String,
    /// Package-scoped configuration, ordered by key.
    pub config: BTreeMap<ConfigKey, ConfigValue>,
    /// Decrypter for secret config values.
    pub decrypter: Arc<dyn Decrypter>,
}

impl Target {
    /// Creates a target with no configuration and a plaintext decrypter.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: BTreeMap::new(),
            decrypter: Arc::new(PlaintextDecrypter),
        }
    }

    /// Sets the target's configuration.
    #[must_use]
    pub fn with_config(mut self, config: BTreeMap<ConfigKey, ConfigValue>) -> Self {
        self.config = config;
        self
    }

    /// Sets the target's decrypter.
    #[must_use]
    pub fn with_decrypter(mut self, decrypter: Arc<dyn Decrypter>) -> Self {
        self.decrypter = decrypter;
        self
    }
}
