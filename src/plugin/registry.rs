//! Lazy provider lookup cache.
//!
//! The registry memoizes host provider lookups per package so each plan
//! resolves a provider at most once. Providers remain owned by the host;
//! the cache holds only shared handles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::{PluginError, Result};
use crate::resource::ResourceType;

use super::host::Host;
use super::provider::Provider;

/// A cached, per-package view of the host's provider plugins.
#[derive(Debug)]
pub struct ProviderRegistry {
    /// The host that owns the plugins.
    host: Arc<dyn Host>,
    /// Memoized lookups by package.
    cache: Mutex<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    /// Creates a registry backed by the given host.
    #[must_use]
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self {
            host,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the provider for a package, if the host has one.
    ///
    /// The first lookup per package consults the host; later lookups are
    /// served from the cache.
    pub fn provider(&self, package: &str) -> Result<Option<Arc<dyn Provider>>> {
        let mut cache = self.cache.lock().expect("provider cache lock poisoned");
        if let Some(provider) = cache.get(package) {
            return Ok(Some(provider.clone()));
        }

        match self.host.provider(package)? {
            Some(provider) => {
                debug!("Loaded provider for package '{package}'");
                cache.insert(package.to_string(), provider.clone());
                Ok(Some(provider))
            }
            None => Ok(None),
        }
    }

    /// Returns the provider backing a custom resource type.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ProviderNotFound`] if no plugin exists for the
    /// type's package; custom resources cannot be planned without one.
    pub fn require(&self, ty: &ResourceType) -> Result<Arc<dyn Provider>> {
        let package = ty.package();
        self.provider(package)?.ok_or_else(|| {
            PluginError::ProviderNotFound {
                package: package.to_string(),
            }
            .into()
        })
    }
}
