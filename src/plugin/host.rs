//! Plugin host interface.
//!
//! The host owns plugin discovery and lifetime: it locates provider and
//! analyzer plugins on the search path and tears them down when the host
//! context closes. The planner only borrows what the host hands out.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::PluginError;

use super::analyzer::Analyzer;
use super::provider::Provider;

/// The kind of a loaded plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    /// A resource provider plugin.
    Resource,
    /// A resource analyzer plugin.
    Analyzer,
    /// A language runtime plugin.
    Language,
}

impl std::fmt::Display for PluginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Resource => "resource",
            Self::Analyzer => "analyzer",
            Self::Language => "language",
        };
        write!(f, "{s}")
    }
}

/// Identity of a plugin loaded by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Plugin name.
    pub name: String,
    /// Plugin kind.
    pub kind: PluginKind,
    /// Plugin version, if the plugin reports one.
    #[serde(default)]
    pub version: Option<String>,
}

/// A plugin host: the authority for plugin lookup and inventory.
pub trait Host: std::fmt::Debug + Send + Sync {
    /// Returns the provider plugin for a package.
    ///
    /// `Ok(None)` means no plugin exists for the package; whether that is an
    /// error depends on the caller (it is fatal for custom resources, legal
    /// during configuration).
    fn provider(&self, package: &str) -> Result<Option<Arc<dyn Provider>>, PluginError>;

    /// Returns the analyzer plugin with the given name, if available.
    fn analyzer(&self, name: &str) -> Result<Option<Arc<dyn Analyzer>>, PluginError>;

    /// Lists the plugins currently loaded by this host.
    fn list_plugins(&self) -> Vec<PluginInfo>;
}
