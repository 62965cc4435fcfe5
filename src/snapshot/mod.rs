//! Snapshots of deployed resource state.
//!
//! A snapshot records the state of every managed resource after a plan run,
//! in an order that is a valid topological sort of the resource DAG: a
//! resource at index `i` may only depend on resources at indices before it.
//! The attached manifest documents when and with what the snapshot was made.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::plugin::PluginInfo;
use crate::resource::StateCell;

/// The engine version recorded in snapshot manifests.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Metadata attached to a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// When the snapshot was produced.
    pub time: DateTime<Utc>,
    /// The engine version that produced it.
    pub version: String,
    /// The plugins loaded by the host at the time of the snapshot.
    pub plugins: Vec<PluginInfo>,
    /// Integrity magic derived from the other fields.
    pub magic: String,
}

impl Manifest {
    /// Creates a manifest and stamps its integrity magic.
    #[must_use]
    pub fn new(time: DateTime<Utc>, version: impl Into<String>, plugins: Vec<PluginInfo>) -> Self {
        let mut manifest = Self {
            time,
            version: version.into(),
            plugins,
            magic: String::new(),
        };
        manifest.magic = manifest.compute_magic();
        manifest
    }

    /// Computes the integrity magic over the manifest's fields.
    ///
    /// The computation is deterministic: field order is fixed and the plugin
    /// list is hashed in its stored order.
    #[must_use]
    pub fn compute_magic(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.version.as_bytes());
        hasher.update(self.time.to_rfc3339().as_bytes());
        for plugin in &self.plugins {
            hasher.update(plugin.name.as_bytes());
            hasher.update(plugin.kind.to_string().as_bytes());
            if let Some(version) = &plugin.version {
                hasher.update(version.as_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }

    /// Verifies the stored magic against a fresh computation.
    #[must_use]
    pub fn verify(&self) -> bool {
        let expected = self.compute_magic();
        // Constant-time comparison to avoid timing side channels.
        expected.len() == self.magic.len()
            && expected
                .bytes()
                .zip(self.magic.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

/// A complete record of a target's deployed resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Name of the target the snapshot belongs to.
    pub target: String,
    /// Metadata about the run that produced the snapshot.
    pub manifest: Manifest,
    /// Resource states, in dependency order.
    pub resources: Vec<StateCell>,
}

impl Snapshot {
    /// Creates a snapshot.
    #[must_use]
    pub const fn new(target: String, manifest: Manifest, resources: Vec<StateCell>) -> Self {
        Self {
            target,
            manifest,
            resources,
        }
    }

    /// Returns the number of resources recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if the snapshot records no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
