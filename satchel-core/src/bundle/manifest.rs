//! Serde model of the bundle manifest.
//!
//! `manifest.yaml` sits at the root of every bundle archive and enumerates
//! the bundled plugins with one entry per `(plugin, platform)` binary. The
//! plugin mapping is kept in a sorted map so iteration, and everything
//! derived from it, is deterministic.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level `manifest.yaml` contents.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleManifest {
    #[serde(rename = "bundleName")]
    pub name: String,
    #[serde(rename = "bundleVersion")]
    pub version: String,
    #[serde(rename = "bundleAuthor")]
    pub author: String,
    #[serde(rename = "bundleComment")]
    pub comment: String,
    #[serde(rename = "bundledOn")]
    pub bundled_on: String,
    #[serde(rename = "bundleSignature", default)]
    pub signature: Option<SignatureBlock>,
    #[serde(rename = "bundlePlugins")]
    pub plugins: BTreeMap<String, PluginEntry>,
}

/// Detached signature over the bundle's canonical content digest.
#[derive(Debug, Clone, Deserialize)]
pub struct SignatureBlock {
    /// Hex-encoded signature bytes.
    pub signature: String,
    /// `"sha256:<hex>"` fingerprint of the signing key.
    #[serde(rename = "keyFingerprint")]
    pub key_fingerprint: String,
}

/// One plugin's entry in the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginEntry {
    /// Optional source distribution shipped alongside the binaries.
    #[serde(default)]
    pub sdist: Option<SdistEntry>,
    pub binaries: Vec<BinaryEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SdistEntry {
    pub path: String,
}

/// One compiled variant of a plugin.
#[derive(Debug, Clone, Deserialize)]
pub struct BinaryEntry {
    pub platform: PlatformEntry,
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformEntry {
    pub triplet: String,
    pub abi_signature: String,
    pub arch: String,
}

/// One `(plugin, platform)` row flattened out of the manifest.
#[derive(Debug, Clone)]
pub struct PluginPlatforms {
    pub name: String,
    pub triplet: String,
    pub abi_signature: String,
    pub arch: String,
    /// Path relative to the unpacked bundle root.
    pub path: String,
}

impl BundleManifest {
    /// Parses `manifest.yaml`; any missing required field is fatal.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| Error::ManifestMalformed {
            message: format!("cannot read {}: {err}", path.display()),
        })?;
        serde_yaml::from_str(&text).map_err(|err| Error::ManifestMalformed {
            message: err.to_string(),
        })
    }

    /// Every file the manifest references, relative to the bundle root:
    /// per-plugin `sdist` paths plus every per-platform binary path.
    pub fn referenced_paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        for entry in self.plugins.values() {
            if let Some(sdist) = &entry.sdist {
                paths.push(sdist.path.as_str());
            }
            for binary in &entry.binaries {
                paths.push(binary.path.as_str());
            }
        }
        paths
    }

    /// Flattens into one record per `(plugin, binary)` pair, preserving the
    /// per-plugin binary order.
    pub fn platform_records(&self) -> Vec<PluginPlatforms> {
        let mut records = Vec::new();
        for (name, entry) in &self.plugins {
            for binary in &entry.binaries {
                records.push(PluginPlatforms {
                    name: name.clone(),
                    triplet: binary.platform.triplet.clone(),
                    abi_signature: binary.platform.abi_signature.clone(),
                    arch: binary.platform.arch.clone(),
                    path: binary.path.clone(),
                });
            }
        }
        records
    }
}
