//! Signed multi-plugin bundle loading.
//!
//! A bundle is a ZIP archive carrying a `manifest.yaml` plus one or more
//! plugin binaries per supported platform. Opening a bundle unpacks it into
//! a scoped workspace, parses and verifies the manifest, selects the
//! binaries compatible with the running host, and registers them with the
//! plugin registry.

pub mod archive;
pub mod manifest;
pub mod platform;
pub mod workspace;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::crypt;
use crate::error::{Error, Result};
use crate::host::HostSpec;
use crate::keyring::Keyring;
use crate::plugin::registry::PluginRegistry;

use self::manifest::{BundleManifest, PluginPlatforms};
use self::platform::AbiSignature;
use self::workspace::Workspace;

/// How strictly bundle variant selection treats ABI coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Every plugin that ships binaries must have a host-compatible one.
    AllCompatible,
    /// At least one plugin must have a host-compatible binary.
    AnyCompatible,
}

/// Knobs for [`Bundle::open_with`].
#[derive(Debug, Default)]
pub struct BundleOptions {
    /// Keyring consulted during signature verification. Defaults to the
    /// host keyring.
    pub keyring: Option<Keyring>,
}

/// An opened plugin bundle.
///
/// The bundle owns the workspace its archive was unpacked into, and the OS
/// loader keeps file handles into that workspace for every plugin the
/// bundle registered. Unload those plugins before dropping the bundle; a
/// bundle opened against the global registry logs a warning when dropped
/// too early.
#[derive(Debug)]
pub struct Bundle {
    path: PathBuf,
    manifest: BundleManifest,
    plugin_names: Vec<String>,
    signed: bool,
    trusted: bool,
    uses_global_registry: bool,
    // Keeps the unpacked files alive while the plugins stay mapped.
    _workspace: Workspace,
}

impl Bundle {
    /// Opens the bundle at `path` against the process-wide registry and the
    /// host keyring.
    pub fn open(path: &Path, policy: LoadPolicy) -> Result<Self> {
        let mut registry = PluginRegistry::global().lock().unwrap();
        let mut bundle = Self::open_with(path, policy, &mut registry, BundleOptions::default())?;
        bundle.uses_global_registry = true;
        Ok(bundle)
    }

    /// Opens the bundle at `path` against an explicit registry and keyring.
    ///
    /// # Errors
    ///
    /// [`Error::BundleNotFound`], [`Error::ArchiveCorrupt`],
    /// [`Error::ManifestMissing`], [`Error::ManifestMalformed`],
    /// [`Error::UntrustedBundle`], [`Error::AbiIncompatible`], plus any
    /// registry load failure. Registry loads performed before a failure
    /// remain registered.
    pub fn open_with(
        path: &Path,
        policy: LoadPolicy,
        registry: &mut PluginRegistry,
        options: BundleOptions,
    ) -> Result<Self> {
        if !path.exists() {
            return Err(Error::BundleNotFound {
                path: path.to_path_buf(),
            });
        }

        let workspace = Workspace::new()?;
        archive::extract_archive(path, workspace.path())?;

        let host = HostSpec::detect();

        let manifest_path = workspace.path().join("manifest.yaml");
        if !manifest_path.exists() {
            return Err(Error::ManifestMissing {
                path: manifest_path,
            });
        }
        let manifest = BundleManifest::from_file(&manifest_path)?;

        let keyring = match options.keyring {
            Some(keyring) => keyring,
            None => Keyring::host_default()?,
        };
        let (signed, trusted) = verify_bundle(&manifest, workspace.path(), &keyring)?;

        let selected = select_variants(&manifest, &host, policy)?;

        let mut plugin_names = Vec::new();
        for record in &selected {
            registry.load(&workspace.path().join(&record.path))?;
            plugin_names.push(record.name.clone());
        }
        if !plugin_names.is_empty() {
            info!(
                "bundle '{}' registered {} plugin(s)",
                manifest.name,
                plugin_names.len()
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            manifest,
            plugin_names,
            signed,
            trusted,
            uses_global_registry: false,
            _workspace: workspace,
        })
    }

    /// Whether the named plugin was selected and registered by this bundle.
    pub fn has(&self, plugin_name: &str) -> bool {
        self.plugin_names.iter().any(|name| name == plugin_name)
    }

    /// Names of the plugins this bundle registered, in registration order.
    pub fn plugin_names(&self) -> &[String] {
        &self.plugin_names
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn author(&self) -> &str {
        &self.manifest.author
    }

    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    pub fn comment(&self) -> &str {
        &self.manifest.comment
    }

    /// The manifest's `bundledOn` timestamp, verbatim.
    pub fn bundled_at(&self) -> &str {
        &self.manifest.bundled_on
    }

    /// Whether the manifest carries a well-formed signature section.
    pub fn signed(&self) -> bool {
        self.signed
    }

    /// Whether the signature verified against a host-trusted key.
    pub fn trusted(&self) -> bool {
        self.trusted
    }

    /// The archive path this bundle was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Bundle {
    fn drop(&mut self) {
        if !self.uses_global_registry {
            return;
        }
        // Never panics: shutdown-path check only.
        if let Ok(registry) = PluginRegistry::global().lock() {
            let live = self
                .plugin_names
                .iter()
                .filter(|name| registry.has(name))
                .count();
            if live > 0 {
                warn!(
                    "bundle '{}' dropped while {live} of its plugin(s) remain registered; \
                     unload them before releasing the bundle",
                    self.manifest.name
                );
            }
        }
    }
}

/// Returns `(signed, trusted)` per the bundle trust policy: a missing
/// signature section is tolerated, a present one must verify.
fn verify_bundle(
    manifest: &BundleManifest,
    root: &Path,
    keyring: &Keyring,
) -> Result<(bool, bool)> {
    let Some(block) = &manifest.signature else {
        debug!("bundle manifest carries no signature section");
        return Ok((false, false));
    };

    if block.signature.trim().is_empty() {
        return Err(Error::ManifestMalformed {
            message: "signature section present but the signature value is empty".to_string(),
        });
    }
    let signature = hex::decode(block.signature.trim()).map_err(|err| {
        Error::ManifestMalformed {
            message: format!("bundle signature is not valid hex: {err}"),
        }
    })?;

    let canonical = canonical_digest_form(manifest, root)?;

    let Some(key) = keyring.find(&block.key_fingerprint)? else {
        return Err(Error::UntrustedBundle {
            reason: format!(
                "no trusted key matches fingerprint {}",
                block.key_fingerprint
            ),
        });
    };

    if key.verify(canonical.as_bytes(), &signature)? {
        Ok((true, true))
    } else {
        Err(Error::UntrustedBundle {
            reason: "signature does not match the bundle contents".to_string(),
        })
    }
}

/// Canonical signed form: one `"<relpath>:sha256:<hexdigest>"` line per file
/// referenced by the manifest, sorted by relative path ascending, joined
/// with single newlines and no trailing newline.
fn canonical_digest_form(manifest: &BundleManifest, root: &Path) -> Result<String> {
    let mut digests = BTreeMap::new();
    for relative in manifest.referenced_paths() {
        let file = root.join(relative);
        if !file.exists() {
            return Err(Error::UntrustedBundle {
                reason: format!("file listed in manifest is missing: {relative}"),
            });
        }
        digests.insert(relative.to_string(), crypt::sha256_file(&file)?);
    }

    let lines: Vec<String> = digests
        .iter()
        .map(|(path, digest)| format!("{path}:sha256:{digest}"))
        .collect();
    Ok(lines.join("\n"))
}

/// Applies the triplet and ABI filters, picking the first compatible binary
/// per plugin in manifest order.
fn select_variants(
    manifest: &BundleManifest,
    host: &HostSpec,
    policy: LoadPolicy,
) -> Result<Vec<PluginPlatforms>> {
    let host_triplet = host.triplet();
    let host_abi = host.abi_signature();

    let mut selected = Vec::new();
    let mut missing = Vec::new();

    for (name, entry) in &manifest.plugins {
        if entry.binaries.is_empty() {
            continue;
        }

        let mut chosen = None;
        for binary in &entry.binaries {
            if binary.platform.triplet != host_triplet {
                continue;
            }
            let required = AbiSignature::from_str(&binary.platform.abi_signature)?;
            if host_abi.is_compatible_with(&required) {
                chosen = Some(PluginPlatforms {
                    name: name.clone(),
                    triplet: binary.platform.triplet.clone(),
                    abi_signature: binary.platform.abi_signature.clone(),
                    arch: binary.platform.arch.clone(),
                    path: binary.path.clone(),
                });
                break;
            }
        }

        match chosen {
            Some(record) => selected.push(record),
            None => missing.push(name.clone()),
        }
    }

    match policy {
        LoadPolicy::AllCompatible if !missing.is_empty() => {
            Err(Error::AbiIncompatible { missing })
        }
        LoadPolicy::AnyCompatible if selected.is_empty() => {
            Err(Error::AbiIncompatible { missing })
        }
        _ => Ok(selected),
    }
}
