//! Error taxonomy for the plugin registry and bundle loader.
//!
//! Every variant carries the offending path or name so callers can report
//! failures without re-deriving context. The kinds are part of the public
//! contract: hosts match on them to decide policy.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds surfaced by the registry, bundle, and verification paths.
#[derive(Debug, Error)]
pub enum Error {
    /// No file exists at the requested library path.
    #[error("plugin library not found at {}", .path.display())]
    LibraryNotFound { path: PathBuf },

    /// The OS loader rejected the shared library.
    #[error("failed to open plugin library {}: {}", .path.display(), .message)]
    LibraryOpenFailed { path: PathBuf, message: String },

    /// One of the two required factory exports is absent.
    #[error("library {} does not export '{}'", .path.display(), .symbol)]
    MissingFactorySymbol {
        path: PathBuf,
        symbol: &'static str,
    },

    /// `create_plugin` produced no instance.
    #[error("plugin factory in {} returned null", .path.display())]
    FactoryReturnedNull { path: PathBuf },

    /// The library exports the factory symbols but its declaration record
    /// is unusable (wrong ABI revision, unreadable name or version).
    #[error("library {} carries an incompatible plugin declaration: {}", .path.display(), .detail)]
    IncompatibleDeclaration { path: PathBuf, detail: String },

    /// A plugin with the same self-declared name is already registered.
    #[error("a plugin named '{name}' is already loaded")]
    NameCollision { name: String },

    /// Lookup of a name that has never been loaded, or was unloaded.
    #[error("plugin '{name}' has not been loaded")]
    NotLoaded { name: String },

    /// The plugin does not implement the requested interface.
    #[error("plugin '{name}' does not implement the requested interface")]
    TypeMismatch { name: String },

    /// No file exists at the requested bundle path.
    #[error("plugin bundle not found at {}", .path.display())]
    BundleNotFound { path: PathBuf },

    /// The archive could not be read or extracted.
    #[error("failed to extract bundle archive: {message}")]
    ArchiveCorrupt { message: String },

    /// The unpacked bundle has no `manifest.yaml` at its root.
    #[error("no manifest.yaml in unpacked bundle at {}", .path.display())]
    ManifestMissing { path: PathBuf },

    /// The manifest is missing required fields or contains invalid values.
    #[error("malformed bundle manifest: {message}")]
    ManifestMalformed { message: String },

    /// The bundle declares a signature that could not be verified against
    /// the host keyring.
    #[error("bundle cannot be trusted: {reason}")]
    UntrustedBundle { reason: String },

    /// Internal fault in the cryptographic machinery.
    #[error("crypto failure: {message}")]
    Crypto { message: String },

    /// Key bytes are neither PEM nor DER `SubjectPublicKeyInfo`.
    #[error("unrecognised public key format: {message}")]
    BadKeyFormat { message: String },

    /// Plugins with no host-compatible binary under the active load policy.
    #[error("plugins not ABI-compatible with this host: {}", .missing.join(", "))]
    AbiIncompatible { missing: Vec<String> },

    /// Ambient I/O failure outside the archive extractor.
    #[error("I/O error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
