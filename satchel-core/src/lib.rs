//! Runtime extension loading for native hosts.
//!
//! Satchel locates, validates, loads, and manages dynamic-library plugins
//! authored against host-declared abstract interfaces, and loads
//! collections of such plugins distributed as signed, multi-platform ZIP
//! bundles.
//!
//! Two subsystems carry the weight:
//!
//! - [`PluginRegistry`] owns library handles and plugin instances, enforces
//!   unique names, mediates type-checked retrieval, and guarantees that an
//!   instance is destroyed before its library is unmapped.
//! - [`Bundle`] unpacks a signed archive into a scoped workspace, verifies
//!   its manifest signature against the host keyring, matches binaries
//!   against the running host's platform and ABI, and drives the registry
//!   to load the selected ones.

pub mod bundle;
pub mod crypt;
pub mod error;
pub mod host;
pub mod keyring;
pub mod plugin;

// Public library API.
pub use bundle::{Bundle, BundleOptions, LoadPolicy};
pub use error::{Error, Result};
pub use host::HostSpec;
pub use keyring::Keyring;
pub use plugin::{Functor, Plugin, PluginInterface, PluginRegistry};
