//! Plugin interfaces and the process-wide registry.
//!
//! A plugin is a shared library exporting the factory symbol pair generated
//! by [`declare_plugin!`](crate::declare_plugin). The host declares abstract
//! interfaces as traits with [`Plugin`] as their supertrait, assigns each a
//! stable identifier with [`plugin_interface!`](crate::plugin_interface),
//! and asks the [`PluginRegistry`] for instances narrowed to those traits.
//!
//! ```ignore
//! use satchel_core::{Plugin, PluginRegistry};
//!
//! pub trait Greeter: Plugin {
//!     fn greet(&self) -> String;
//! }
//! satchel_core::plugin_interface!(dyn Greeter, "myhost.greeter.v1");
//!
//! let mut registry = PluginRegistry::new();
//! registry.load("plugins/libenglish_greeter.so".as_ref())?;
//! let greeter = registry.get::<dyn Greeter>("english-greeter")?;
//! println!("{}", greeter.greet());
//! # Ok::<(), satchel_core::Error>(())
//! ```

pub mod abi;
pub mod functor;
pub mod registry;

pub use self::functor::Functor;
pub use self::registry::PluginRegistry;

use self::abi::InterfaceId;

/// Root contract every plugin implements.
///
/// The registry keys plugins by the self-declared [`name`](Plugin::name),
/// not by the library filename, so a plugin keeps its identity when the
/// file moves. Returned strings stay valid for the instance's lifetime.
pub trait Plugin: Send + Sync {
    /// Self-declared unique plugin name; the registry key.
    fn name(&self) -> &str;

    /// Plugin version string.
    fn version(&self) -> &str;
}

/// A host-declared interface registered via
/// [`plugin_interface!`](crate::plugin_interface).
pub trait PluginInterface: Plugin {
    /// Compile-time identifier compared against the declaration record
    /// during typed retrieval.
    const INTERFACE_ID: InterfaceId;
}
