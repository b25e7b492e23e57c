//! C ABI shared between the registry and plugin libraries.
//!
//! A plugin library exports exactly two symbols, `create_plugin` and
//! `destroy_plugin`. `create_plugin` hands the host a declaration record
//! describing the plugin and carrying its erased instance; `destroy_plugin`
//! releases everything the record owns. Both are generated by
//! [`declare_plugin!`], so plugin authors never write them by hand.
//!
//! There is no language-level introspection across a shared-library
//! boundary, so typed retrieval rides on a per-interface identifier instead:
//! [`plugin_interface!`] assigns each host-declared interface a stable id,
//! the declaring macro embeds it in the record, and the registry's typed
//! accessor compares it against the caller's compile-time constant before
//! reconstructing the trait object.

use std::os::raw::{c_char, c_void};

/// Revision of the declaration record layout. A plugin built against a
/// different revision is rejected at load time.
pub const PLUGIN_ABI_VERSION: u32 = 1;

/// Identifier distinguishing host-declared interfaces at the library
/// boundary.
pub type InterfaceId = u64;

/// FNV-1a over a stable, host-chosen interface string.
pub const fn interface_id(name: &str) -> InterfaceId {
    let bytes = name.as_bytes();
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        i += 1;
    }
    hash
}

/// Declaration record returned by a plugin library's `create_plugin`.
///
/// `name` and `version` point at NUL-terminated statics inside the library
/// and remain valid while it is mapped. `instance` is the erased
/// `Box<Box<dyn Interface>>` for the interface named by `interface_id`;
/// only the library's own `destroy_plugin` may release it.
#[repr(C)]
pub struct RawPlugin {
    pub abi_version: u32,
    pub interface_id: InterfaceId,
    pub name: *const c_char,
    pub version: *const c_char,
    pub instance: *mut c_void,
}

/// Signature of the exported `create_plugin` symbol.
pub type CreateFn = unsafe extern "C" fn() -> *mut RawPlugin;

/// Signature of the exported `destroy_plugin` symbol.
pub type DestroyFn = unsafe extern "C" fn(*mut RawPlugin);

pub(crate) const CREATE_SYMBOL: &[u8] = b"create_plugin\0";
pub(crate) const DESTROY_SYMBOL: &[u8] = b"destroy_plugin\0";

/// Assigns a host-declared plugin interface its stable identifier.
///
/// The id string is chosen by the host and must stay the same on both sides
/// of the library boundary; version it like any other contract.
///
/// ```ignore
/// pub trait Greeter: satchel_core::Plugin {
///     fn greet(&self) -> String;
/// }
/// satchel_core::plugin_interface!(dyn Greeter, "myhost.greeter.v1");
/// ```
#[macro_export]
macro_rules! plugin_interface {
    ($interface:ty, $id:literal) => {
        impl $crate::plugin::PluginInterface for $interface {
            const INTERFACE_ID: $crate::plugin::abi::InterfaceId =
                $crate::plugin::abi::interface_id($id);
        }
    };
}

/// Declares a dynamic-library plugin.
///
/// Expands to the root [`Plugin`](crate::plugin::Plugin) impl returning the
/// literal name and version, plus the two exported factory symbols. Use
/// exactly once per plugin library; the plugin type must be
/// default-constructible and implement the named interface.
///
/// ```ignore
/// #[derive(Default)]
/// struct EnglishGreeter;
///
/// impl Greeter for EnglishGreeter {
///     fn greet(&self) -> String {
///         "hello".to_string()
///     }
/// }
///
/// satchel_core::declare_plugin!(EnglishGreeter, dyn Greeter, "english-greeter", "1.0.0");
/// ```
#[macro_export]
macro_rules! declare_plugin {
    ($plugin:ty, $interface:ty, $name:literal, $version:literal) => {
        impl $crate::plugin::Plugin for $plugin {
            fn name(&self) -> &str {
                $name
            }

            fn version(&self) -> &str {
                $version
            }
        }

        #[no_mangle]
        pub unsafe extern "C" fn create_plugin() -> *mut $crate::plugin::abi::RawPlugin {
            let instance: ::std::boxed::Box<$interface> =
                ::std::boxed::Box::new(<$plugin as ::std::default::Default>::default());
            let record = $crate::plugin::abi::RawPlugin {
                abi_version: $crate::plugin::abi::PLUGIN_ABI_VERSION,
                interface_id:
                    <$interface as $crate::plugin::PluginInterface>::INTERFACE_ID,
                name: concat!($name, "\0").as_ptr().cast(),
                version: concat!($version, "\0").as_ptr().cast(),
                instance: ::std::boxed::Box::into_raw(::std::boxed::Box::new(instance)).cast(),
            };
            ::std::boxed::Box::into_raw(::std::boxed::Box::new(record))
        }

        #[no_mangle]
        pub unsafe extern "C" fn destroy_plugin(record: *mut $crate::plugin::abi::RawPlugin) {
            if record.is_null() {
                return;
            }
            let record = ::std::boxed::Box::from_raw(record);
            if !record.instance.is_null() {
                drop(::std::boxed::Box::from_raw(
                    record.instance as *mut ::std::boxed::Box<$interface>,
                ));
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abi_version() {
        assert_eq!(PLUGIN_ABI_VERSION, 1);
    }

    #[test]
    fn test_interface_ids_are_stable_and_distinct() {
        assert_eq!(interface_id("a.b.v1"), interface_id("a.b.v1"));
        assert_ne!(interface_id("a.b.v1"), interface_id("a.b.v2"));
        assert_ne!(interface_id(""), interface_id(" "));
    }
}
