//! Dynamic-library plugin registry.

use std::collections::HashMap;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use libloading::Library;
use tracing::{debug, info};

use super::abi::{
    CreateFn, DestroyFn, RawPlugin, CREATE_SYMBOL, DESTROY_SYMBOL, PLUGIN_ABI_VERSION,
};
use super::PluginInterface;
use crate::error::{Error, Result};

/// One loaded plugin: its declaration record, the destroyer that releases
/// it, and the library that must stay mapped underneath both.
struct PluginHandle {
    name: String,
    version: String,
    record: *mut RawPlugin,
    destroy: DestroyFn,
    // Field order matters: the record and destroyer point into the mapped
    // library, and `Drop` runs before fields are dropped, so the instance
    // is destroyed strictly before the library handle is released.
    _library: Library,
}

impl Drop for PluginHandle {
    fn drop(&mut self) {
        if !self.record.is_null() {
            unsafe { (self.destroy)(self.record) };
            self.record = std::ptr::null_mut();
        }
    }
}

// The raw pointers are owned exclusively by the handle and released only in
// `drop`; instances are `Send + Sync` via the `Plugin` supertrait bounds.
unsafe impl Send for PluginHandle {}
unsafe impl Sync for PluginHandle {}

/// Registry of loaded plugin libraries, keyed by self-declared plugin name.
///
/// Mutations (`load`, `unload`) take `&mut self` and are expected to run on
/// a single control thread; `get` and `has` are plain reads. The
/// process-wide instance behind [`PluginRegistry::global`] wraps the
/// registry in a `Mutex`, so bundle loads and unrelated host code observe
/// one consistent set of plugins.
///
/// Teardown is deterministic: dropping the registry unloads every remaining
/// handle in reverse insertion order, and each handle destroys its instance
/// before its library is unmapped.
pub struct PluginRegistry {
    plugins: HashMap<String, PluginHandle>,
    // Insertion order, for deterministic reverse teardown.
    order: Vec<String>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Process-wide registry shared by bundle loads and host code.
    ///
    /// Statics are never dropped, so hosts that want an orderly shutdown
    /// call [`unload_all`](Self::unload_all) once plugin-calling threads
    /// have quiesced.
    pub fn global() -> &'static Mutex<PluginRegistry> {
        static GLOBAL: OnceLock<Mutex<PluginRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Mutex::new(PluginRegistry::new()))
    }

    /// Loads the shared library at `path` and registers the plugin it
    /// declares under its self-declared name.
    ///
    /// The library is opened with lazy symbol resolution and global symbol
    /// visibility. On any failure after the library was opened it is closed
    /// again before the error surfaces; on a name collision the freshly
    /// created instance is destroyed with the library's own destroyer
    /// first.
    ///
    /// # Errors
    ///
    /// [`Error::LibraryNotFound`], [`Error::LibraryOpenFailed`],
    /// [`Error::MissingFactorySymbol`], [`Error::FactoryReturnedNull`],
    /// [`Error::IncompatibleDeclaration`], [`Error::NameCollision`].
    pub fn load(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(Error::LibraryNotFound {
                path: path.to_path_buf(),
            });
        }
        debug!("loading plugin library {}", path.display());

        let library = open_library(path)?;

        let create: CreateFn = match unsafe { library.get::<CreateFn>(CREATE_SYMBOL) } {
            Ok(symbol) => *symbol,
            Err(_) => {
                return Err(Error::MissingFactorySymbol {
                    path: path.to_path_buf(),
                    symbol: "create_plugin",
                })
            }
        };
        let destroy: DestroyFn = match unsafe { library.get::<DestroyFn>(DESTROY_SYMBOL) } {
            Ok(symbol) => *symbol,
            Err(_) => {
                return Err(Error::MissingFactorySymbol {
                    path: path.to_path_buf(),
                    symbol: "destroy_plugin",
                })
            }
        };

        let record = unsafe { create() };
        if record.is_null() {
            return Err(Error::FactoryReturnedNull {
                path: path.to_path_buf(),
            });
        }

        let declaration = unsafe { &*record };
        if declaration.abi_version != PLUGIN_ABI_VERSION {
            let detail = format!(
                "declares ABI revision {} but this host expects {}",
                declaration.abi_version, PLUGIN_ABI_VERSION
            );
            unsafe { destroy(record) };
            return Err(Error::IncompatibleDeclaration {
                path: path.to_path_buf(),
                detail,
            });
        }
        if declaration.instance.is_null() {
            unsafe { destroy(record) };
            return Err(Error::FactoryReturnedNull {
                path: path.to_path_buf(),
            });
        }

        let Some(name) = read_declared_str(declaration.name) else {
            unsafe { destroy(record) };
            return Err(Error::IncompatibleDeclaration {
                path: path.to_path_buf(),
                detail: "unreadable plugin name".to_string(),
            });
        };
        let Some(version) = read_declared_str(declaration.version) else {
            unsafe { destroy(record) };
            return Err(Error::IncompatibleDeclaration {
                path: path.to_path_buf(),
                detail: "unreadable plugin version".to_string(),
            });
        };

        if self.plugins.contains_key(&name) {
            unsafe { destroy(record) };
            return Err(Error::NameCollision { name });
        }

        info!("loaded plugin '{name}' v{version} from {}", path.display());
        self.order.push(name.clone());
        self.plugins.insert(
            name.clone(),
            PluginHandle {
                name,
                version,
                record,
                destroy,
                _library: library,
            },
        );
        Ok(())
    }

    /// Destroys the named plugin's instance, then closes its library, then
    /// forgets the entry. A no-op when the name is absent.
    ///
    /// Any reference previously obtained through [`get`](Self::get) is
    /// invalid afterwards; the borrow checker enforces that for safe
    /// callers.
    pub fn unload(&mut self, name: &str) {
        if let Some(handle) = self.plugins.remove(name) {
            debug!("unloading plugin '{}' v{}", handle.name, handle.version);
            self.order.retain(|entry| entry != name);
            drop(handle);
        }
    }

    /// Typed access to a loaded plugin.
    ///
    /// # Errors
    ///
    /// [`Error::NotLoaded`] when nothing is registered under `name`;
    /// [`Error::TypeMismatch`] when the plugin does not implement `T` (the
    /// plugin stays loaded).
    pub fn get<T: PluginInterface + ?Sized>(&self, name: &str) -> Result<&T> {
        let handle = self.plugins.get(name).ok_or_else(|| Error::NotLoaded {
            name: name.to_string(),
        })?;
        let declaration = unsafe { &*handle.record };
        if declaration.interface_id != T::INTERFACE_ID {
            return Err(Error::TypeMismatch {
                name: name.to_string(),
            });
        }
        // The id match proves the erased pointer is the `Box<Box<T>>` the
        // declaring macro produced for this interface.
        let instance = unsafe { &*(declaration.instance as *const Box<T>) };
        Ok(instance.as_ref())
    }

    /// Presence test; never fails.
    pub fn has(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Names of all loaded plugins, in load order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Unloads every remaining plugin, newest first.
    pub fn unload_all(&mut self) {
        while let Some(name) = self.order.pop() {
            if let Some(handle) = self.plugins.remove(&name) {
                debug!("unloading plugin '{}' v{}", handle.name, handle.version);
                drop(handle);
            }
        }
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PluginRegistry {
    // Runs during shutdown paths: must not panic. Each handle destroys its
    // instance before its library is unmapped.
    fn drop(&mut self) {
        self.unload_all();
    }
}

/// Opens with lazy resolution and global symbol visibility, the loader
/// semantics plugin libraries are linked against.
#[cfg(unix)]
fn open_library(path: &Path) -> Result<Library> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_LAZY};

    match unsafe { UnixLibrary::open(Some(path), RTLD_LAZY | RTLD_GLOBAL) } {
        Ok(library) => Ok(library.into()),
        Err(err) => Err(Error::LibraryOpenFailed {
            path: path.to_path_buf(),
            message: err.to_string(),
        }),
    }
}

#[cfg(not(unix))]
fn open_library(path: &Path) -> Result<Library> {
    match unsafe { Library::new(path) } {
        Ok(library) => Ok(library),
        Err(err) => Err(Error::LibraryOpenFailed {
            path: path.to_path_buf(),
            message: err.to_string(),
        }),
    }
}

fn read_declared_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .ok()
        .map(str::to_owned)
}
