//! Scratch directory scoped to a single bundle load.

use std::path::Path;

use tempfile::TempDir;

use crate::error::{Error, Result};

/// Uniquely named directory under the system temp dir.
///
/// The directory and everything in it are removed when the workspace is
/// dropped, including during unwinding. A workspace is movable but not
/// copyable; it is exclusively owned by one bundle load.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("satchel-bundle-")
            .tempdir()
            .map_err(|source| Error::Io {
                path: std::env::temp_dir(),
                source,
            })?;
        Ok(Self { dir })
    }

    /// Absolute path of the scratch directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
