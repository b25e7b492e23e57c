//! Mock plugin exposing the `Valid` interface.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use satchel_testkit::Valid;

#[derive(Default)]
struct ValidPlugin {
    drop_marker: Mutex<Option<PathBuf>>,
}

impl Valid for ValidPlugin {
    fn magic(&self) -> i32 {
        42
    }

    fn arm_drop_marker(&self, path: &Path) {
        *self.drop_marker.lock().unwrap() = Some(path.to_path_buf());
    }
}

impl Drop for ValidPlugin {
    // Runs inside destroy_plugin, while the library is still mapped; the
    // marker lets tests observe that ordering.
    fn drop(&mut self) {
        if let Some(path) = self.drop_marker.lock().unwrap().take() {
            let _ = std::fs::write(path, b"dropped");
        }
    }
}

satchel_core::declare_plugin!(ValidPlugin, dyn Valid, "ValidPlugin", "1.0.0");
