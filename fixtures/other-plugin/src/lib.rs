//! Mock plugin exposing the `Other` interface, unrelated to `Valid`.

use satchel_testkit::Other;

#[derive(Default)]
struct OtherPlugin;

impl Other for OtherPlugin {
    fn tag(&self) -> &'static str {
        "other"
    }
}

satchel_core::declare_plugin!(OtherPlugin, dyn Other, "OtherPlugin", "0.2.0");
