//! Mock plugin interfaces used exclusively for testing.
//!
//! Both the test suite and the mock plugin libraries link against this
//! crate, so the trait shapes and interface identifiers agree on the two
//! sides of the library boundary.

use std::fmt;
use std::path::Path;

use satchel_core::{Functor, Plugin};

/// Interface implemented by the valid mock plugin.
pub trait Valid: Plugin {
    /// Always 42; proves the typed downcast reached the real instance.
    fn magic(&self) -> i32;

    /// Asks the plugin to write a marker file when its destructor runs, so
    /// tests can observe teardown ordering.
    fn arm_drop_marker(&self, path: &Path);
}
satchel_core::plugin_interface!(dyn Valid, "satchel.testkit.valid.v1");

impl fmt::Debug for dyn Valid + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Valid")
    }
}

/// An unrelated interface for exercising type mismatches.
pub trait Other: Plugin {
    fn tag(&self) -> &'static str;
}
satchel_core::plugin_interface!(dyn Other, "satchel.testkit.other.v1");

/// Payload transformed by the functor mock plugin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub value: i32,
    pub threshold: f64,
}

/// Functor interface over [`Frame`].
pub trait FrameFunctor: Functor<Frame> {}
impl<P: Functor<Frame>> FrameFunctor for P {}
satchel_core::plugin_interface!(dyn FrameFunctor, "satchel.testkit.frame-functor.v1");
