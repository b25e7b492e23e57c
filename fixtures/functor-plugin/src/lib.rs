//! Mock transformation plugin over the `Frame` payload.

use satchel_core::Functor;
use satchel_testkit::{Frame, FrameFunctor};

#[derive(Default)]
struct FunctorPlugin;

impl Functor<Frame> for FunctorPlugin {
    fn apply(&self, input: Frame) -> Frame {
        Frame {
            value: input.value * 2,
            threshold: input.threshold + 1.0,
        }
    }
}

satchel_core::declare_plugin!(FunctorPlugin, dyn FrameFunctor, "FunctorPlugin", "1.0.0");
