use wasm_bindgen::{prelude::Closure, JsCast};
use web_sys::Window;

use super::describe;
use crate::{CoalescerError, FrameScheduler};

/// Schedules flushes with `window.requestAnimationFrame`.
pub struct AnimationFrame {
    window: Window,
}

impl AnimationFrame {
    pub fn new() -> Result<Self, CoalescerError> {
        web_sys::window()
            .map(Self::with_window)
            .ok_or(CoalescerError::NoWindow)
    }

    pub fn with_window(window: Window) -> Self {
        Self { window }
    }
}

impl FrameScheduler for AnimationFrame {
    fn request_frame(&self, flush: Box<dyn FnOnce()>) -> Result<(), CoalescerError> {
        let callback = Closure::once_into_js(move || flush());
        self.window
            .request_animation_frame(callback.unchecked_ref())
            .map(drop)
            .map_err(|err| CoalescerError::Schedule {
                reason: describe(&err),
            })
    }
}
