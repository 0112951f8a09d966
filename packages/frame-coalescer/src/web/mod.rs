//! Browser host for the coalescer.
//!
//! [`WebBinding`] attaches listeners through whichever registration mechanism the target offers,
//! and [`AnimationFrame`] schedules flushes with `requestAnimationFrame`. [`JsEventCoalescer`]
//! exposes the whole thing to JavaScript as the `EventCoalescer` class.

use js_sys::Function;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Event;

use crate::{CoalescerError, EventCoalescer};

mod bindings;
mod cfg;
mod listener;
mod raf;

pub use bindings::JsEventCoalescer;
pub use cfg::WebConfig;
pub use listener::{BindingTier, WebBinding};
pub use raf::AnimationFrame;

/// A coalescer for DOM events, flushed on animation frames.
pub type WebCoalescer = EventCoalescer<Event, WebBinding, AnimationFrame>;

impl EventCoalescer<Event, WebBinding, AnimationFrame> {
    /// Build a coalescer for the target and tier in `cfg`.
    pub fn with_config(events: &str, cfg: WebConfig) -> Result<Self, CoalescerError> {
        let binding = match cfg.tier {
            Some(tier) => WebBinding::with_tier(cfg.target, tier),
            None => WebBinding::new(cfg.target),
        };
        Self::new(events, binding, AnimationFrame::new()?)
    }

    /// Build a coalescer listening on `window`.
    pub fn on_window(events: &str) -> Result<Self, CoalescerError> {
        Self::with_config(events, WebConfig::window()?)
    }
}

impl From<CoalescerError> for JsValue {
    fn from(err: CoalescerError) -> Self {
        let message = format!("EventCoalescer: {err}");
        if err.is_type_constraint() {
            js_sys::TypeError::new(&message).into()
        } else {
            js_sys::Error::new(&message).into()
        }
    }
}

/// Best-effort message for a thrown JS value.
pub(crate) fn describe(err: &JsValue) -> String {
    if let Some(err) = err.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    if let Some(function) = err.dyn_ref::<Function>() {
        return String::from(function.name());
    }
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}
