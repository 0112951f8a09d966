use std::cell::RefCell;

use js_sys::{Function, Reflect};
use wasm_bindgen::{prelude::Closure, JsCast, JsValue};
use web_sys::{Event, EventTarget};

use super::describe;
use crate::{BindingOp, CoalescerError, Handler, ListenerBinding};

/// How listeners get registered on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingTier {
    /// `addEventListener` / `removeEventListener`, non-capturing.
    Standard,
    /// `attachEvent` / `detachEvent` with `on`-prefixed names.
    LegacyAttach,
    /// Assigning the handler to the target's `on<event>` property.
    Property,
}

impl BindingTier {
    /// Pick the best tier the target supports.
    pub fn detect(target: &JsValue) -> Self {
        if has_method(target, "addEventListener") {
            BindingTier::Standard
        } else if has_method(target, "attachEvent") {
            BindingTier::LegacyAttach
        } else {
            BindingTier::Property
        }
    }
}

fn has_method(target: &JsValue, name: &str) -> bool {
    Reflect::get(target, &JsValue::from_str(name))
        .map(|value| value.is_function())
        .unwrap_or(false)
}

/// Attaches a coalescer's handler to a JS target.
///
/// The handler is wrapped in a single JS function the first time it is attached. Every later
/// attach and detach reuses that function, so removal finds what was added.
pub struct WebBinding {
    target: JsValue,
    tier: BindingTier,
    listener: RefCell<Option<Closure<dyn Fn(Event)>>>,
}

impl WebBinding {
    /// Bind to `target` with the best tier it supports.
    pub fn new(target: impl Into<JsValue>) -> Self {
        let target = target.into();
        let tier = BindingTier::detect(&target);
        tracing::debug!(?tier, "detected listener binding tier");
        Self::with_tier(target, tier)
    }

    /// Bind to `target` with a fixed tier.
    pub fn with_tier(target: impl Into<JsValue>, tier: BindingTier) -> Self {
        Self {
            target: target.into(),
            tier,
            listener: RefCell::new(None),
        }
    }

    pub fn tier(&self) -> BindingTier {
        self.tier
    }

    pub fn target(&self) -> &JsValue {
        &self.target
    }

    fn function(&self, handler: &Handler<Event>) -> Function {
        let mut listener = self.listener.borrow_mut();
        let closure = listener.get_or_insert_with(|| {
            let handler = handler.clone();
            Closure::wrap(Box::new(move |event: Event| handler(event)) as Box<dyn Fn(Event)>)
        });
        closure.as_ref().unchecked_ref::<Function>().clone()
    }

    fn call_legacy(&self, method: &str, event: &str, function: &Function) -> Result<(), JsValue> {
        let method: Function = Reflect::get(&self.target, &JsValue::from_str(method))?.dyn_into()?;
        method.call2(&self.target, &on(event), function)?;
        Ok(())
    }

    fn set_property(&self, event: &str, value: &JsValue) -> Result<(), JsValue> {
        if Reflect::set(&self.target, &on(event), value)? {
            Ok(())
        } else {
            Err(JsValue::from_str("property is not writable"))
        }
    }
}

impl ListenerBinding<Event> for WebBinding {
    fn attach(&self, event: &str, handler: &Handler<Event>) -> Result<(), CoalescerError> {
        let function = self.function(handler);
        let result = match self.tier {
            BindingTier::Standard => self
                .target
                .unchecked_ref::<EventTarget>()
                .add_event_listener_with_callback(event, &function),
            BindingTier::LegacyAttach => self.call_legacy("attachEvent", event, &function),
            BindingTier::Property => self.set_property(event, &function),
        };
        result.map_err(|err| binding_error(BindingOp::Attach, event, &err))
    }

    fn detach(&self, event: &str, handler: &Handler<Event>) -> Result<(), CoalescerError> {
        let function = self.function(handler);
        let result = match self.tier {
            BindingTier::Standard => self
                .target
                .unchecked_ref::<EventTarget>()
                .remove_event_listener_with_callback(event, &function),
            BindingTier::LegacyAttach => self.call_legacy("detachEvent", event, &function),
            BindingTier::Property => self.set_property(event, &JsValue::NULL),
        };
        result.map_err(|err| binding_error(BindingOp::Detach, event, &err))
    }
}

fn on(event: &str) -> JsValue {
    JsValue::from_str(&format!("on{event}"))
}

fn binding_error(op: BindingOp, event: &str, err: &JsValue) -> CoalescerError {
    CoalescerError::Binding {
        op,
        event: event.to_string(),
        reason: describe(err),
    }
}
