use std::cell::RefCell;

use js_sys::{Function, Promise};
use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
use web_sys::Event;

use super::{describe, WebCoalescer, WebConfig};
use crate::{Callback, CoalescerError};

/// The coalescer as a JavaScript class.
///
/// ```js
/// const coalescer = new EventCoalescer("scroll resize");
/// const onFrame = (event) => console.log(event.type);
/// coalescer.register(onFrame);   // 1
/// coalescer.deregister(onFrame); // 0
/// coalescer.deregister(onFrame); // -1
/// ```
///
/// Arguments of the wrong type throw a `TypeError` before anything changes. A callback that
/// throws is reported to the page as an unhandled rejection and the remaining callbacks still
/// run.
#[wasm_bindgen(js_name = EventCoalescer)]
pub struct JsEventCoalescer {
    inner: WebCoalescer,
    // parallels the core's callback list so JS functions can be found by identity
    callbacks: RefCell<Vec<(Function, Callback<Event>)>>,
}

#[wasm_bindgen(js_class = EventCoalescer)]
impl JsEventCoalescer {
    /// `new EventCoalescer(events, target = window)`
    #[wasm_bindgen(constructor)]
    pub fn new(events: JsValue, target: JsValue) -> Result<JsEventCoalescer, JsValue> {
        let events = event_names(&events)?;
        let cfg = if target.is_undefined() || target.is_null() {
            WebConfig::window()?
        } else {
            WebConfig::new(target)
        };

        Ok(Self {
            inner: WebCoalescer::with_config(&events, cfg)?,
            callbacks: RefCell::new(Vec::new()),
        })
    }

    #[wasm_bindgen(js_name = addListeners)]
    pub fn add_listeners(&self, events: JsValue) -> Result<(), JsValue> {
        self.inner.add_listeners(&event_names(&events)?)?;
        Ok(())
    }

    #[wasm_bindgen(js_name = removeListeners)]
    pub fn remove_listeners(&self, events: JsValue, hard: Option<bool>) -> Result<(), JsValue> {
        self.inner
            .remove_listeners(&event_names(&events)?, hard.unwrap_or(false))?;
        Ok(())
    }

    /// Returns the new number of callbacks.
    pub fn register(&self, callback: JsValue) -> Result<usize, JsValue> {
        let function = callable(callback)?;
        let callback = Callback::new({
            let function = function.clone();
            move |event: &Event| {
                if let Err(err) = function.call1(&JsValue::UNDEFINED, event) {
                    tracing::error!(error = %describe(&err), "event callback threw");
                    // surfaces as an `unhandledrejection` without aborting the flush
                    let _ = Promise::reject(&err);
                }
            }
        });

        let len = self.inner.register(callback.clone())?;
        self.callbacks.borrow_mut().push((function, callback));
        Ok(len)
    }

    /// Returns the index the callback was removed from, or -1.
    pub fn deregister(&self, callback: JsValue) -> Result<i32, JsValue> {
        let function = callable(callback)?;
        let found = self
            .callbacks
            .borrow()
            .iter()
            .find(|(registered, _)| *registered == function)
            .map(|(_, callback)| callback.clone());

        let Some(callback) = found else {
            return Ok(-1);
        };

        self.callbacks
            .borrow_mut()
            .retain(|(_, registered)| *registered != callback);
        let index = self.inner.deregister(&callback);
        Ok(index.map_or(-1, |index| index as i32))
    }

    /// The remembered event names, space separated.
    #[wasm_bindgen(getter)]
    pub fn events(&self) -> String {
        self.inner.event_names().to_string()
    }
}

impl JsEventCoalescer {
    /// The Rust coalescer behind this object.
    pub fn coalescer(&self) -> &WebCoalescer {
        &self.inner
    }
}

fn event_names(value: &JsValue) -> Result<String, CoalescerError> {
    value.as_string().ok_or(CoalescerError::EventNamesNotString)
}

fn callable(value: JsValue) -> Result<Function, CoalescerError> {
    value
        .dyn_into::<Function>()
        .map_err(|_| CoalescerError::NotCallable)
}
