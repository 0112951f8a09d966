use wasm_bindgen::JsValue;

use super::BindingTier;
use crate::CoalescerError;

/// Configuration for a browser coalescer.
///
/// The target is always explicit. Use [`WebConfig::window`] to listen on the global scope.
///
/// # Example
///
/// ```rust, ignore
/// let cfg = WebConfig::new(element).tier(BindingTier::Property);
/// let coalescer = WebCoalescer::with_config("scroll", cfg)?;
/// ```
pub struct WebConfig {
    pub(crate) target: JsValue,
    pub(crate) tier: Option<BindingTier>,
}

impl WebConfig {
    /// Listen on `target`.
    pub fn new(target: impl Into<JsValue>) -> Self {
        Self {
            target: target.into(),
            tier: None,
        }
    }

    /// Listen on `window`.
    ///
    /// Fails where there is no window, such as inside a web worker.
    pub fn window() -> Result<Self, CoalescerError> {
        web_sys::window()
            .map(Self::new)
            .ok_or(CoalescerError::NoWindow)
    }

    /// Skip tier detection and register listeners with `tier`.
    pub fn tier(mut self, tier: BindingTier) -> Self {
        self.tier = Some(tier);
        self
    }
}
