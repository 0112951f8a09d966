use std::{fmt::Debug, rc::Rc};

/// A callback run once per flush with the most recent event.
///
/// Callbacks compare by identity: two handles are equal only if they were cloned from the same
/// [`Callback::new`] call. Wrapping the same closure twice gives two distinct callbacks.
pub struct Callback<E: 'static> {
    inner: Rc<dyn Fn(&E)>,
}

impl<E: 'static> Callback<E> {
    pub fn new(f: impl Fn(&E) + 'static) -> Self {
        Self { inner: Rc::new(f) }
    }

    /// Invoke the callback.
    pub fn call(&self, event: &E) {
        (self.inner)(event)
    }
}

impl<E: 'static> Clone for Callback<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: 'static> PartialEq for Callback<E> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<E: 'static> Eq for Callback<E> {}

impl<E: 'static> Debug for Callback<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Callback")
            .field(&Rc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}

impl<E: 'static, F: Fn(&E) + 'static> From<F> for Callback<E> {
    fn from(f: F) -> Self {
        Self::new(f)
    }
}
