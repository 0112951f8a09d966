use std::rc::Rc;

use crate::CoalescerError;

/// The dispatch handler a coalescer hands to its binding.
///
/// The host calls it synchronously for every raw event. One handler is created per coalescer and
/// passed to every `attach` and `detach` call, so bindings may compare it by identity.
pub type Handler<E> = Rc<dyn Fn(E)>;

/// Installs and removes native listeners on a target.
///
/// The coalescer tracks which names are attached and never attaches the same name twice without
/// a detach in between.
pub trait ListenerBinding<E> {
    /// Start delivering `event` occurrences on the target to `handler`.
    fn attach(&self, event: &str, handler: &Handler<E>) -> Result<(), CoalescerError>;

    /// Stop delivering `event` occurrences on the target to `handler`.
    fn detach(&self, event: &str, handler: &Handler<E>) -> Result<(), CoalescerError>;
}

impl<E, B: ListenerBinding<E> + ?Sized> ListenerBinding<E> for Rc<B> {
    fn attach(&self, event: &str, handler: &Handler<E>) -> Result<(), CoalescerError> {
        (**self).attach(event, handler)
    }

    fn detach(&self, event: &str, handler: &Handler<E>) -> Result<(), CoalescerError> {
        (**self).detach(event, handler)
    }
}
