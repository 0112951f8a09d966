use std::{
    cell::RefCell,
    fmt::Debug,
    rc::{Rc, Weak},
};

use rustc_hash::FxHashSet;

use crate::{
    events::{tokens, EventNames},
    Callback, CoalescerError, FrameScheduler, Handler, ListenerBinding,
};

/// Coalesces raw events into at most one callback run per frame.
///
/// Every raw event on a subscribed name reaches the coalescer's dispatch handler. The first one
/// schedules a flush through the [`FrameScheduler`]; the ones after it only replace the stored
/// event until that flush runs. The flush then calls every registered callback, in registration
/// order, with the most recent event.
///
/// Native listeners are attached through the [`ListenerBinding`] when event names are added and
/// whenever the first callback is registered. They are detached when the last callback is
/// deregistered and when the last handle to the coalescer is dropped.
///
/// Handles are cheap to clone and all refer to the same coalescer.
///
/// # Example
///
/// ```rust
/// # use frame_coalescer::{Callback, EventCoalescer, FrameQueue, Handler, ListenerBinding, CoalescerError};
/// # struct Ignore;
/// # impl ListenerBinding<u32> for Ignore {
/// #     fn attach(&self, _: &str, _: &Handler<u32>) -> Result<(), CoalescerError> { Ok(()) }
/// #     fn detach(&self, _: &str, _: &Handler<u32>) -> Result<(), CoalescerError> { Ok(()) }
/// # }
/// let frames = FrameQueue::new();
/// let coalescer = EventCoalescer::new("scroll resize", Ignore, frames.clone()).unwrap();
/// coalescer.register(Callback::new(|y: &u32| println!("scrolled to {y}"))).unwrap();
///
/// coalescer.dispatch(10);
/// coalescer.dispatch(20);
///
/// // prints "scrolled to 20" once
/// frames.run_frame();
/// ```
pub struct EventCoalescer<E: 'static, B: ListenerBinding<E>, S: FrameScheduler> {
    shared: Rc<Shared<E, B, S>>,
}

struct Shared<E: 'static, B: ListenerBinding<E>, S: FrameScheduler> {
    binding: B,
    scheduler: S,
    handler: Handler<E>,
    state: RefCell<State<E>>,
}

struct State<E: 'static> {
    names: EventNames,
    attached: FxHashSet<String>,
    callbacks: Vec<Callback<E>>,
    phase: Phase,
    latest: Option<E>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// A flush has been requested and hasn't started yet.
    Scheduled,
    /// The callbacks are running.
    Flushing,
}

impl<E, B, S> EventCoalescer<E, B, S>
where
    E: 'static,
    B: ListenerBinding<E> + 'static,
    S: FrameScheduler + 'static,
{
    /// Create a coalescer and immediately attach listeners for every name in `events`.
    pub fn new(events: &str, binding: B, scheduler: S) -> Result<Self, CoalescerError> {
        let shared = Rc::new_cyclic(|weak: &Weak<Shared<E, B, S>>| {
            let weak = weak.clone();
            let handler: Handler<E> = Rc::new(move |event: E| {
                if let Some(shared) = weak.upgrade() {
                    shared.dispatch(event);
                }
            });

            Shared {
                binding,
                scheduler,
                handler,
                state: RefCell::new(State {
                    names: EventNames::new(),
                    attached: FxHashSet::default(),
                    callbacks: Vec::new(),
                    phase: Phase::Idle,
                    latest: None,
                }),
            }
        });

        let coalescer = Self { shared };
        coalescer.add_listeners(events)?;
        Ok(coalescer)
    }

    /// Subscribe to every name in the whitespace-separated `events` list.
    ///
    /// The names join the remembered set and their listeners are attached right away, whether or
    /// not any callback is registered yet.
    pub fn add_listeners(&self, events: &str) -> Result<(), CoalescerError> {
        self.shared.state.borrow_mut().names.extend(events);
        self.shared.attach(tokens(events).map(str::to_string).collect())
    }

    /// Detach the listeners for every name in `events`.
    ///
    /// With `hard` the names are also forgotten, so registering a first callback later won't
    /// attach them again. Names that were never subscribed are ignored.
    pub fn remove_listeners(&self, events: &str, hard: bool) -> Result<(), CoalescerError> {
        if hard {
            self.shared.state.borrow_mut().names.remove(events);
        }
        self.shared.detach(tokens(events).map(str::to_string).collect())
    }

    /// Append a callback and return the new number of callbacks.
    ///
    /// Registering the first callback attaches every remembered name that isn't attached.
    /// Duplicates are allowed; the same callback registered twice runs twice per flush.
    pub fn register(&self, callback: Callback<E>) -> Result<usize, CoalescerError> {
        let first = self.shared.state.borrow().callbacks.is_empty();
        if first {
            let names = self
                .shared
                .state
                .borrow()
                .names
                .iter()
                .map(str::to_string)
                .collect();
            self.shared.attach(names)?;
        }

        let mut state = self.shared.state.borrow_mut();
        state.callbacks.push(callback);
        Ok(state.callbacks.len())
    }

    /// Remove the first occurrence of `callback` and return the index it was found at.
    ///
    /// Returns `None` if the callback isn't registered. Removing the last callback detaches
    /// every attached listener; a listener the host refuses to detach is logged and skipped.
    pub fn deregister(&self, callback: &Callback<E>) -> Option<usize> {
        let (index, emptied) = {
            let mut state = self.shared.state.borrow_mut();
            let index = state.callbacks.iter().position(|cb| cb == callback);
            if let Some(index) = index {
                state.callbacks.remove(index);
            }
            (index, index.is_some() && state.callbacks.is_empty())
        };

        if emptied {
            let names = self.shared.state.borrow().attached_in_order();
            self.shared.detach_all(names);
        }

        index
    }

    /// Feed a raw event to the coalescer, exactly as the native listener does.
    pub fn dispatch(&self, event: E) {
        self.shared.dispatch(event)
    }

    /// The dispatch handler given to the binding.
    pub fn handler(&self) -> Handler<E> {
        self.shared.handler.clone()
    }

    /// The remembered event names.
    pub fn event_names(&self) -> EventNames {
        self.shared.state.borrow().names.clone()
    }

    /// Whether a native listener for `event` is currently attached.
    pub fn is_attached(&self, event: &str) -> bool {
        self.shared.state.borrow().attached.contains(event)
    }

    pub fn callback_count(&self) -> usize {
        self.shared.state.borrow().callbacks.len()
    }

    /// Whether a flush has been scheduled and hasn't finished yet.
    pub fn is_flush_pending(&self) -> bool {
        self.shared.state.borrow().phase != Phase::Idle
    }

    pub fn binding(&self) -> &B {
        &self.shared.binding
    }
}

impl<E, B, S> Shared<E, B, S>
where
    E: 'static,
    B: ListenerBinding<E> + 'static,
    S: FrameScheduler + 'static,
{
    /// Attach every name that isn't attached yet.
    ///
    /// On failure the names attached by this call are detached again.
    fn attach(&self, names: Vec<String>) -> Result<(), CoalescerError> {
        let mut added = Vec::new();
        for name in names {
            if self.state.borrow().attached.contains(&name) {
                continue;
            }
            if let Err(err) = self.binding.attach(&name, &self.handler) {
                self.detach_all(added);
                return Err(err);
            }
            tracing::debug!(event = %name, "attached listener");
            self.state.borrow_mut().attached.insert(name.clone());
            added.push(name);
        }
        Ok(())
    }

    /// Detach every attached name, logging the ones the host refuses.
    fn detach_all(&self, names: Vec<String>) {
        for name in names {
            if let Err(err) = self.detach(vec![name.clone()]) {
                tracing::warn!(event = %name, %err, "failed to detach listener");
            }
        }
    }

    fn detach(&self, names: Vec<String>) -> Result<(), CoalescerError> {
        for name in names {
            if !self.state.borrow().attached.contains(&name) {
                continue;
            }
            self.binding.detach(&name, &self.handler)?;
            tracing::debug!(event = %name, "detached listener");
            self.state.borrow_mut().attached.remove(&name);
        }
        Ok(())
    }

    fn dispatch(self: &Rc<Self>, event: E) {
        let mut state = self.state.borrow_mut();
        if state.callbacks.is_empty() {
            tracing::trace!("no callbacks registered, ignoring event");
            return;
        }

        match state.phase {
            Phase::Flushing => {
                tracing::trace!("flush running, dropping event");
                return;
            }
            Phase::Scheduled => {
                tracing::trace!("flush already scheduled, coalescing event");
                state.latest = Some(event);
                return;
            }
            Phase::Idle => {}
        }

        state.latest = Some(event);
        state.phase = Phase::Scheduled;
        drop(state);

        let weak = Rc::downgrade(self);
        let flush = Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.flush();
            }
        });

        match self.scheduler.request_frame(flush) {
            Ok(()) => tracing::trace!("scheduled flush"),
            Err(err) => {
                tracing::error!(%err, "failed to schedule flush");
                let mut state = self.state.borrow_mut();
                state.phase = Phase::Idle;
                state.latest = None;
            }
        }
    }

    fn flush(&self) {
        let (callbacks, event) = {
            let mut state = self.state.borrow_mut();
            state.phase = Phase::Flushing;
            (state.callbacks.clone(), state.latest.take())
        };

        // Runs even if a callback unwinds.
        let _reset = ResetPhase(&self.state);

        let Some(event) = event else {
            return;
        };

        tracing::trace!(callbacks = callbacks.len(), "running flush");
        for callback in &callbacks {
            callback.call(&event);
        }
    }
}

impl<E: 'static> State<E> {
    /// Attached names, in subscription order first.
    fn attached_in_order(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .names
            .iter()
            .filter(|name| self.attached.contains(*name))
            .map(str::to_string)
            .collect();
        names.extend(
            self.attached
                .iter()
                .filter(|name| !self.names.contains(name))
                .cloned(),
        );
        names
    }
}

struct ResetPhase<'a, E: 'static>(&'a RefCell<State<E>>);

impl<E: 'static> Drop for ResetPhase<'_, E> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.try_borrow_mut() {
            state.phase = Phase::Idle;
            state.latest = None;
        }
    }
}

impl<E: 'static, B: ListenerBinding<E>, S: FrameScheduler> Drop for Shared<E, B, S> {
    fn drop(&mut self) {
        let attached = std::mem::take(&mut self.state.get_mut().attached);
        for name in attached {
            if let Err(err) = self.binding.detach(&name, &self.handler) {
                tracing::warn!(event = %name, %err, "failed to detach listener on drop");
            }
        }
    }
}

impl<E: 'static, B: ListenerBinding<E>, S: FrameScheduler> Clone for EventCoalescer<E, B, S> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<E: 'static, B: ListenerBinding<E>, S: FrameScheduler> Debug for EventCoalescer<E, B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("EventCoalescer")
            .field("events", &state.names.to_string())
            .field("callbacks", &state.callbacks.len())
            .field("phase", &state.phase)
            .finish()
    }
}
