use std::{
    cell::{Cell, RefCell},
    panic::{catch_unwind, AssertUnwindSafe},
    rc::Rc,
};

use frame_coalescer::{
    BindingOp, Callback, CoalescerError, EventCoalescer, FrameQueue, Handler, ListenerBinding,
};
use pretty_assertions::assert_eq;

#[derive(Debug, Clone, PartialEq)]
struct Raw {
    kind: &'static str,
    seq: u32,
}

/// A target that records every attach and detach and can fire events at its listeners.
#[derive(Default)]
struct Target {
    listeners: RefCell<Vec<(String, Handler<Raw>)>>,
    calls: RefCell<Vec<String>>,
    refuse_attach: Cell<Option<&'static str>>,
    refuse_detach: Cell<Option<&'static str>>,
}

impl Target {
    fn fire(&self, kind: &'static str, seq: u32) {
        let handlers: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(name, _)| name == kind)
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(Raw { kind, seq });
        }
    }

    fn listening(&self) -> Vec<String> {
        self.listeners
            .borrow()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ListenerBinding<Raw> for Target {
    fn attach(&self, event: &str, handler: &Handler<Raw>) -> Result<(), CoalescerError> {
        if self.refuse_attach.get() == Some(event) {
            return Err(refused(BindingOp::Attach, event));
        }
        self.calls.borrow_mut().push(format!("attach {event}"));
        self.listeners
            .borrow_mut()
            .push((event.to_string(), handler.clone()));
        Ok(())
    }

    fn detach(&self, event: &str, handler: &Handler<Raw>) -> Result<(), CoalescerError> {
        if self.refuse_detach.get() == Some(event) {
            return Err(refused(BindingOp::Detach, event));
        }
        self.calls.borrow_mut().push(format!("detach {event}"));
        self.listeners
            .borrow_mut()
            .retain(|(name, h)| !(name == event && Rc::ptr_eq(h, handler)));
        Ok(())
    }
}

fn refused(op: BindingOp, event: &str) -> CoalescerError {
    CoalescerError::Binding {
        op,
        event: event.to_string(),
        reason: "refused".to_string(),
    }
}

type TestCoalescer = EventCoalescer<Raw, Rc<Target>, FrameQueue>;

fn setup(events: &str) -> (TestCoalescer, Rc<Target>, FrameQueue) {
    let target = Rc::new(Target::default());
    let frames = FrameQueue::new();
    let coalescer = EventCoalescer::new(events, target.clone(), frames.clone()).unwrap();
    (coalescer, target, frames)
}

type Log = Rc<RefCell<Vec<(&'static str, u32)>>>;

fn recorder(label: &'static str, log: &Log) -> Callback<Raw> {
    let log = log.clone();
    Callback::new(move |raw: &Raw| log.borrow_mut().push((label, raw.seq)))
}

#[test]
fn register_then_deregister_detaches() {
    let (coalescer, target, _) = setup("scroll resize");
    let cb = Callback::new(|_: &Raw| {});

    assert_eq!(coalescer.register(cb.clone()).unwrap(), 1);
    assert_eq!(coalescer.deregister(&cb), Some(0));

    assert_eq!(coalescer.callback_count(), 0);
    assert!(target.listening().is_empty());
    assert!(!coalescer.is_attached("scroll"));
    assert!(!coalescer.is_attached("resize"));
}

#[test]
fn one_event_runs_every_callback_once_in_order() {
    let (coalescer, target, frames) = setup("scroll");
    let log = Log::default();
    for label in ["a", "b", "c"] {
        coalescer.register(recorder(label, &log)).unwrap();
    }

    target.fire("scroll", 1);
    assert_eq!(frames.run_frame(), 1);

    assert_eq!(*log.borrow(), [("a", 1), ("b", 1), ("c", 1)]);
}

#[test]
fn rapid_events_coalesce_into_the_latest() {
    let (coalescer, target, frames) = setup("mousemove");
    let log = Log::default();
    coalescer.register(recorder("a", &log)).unwrap();

    target.fire("mousemove", 1);
    target.fire("mousemove", 2);
    target.fire("mousemove", 3);

    assert_eq!(frames.len(), 1);
    frames.run_frame();
    assert_eq!(*log.borrow(), [("a", 3)]);

    // the next event starts a new cycle
    target.fire("mousemove", 4);
    frames.run_frame();
    assert_eq!(*log.borrow(), [("a", 3), ("a", 4)]);
}

#[test]
fn add_listeners_merges_names() {
    let (coalescer, target, frames) = setup("click");
    coalescer.add_listeners("scroll").unwrap();
    coalescer.add_listeners("click").unwrap();

    let log = Log::default();
    coalescer.register(recorder("a", &log)).unwrap();

    assert_eq!(coalescer.event_names().to_string(), "click scroll");
    assert_eq!(target.calls(), ["attach click", "attach scroll"]);

    target.fire("click", 1);
    frames.run_frame();
    target.fire("scroll", 2);
    frames.run_frame();
    assert_eq!(*log.borrow(), [("a", 1), ("a", 2)]);
}

#[test]
fn hard_removal_forgets_the_name() {
    let (coalescer, target, frames) = setup("click scroll");
    let log = Log::default();
    let cb = recorder("a", &log);
    coalescer.register(cb.clone()).unwrap();

    coalescer.remove_listeners("click", true).unwrap();
    assert_eq!(coalescer.event_names().to_string(), "scroll");

    target.fire("click", 1);
    assert!(frames.is_empty());

    // cycling the last callback doesn't bring it back
    coalescer.deregister(&cb);
    coalescer.register(cb).unwrap();
    assert_eq!(target.listening(), ["scroll"]);

    target.fire("scroll", 2);
    frames.run_frame();
    assert_eq!(*log.borrow(), [("a", 2)]);
}

#[test]
fn soft_removal_is_undone_by_the_first_register() {
    let (coalescer, target, _) = setup("click scroll");
    coalescer.remove_listeners("click", false).unwrap();

    assert_eq!(coalescer.event_names().to_string(), "click scroll");
    assert_eq!(target.listening(), ["scroll"]);

    coalescer.register(Callback::new(|_: &Raw| {})).unwrap();
    assert_eq!(target.listening(), ["scroll", "click"]);
}

#[test]
fn hard_removal_of_unknown_names_is_ignored() {
    let (coalescer, target, _) = setup("scroll");
    coalescer.remove_listeners("keydown", true).unwrap();

    assert_eq!(coalescer.event_names().to_string(), "scroll");
    assert_eq!(target.calls(), ["attach scroll"]);
}

#[test]
fn first_register_never_attaches_twice() {
    let (coalescer, target, _) = setup("scroll");
    coalescer.register(Callback::new(|_: &Raw| {})).unwrap();
    coalescer.register(Callback::new(|_: &Raw| {})).unwrap();

    assert_eq!(target.calls(), ["attach scroll"]);
}

#[test]
fn last_deregister_detaches_and_first_register_reattaches() {
    let (coalescer, target, _) = setup("scroll resize");
    let cb = Callback::new(|_: &Raw| {});

    coalescer.register(cb.clone()).unwrap();
    coalescer.deregister(&cb);
    coalescer.register(cb).unwrap();

    assert_eq!(
        target.calls(),
        [
            "attach scroll",
            "attach resize",
            "detach scroll",
            "detach resize",
            "attach scroll",
            "attach resize",
        ]
    );
}

#[test]
fn deregister_unknown_callback_returns_none() {
    let (coalescer, target, _) = setup("scroll");
    let kept = Callback::new(|_: &Raw| {});
    coalescer.register(kept).unwrap();

    let stranger = Callback::new(|_: &Raw| {});
    assert_eq!(coalescer.deregister(&stranger), None);
    assert_eq!(coalescer.callback_count(), 1);
    assert_eq!(target.listening(), ["scroll"]);
}

#[test]
fn duplicates_run_twice_and_deregister_one_at_a_time() {
    let (coalescer, target, frames) = setup("scroll");
    let log = Log::default();
    let cb = recorder("a", &log);

    assert_eq!(coalescer.register(cb.clone()).unwrap(), 1);
    assert_eq!(coalescer.register(cb.clone()).unwrap(), 2);

    target.fire("scroll", 1);
    frames.run_frame();
    assert_eq!(*log.borrow(), [("a", 1), ("a", 1)]);

    assert_eq!(coalescer.deregister(&cb), Some(0));
    assert_eq!(coalescer.callback_count(), 1);
    assert!(coalescer.is_attached("scroll"));
}

#[test]
fn events_without_callbacks_schedule_nothing() {
    let (coalescer, target, frames) = setup("scroll");
    assert!(coalescer.is_attached("scroll"));

    target.fire("scroll", 1);
    assert!(frames.is_empty());
    assert!(!coalescer.is_flush_pending());
}

#[test]
fn flush_runs_a_snapshot_of_the_callbacks() {
    let (coalescer, target, frames) = setup("scroll");
    let log = Log::default();
    let b = recorder("b", &log);
    let late = recorder("late", &log);

    let a = Callback::new({
        let log = log.clone();
        let coalescer = coalescer.clone();
        let b = b.clone();
        let late = late.clone();
        move |raw: &Raw| {
            log.borrow_mut().push(("a", raw.seq));
            if raw.seq == 1 {
                coalescer.deregister(&b);
                coalescer.register(late.clone()).unwrap();
            }
        }
    });

    coalescer.register(a).unwrap();
    coalescer.register(b).unwrap();

    target.fire("scroll", 1);
    frames.run_frame();
    assert_eq!(*log.borrow(), [("a", 1), ("b", 1)]);

    target.fire("scroll", 2);
    frames.run_frame();
    assert_eq!(*log.borrow(), [("a", 1), ("b", 1), ("a", 2), ("late", 2)]);
}

#[test]
fn events_raised_by_callbacks_are_dropped() {
    let (coalescer, target, frames) = setup("scroll");
    let runs = Rc::new(Cell::new(0));

    coalescer
        .register(Callback::new({
            let target = target.clone();
            let runs = runs.clone();
            move |_: &Raw| {
                runs.set(runs.get() + 1);
                target.fire("scroll", 99);
            }
        }))
        .unwrap();

    target.fire("scroll", 1);
    frames.run_frame();

    assert_eq!(runs.get(), 1);
    assert!(frames.is_empty());
    assert!(!coalescer.is_flush_pending());
}

#[test]
fn panicking_callback_still_clears_the_pending_flush() {
    let (coalescer, target, frames) = setup("scroll");
    let armed = Rc::new(Cell::new(true));
    let log = Log::default();

    coalescer
        .register(Callback::new({
            let armed = armed.clone();
            move |_: &Raw| {
                if armed.replace(false) {
                    panic!("callback failed");
                }
            }
        }))
        .unwrap();
    coalescer.register(recorder("b", &log)).unwrap();

    target.fire("scroll", 1);
    let result = catch_unwind(AssertUnwindSafe(|| frames.run_frame()));
    assert!(result.is_err());
    assert!(!coalescer.is_flush_pending());

    target.fire("scroll", 2);
    frames.run_frame();
    assert_eq!(*log.borrow(), [("b", 2)]);
}

#[test]
fn refused_attach_leaves_callbacks_untouched() {
    let (coalescer, target, _) = setup("scroll");
    coalescer.remove_listeners("scroll", false).unwrap();
    target.refuse_attach.set(Some("scroll"));

    let err = coalescer
        .register(Callback::new(|_: &Raw| {}))
        .unwrap_err();
    assert!(matches!(
        err,
        CoalescerError::Binding {
            op: BindingOp::Attach,
            ..
        }
    ));
    assert_eq!(coalescer.callback_count(), 0);
    assert!(!coalescer.is_attached("scroll"));
}

#[test]
fn refused_attach_rolls_back_the_names_it_attached() {
    let (coalescer, target, _) = setup("scroll resize mousemove");
    coalescer
        .remove_listeners("scroll resize mousemove", false)
        .unwrap();
    target.refuse_attach.set(Some("resize"));

    assert!(coalescer.register(Callback::new(|_: &Raw| {})).is_err());

    assert!(target.listening().is_empty());
    assert!(!coalescer.is_attached("scroll"));
    assert!(!coalescer.is_attached("mousemove"));

    // a later register starts from a clean slate
    target.refuse_attach.set(None);
    coalescer.register(Callback::new(|_: &Raw| {})).unwrap();
    assert_eq!(target.listening(), ["scroll", "resize", "mousemove"]);
}

#[test]
fn refused_detach_does_not_stop_the_others() {
    let (coalescer, target, _) = setup("scroll resize");
    let cb = Callback::new(|_: &Raw| {});
    coalescer.register(cb.clone()).unwrap();
    target.refuse_detach.set(Some("scroll"));

    assert_eq!(coalescer.deregister(&cb), Some(0));

    assert_eq!(coalescer.callback_count(), 0);
    assert_eq!(target.listening(), ["scroll"]);
    assert!(coalescer.is_attached("scroll"));
    assert!(!coalescer.is_attached("resize"));
}

#[test]
fn dropping_the_last_handle_detaches() {
    let (coalescer, target, _) = setup("scroll resize");
    let other = coalescer.clone();
    coalescer.register(Callback::new(|_: &Raw| {})).unwrap();

    drop(coalescer);
    assert_eq!(target.listening().len(), 2);

    drop(other);
    assert!(target.listening().is_empty());
}
