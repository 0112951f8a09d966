use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use crate::CoalescerError;

/// A "run before the next repaint" primitive.
///
/// Implementations run `flush` exactly once, asynchronously relative to the call. There is no
/// handle and no cancellation.
pub trait FrameScheduler {
    fn request_frame(&self, flush: Box<dyn FnOnce()>) -> Result<(), CoalescerError>;
}

impl<S: FrameScheduler + ?Sized> FrameScheduler for Rc<S> {
    fn request_frame(&self, flush: Box<dyn FnOnce()>) -> Result<(), CoalescerError> {
        (**self).request_frame(flush)
    }
}

/// A frame scheduler driven by the host.
///
/// Useful for renderers with their own loop and for tests. Requests queue up until the host
/// calls [`FrameQueue::run_frame`]. Clones share the same queue.
#[derive(Clone, Default)]
pub struct FrameQueue {
    queue: Rc<RefCell<VecDeque<Box<dyn FnOnce()>>>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests waiting for the next frame.
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Run every request queued before this call and return how many ran.
    ///
    /// Requests made while the frame runs are left for the next frame.
    pub fn run_frame(&self) -> usize {
        let frame = std::mem::take(&mut *self.queue.borrow_mut());
        let count = frame.len();
        for flush in frame {
            flush();
        }
        count
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&self, flush: Box<dyn FnOnce()>) -> Result<(), CoalescerError> {
        self.queue.borrow_mut().push_back(flush);
        Ok(())
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameQueue")
            .field("pending", &self.len())
            .finish()
    }
}
