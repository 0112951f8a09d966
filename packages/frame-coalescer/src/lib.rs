#![doc = include_str!("../README.md")]

mod binding;
mod callback;
mod coalescer;
mod error;
pub mod events;
mod frame;

#[cfg(feature = "web")]
pub mod web;

pub use binding::{Handler, ListenerBinding};
pub use callback::Callback;
pub use coalescer::EventCoalescer;
pub use error::{BindingOp, CoalescerError};
pub use events::EventNames;
pub use frame::{FrameQueue, FrameScheduler};

#[cfg(feature = "web")]
pub use web::{WebCoalescer, WebConfig};
