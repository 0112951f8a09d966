use thiserror::Error;

/// Errors raised by an [`EventCoalescer`](crate::EventCoalescer) and its hosts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoalescerError {
    /// Event names were given as something other than a string.
    #[error("can only coalesce events named by a string")]
    EventNamesNotString,

    /// A callback was given that cannot be called.
    #[error("registered callback must be callable")]
    NotCallable,

    /// The host refused to attach or detach a native listener.
    #[error("failed to {op} `{event}` listener: {reason}")]
    Binding {
        op: BindingOp,
        event: String,
        reason: String,
    },

    /// The host refused to schedule a flush.
    #[error("failed to schedule a frame: {reason}")]
    Schedule { reason: String },

    /// No `window` exists in this context (for example, inside a web worker).
    #[error("no global `window` object is available")]
    NoWindow,
}

impl CoalescerError {
    /// Returns true for errors caused by an argument of the wrong type.
    ///
    /// The JS-facing class reports these as a `TypeError`.
    pub fn is_type_constraint(&self) -> bool {
        matches!(self, Self::EventNamesNotString | Self::NotCallable)
    }
}

/// Which half of the listener lifecycle failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingOp {
    Attach,
    Detach,
}

impl std::fmt::Display for BindingOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingOp::Attach => f.write_str("attach"),
            BindingOp::Detach => f.write_str("detach"),
        }
    }
}
