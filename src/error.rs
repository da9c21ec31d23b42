//! # Error Handling

use std::fmt;

/// Represents all possible errors that can occur in the EventKeeper system.
///
/// None of these ever reach a producer through [`Logger::trigger`](crate::Logger::trigger)
/// or [`Logger::write`](crate::Logger::write): dispatch is fire-and-forget, so
/// write failures are forwarded to the optional error channel and listener
/// failures stay inside their worker.
pub enum Error {
    /// Represents an underlying I/O error raised by an output sink.
    Io(std::io::Error),

    /// A formatter could not render an event.
    Format(String),

    /// A flag expression could not be parsed (e.g. a bare `-`).
    InvalidFlag(String),

    /// The worker identified by the given label no longer accepts work.
    Stopped(String),

    /// A drain did not complete before its deadline.
    Timeout,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => f.debug_tuple("Io").field(err).finish(),
            Error::Format(msg) => f.debug_tuple("Format").field(msg).finish(),
            Error::InvalidFlag(flag) => f.debug_tuple("InvalidFlag").field(flag).finish(),
            Error::Stopped(label) => f.debug_tuple("Stopped").field(label).finish(),
            Error::Timeout => f.debug_tuple("Timeout").finish(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {err}"),
            Error::Format(msg) => write!(f, "Format error: {msg}"),
            Error::InvalidFlag(flag) => write!(f, "Invalid flag: {flag:?}"),
            Error::Stopped(label) => write!(f, "Worker {label} is stopped"),
            Error::Timeout => write!(f, "EventKeeper drain timeout"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<fmt::Error> for Error {
    fn from(err: fmt::Error) -> Self {
        Error::Format(err.to_string())
    }
}
