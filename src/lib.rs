//! # EventKeeper - Flag-Gated Asynchronous Event Dispatch
//!
//! EventKeeper routes typed events to named listeners. Every event names a
//! *flag* (a category such as `"info"` or `"http.response"`); only flags
//! that are enabled are dispatched, and each listener runs on its own
//! worker so a slow or failing listener never holds up the producer or any
//! other listener.
//!
//! ## Key Features
//!
//! - **Asynchronous Fan-out**: [`Logger::trigger`] queues the event for every
//!   listener of its flag and returns without waiting for them
//! - **Per-listener FIFO**: each listener sees its events in submission order,
//!   one at a time
//! - **Backpressure**: listener queues are bounded; producers wait when one is full
//! - **Panic Isolation**: a panicking listener is reported and keeps receiving
//!   later events (configurable)
//! - **Synchronous Output**: [`Logger::write`] formats an event straight to a
//!   shared output, independent of listeners
//! - **Graceful Shutdown**: [`Logger::close`] delivers everything already
//!   queued before stopping workers
//!
//! ## Architecture
//!
//! - **Producer**: code calling [`Logger::trigger`] / [`Logger::write`]
//! - **Registry**: the [`Logger`], mapping `flag → name → Worker`
//! - **Consumer**: one [`Worker`] thread per listener, fed by a bounded channel
//! - **Gate**: the [`Flags`] set consulted on every dispatch
//! - **Lifecycle**: a [`Latch`] shared by logger and workers to order start/stop
//!
//! ## Usage Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use event_keeper::{flags, Context, Event, Logger, MessageEvent};
//!
//! let logger = Logger::new(None).without_output();
//! let seen = Arc::new(AtomicUsize::new(0));
//!
//! let counter = Arc::clone(&seen);
//! logger
//!     .listen(flags::INFO, "counter", move |_: &Context, _: &dyn Event| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     })
//!     .unwrap();
//!
//! logger.trigger(&Context::new(), MessageEvent::new(flags::INFO, "hello"));
//! logger.drain().unwrap();
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//!
//! logger.close().unwrap();
//! ```
//!
//! ## Convenience Logging
//!
//! ```rust
//! use event_keeper::{Log, Logger};
//!
//! let logger = Logger::new(None);
//! logger.info("Application started");
//! logger.debug("Not written: debug is disabled by default");
//! logger.close().unwrap();
//! ```
mod config;
mod context;
mod error;
mod event;
pub mod flags;
mod formatter;
mod latch;
mod listener;
mod logger;
mod worker;
mod writer;

pub use crate::context::Context;
pub use crate::error::Error;
pub use crate::event::{EnabledOverride, Event, MessageEvent, WritableOverride};
pub use crate::flags::Flags;
pub use crate::formatter::{Formatter, TextFormatter, TextWritable, DEFAULT_TIMESTAMP_FORMAT};
pub use crate::latch::{Latch, State};
pub use crate::listener::{listener_for, Listener, TypedListener};
pub use crate::logger::Logger;
pub use crate::worker::Worker;
pub use crate::writer::InterlockedWriter;

/// A trait for the one-line logging calls applications make most.
///
/// Each method builds a [`MessageEvent`] under the matching flag and both
/// triggers and writes it, but only when that flag is enabled.
///
/// # Thread Safety
///
/// Implementors must be `Send + Sync + 'static` to ensure they can be safely used
/// across thread boundaries and have no lifetime constraints.
pub trait Log: Send + Sync + 'static {
    /// Logs under [`flags::INFO`].
    fn info<S: AsRef<str>>(&self, message: S);

    /// Logs under [`flags::WARNING`].
    fn warning<S: AsRef<str>>(&self, message: S);

    /// Logs under [`flags::ERROR`].
    fn error<S: AsRef<str>>(&self, message: S);

    /// Logs under [`flags::FATAL`].
    fn fatal<S: AsRef<str>>(&self, message: S);

    /// Logs under [`flags::DEBUG`], which is disabled unless enabled explicitly.
    fn debug<S: AsRef<str>>(&self, message: S);
}
