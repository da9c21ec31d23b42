//! # Events
//!
//! An event is any immutable value that names its flag and carries a
//! timestamp. Optional behavior is discovered through capability queries
//! that default to `None`, so an event only opts in to what it implements.

use std::any::Any;
use std::fmt;
use std::io;

use chrono::{DateTime, Utc};

use crate::formatter::TextWritable;

/// An event that can be triggered to listeners and written to the output.
///
/// Events are shared between listeners as `Arc<dyn Event>` and are never
/// mutated after construction.
pub trait Event: Any + Send + Sync + fmt::Debug {
    /// The category this event is dispatched under.
    fn flag(&self) -> &str;

    /// When the event was created.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Upcast used by typed listeners to recover the concrete event type.
    fn as_any(&self) -> &dyn Any;

    /// Lets the event veto its own dispatch even when its flag is enabled.
    fn enabled_override(&self) -> Option<&dyn EnabledOverride> {
        None
    }

    /// Lets the event veto the synchronous write path only.
    fn writable_override(&self) -> Option<&dyn WritableOverride> {
        None
    }

    /// Text rendering used by [`TextFormatter`](crate::TextFormatter).
    fn text_writable(&self) -> Option<&dyn TextWritable> {
        None
    }
}

/// Capability: an event that decides whether it is dispatched at all.
pub trait EnabledOverride {
    fn is_enabled(&self) -> bool;
}

/// Capability: an event that decides whether it is written to the output.
pub trait WritableOverride {
    fn is_writable(&self) -> bool;
}

/// Returns `false` only when the event explicitly vetoes its dispatch.
pub(crate) fn is_enabled(event: &dyn Event) -> bool {
    event
        .enabled_override()
        .map_or(true, |capability| capability.is_enabled())
}

/// Returns `false` only when the event explicitly vetoes being written.
pub(crate) fn is_writable(event: &dyn Event) -> bool {
    event
        .writable_override()
        .map_or(true, |capability| capability.is_writable())
}

/// A plain text line under an arbitrary flag.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    flag: String,
    text: String,
    timestamp: DateTime<Utc>,
    enabled: bool,
    writable: bool,
}

impl MessageEvent {
    pub fn new(flag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            flag: flag.into(),
            text: text.into(),
            timestamp: Utc::now(),
            enabled: true,
            writable: true,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// When `false` the event is neither triggered nor written.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// When `false` the event still reaches listeners but is never written.
    pub fn with_writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Event for MessageEvent {
    fn flag(&self) -> &str {
        &self.flag
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn enabled_override(&self) -> Option<&dyn EnabledOverride> {
        Some(self)
    }

    fn writable_override(&self) -> Option<&dyn WritableOverride> {
        Some(self)
    }

    fn text_writable(&self) -> Option<&dyn TextWritable> {
        Some(self)
    }
}

impl EnabledOverride for MessageEvent {
    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl WritableOverride for MessageEvent {
    fn is_writable(&self) -> bool {
        self.writable
    }
}

impl TextWritable for MessageEvent {
    fn write_text(&self, out: &mut dyn io::Write) -> io::Result<()> {
        out.write_all(self.text.as_bytes())
    }
}

impl fmt::Display for MessageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
