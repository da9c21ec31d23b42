//! # Formatters
//!
//! A [`Formatter`] renders one event for the synchronous write path. The
//! logger hands it an in-memory buffer and emits the result through the
//! [`InterlockedWriter`](crate::InterlockedWriter) in a single locked write.

use std::fmt::Write as _;
use std::io;

use crate::{context::Context, error::Error, event::Event};

/// Default `strftime` layout: RFC 3339 with millisecond precision.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Renders an event into bytes.
pub trait Formatter: Send + Sync + 'static {
    /// # Errors
    ///
    /// Returns an error when the event cannot be rendered or `out` fails.
    fn format(&self, ctx: &Context, out: &mut dyn io::Write, event: &dyn Event)
        -> Result<(), Error>;
}

/// Capability: an event that knows how to render its own message text.
pub trait TextWritable {
    fn write_text(&self, out: &mut dyn io::Write) -> io::Result<()>;
}

/// Human readable single-line output:
///
/// ```text
/// 2024-05-01T10:00:00.000Z [info] app=api request started
/// ```
#[derive(Debug, Clone)]
pub struct TextFormatter {
    show_timestamp: bool,
    show_flag: bool,
    timestamp_format: String,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            show_timestamp: true,
            show_flag: true,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timestamp(mut self, show: bool) -> Self {
        self.show_timestamp = show;
        self
    }

    pub fn with_flag(mut self, show: bool) -> Self {
        self.show_flag = show;
        self
    }

    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }
}

impl Formatter for TextFormatter {
    fn format(
        &self,
        ctx: &Context,
        out: &mut dyn io::Write,
        event: &dyn Event,
    ) -> Result<(), Error> {
        let mut prefix: Vec<String> = Vec::new();
        if self.show_timestamp {
            // an invalid layout surfaces as fmt::Error instead of a panic
            let mut stamp = String::new();
            write!(stamp, "{}", event.timestamp().format(&self.timestamp_format))?;
            prefix.push(stamp);
        }
        if self.show_flag {
            prefix.push(format!("[{}]", event.flag()));
        }
        prefix.extend(ctx.labels().map(|(key, value)| format!("{key}={value}")));

        out.write_all(prefix.join(" ").as_bytes())?;
        if let Some(text) = event.text_writable() {
            if !prefix.is_empty() {
                out.write_all(b" ")?;
            }
            text.write_text(out)?;
        }
        out.write_all(b"\n")?;
        Ok(())
    }
}
