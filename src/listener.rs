//! # Listeners
//!
//! A listener is the callback a [`Worker`](crate::Worker) runs for every
//! event queued under its flag. It is invoked on the worker's own thread,
//! one event at a time, never concurrently with itself.

use std::marker::PhantomData;

use crate::{context::Context, event::Event};

/// Receives events dispatched under the flag it was registered for.
///
/// Any `Fn(&Context, &dyn Event)` closure is a listener:
///
/// ```rust
/// use event_keeper::{Context, Event, Listener};
///
/// let listener = |_ctx: &Context, event: &dyn Event| {
///     println!("{} at {}", event.flag(), event.timestamp());
/// };
/// fn assert_listener<L: Listener>(_: &L) {}
/// assert_listener(&listener);
/// ```
///
/// ### Implementation requirements
/// - Do not block indefinitely; a stuck listener stalls only its own queue,
///   but a full queue makes producers wait.
/// - Do not trigger events for your own flag from inside the callback while
///   the queue may be full; the worker cannot drain while it waits on itself.
pub trait Listener: Send + Sync + 'static {
    fn on_event(&self, ctx: &Context, event: &dyn Event);
}

impl<F> Listener for F
where
    F: Fn(&Context, &dyn Event) + Send + Sync + 'static,
{
    fn on_event(&self, ctx: &Context, event: &dyn Event) {
        self(ctx, event)
    }
}

/// A listener that only sees events of the concrete type `E`.
pub struct TypedListener<E, F> {
    handler: F,
    _event: PhantomData<fn(&E)>,
}

/// Wraps a handler for one concrete event type; other event types sharing
/// the flag are skipped.
///
/// ```rust
/// use event_keeper::{listener_for, Context, MessageEvent};
///
/// let listener = listener_for(|_ctx: &Context, event: &MessageEvent| {
///     println!("{}", event.text());
/// });
/// # let _ = listener;
/// ```
pub fn listener_for<E, F>(handler: F) -> TypedListener<E, F>
where
    E: Event,
    F: Fn(&Context, &E) + Send + Sync + 'static,
{
    TypedListener {
        handler,
        _event: PhantomData,
    }
}

impl<E, F> Listener for TypedListener<E, F>
where
    E: Event,
    F: Fn(&Context, &E) + Send + Sync + 'static,
{
    fn on_event(&self, ctx: &Context, event: &dyn Event) {
        if let Some(typed) = event.as_any().downcast_ref::<E>() {
            (self.handler)(ctx, typed);
        }
    }
}
