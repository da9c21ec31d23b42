//! # Dispatch Registry
//!
//! [`Logger`] owns the flag set and a `flag → listener name → Worker`
//! registry guarded by a single mutex. The lock only ever covers map
//! bookkeeping: starting, stopping, draining and submitting all happen
//! after it has been released.
//!
//! ```text
//! trigger(ctx, event)
//!     │ flag enabled? event enabled?
//!     │ snapshot workers[flag] under the lock
//!     ├──────► worker a ─► queue ─► listener a
//!     └──────► worker b ─► queue ─► listener b
//!
//! write(ctx, event) ─► formatter ─► InterlockedWriter   (synchronous)
//! ```

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::channel::mpsc::UnboundedSender;
use futures::executor::block_on;
use futures::future::{join_all, select, Either};

use crate::{
    config::Config,
    context::Context,
    error::Error,
    event::{self, Event, MessageEvent},
    flags::{self, Flags},
    formatter::{Formatter, TextFormatter},
    latch::{Latch, State},
    listener::Listener,
    worker::Worker,
    writer::InterlockedWriter,
    Log,
};

type Registry = HashMap<String, HashMap<String, Arc<Worker>>>;

/// Flag-gated event dispatcher with one isolated worker per listener.
///
/// ## Lifecycle
///
/// 1. **Creation**: flags and defaults come from the global `Config`
/// 2. **Registration**: listeners are added and removed at runtime with
///    [`listen`](Self::listen) / [`remove_listener`](Self::remove_listener)
/// 3. **Dispatch**: [`trigger`](Self::trigger) fans out to listeners,
///    [`write`](Self::write) renders to the output synchronously
/// 4. **Shutdown**: [`close`](Self::close) disables every flag and stops
///    every worker after its queue is delivered; dropping the logger does
///    the same
pub struct Logger {
    latch: Latch,
    flags: Flags,
    recover_panics: bool,
    queue_capacity: usize,
    default_listener_name: String,
    formatter: Option<Box<dyn Formatter>>,
    output: Option<InterlockedWriter>,
    errors: Option<UnboundedSender<Error>>,
    listeners: Mutex<Registry>,
}

impl Logger {
    /// Creates a new `Logger` with the specified configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Optional overrides for the global `Config`. Only the
    ///   first call in a process takes effect; later loggers reuse it.
    ///
    /// # Configuration Keys
    ///
    /// - `enabled_flags`: Flag expression, e.g. `"info,error"` or `"all,-debug"`
    /// - `queue_capacity`: Per-listener queue size
    /// - `recover_panics`: `"true"` or `"false"`
    /// - `default_listener_name`: Name used by [`listen_default`](Self::listen_default)
    ///
    /// The logger writes text lines to stdout until configured otherwise.
    pub fn new(config: Option<HashMap<String, String>>) -> Self {
        Config::from_hashmap(config);

        let flags = Config::enabled_flags()
            .parse::<Flags>()
            .unwrap_or_else(|err| {
                tracing::warn!(%err, "invalid enabled_flags; using defaults");
                flags::DEFAULT_FLAGS.parse().unwrap_or_default()
            });

        let logger = Logger {
            latch: Latch::new(),
            flags,
            recover_panics: *Config::recover_panics(),
            queue_capacity: *Config::queue_capacity(),
            default_listener_name: Config::default_listener_name().to_string(),
            formatter: Some(Box::new(TextFormatter::new())),
            output: Some(InterlockedWriter::new(io::stdout())),
            errors: None,
            listeners: Mutex::new(HashMap::new()),
        };
        logger.latch.starting();
        logger.latch.started();
        logger
    }

    /// Replaces the flag set.
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// Applies to listeners registered afterwards.
    pub fn with_recover_panics(mut self, recover: bool) -> Self {
        self.recover_panics = recover;
        self
    }

    /// Applies to listeners registered afterwards.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_output(mut self, output: impl Write + Send + 'static) -> Self {
        self.output = Some(InterlockedWriter::new(output));
        self
    }

    /// Turns [`write`](Self::write) into a no-op.
    pub fn without_output(mut self) -> Self {
        self.output = None;
        self
    }

    pub fn with_formatter(mut self, formatter: impl Formatter) -> Self {
        self.formatter = Some(Box::new(formatter));
        self
    }

    /// Forwards formatting and output errors from [`write`](Self::write) to
    /// `errors`. Without it they are dropped.
    pub fn with_errors(mut self, errors: UnboundedSender<Error>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    /// `Stopped` after [`close`](Self::close) until the next
    /// [`listen`](Self::listen), `Started` otherwise.
    pub fn state(&self) -> State {
        self.latch.state()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn workers(&self) -> Vec<Arc<Worker>> {
        self.registry()
            .values()
            .flat_map(|workers| workers.values().cloned())
            .collect()
    }

    /// Returns whether any listener is registered for `flag`.
    pub fn has_listeners(&self, flag: &str) -> bool {
        self.registry()
            .get(flag)
            .is_some_and(|workers| !workers.is_empty())
    }

    /// Returns whether `name` is registered for `flag`.
    pub fn has_listener(&self, flag: &str, name: &str) -> bool {
        self.registry()
            .get(flag)
            .is_some_and(|workers| workers.contains_key(name))
    }

    /// Registers `listener` under `(flag, name)` and returns once its worker
    /// is consuming, so the next [`trigger`](Self::trigger) reaches it.
    ///
    /// A listener already registered under the same key is replaced; its
    /// worker delivers whatever it had queued and is stopped before this
    /// call returns. After [`close`](Self::close) the logger is started
    /// again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the worker thread cannot be spawned; the
    /// registry is left unchanged.
    pub fn listen(
        &self,
        flag: impl Into<String>,
        name: impl Into<String>,
        listener: impl Listener,
    ) -> Result<(), Error> {
        let (flag, name) = (flag.into(), name.into());
        let worker = Arc::new(Worker::new(
            format!("{flag}/{name}"),
            Arc::new(listener),
            self.queue_capacity,
            self.recover_panics,
        ));
        worker.start()?;
        worker.wait_started();

        if self.latch.is_stopped() {
            self.latch.starting();
            self.latch.started();
        }

        let previous = self
            .registry()
            .entry(flag.clone())
            .or_default()
            .insert(name.clone(), worker);

        if let Some(previous) = previous {
            tracing::debug!(flag = %flag, listener = %name, "replacing listener");
            previous.stop();
            previous.wait_stopped();
        }
        Ok(())
    }

    /// [`listen`](Self::listen) under the configured default listener name.
    pub fn listen_default(
        &self,
        flag: impl Into<String>,
        listener: impl Listener,
    ) -> Result<(), Error> {
        self.listen(flag, self.default_listener_name.clone(), listener)
    }

    /// Stops and removes one listener. A no-op when it is not registered.
    ///
    /// Called from the listener being removed, it returns without waiting
    /// and the worker exits once the callback returns.
    pub fn remove_listener(&self, flag: &str, name: &str) {
        let removed = {
            let mut registry = self.registry();
            let Some(workers) = registry.get_mut(flag) else {
                return;
            };
            let removed = workers.remove(name);
            if workers.is_empty() {
                registry.remove(flag);
            }
            removed
        };

        if let Some(worker) = removed {
            worker.stop();
            worker.wait_stopped();
        }
    }

    /// Stops and removes every listener registered for `flag`.
    pub fn remove_listeners(&self, flag: &str) {
        let removed = self.registry().remove(flag);
        if let Some(workers) = removed {
            stop_all(workers.into_values().collect());
        }
    }

    /// Queues `event` for every listener of its flag without waiting for
    /// them to run.
    ///
    /// Nothing happens when the flag is disabled or the event vetoes itself.
    /// The call only blocks while a listener's queue is full.
    pub fn trigger<E: Event>(&self, ctx: &Context, event: E) {
        self.trigger_shared(ctx, Arc::new(event));
    }

    /// [`trigger`](Self::trigger) for an event that is already shared.
    pub fn trigger_shared(&self, ctx: &Context, event: Arc<dyn Event>) {
        let flag = event.flag();
        if !self.flags.is_enabled(flag) || !event::is_enabled(event.as_ref()) {
            return;
        }

        let workers: Vec<Arc<Worker>> = match self.registry().get(flag) {
            Some(workers) => workers.values().cloned().collect(),
            None => return,
        };

        for worker in workers {
            if let Err(err) = worker.submit(ctx.clone(), Arc::clone(&event)) {
                tracing::debug!(flag, worker = worker.label(), %err, "event dropped");
            }
        }
    }

    /// Renders `event` with the formatter and writes it to the output on
    /// the calling thread.
    ///
    /// Flags are not consulted here; check [`Flags::is_enabled`] first or
    /// use [`emit`](Self::emit). Failures go to the error channel if one
    /// was attached.
    pub fn write(&self, ctx: &Context, event: &dyn Event) {
        if !event::is_writable(event) {
            return;
        }
        let (Some(formatter), Some(output)) = (&self.formatter, &self.output) else {
            return;
        };

        let mut rendered = Vec::new();
        let result = formatter
            .format(ctx, &mut rendered, event)
            .and_then(|()| output.write_all(&rendered).map_err(Error::from));
        if let Err(err) = result {
            self.report(err);
        }
    }

    fn report(&self, err: Error) {
        match &self.errors {
            Some(errors) => {
                let _ = errors.unbounded_send(err);
            }
            None => tracing::debug!(%err, "write failed; no error channel attached"),
        }
    }

    /// Triggers and writes `event` when its flag is enabled.
    pub fn emit<E: Event>(&self, ctx: &Context, event: E) {
        if !self.flags.is_enabled(event.flag()) {
            return;
        }
        let event: Arc<dyn Event> = Arc::new(event);
        self.trigger_shared(ctx, Arc::clone(&event));
        self.write(ctx, event.as_ref());
    }

    /// Disables every flag, then stops every worker once its queue has been
    /// delivered and empties the registry. Idempotent.
    ///
    /// The logger can be reused afterwards by enabling flags and registering
    /// listeners again.
    pub fn close(&self) -> Result<(), Error> {
        self.latch.stopping();
        self.flags.disable_all();

        let registry = std::mem::take(&mut *self.registry());
        stop_all(
            registry
                .into_values()
                .flat_map(HashMap::into_values)
                .collect(),
        );

        self.latch.stopped();
        Ok(())
    }

    /// Blocks until every event queued so far has been delivered, without
    /// stopping any worker.
    pub fn drain(&self) -> Result<(), Error> {
        block_on(join_all(self.drain_signals()));
        Ok(())
    }

    /// [`drain`](Self::drain) with a deadline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] when some listener is still behind after
    /// `timeout`. Queuing the drain markers themselves is not bounded.
    pub fn drain_timeout(&self, timeout: Duration) -> Result<(), Error> {
        let drained = join_all(self.drain_signals());
        match block_on(select(
            Box::pin(drained),
            Box::pin(futures_timer::Delay::new(timeout)),
        )) {
            Either::Left(_) => Ok(()),
            Either::Right(_) => Err(Error::Timeout),
        }
    }

    fn drain_signals(&self) -> Vec<futures::channel::oneshot::Receiver<()>> {
        self.workers()
            .iter()
            .filter_map(|worker| worker.drain_signal())
            .collect()
    }
}

/// Signals every worker first so they wind down in parallel, then waits.
fn stop_all(workers: Vec<Arc<Worker>>) {
    for worker in &workers {
        worker.stop();
    }
    for worker in &workers {
        worker.wait_stopped();
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("state", &self.latch.state())
            .field("flags", &self.flags.to_string())
            .field("recover_panics", &self.recover_panics)
            .field("queue_capacity", &self.queue_capacity)
            .field("listeners", &self.workers().len())
            .finish_non_exhaustive()
    }
}

impl Log for Logger {
    fn info<S: AsRef<str>>(&self, message: S) {
        self.emit(&Context::new(), MessageEvent::new(flags::INFO, message.as_ref()));
    }

    fn warning<S: AsRef<str>>(&self, message: S) {
        self.emit(&Context::new(), MessageEvent::new(flags::WARNING, message.as_ref()));
    }

    fn error<S: AsRef<str>>(&self, message: S) {
        self.emit(&Context::new(), MessageEvent::new(flags::ERROR, message.as_ref()));
    }

    fn fatal<S: AsRef<str>>(&self, message: S) {
        self.emit(&Context::new(), MessageEvent::new(flags::FATAL, message.as_ref()));
    }

    fn debug<S: AsRef<str>>(&self, message: S) {
        self.emit(&Context::new(), MessageEvent::new(flags::DEBUG, message.as_ref()));
    }
}
