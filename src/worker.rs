//! # Worker Module
//!
//! A [`Worker`] owns one listener, one bounded FIFO queue and one thread.
//! Events submitted to the queue are handed to the listener in order, one
//! at a time, on that thread; producers only wait when the queue is full.
//!
//! ```text
//! submit() ──► [bounded queue] ──► worker thread ──► listener.on_event()
//!                                               └─► panic caught and reported
//! ```

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use futures::channel::{mpsc, oneshot};
use futures::executor::{block_on, block_on_stream};
use futures::SinkExt;

use crate::{
    context::Context,
    error::Error,
    event::Event,
    latch::{Latch, State},
    listener::Listener,
};

/// A unit of work travelling through a worker queue.
enum Work {
    Event(Context, Arc<dyn Event>),
    /// Fires once every item queued before it has been handled.
    Drain(oneshot::Sender<()>),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An asynchronous, isolated executor for a single listener.
pub struct Worker {
    /// `<flag>/<name>`, used for the thread name and diagnostics.
    label: String,
    listener: Arc<dyn Listener>,
    recover_panics: bool,
    latch: Arc<Latch>,
    /// Dropped on stop, which closes the queue.
    sender: Mutex<Option<mpsc::Sender<Work>>>,
    /// Taken by the thread on start.
    receiver: Mutex<Option<mpsc::Receiver<Work>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    /// Id of the consuming thread, set once it has been spawned.
    thread: OnceLock<ThreadId>,
}

impl Worker {
    /// Creates a worker without starting it.
    ///
    /// # Arguments
    ///
    /// * `label` - Identifier used for the thread name and diagnostics
    /// * `listener` - The callback every queued event is handed to
    /// * `capacity` - Maximum number of queued events before `submit` blocks (at least 1)
    /// * `recover_panics` - Whether a panicking listener keeps receiving later events
    pub fn new(
        label: impl Into<String>,
        listener: Arc<dyn Listener>,
        capacity: usize,
        recover_panics: bool,
    ) -> Self {
        // the channel grants one extra slot to its single sender
        let (sender, receiver) = mpsc::channel(capacity.max(1) - 1);
        Self {
            label: label.into(),
            listener,
            recover_panics,
            latch: Arc::new(Latch::new()),
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
            handle: Mutex::new(None),
            thread: OnceLock::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> State {
        self.latch.state()
    }

    /// Spawns the worker thread. Calling it again is a no-op.
    ///
    /// Use [`wait_started`](Self::wait_started) to block until the thread is
    /// consuming its queue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the thread cannot be spawned; the worker is
    /// then marked stopped.
    pub fn start(&self) -> Result<(), Error> {
        let Some(receiver) = lock(&self.receiver).take() else {
            return Ok(());
        };
        self.latch.starting();

        let consumer = Consumer {
            label: self.label.clone(),
            listener: Arc::clone(&self.listener),
            recover_panics: self.recover_panics,
            latch: Arc::clone(&self.latch),
        };
        let spawned = thread::Builder::new()
            .name(format!("worker {}", self.label))
            .spawn(move || consumer.run(receiver));

        match spawned {
            Ok(handle) => {
                let _ = self.thread.set(handle.thread().id());
                *lock(&self.handle) = Some(handle);
                Ok(())
            }
            Err(err) => {
                lock(&self.sender).take();
                self.latch.stopping();
                self.latch.stopped();
                Err(Error::Io(err))
            }
        }
    }

    /// Queues an event for the listener, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stopped`] once the worker has been stopped or its
    /// thread has died.
    pub fn submit(&self, ctx: Context, event: Arc<dyn Event>) -> Result<(), Error> {
        self.send(Work::Event(ctx, event))
    }

    fn send(&self, work: Work) -> Result<(), Error> {
        let mut sender = lock(&self.sender);
        let Some(sender) = sender.as_mut() else {
            return Err(Error::Stopped(self.label.clone()));
        };
        block_on(sender.send(work)).map_err(|_| Error::Stopped(self.label.clone()))
    }

    /// Queues a drain marker and returns the signal that fires once every
    /// event queued before it has been handled. `None` if the worker is
    /// stopped or the caller is this worker's own listener.
    pub fn drain_signal(&self) -> Option<oneshot::Receiver<()>> {
        if self.is_current_thread() {
            return None;
        }
        let (done, signal) = oneshot::channel();
        self.send(Work::Drain(done)).ok()?;
        Some(signal)
    }

    /// Blocks until everything queued before this call has been handled.
    ///
    /// A no-op when called from this worker's own listener.
    pub fn drain(&self) {
        if let Some(signal) = self.drain_signal() {
            // a dead thread cancels the signal instead of leaving us waiting
            let _ = block_on(signal);
        }
    }

    /// Closes the queue. Already queued events are still delivered before
    /// the thread exits. Idempotent.
    pub fn stop(&self) {
        self.latch.stopping();
        lock(&self.sender).take();

        if lock(&self.receiver).take().is_some() {
            // never started: nothing will ever consume the queue
            self.latch.stopped();
        }
    }

    pub fn wait_started(&self) {
        self.latch.wait_started();
    }

    /// Blocks until the thread has exited.
    ///
    /// Called from this worker's own listener it returns at once; the
    /// thread exits after the callback returns if [`stop`](Self::stop) was
    /// requested.
    pub fn wait_stopped(&self) {
        if self.is_current_thread() {
            return;
        }
        self.latch.wait_stopped();
        if let Some(handle) = lock(&self.handle).take() {
            if handle.join().is_err() {
                tracing::error!(worker = %self.label, "worker terminated by a listener panic");
            }
        }
    }
}

impl Worker {
    fn is_current_thread(&self) -> bool {
        self.thread.get() == Some(&thread::current().id())
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("label", &self.label)
            .field("state", &self.latch.state())
            .field("recover_panics", &self.recover_panics)
            .finish_non_exhaustive()
    }
}

/// The half of a worker that lives on its thread.
struct Consumer {
    label: String,
    listener: Arc<dyn Listener>,
    recover_panics: bool,
    latch: Arc<Latch>,
}

/// Marks the latch stopped when the thread exits, including by unwinding.
struct StoppedOnExit(Arc<Latch>);

impl Drop for StoppedOnExit {
    fn drop(&mut self) {
        self.0.stopping();
        self.0.stopped();
    }
}

impl Consumer {
    fn run(self, receiver: mpsc::Receiver<Work>) {
        let _stopped = StoppedOnExit(Arc::clone(&self.latch));
        // the executor is only entered while waiting for the next item, so
        // listeners are free to trigger or drain other workers
        let queue = block_on_stream(receiver);
        self.latch.started();

        for work in queue {
            match work {
                Work::Event(ctx, event) => self.invoke(&ctx, event.as_ref()),
                Work::Drain(done) => {
                    let _ = done.send(());
                }
            }
        }
    }

    fn invoke(&self, ctx: &Context, event: &dyn Event) {
        if !self.recover_panics {
            self.listener.on_event(ctx, event);
            return;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.listener.on_event(ctx, event);
        }));
        if let Err(payload) = outcome {
            tracing::error!(
                worker = %self.label,
                flag = event.flag(),
                panic = panic_message(payload.as_ref()),
                "listener panicked; continuing with the next event"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
