//! Tick scheduler
//!
//! Delivers one [`TickEvent`] per simulation step to every registered
//! handler, in registration order, on the thread that dispatches.
//!
//! Ticks come from exactly one of two sources:
//!
//! - a fallback timer thread (`pyrium-tick`) firing at a fixed rate
//! - the host's own loop calling [`TickScheduler::dispatch`] after
//!   [`TickScheduler::attach_external_source`]
//!
//! Attaching is one-shot and permanently stops the fallback timer.
//!
//! The handler list is copy-on-write: each dispatch iterates a snapshot, so
//! registering during a dispatch is safe. A handler added mid-dispatch first
//! sees the following tick.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use pyrium_vm_core::TickEvent;

use crate::error::{RuntimeError, RuntimeResult};

/// Error type returned by tick handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Name of the fallback timer thread
pub const TICK_THREAD_NAME: &str = "pyrium-tick";

type Callback = dyn Fn(&TickEvent) -> Result<(), HandlerError> + Send + Sync;

struct Handler {
    name: String,
    callback: Box<Callback>,
}

/// Identifier returned by [`TickScheduler::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Dispatch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Ticks dispatched
    pub ticks: u64,
    /// Handler invocations that returned an error
    pub faults: u64,
    /// Handler invocations that panicked
    pub panics: u64,
    /// Currently registered handlers
    pub handlers: usize,
}

struct Timer {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

struct Inner {
    handlers: RwLock<Arc<Vec<(HandlerId, Arc<Handler>)>>>,
    next_id: AtomicU64,
    external_attached: AtomicBool,
    timer: Mutex<Option<Timer>>,
    epoch: Instant,
    ticks: AtomicU64,
    faults: AtomicU64,
    panics: AtomicU64,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            let _ = timer.stop.try_send(());
        }
    }
}

/// Owned handle to a tick scheduler. Clones share the same scheduler.
#[derive(Clone)]
pub struct TickScheduler {
    inner: Arc<Inner>,
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickScheduler")
            .field("stats", &self.stats())
            .field("external_attached", &self.is_external_attached())
            .field("timer_running", &self.is_timer_running())
            .finish()
    }
}

impl TickScheduler {
    /// Create a scheduler with no handlers and no running timer
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                handlers: RwLock::new(Arc::new(Vec::new())),
                next_id: AtomicU64::new(0),
                external_attached: AtomicBool::new(false),
                timer: Mutex::new(None),
                epoch: Instant::now(),
                ticks: AtomicU64::new(0),
                faults: AtomicU64::new(0),
                panics: AtomicU64::new(0),
            }),
        }
    }

    /// Register a handler; it receives every tick dispatched after this call
    pub fn register<F>(&self, name: impl Into<String>, callback: F) -> HandlerId
    where
        F: Fn(&TickEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = HandlerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let handler = Arc::new(Handler {
            name: name.into(),
            callback: Box::new(callback),
        });

        tracing::debug!(handler = %handler.name, "registered tick handler");

        let mut handlers = self.inner.handlers.write();
        Arc::make_mut(&mut *handlers).push((id, handler));
        id
    }

    /// Remove a handler; returns whether it was registered
    pub fn unregister(&self, id: HandlerId) -> bool {
        let mut handlers = self.inner.handlers.write();
        let Some(pos) = handlers.iter().position(|(hid, _)| *hid == id) else {
            return false;
        };
        Arc::make_mut(&mut *handlers).remove(pos);
        true
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.inner.handlers.read().len()
    }

    /// Names of registered handlers, in dispatch order
    pub fn handler_names(&self) -> Vec<String> {
        self.inner
            .handlers
            .read()
            .iter()
            .map(|(_, h)| h.name.clone())
            .collect()
    }

    /// Deliver one tick to every handler
    ///
    /// This is the entry point for an external tick source.
    pub fn dispatch(&self, timestamp_nanos: u64, elapsed_ms: f64) {
        self.dispatch_event(&TickEvent::new(timestamp_nanos, elapsed_ms));
    }

    /// Deliver an already built tick event
    pub fn dispatch_event(&self, tick: &TickEvent) {
        let snapshot = Arc::clone(&*self.inner.handlers.read());

        tracing::trace!(
            timestamp = tick.timestamp_nanos,
            handlers = snapshot.len(),
            "dispatch"
        );

        for (_, handler) in snapshot.iter() {
            match panic::catch_unwind(AssertUnwindSafe(|| (handler.callback)(tick))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    self.inner.faults.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        module = %handler.name,
                        timestamp = tick.timestamp_nanos,
                        error = %err,
                        "tick handler failed"
                    );
                }
                Err(payload) => {
                    self.inner.panics.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        module = %handler.name,
                        timestamp = tick.timestamp_nanos,
                        panic = panic_message(payload.as_ref()),
                        "tick handler panicked"
                    );
                }
            }
        }

        self.inner.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Start the fallback timer at `tick_rate` steps per second
    ///
    /// Returns `false` without starting anything when a timer is already
    /// running or an external source has been attached.
    pub fn start_fallback_timer(&self, tick_rate: u32) -> RuntimeResult<bool> {
        if tick_rate == 0 {
            return Err(RuntimeError::invalid_config("tick_rate must be at least 1"));
        }

        let mut slot = self.inner.timer.lock();
        if slot.is_some() || self.is_external_attached() {
            return Ok(false);
        }

        let period = Duration::from_secs(1) / tick_rate;
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let inner = Arc::downgrade(&self.inner);

        let thread = thread::Builder::new()
            .name(TICK_THREAD_NAME.to_owned())
            .spawn(move || run_timer(inner, period, stop_rx))
            .map_err(RuntimeError::Spawn)?;

        tracing::info!(tick_rate, period_ms = period.as_millis() as u64, "fallback timer started");

        *slot = Some(Timer {
            stop: stop_tx,
            thread,
        });
        Ok(true)
    }

    /// Switch to an external tick source
    ///
    /// Stops the fallback timer for good. Only the first call has any
    /// effect; it returns `true`, every later call returns `false`.
    pub fn attach_external_source(&self) -> bool {
        if self
            .inner
            .external_attached
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.stop_timer();
        tracing::info!("external tick source attached");
        true
    }

    /// Whether an external source has been attached
    pub fn is_external_attached(&self) -> bool {
        self.inner.external_attached.load(Ordering::Acquire)
    }

    /// Whether the fallback timer thread is running
    pub fn is_timer_running(&self) -> bool {
        self.inner.timer.lock().is_some()
    }

    /// Stop the fallback timer without attaching an external source
    pub fn shutdown(&self) {
        self.stop_timer();
    }

    /// Current counters
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.inner.ticks.load(Ordering::Relaxed),
            faults: self.inner.faults.load(Ordering::Relaxed),
            panics: self.inner.panics.load(Ordering::Relaxed),
            handlers: self.handler_count(),
        }
    }

    /// Nanoseconds since this scheduler was created
    pub fn now_nanos(&self) -> u64 {
        u64::try_from(self.inner.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn stop_timer(&self) {
        let Some(timer) = self.inner.timer.lock().take() else {
            return;
        };

        let _ = timer.stop.try_send(());

        // A handler running on the timer thread may trigger this; the loop
        // then exits on its own after the current dispatch.
        if timer.thread.thread().id() == thread::current().id() {
            return;
        }
        if timer.thread.join().is_err() {
            tracing::warn!("fallback timer thread panicked");
        }
        tracing::debug!("fallback timer stopped");
    }
}

fn run_timer(inner: Weak<Inner>, period: Duration, stop: Receiver<()>) {
    let ticker = crossbeam_channel::tick(period);
    let mut last = Instant::now();

    loop {
        crossbeam_channel::select! {
            recv(stop) -> _ => break,
            recv(ticker) -> msg => {
                let Ok(now) = msg else { break };
                let Some(inner) = inner.upgrade() else { break };
                if inner.external_attached.load(Ordering::Acquire) {
                    break;
                }

                let elapsed_ms = now.saturating_duration_since(last).as_secs_f64() * 1000.0;
                last = now;
                let timestamp = now.saturating_duration_since(inner.epoch).as_nanos();
                let tick = TickEvent::new(u64::try_from(timestamp).unwrap_or(u64::MAX), elapsed_ms);

                TickScheduler { inner }.dispatch_event(&tick);
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn test_registration_order() {
        let scheduler = TickScheduler::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));

        for name in ["a", "b", "c"] {
            let seen = Arc::clone(&seen);
            scheduler.register(name, move |_| {
                seen.lock().unwrap().push(name);
                Ok(())
            });
        }

        scheduler.dispatch(1, 50.0);
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(scheduler.handler_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unregister() {
        let scheduler = TickScheduler::new();
        let id = scheduler.register("gone", |_| Ok(()));
        scheduler.register("kept", |_| Ok(()));

        assert!(scheduler.unregister(id));
        assert!(!scheduler.unregister(id));
        assert_eq!(scheduler.handler_names(), vec!["kept"]);
    }

    #[test]
    fn test_register_during_dispatch() {
        let scheduler = TickScheduler::new();
        let late_calls = Arc::new(AtomicU64::new(0));

        let handle = scheduler.clone();
        let counter = Arc::clone(&late_calls);
        let added = AtomicBool::new(false);
        scheduler.register("adder", move |_| {
            if !added.swap(true, Ordering::SeqCst) {
                let counter = Arc::clone(&counter);
                handle.register("late", move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                });
            }
            Ok(())
        });

        scheduler.dispatch(1, 50.0);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        scheduler.dispatch(2, 50.0);
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_tick_rate_rejected() {
        let scheduler = TickScheduler::new();
        assert!(scheduler.start_fallback_timer(0).is_err());
        assert!(!scheduler.is_timer_running());
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&42_u32), "non-string panic payload");
    }
}
