//! Throttle for bursts of trigger events
//!
//! The throttle remembers when its action last ran (initially, when it was
//! created). A trigger that arrives a full interval or more after that runs
//! the action immediately and opens a new window. A trigger inside the
//! window arms one timer for the end of the window; every further trigger
//! collapses into it, and the action runs once at the trailing edge, reading
//! whatever state is current at that moment.
//!
//! A trigger that finds its timer already past its deadline (the loop was
//! busy and has not serviced it yet) runs the action immediately and cancels
//! the stale timer.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::event_loop::{EventLoop, TimerId};

struct ThrottleInner {
    event_loop: EventLoop,
    interval: Duration,
    pending: Cell<Option<TimerId>>,
    last_run: Cell<Duration>,
    runs: Cell<u64>,
    action: Box<dyn Fn()>,
}

impl ThrottleInner {
    fn run(&self) {
        self.pending.set(None);
        self.last_run.set(self.event_loop.now());
        self.runs.set(self.runs.get() + 1);
        (self.action)();
    }
}

/// Collapses bursts of triggers into one trailing-edge call
pub struct Throttle {
    inner: Rc<ThrottleInner>,
}

impl Throttle {
    pub fn new<F>(event_loop: &EventLoop, interval: Duration, action: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            inner: Rc::new(ThrottleInner {
                event_loop: event_loop.clone(),
                interval,
                pending: Cell::new(None),
                last_run: Cell::new(event_loop.now()),
                runs: Cell::new(0),
                action: Box::new(action),
            }),
        }
    }

    /// Request a run of the action
    pub fn trigger(&self) {
        let inner = &self.inner;
        let now = inner.event_loop.now();
        if let Some(timer) = inner.pending.get() {
            let overdue = inner
                .event_loop
                .deadline(timer)
                .is_some_and(|deadline| now >= deadline);
            if overdue {
                inner.event_loop.clear_timeout(timer);
                inner.run();
            }
            return;
        }

        let since_last = now.saturating_sub(inner.last_run.get());
        if since_last >= inner.interval {
            inner.run();
            return;
        }

        let weak: Weak<ThrottleInner> = Rc::downgrade(inner);
        let timer = inner
            .event_loop
            .set_timeout(inner.interval - since_last, move || {
                if let Some(inner) = weak.upgrade() {
                    inner.run();
                }
            });
        inner.pending.set(Some(timer));
    }

    /// Run a pending action now instead of at the trailing edge.
    ///
    /// Returns false if nothing was pending.
    pub fn flush(&self) -> bool {
        let Some(timer) = self.inner.pending.get() else {
            return false;
        };
        self.inner.event_loop.clear_timeout(timer);
        self.inner.run();
        true
    }

    /// Drop a pending action without running it
    pub fn cancel(&self) {
        if let Some(timer) = self.inner.pending.take() {
            self.inner.event_loop.clear_timeout(timer);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.pending.get().is_some()
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Loop time of the most recent run, or of creation if it never ran
    pub fn last_run(&self) -> Duration {
        self.inner.last_run.get()
    }

    /// Number of times the action has run
    pub fn run_count(&self) -> u64 {
        self.inner.runs.get()
    }
}

impl Drop for Throttle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Throttle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttle")
            .field("interval", &self.inner.interval)
            .field("pending", &self.is_pending())
            .field("runs", &self.run_count())
            .finish()
    }
}
