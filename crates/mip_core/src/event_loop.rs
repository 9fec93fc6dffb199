//! Cooperative event loop
//!
//! A single-threaded macrotask queue. Work is suspended only by scheduling a
//! timer; nothing blocks. Timers fire in deadline order, ties broken by
//! scheduling order.
//!
//! `EventLoop` is a cheap handle: clones share the same clock and queue, so
//! components can keep their own handle for scheduling.
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! use mip_core::EventLoop;
//!
//! let event_loop = EventLoop::manual();
//! let fired = Rc::new(Cell::new(false));
//!
//! let flag = fired.clone();
//! event_loop.set_timeout(Duration::from_millis(20), move || flag.set(true));
//!
//! event_loop.advance(Duration::from_millis(19));
//! assert!(!fired.get());
//! event_loop.advance(Duration::from_millis(1));
//! assert!(fired.get());
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use slotmap::{new_key_type, SlotMap};

use crate::clock::{Clock, ManualClock, SystemClock};

new_key_type! {
    /// Handle to a scheduled timer
    pub struct TimerId;
}

struct Timer {
    deadline: Duration,
    seq: u64,
    callback: Box<dyn FnOnce()>,
}

struct EventLoopInner {
    clock: Box<dyn Clock>,
    timers: RefCell<SlotMap<TimerId, Timer>>,
    /// Deadline ordering: (deadline, scheduling sequence) -> timer
    queue: RefCell<BTreeMap<(Duration, u64), TimerId>>,
    next_seq: Cell<u64>,
}

/// Handle to a single-threaded timer queue and its clock
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<EventLoopInner>,
}

impl EventLoop {
    /// Create an event loop driven by the given clock
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            inner: Rc::new(EventLoopInner {
                clock: Box::new(clock),
                timers: RefCell::new(SlotMap::with_key()),
                queue: RefCell::new(BTreeMap::new()),
                next_seq: Cell::new(0),
            }),
        }
    }

    /// Event loop on the monotonic system clock
    pub fn system() -> Self {
        Self::new(SystemClock::new())
    }

    /// Event loop whose time only moves through [`EventLoop::advance`]
    pub fn manual() -> Self {
        Self::new(ManualClock::new())
    }

    /// Current time of the loop's clock
    pub fn now(&self) -> Duration {
        self.inner.clock.now()
    }

    /// Schedule `callback` to run once `delay` has elapsed
    pub fn set_timeout<F>(&self, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce() + 'static,
    {
        let deadline = self.now() + delay;
        let seq = self.inner.next_seq.get();
        self.inner.next_seq.set(seq + 1);

        let id = self.inner.timers.borrow_mut().insert(Timer {
            deadline,
            seq,
            callback: Box::new(callback),
        });
        self.inner.queue.borrow_mut().insert((deadline, seq), id);
        tracing::trace!(?deadline, "timer scheduled");
        id
    }

    /// Cancel a pending timer.
    ///
    /// Returns false if the timer already fired or was cleared.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        let Some(timer) = self.inner.timers.borrow_mut().remove(id) else {
            return false;
        };
        self.inner
            .queue
            .borrow_mut()
            .remove(&(timer.deadline, timer.seq));
        true
    }

    /// Returns true if the timer is still waiting to fire
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.inner.timers.borrow().contains_key(id)
    }

    /// Deadline of the timer pending for `id`
    pub fn deadline(&self, id: TimerId) -> Option<Duration> {
        self.inner.timers.borrow().get(id).map(|timer| timer.deadline)
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Duration> {
        self.inner
            .queue
            .borrow()
            .keys()
            .next()
            .map(|(deadline, _)| *deadline)
    }

    /// Number of timers waiting to fire
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.borrow().len()
    }

    /// Run every timer whose deadline has passed.
    ///
    /// Timers scheduled by callbacks that are already due run in the same
    /// call. Returns the number of timers fired.
    pub fn run_due(&self) -> usize {
        let now = self.now();
        let mut fired = 0;
        while let Some(timer) = self.pop_due(now) {
            (timer.callback)();
            fired += 1;
        }
        fired
    }

    /// Advance the clock by `delta`, firing timers in deadline order.
    ///
    /// The clock is moved to each timer's deadline before its callback runs.
    /// Only meaningful for clocks that accept [`Clock::advance_to`].
    pub fn advance(&self, delta: Duration) -> usize {
        let target = self.now() + delta;
        let mut fired = 0;
        while let Some(timer) = self.pop_due(target) {
            self.inner.clock.advance_to(timer.deadline);
            (timer.callback)();
            fired += 1;
        }
        self.inner.clock.advance_to(target);
        fired
    }

    /// Advance until no timers remain, bounded by `limit` of clock time
    pub fn run_until_idle(&self, limit: Duration) -> usize {
        let stop = self.now() + limit;
        let mut fired = 0;
        while let Some(deadline) = self.next_deadline() {
            if deadline > stop {
                break;
            }
            fired += self.advance(deadline.saturating_sub(self.now()));
        }
        fired
    }

    /// Detach the earliest timer due at or before `until`.
    ///
    /// The timer leaves both maps before its callback runs, so callbacks may
    /// freely schedule or clear timers.
    fn pop_due(&self, until: Duration) -> Option<Timer> {
        let id = {
            let mut queue = self.inner.queue.borrow_mut();
            let (&key, &id) = queue.iter().next()?;
            if key.0 > until {
                return None;
            }
            queue.remove(&key);
            id
        };
        self.inner.timers.borrow_mut().remove(id)
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("now", &self.now())
            .field("pending_timers", &self.pending_timers())
            .finish()
    }
}
