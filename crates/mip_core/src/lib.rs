//! MIP Core
//!
//! Host-independent primitives shared by the MIP element runtime:
//!
//! - **Geometry**: page-absolute rectangles and the overlap test used for
//!   viewport classification
//! - **Event Loop**: a single-threaded macrotask queue driven by a real or
//!   manual clock
//! - **Events**: kind-filtered, re-entrancy safe event emitters
//! - **Throttle**: collapsing of trigger bursts into one run per window
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! use mip_core::{EventLoop, Throttle};
//!
//! let event_loop = EventLoop::manual();
//! let runs = Rc::new(Cell::new(0));
//!
//! let counter = runs.clone();
//! let throttle = Throttle::new(&event_loop, Duration::from_millis(10), move || {
//!     counter.set(counter.get() + 1);
//! });
//!
//! for _ in 0..50 {
//!     throttle.trigger();
//! }
//! event_loop.advance(Duration::from_millis(10));
//! assert_eq!(runs.get(), 1);
//! ```

pub mod clock;
pub mod event_loop;
pub mod events;
pub mod geometry;
pub mod throttle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event_loop::{EventLoop, TimerId};
pub use events::{EventEmitter, EventKind, ListenerId};
pub use geometry::Rect;
pub use throttle::Throttle;
