//! Viewport tracker
//!
//! Redispatches the host's native scroll and resize notifications and turns a
//! stream of scroll ticks into a single `changed` event once scrolling has
//! settled.
//!
//! # Settle detection
//!
//! ```text
//! scroll tick ──► no sample, or sample older than the window?
//!                     │ yes: sample = (now, scroll_top), check in one window
//!                     ▼
//!               settle check ──► |Δscroll / Δt| < settle_velocity ?
//!                     │ yes: emit Changed(rect), back to idle
//!                     │ no:  re-sample, check again in one window
//! ```
//!
//! At most one settle check is pending at any time.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use mip_core::{EventEmitter, EventKind, EventLoop, ListenerId, Rect, TimerId};
use mip_platform::GeometryProvider;

use crate::config::MipConfig;
use crate::error::MipError;

/// Events emitted by the viewport tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportEvent {
    /// Native scroll tick, dispatched synchronously
    Scroll,
    /// Native resize, dispatched synchronously
    Resize,
    /// Scrolling settled; carries the viewport rectangle at that moment
    Changed(Rect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportEventKind {
    Scroll,
    Resize,
    Changed,
}

impl EventKind for ViewportEvent {
    type Kind = ViewportEventKind;

    fn kind(&self) -> ViewportEventKind {
        match self {
            ViewportEvent::Scroll => ViewportEventKind::Scroll,
            ViewportEvent::Resize => ViewportEventKind::Resize,
            ViewportEvent::Changed(_) => ViewportEventKind::Changed,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ScrollSample {
    at: Duration,
    scroll_top: f64,
}

/// Tracks the designated scrolling context of the page
pub struct Viewport {
    event_loop: EventLoop,
    geometry: Rc<dyn GeometryProvider>,
    events: EventEmitter<ViewportEvent>,
    settle_window: Duration,
    settle_velocity: f64,

    scroll_top: Cell<f64>,
    scroll_left: Cell<f64>,
    changing: Cell<bool>,
    sample: Cell<Option<ScrollSample>>,
    check_timer: Cell<Option<TimerId>>,
    changed_count: Cell<u64>,

    weak_self: Weak<Viewport>,
}

impl Viewport {
    pub fn new(
        event_loop: &EventLoop,
        geometry: Rc<dyn GeometryProvider>,
        config: &MipConfig,
    ) -> Rc<Self> {
        Rc::new_cyclic(|weak_self| Self {
            event_loop: event_loop.clone(),
            scroll_top: Cell::new(geometry.scroll_top()),
            scroll_left: Cell::new(geometry.scroll_left()),
            geometry,
            events: EventEmitter::new(),
            settle_window: config.settle_window(),
            settle_velocity: config.settle_velocity,
            changing: Cell::new(false),
            sample: Cell::new(None),
            check_timer: Cell::new(None),
            changed_count: Cell::new(0),
            weak_self: weak_self.clone(),
        })
    }

    /// Current vertical scroll offset of the scrolling context
    pub fn scroll_top(&self) -> f64 {
        self.geometry.scroll_top()
    }

    /// Current horizontal scroll offset of the scrolling context
    pub fn scroll_left(&self) -> f64 {
        self.geometry.scroll_left()
    }

    /// Scroll offsets recorded at the most recent tick
    pub fn last_scroll(&self) -> (f64, f64) {
        (self.scroll_left.get(), self.scroll_top.get())
    }

    /// Visible viewport in page coordinates
    pub fn rect(&self) -> mip_platform::Result<Rect> {
        self.geometry.viewport_rect()
    }

    /// Width and height of the visible viewport
    pub fn size(&self) -> mip_platform::Result<(f64, f64)> {
        self.rect().map(|rect| (rect.width, rect.height))
    }

    pub fn scroll_height(&self) -> f64 {
        self.geometry.scroll_height()
    }

    /// Move the scrolling context and process the move as a scroll tick
    pub fn set_scroll_top(&self, top: f64) {
        self.geometry.scroll_to(self.geometry.scroll_left(), top);
        self.handle_scroll();
    }

    /// True between the first tick of a scroll and its settle
    pub fn is_changing(&self) -> bool {
        self.changing.get()
    }

    /// Number of `changed` events emitted so far
    pub fn changed_count(&self) -> u64 {
        self.changed_count.get()
    }

    /// Subscribe to one kind of viewport event
    pub fn on<F>(&self, kind: ViewportEventKind, handler: F) -> ListenerId
    where
        F: Fn(&ViewportEvent) + 'static,
    {
        self.events.on(kind, handler)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    /// Native scroll notification from the host
    pub fn handle_scroll(&self) {
        let now = self.event_loop.now();
        let top = self.geometry.scroll_top();
        self.scroll_top.set(top);
        self.scroll_left.set(self.geometry.scroll_left());
        self.changing.set(true);

        self.events.emit(&ViewportEvent::Scroll);

        let needs_sample = match self.sample.get() {
            None => true,
            Some(sample) => now.saturating_sub(sample.at) >= self.settle_window,
        };
        if needs_sample {
            tracing::trace!(scroll_top = top, ?now, "viewport sample captured");
            self.sample.set(Some(ScrollSample {
                at: now,
                scroll_top: top,
            }));
            self.schedule_check();
        }
    }

    /// Native resize notification from the host
    pub fn handle_resize(&self) {
        tracing::trace!("viewport resized");
        self.events.emit(&ViewportEvent::Resize);
    }

    fn schedule_check(&self) {
        if let Some(timer) = self.check_timer.take() {
            self.event_loop.clear_timeout(timer);
        }
        let weak = self.weak_self.clone();
        let timer = self.event_loop.set_timeout(self.settle_window, move || {
            if let Some(viewport) = weak.upgrade() {
                viewport.check_settled();
            }
        });
        self.check_timer.set(Some(timer));
    }

    fn check_settled(&self) {
        self.check_timer.set(None);
        let Some(sample) = self.sample.get() else {
            return;
        };

        let now = self.event_loop.now();
        let top = self.geometry.scroll_top();
        let elapsed_ms = now.saturating_sub(sample.at).as_secs_f64() * 1000.0;
        let velocity = if elapsed_ms > 0.0 {
            (top - sample.scroll_top).abs() / elapsed_ms
        } else {
            0.0
        };

        if velocity >= self.settle_velocity {
            tracing::trace!(velocity, "viewport still moving");
            self.sample.set(Some(ScrollSample {
                at: now,
                scroll_top: top,
            }));
            self.schedule_check();
            return;
        }

        self.sample.set(None);
        self.changing.set(false);
        match self.geometry.viewport_rect() {
            Ok(rect) => {
                self.changed_count.set(self.changed_count.get() + 1);
                tracing::debug!(scroll_top = top, ?now, "viewport settled");
                self.events.emit(&ViewportEvent::Changed(rect));
            }
            Err(err) => {
                let err = MipError::from(err);
                tracing::warn!(error = %err, "viewport settled but could not be measured");
            }
        }
    }
}

impl Drop for Viewport {
    fn drop(&mut self) {
        if let Some(timer) = self.check_timer.take() {
            self.event_loop.clear_timeout(timer);
        }
    }
}

impl fmt::Debug for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewport")
            .field("scroll_top", &self.scroll_top.get())
            .field("scroll_left", &self.scroll_left.get())
            .field("changing", &self.changing.get())
            .field("listeners", &self.events.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mip_platform::HeadlessPage;
    use std::cell::RefCell;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn setup() -> (EventLoop, Rc<HeadlessPage>, Rc<Viewport>) {
        let event_loop = EventLoop::manual();
        let page = Rc::new(HeadlessPage::new(375.0, 667.0));
        page.set_content_height(10_000.0);
        let viewport = Viewport::new(&event_loop, page.clone(), &MipConfig::default());
        (event_loop, page, viewport)
    }

    /// Record the loop time of every `changed` event
    fn record_changed(event_loop: &EventLoop, viewport: &Viewport) -> Rc<RefCell<Vec<Duration>>> {
        let times = Rc::new(RefCell::new(Vec::new()));
        let sink = times.clone();
        let clock = event_loop.clone();
        viewport.on(ViewportEventKind::Changed, move |_| {
            sink.borrow_mut().push(clock.now());
        });
        times
    }

    #[test]
    fn test_scroll_and_resize_are_synchronous() {
        let (_event_loop, _page, viewport) = setup();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for kind in [ViewportEventKind::Scroll, ViewportEventKind::Resize] {
            let sink = seen.clone();
            viewport.on(kind, move |event| sink.borrow_mut().push(event.kind()));
        }

        viewport.handle_scroll();
        viewport.handle_resize();
        assert_eq!(
            *seen.borrow(),
            vec![ViewportEventKind::Scroll, ViewportEventKind::Resize]
        );
        assert!(viewport.is_changing());
    }

    #[test]
    fn test_changed_fires_once_per_settle() {
        let (event_loop, page, viewport) = setup();
        let changed = record_changed(&event_loop, &viewport);

        // 100ms of scrolling at 2px/ms, one tick every 5ms
        for step in 1..=20 {
            event_loop.advance(ms(5));
            page.set_scroll(0.0, step as f64 * 10.0);
            viewport.handle_scroll();
        }
        let stopped_at = event_loop.now();

        event_loop.advance(ms(200));
        let changed = changed.borrow();
        assert_eq!(changed.len(), 1);
        let latency = changed[0] - stopped_at;
        assert!(latency >= ms(20), "fired too early: {latency:?}");
        assert!(latency <= ms(40), "fired too late: {latency:?}");
        assert!(!viewport.is_changing());
        assert_eq!(viewport.changed_count(), 1);
    }

    #[test]
    fn test_single_tick_settles_after_one_window() {
        let (event_loop, page, viewport) = setup();
        let changed = record_changed(&event_loop, &viewport);

        page.set_scroll(0.0, 300.0);
        viewport.handle_scroll();
        event_loop.advance(ms(19));
        assert!(changed.borrow().is_empty());
        event_loop.advance(ms(1));
        assert_eq!(*changed.borrow(), vec![ms(20)]);
    }

    #[test]
    fn test_only_one_check_pending() {
        let (event_loop, page, viewport) = setup();
        for step in 1..=10 {
            page.set_scroll(0.0, step as f64);
            viewport.handle_scroll();
            event_loop.advance(ms(3));
            assert!(event_loop.pending_timers() <= 1);
        }
    }

    #[test]
    fn test_changed_carries_viewport_rect() {
        let (event_loop, page, viewport) = setup();
        let rect = Rc::new(Cell::new(None));
        let sink = rect.clone();
        viewport.on(ViewportEventKind::Changed, move |event| {
            if let ViewportEvent::Changed(r) = event {
                sink.set(Some(*r));
            }
        });

        page.set_scroll(0.0, 1200.0);
        viewport.handle_scroll();
        event_loop.advance(ms(50));
        assert_eq!(rect.get(), Some(Rect::new(0.0, 1200.0, 375.0, 667.0)));
    }

    #[test]
    fn test_unmeasurable_viewport_skips_changed() {
        let (event_loop, page, viewport) = setup();
        let changed = record_changed(&event_loop, &viewport);

        page.break_viewport(true);
        viewport.handle_scroll();
        event_loop.advance(ms(50));
        assert!(changed.borrow().is_empty());
        assert!(!viewport.is_changing());

        page.break_viewport(false);
        viewport.handle_scroll();
        event_loop.advance(ms(50));
        assert_eq!(changed.borrow().len(), 1);
    }

    #[test]
    fn test_set_scroll_top() {
        let (event_loop, _page, viewport) = setup();
        viewport.set_scroll_top(400.0);
        assert_eq!(viewport.scroll_top(), 400.0);
        assert_eq!(viewport.last_scroll(), (0.0, 400.0));
        assert!(viewport.is_changing());
        event_loop.advance(ms(40));
        assert!(!viewport.is_changing());
        assert_eq!(viewport.size().unwrap(), (375.0, 667.0));
        assert_eq!(viewport.scroll_height(), 10_000.0);
    }
}
