//! First-screen performance tracking
//!
//! Elements that load resources register as first-screen candidates when
//! they are created. The first screen is complete once the document has
//! loaded and every candidate has either reported its resources loaded or
//! left the document.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::time::Duration;

use mip_core::{EventEmitter, EventKind, EventLoop, ListenerId};
use mip_platform::NodeId;
use rustc_hash::FxHashSet;

/// Performance collaborator of the lifecycle controller
pub trait PerformanceMonitor {
    fn add_first_screen_candidate(&self, node: NodeId);

    /// The node's resources loaded, or it stopped being a candidate
    fn first_screen_resource_loaded(&self, node: NodeId);

    /// The host finished parsing the document
    fn dom_loaded(&self) {}
}

/// Events emitted by [`FirstScreenTracker`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PerformanceEvent {
    FirstScreen { at: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceEventKind {
    FirstScreen,
}

impl EventKind for PerformanceEvent {
    type Kind = PerformanceEventKind;

    fn kind(&self) -> PerformanceEventKind {
        match self {
            PerformanceEvent::FirstScreen { .. } => PerformanceEventKind::FirstScreen,
        }
    }
}

/// Default [`PerformanceMonitor`]
pub struct FirstScreenTracker {
    event_loop: EventLoop,
    pending: RefCell<FxHashSet<NodeId>>,
    dom_loaded: Cell<bool>,
    first_screen_at: Cell<Option<Duration>>,
    events: EventEmitter<PerformanceEvent>,
}

impl FirstScreenTracker {
    pub fn new(event_loop: &EventLoop) -> Self {
        Self {
            event_loop: event_loop.clone(),
            pending: RefCell::new(FxHashSet::default()),
            dom_loaded: Cell::new(false),
            first_screen_at: Cell::new(None),
            events: EventEmitter::new(),
        }
    }

    pub fn is_pending(&self, node: NodeId) -> bool {
        self.pending.borrow().contains(&node)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Loop time at which the first screen completed
    pub fn first_screen_at(&self) -> Option<Duration> {
        self.first_screen_at.get()
    }

    pub fn on<F>(&self, kind: PerformanceEventKind, handler: F) -> ListenerId
    where
        F: Fn(&PerformanceEvent) + 'static,
    {
        self.events.on(kind, handler)
    }

    fn check_complete(&self) {
        if self.first_screen_at.get().is_some()
            || !self.dom_loaded.get()
            || !self.pending.borrow().is_empty()
        {
            return;
        }
        let at = self.event_loop.now();
        self.first_screen_at.set(Some(at));
        tracing::debug!(?at, "first screen complete");
        self.events.emit(&PerformanceEvent::FirstScreen { at });
    }
}

impl PerformanceMonitor for FirstScreenTracker {
    fn add_first_screen_candidate(&self, node: NodeId) {
        if self.first_screen_at.get().is_some() {
            tracing::trace!(?node, "first screen already complete, candidate ignored");
            return;
        }
        self.pending.borrow_mut().insert(node);
    }

    fn first_screen_resource_loaded(&self, node: NodeId) {
        if self.pending.borrow_mut().remove(&node) {
            self.check_complete();
        }
    }

    fn dom_loaded(&self) {
        self.dom_loaded.set(true);
        self.check_complete();
    }
}

impl fmt::Debug for FirstScreenTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirstScreenTracker")
            .field("pending", &self.pending_count())
            .field("dom_loaded", &self.dom_loaded.get())
            .field("first_screen_at", &self.first_screen_at.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mip_platform::HeadlessPage;
    use std::rc::Rc;

    #[test]
    fn test_completes_when_last_candidate_loads() {
        let event_loop = EventLoop::manual();
        let page = HeadlessPage::new(375.0, 667.0);
        let a = page.create_element("mip-img");
        let b = page.create_element("mip-img");
        let tracker = FirstScreenTracker::new(&event_loop);

        let fired = Rc::new(Cell::new(None));
        let sink = fired.clone();
        tracker.on(PerformanceEventKind::FirstScreen, move |event| {
            let PerformanceEvent::FirstScreen { at } = event;
            sink.set(Some(*at));
        });

        tracker.add_first_screen_candidate(a);
        tracker.add_first_screen_candidate(b);
        tracker.dom_loaded();
        assert_eq!(tracker.first_screen_at(), None);

        event_loop.advance(Duration::from_millis(30));
        tracker.first_screen_resource_loaded(a);
        // Unknown nodes do not count
        tracker.first_screen_resource_loaded(a);
        assert_eq!(tracker.pending_count(), 1);

        event_loop.advance(Duration::from_millis(20));
        tracker.first_screen_resource_loaded(b);
        assert_eq!(tracker.first_screen_at(), Some(Duration::from_millis(50)));
        assert_eq!(fired.get(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_dom_loaded_without_candidates() {
        let event_loop = EventLoop::manual();
        let tracker = FirstScreenTracker::new(&event_loop);
        tracker.dom_loaded();
        assert_eq!(tracker.first_screen_at(), Some(Duration::ZERO));
    }

    #[test]
    fn test_waits_for_dom_loaded() {
        let event_loop = EventLoop::manual();
        let page = HeadlessPage::new(375.0, 667.0);
        let node = page.create_element("mip-img");
        let tracker = FirstScreenTracker::new(&event_loop);

        tracker.add_first_screen_candidate(node);
        tracker.first_screen_resource_loaded(node);
        assert_eq!(tracker.first_screen_at(), None);

        tracker.dom_loaded();
        assert!(tracker.first_screen_at().is_some());

        // Late candidates are ignored once complete
        tracker.add_first_screen_candidate(node);
        assert!(!tracker.is_pending(node));
    }
}
