//! Resource scheduler
//!
//! Keeps the live set of attached elements and decides which of them are in
//! the viewport. A pass walks a snapshot of the live set, so elements may be
//! added or removed from inside any callback the pass triggers; an element
//! removed mid-pass is skipped for the rest of that pass.
//!
//! Passes are requested through [`Resources::recompute`], which is throttled:
//! a request long after the previous pass runs at once, requests inside the
//! window collapse into one pass at its trailing edge. [`Resources::recompute_now`]
//! runs a pass directly.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use mip_core::{EventLoop, Throttle, TimerId};
use mip_platform::GeometryProvider;
use smallvec::SmallVec;

use crate::config::MipConfig;
use crate::element::ElementController;
use crate::error::MipError;
use crate::viewport::{Viewport, ViewportEventKind};

/// Scheduler-local id of a live element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Snapshot = SmallVec<[(ResourceId, Rc<ElementController>); 16]>;

/// Live set of attached elements and their viewport classification
pub struct Resources {
    event_loop: EventLoop,
    geometry: Rc<dyn GeometryProvider>,
    live: RefCell<IndexMap<ResourceId, Rc<ElementController>>>,
    next_id: Cell<u64>,
    throttle: Throttle,
    swipe_timer: Cell<Option<TimerId>>,
    swipe_delay_factor: f64,
    swipe_max_delay: Duration,
    passes: Cell<u64>,
    weak_self: Weak<Resources>,
}

impl Resources {
    pub fn new(
        event_loop: &EventLoop,
        geometry: Rc<dyn GeometryProvider>,
        config: &MipConfig,
    ) -> Rc<Self> {
        Rc::new_cyclic(|weak_self: &Weak<Resources>| {
            let weak = weak_self.clone();
            let throttle = Throttle::new(event_loop, config.throttle_interval(), move || {
                if let Some(resources) = weak.upgrade() {
                    resources.recompute_now();
                }
            });
            Self {
                event_loop: event_loop.clone(),
                geometry,
                live: RefCell::new(IndexMap::new()),
                next_id: Cell::new(1),
                throttle,
                swipe_timer: Cell::new(None),
                swipe_delay_factor: config.swipe_delay_factor,
                swipe_max_delay: config.swipe_max_delay(),
                passes: Cell::new(0),
                weak_self: weak_self.clone(),
            }
        })
    }

    /// Request a pass whenever the viewport settles or is resized
    pub fn bind_viewport(&self, viewport: &Viewport) {
        for kind in [ViewportEventKind::Changed, ViewportEventKind::Resize] {
            let weak = self.weak_self.clone();
            viewport.on(kind, move |_| {
                if let Some(resources) = weak.upgrade() {
                    resources.recompute();
                }
            });
        }
    }

    /// Insert an element into the live set.
    ///
    /// The element is built and classified by an immediate pass. Adding an
    /// element that is already live returns its existing id.
    pub fn add(&self, element: Rc<ElementController>) -> ResourceId {
        if let Some(id) = element.resource_id() {
            if self.contains(id) {
                return id;
            }
        }

        let id = ResourceId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.live.borrow_mut().insert(id, element.clone());
        element.set_resource_id(Some(id));
        tracing::debug!(%id, tag = element.tag(), "resource added");

        element.build();
        self.recompute_now();
        id
    }

    /// Remove an element from the live set.
    ///
    /// Returns false if `id` was not live.
    pub fn remove(&self, id: ResourceId) -> bool {
        let removed = self.live.borrow_mut().shift_remove(&id);
        match removed {
            Some(element) => {
                element.set_resource_id(None);
                tracing::debug!(%id, tag = element.tag(), "resource removed");
                true
            }
            None => {
                tracing::debug!(error = %MipError::UnknownRemoval(id), "resource not found");
                false
            }
        }
    }

    /// Remove an element by its controller
    pub fn remove_element(&self, element: &ElementController) -> bool {
        match element.resource_id() {
            Some(id) => self.remove(id),
            None => false,
        }
    }

    /// Request a throttled pass
    pub fn recompute(&self) {
        self.throttle.trigger();
    }

    /// Classify every live element against the current viewport
    pub fn recompute_now(&self) {
        let viewport = match self.geometry.viewport_rect() {
            Ok(rect) => rect,
            Err(err) => {
                let err = MipError::from(err);
                tracing::warn!(error = %err, "viewport unavailable, recompute skipped");
                return;
            }
        };
        self.passes.set(self.passes.get() + 1);

        let snapshot: Snapshot = self
            .live
            .borrow()
            .iter()
            .map(|(id, element)| (*id, element.clone()))
            .collect();

        for (id, element) in snapshot {
            if !self.contains(id) {
                tracing::trace!(%id, "removed during pass, skipped");
                continue;
            }
            let in_viewport = element.prerender_allowed()
                || match self.geometry.element_rect(element.node()) {
                    Ok(rect) => rect.overlaps(&viewport),
                    Err(err) => {
                        let err = MipError::from(err);
                        tracing::debug!(%id, error = %err, "treating element as out of viewport");
                        false
                    }
                };
            tracing::trace!(%id, tag = element.tag(), in_viewport, "classified");
            element.set_in_viewport(in_viewport);
        }
    }

    /// Force a live element into the in-viewport state.
    ///
    /// Returns false if the element is not in the live set or already was in
    /// the viewport.
    pub fn prerender_element(&self, element: &ElementController) -> bool {
        let live = element.resource_id().is_some_and(|id| self.contains(id));
        if !live {
            tracing::debug!(tag = element.tag(), node = ?element.node(), "prerender of element not in live set ignored");
            return false;
        }
        if element.in_viewport() {
            return false;
        }
        tracing::debug!(tag = element.tag(), "prerendering element");
        element.set_in_viewport(true)
    }

    /// Schedule a pass for when a swipe of `velocity` px/ms comes to rest.
    ///
    /// A newer swipe replaces a pending one.
    pub fn on_swipe(&self, velocity: f64) {
        if let Some(timer) = self.swipe_timer.take() {
            self.event_loop.clear_timeout(timer);
        }
        let delay = self.swipe_delay(velocity);
        tracing::trace!(velocity, ?delay, "swipe recompute scheduled");

        let weak = self.weak_self.clone();
        let timer = self.event_loop.set_timeout(delay, move || {
            if let Some(resources) = weak.upgrade() {
                resources.swipe_timer.set(None);
                resources.recompute();
            }
        });
        self.swipe_timer.set(Some(timer));
    }

    fn swipe_delay(&self, velocity: f64) -> Duration {
        let millis = velocity.abs() * self.swipe_delay_factor;
        if !millis.is_finite() {
            return self.swipe_max_delay;
        }
        Duration::from_millis(millis.round() as u64).min(self.swipe_max_delay)
    }

    pub fn len(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.borrow().is_empty()
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        self.live.borrow().contains_key(&id)
    }

    pub fn get(&self, id: ResourceId) -> Option<Rc<ElementController>> {
        self.live.borrow().get(&id).cloned()
    }

    /// Live elements in insertion order
    pub fn elements(&self) -> Vec<Rc<ElementController>> {
        self.live.borrow().values().cloned().collect()
    }

    /// Number of passes run so far
    pub fn pass_count(&self) -> u64 {
        self.passes.get()
    }

    pub fn is_recompute_pending(&self) -> bool {
        self.throttle.is_pending()
    }
}

impl Drop for Resources {
    fn drop(&mut self) {
        if let Some(timer) = self.swipe_timer.take() {
            self.event_loop.clear_timeout(timer);
        }
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resources")
            .field("live", &self.len())
            .field("passes", &self.passes.get())
            .field("throttle", &self.throttle)
            .finish()
    }
}
