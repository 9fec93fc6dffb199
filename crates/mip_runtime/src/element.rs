//! Custom elements and their lifecycle controller
//!
//! A [`CustomElement`] is the behaviour a page author supplies for one tag.
//! Every callback is optional. The runtime wraps each instance in an
//! [`ElementController`], which owns the lifecycle state machine:
//!
//! ```text
//!   Created ──attach──► Attached ──detach──► Detached
//!                          ▲                    │
//!                          └──────attach────────┘
//! ```
//!
//! Orthogonal to the lifecycle state are the `built` flag (set once, never
//! cleared) and the `in_viewport` / `first_in_viewport` pair driven by the
//! resource scheduler.
//!
//! A failing callback is logged and the controller carries on. A callback
//! that re-enters its own element (for example by prerendering itself from
//! `viewport_callback`) is refused and logged.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use mip_platform::{Document, NodeId};

use crate::error::{LifecycleStage, MipError};
use crate::layout::LayoutApplier;
use crate::performance::PerformanceMonitor;
use crate::resources::{ResourceId, Resources};

/// Return type of user callbacks
pub type CallbackResult = anyhow::Result<()>;

/// Behaviour of one custom element type
///
/// # Example
///
/// ```rust
/// use mip_runtime::{CallbackResult, CustomElement, ElementHost};
///
/// struct LazyImage {
///     host: ElementHost,
///     loaded: bool,
/// }
///
/// impl CustomElement for LazyImage {
///     fn first_inview_callback(&mut self) -> CallbackResult {
///         let src = self.host.attribute("src");
///         anyhow::ensure!(src.is_some(), "mip-img without src");
///         self.loaded = true;
///         self.host.first_screen_loaded();
///         Ok(())
///     }
///
///     fn has_resources(&self) -> bool {
///         true
///     }
/// }
/// ```
pub trait CustomElement {
    fn created_callback(&mut self) -> CallbackResult {
        Ok(())
    }

    fn attached_callback(&mut self) -> CallbackResult {
        Ok(())
    }

    fn detached_callback(&mut self) -> CallbackResult {
        Ok(())
    }

    fn attribute_changed_callback(&mut self, _change: &AttributeChange) -> CallbackResult {
        Ok(())
    }

    /// One-time construction of the element's content
    fn build(&mut self) -> CallbackResult {
        Ok(())
    }

    /// Called once, right before the first `viewport_callback(true)`
    fn first_inview_callback(&mut self) -> CallbackResult {
        Ok(())
    }

    fn viewport_callback(&mut self, _in_viewport: bool) -> CallbackResult {
        Ok(())
    }

    /// Treat the element as in the viewport regardless of geometry
    fn prerender_allowed(&self) -> bool {
        false
    }

    /// The element loads resources that count towards the first screen
    fn has_resources(&self) -> bool {
        false
    }

    /// Attribute names to receive changes for; `None` receives all
    fn observed_attributes(&self) -> Option<&[&'static str]> {
        None
    }
}

/// An attribute mutation forwarded to [`CustomElement::attribute_changed_callback`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeChange {
    pub name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// The node an implementation is bound to, handed to its factory
#[derive(Clone)]
pub struct ElementHost {
    node: NodeId,
    tag: String,
    document: Rc<dyn Document>,
    performance: Rc<dyn PerformanceMonitor>,
}

impl ElementHost {
    pub(crate) fn new(
        node: NodeId,
        tag: String,
        document: Rc<dyn Document>,
        performance: Rc<dyn PerformanceMonitor>,
    ) -> Self {
        Self {
            node,
            tag,
            document,
            performance,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.document.attribute(self.node, name)
    }

    pub fn document(&self) -> &Rc<dyn Document> {
        &self.document
    }

    /// Report that this element's first-screen resources finished loading
    pub fn first_screen_loaded(&self) {
        self.performance.first_screen_resource_loaded(self.node);
    }
}

impl fmt::Debug for ElementHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementHost")
            .field("node", &self.node)
            .field("tag", &self.tag)
            .finish()
    }
}

/// Lifecycle states of a controlled element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    /// Instantiated, never inserted
    #[default]
    Created,
    /// Inserted in the document and tracked by the scheduler
    Attached,
    /// Removed from the document
    Detached,
}

/// Events driving [`LifecycleState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Attach,
    Detach,
}

impl LifecycleState {
    /// Handle an event and return the new state, or None if no transition
    pub fn on_event(&self, event: LifecycleEvent) -> Option<Self> {
        match (self, event) {
            (LifecycleState::Created, LifecycleEvent::Attach) => Some(LifecycleState::Attached),
            (LifecycleState::Detached, LifecycleEvent::Attach) => Some(LifecycleState::Attached),
            (LifecycleState::Attached, LifecycleEvent::Detach) => Some(LifecycleState::Detached),
            _ => None,
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self, LifecycleState::Attached)
    }
}

/// Per-element lifecycle controller
///
/// Created once per node and never moved to another node.
pub struct ElementController {
    node: NodeId,
    tag: String,
    implementation: RefCell<Box<dyn CustomElement>>,
    state: Cell<LifecycleState>,
    built: Cell<bool>,
    in_viewport: Cell<bool>,
    first_in_viewport: Cell<bool>,
    resource_id: Cell<Option<ResourceId>>,
}

impl ElementController {
    /// Bind an implementation to its node and run `created_callback`.
    ///
    /// Elements declaring first-screen resources are registered with the
    /// performance monitor.
    pub fn create(
        host: &ElementHost,
        implementation: Box<dyn CustomElement>,
        performance: &dyn PerformanceMonitor,
    ) -> Rc<Self> {
        let controller = Rc::new(Self {
            node: host.node(),
            tag: host.tag().to_string(),
            implementation: RefCell::new(implementation),
            state: Cell::new(LifecycleState::Created),
            built: Cell::new(false),
            in_viewport: Cell::new(false),
            first_in_viewport: Cell::new(false),
            resource_id: Cell::new(None),
        });

        tracing::debug!(tag = %controller.tag, node = ?controller.node, "element created");
        controller.invoke(LifecycleStage::Created, |imp| imp.created_callback());
        if controller.has_resources() {
            performance.add_first_screen_candidate(controller.node);
        }
        controller
    }

    /// The node was inserted in the document.
    ///
    /// Layout runs before the element joins the scheduler, which builds it
    /// and gives it an initial viewport classification. Returns false if the
    /// element was already attached.
    pub fn attach(self: &Rc<Self>, layout: &dyn LayoutApplier, resources: &Resources) -> bool {
        if !self.transition(LifecycleEvent::Attach) {
            return false;
        }

        if let Err(err) = layout.apply_layout(self.node) {
            tracing::warn!(tag = %self.tag, error = %err, "layout could not be applied");
        }
        self.invoke(LifecycleStage::Attached, |imp| imp.attached_callback());
        resources.add(self.clone());
        true
    }

    /// The node was removed from the document.
    ///
    /// Returns false if the element was not attached.
    pub fn detach(&self, resources: &Resources, performance: &dyn PerformanceMonitor) -> bool {
        if !self.transition(LifecycleEvent::Detach) {
            return false;
        }

        self.invoke(LifecycleStage::Detached, |imp| imp.detached_callback());
        resources.remove_element(self);
        performance.first_screen_resource_loaded(self.node);
        true
    }

    /// Forward an attribute mutation if the implementation observes it.
    ///
    /// Returns true if the callback was invoked.
    pub fn attribute_changed(&self, change: &AttributeChange) -> bool {
        let observed = match self.implementation.try_borrow() {
            Ok(imp) => imp
                .observed_attributes()
                .map_or(true, |names| names.iter().any(|name| *name == change.name)),
            Err(_) => {
                self.report_reentry(LifecycleStage::AttributeChanged);
                return false;
            }
        };
        if !observed {
            return false;
        }
        self.invoke(LifecycleStage::AttributeChanged, |imp| {
            imp.attribute_changed_callback(change)
        })
        .is_some()
    }

    /// Run the one-time build step.
    ///
    /// The element counts as built even if `build` fails; it is never
    /// retried. Returns true if `build` was invoked by this call.
    pub fn build(&self) -> bool {
        if self.built.replace(true) {
            return false;
        }
        tracing::debug!(tag = %self.tag, node = ?self.node, "building element");
        self.invoke(LifecycleStage::Build, |imp| imp.build());
        true
    }

    /// Viewport transition hook used by the scheduler.
    ///
    /// The first entry into the viewport runs `first_inview_callback` before
    /// `viewport_callback(true)`. Returns false if `in_viewport` matches the
    /// stored flag.
    pub fn set_in_viewport(&self, in_viewport: bool) -> bool {
        if self.in_viewport.replace(in_viewport) == in_viewport {
            return false;
        }
        tracing::trace!(tag = %self.tag, node = ?self.node, in_viewport, "viewport transition");

        if in_viewport && !self.first_in_viewport.replace(true) {
            self.invoke(LifecycleStage::FirstInview, |imp| imp.first_inview_callback());
        }
        self.invoke(LifecycleStage::Viewport, |imp| {
            imp.viewport_callback(in_viewport)
        });
        true
    }

    pub fn prerender_allowed(&self) -> bool {
        match self.implementation.try_borrow() {
            Ok(imp) => imp.prerender_allowed(),
            Err(_) => false,
        }
    }

    pub fn has_resources(&self) -> bool {
        match self.implementation.try_borrow() {
            Ok(imp) => imp.has_resources(),
            Err(_) => false,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    pub fn is_built(&self) -> bool {
        self.built.get()
    }

    pub fn in_viewport(&self) -> bool {
        self.in_viewport.get()
    }

    pub fn first_in_viewport(&self) -> bool {
        self.first_in_viewport.get()
    }

    /// Id in the scheduler's live set, while attached
    pub fn resource_id(&self) -> Option<ResourceId> {
        self.resource_id.get()
    }

    pub(crate) fn set_resource_id(&self, id: Option<ResourceId>) {
        self.resource_id.set(id);
    }

    fn transition(&self, event: LifecycleEvent) -> bool {
        let current = self.state.get();
        match current.on_event(event) {
            Some(next) => {
                tracing::debug!(tag = %self.tag, from = ?current, to = ?next, "lifecycle transition");
                self.state.set(next);
                true
            }
            None => {
                tracing::debug!(tag = %self.tag, state = ?current, ?event, "ignored lifecycle event");
                false
            }
        }
    }

    /// Run one callback with failure isolation.
    ///
    /// Returns None if the callback could not run or failed.
    fn invoke<F>(&self, stage: LifecycleStage, f: F) -> Option<()>
    where
        F: FnOnce(&mut dyn CustomElement) -> CallbackResult,
    {
        let Ok(mut imp) = self.implementation.try_borrow_mut() else {
            self.report_reentry(stage);
            return None;
        };
        match f(&mut **imp) {
            Ok(()) => Some(()),
            Err(err) => {
                let err = MipError::implementation(&self.tag, stage, err);
                tracing::warn!(node = ?self.node, error = %err, "element callback failed");
                None
            }
        }
    }

    fn report_reentry(&self, stage: LifecycleStage) {
        let err = MipError::Reentrant {
            tag: self.tag.clone(),
            stage,
        };
        tracing::warn!(node = ?self.node, error = %err, "element callback refused");
    }
}

impl fmt::Debug for ElementController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementController")
            .field("tag", &self.tag)
            .field("node", &self.node)
            .field("state", &self.state.get())
            .field("built", &self.built.get())
            .field("in_viewport", &self.in_viewport.get())
            .field("resource_id", &self.resource_id.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::FirstScreenTracker;
    use mip_core::EventLoop;
    use mip_platform::HeadlessPage;

    #[derive(Default)]
    struct Calls {
        log: RefCell<Vec<String>>,
    }

    struct Recorder {
        calls: Rc<Calls>,
        fail_build: bool,
        observed: Option<&'static [&'static str]>,
    }

    impl Recorder {
        fn push(&self, entry: impl Into<String>) {
            self.calls.log.borrow_mut().push(entry.into());
        }
    }

    impl CustomElement for Recorder {
        fn created_callback(&mut self) -> CallbackResult {
            self.push("created");
            Ok(())
        }

        fn build(&mut self) -> CallbackResult {
            self.push("build");
            if self.fail_build {
                anyhow::bail!("broken template");
            }
            Ok(())
        }

        fn first_inview_callback(&mut self) -> CallbackResult {
            self.push("first_inview");
            Ok(())
        }

        fn viewport_callback(&mut self, in_viewport: bool) -> CallbackResult {
            self.push(format!("viewport:{in_viewport}"));
            Ok(())
        }

        fn attribute_changed_callback(&mut self, change: &AttributeChange) -> CallbackResult {
            self.push(format!("attr:{}", change.name));
            Ok(())
        }

        fn has_resources(&self) -> bool {
            true
        }

        fn observed_attributes(&self) -> Option<&[&'static str]> {
            self.observed
        }
    }

    fn controller(
        fail_build: bool,
        observed: Option<&'static [&'static str]>,
    ) -> (Rc<ElementController>, Rc<Calls>, Rc<FirstScreenTracker>) {
        let page = Rc::new(HeadlessPage::new(375.0, 667.0));
        let node = page.create_element("mip-recorder");
        let tracker = Rc::new(FirstScreenTracker::new(&EventLoop::manual()));
        let host = ElementHost::new(node, "mip-recorder".to_string(), page, tracker.clone());
        let calls = Rc::new(Calls::default());
        let recorder = Recorder {
            calls: calls.clone(),
            fail_build,
            observed,
        };
        let controller = ElementController::create(&host, Box::new(recorder), tracker.as_ref());
        (controller, calls, tracker)
    }

    #[test]
    fn test_lifecycle_transitions() {
        use LifecycleEvent::*;
        use LifecycleState::*;

        assert_eq!(Created.on_event(Attach), Some(Attached));
        assert_eq!(Attached.on_event(Detach), Some(Detached));
        assert_eq!(Detached.on_event(Attach), Some(Attached));
        assert_eq!(Created.on_event(Detach), None);
        assert_eq!(Attached.on_event(Attach), None);
        assert_eq!(Detached.on_event(Detach), None);
        assert!(Attached.is_attached());
    }

    #[test]
    fn test_create_registers_first_screen_candidate() {
        let (controller, calls, tracker) = controller(false, None);
        assert_eq!(*calls.log.borrow(), vec!["created"]);
        assert_eq!(controller.state(), LifecycleState::Created);
        assert!(tracker.is_pending(controller.node()));
    }

    #[test]
    fn test_build_runs_once_even_when_failing() {
        let (controller, calls, _tracker) = controller(true, None);
        assert!(controller.build());
        assert!(controller.is_built());
        assert!(!controller.build());
        assert!(!controller.build());
        let builds = calls.log.borrow().iter().filter(|c| *c == "build").count();
        assert_eq!(builds, 1);
    }

    #[test]
    fn test_first_inview_precedes_viewport_and_fires_once() {
        let (controller, calls, _tracker) = controller(false, None);
        assert!(!controller.set_in_viewport(false));
        assert!(controller.set_in_viewport(true));
        assert!(!controller.set_in_viewport(true));
        assert!(controller.set_in_viewport(false));
        assert!(controller.set_in_viewport(true));

        assert_eq!(
            *calls.log.borrow(),
            vec![
                "created",
                "first_inview",
                "viewport:true",
                "viewport:false",
                "viewport:true"
            ]
        );
        assert!(controller.first_in_viewport());
    }

    #[test]
    fn test_observed_attribute_filter() {
        let (controller, calls, _tracker) = controller(false, Some(&["src"]));
        let change = |name: &str| AttributeChange {
            name: name.to_string(),
            old_value: None,
            new_value: Some("x".to_string()),
        };

        assert!(controller.attribute_changed(&change("src")));
        assert!(!controller.attribute_changed(&change("alt")));
        assert_eq!(*calls.log.borrow(), vec!["created", "attr:src"]);
    }

    #[test]
    fn test_all_attributes_forwarded_by_default() {
        let (controller, calls, _tracker) = controller(false, None);
        controller.attribute_changed(&AttributeChange {
            name: "data-anything".to_string(),
            old_value: Some("a".to_string()),
            new_value: None,
        });
        assert_eq!(*calls.log.borrow(), vec!["created", "attr:data-anything"]);
    }
}
