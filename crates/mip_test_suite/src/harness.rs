//! Scenario harness
//!
//! Provides the fixture every scenario runs against:
//! - a headless page with a scrollable viewport
//! - a manual event loop, so timing is exact and reproducible
//! - a context with traced element types whose callbacks land in one log

use anyhow::{anyhow, bail, Context, Result};
use mip_core::{EventLoop, Rect};
use mip_platform::{Document, HeadlessPage, NodeId};
use mip_runtime::{
    AttributeChange, CallbackResult, CustomElement, ElementController, ElementHost, MipConfig,
    MipContext, Resources,
};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Result of a scenario
#[derive(Debug)]
pub enum TestResult {
    /// Scenario passed
    Passed,
    /// Scenario failed with a reason
    Failed { reason: String },
}

impl TestResult {
    pub fn is_passed(&self) -> bool {
        matches!(self, TestResult::Passed)
    }
}

/// Element callbacks recorded by the trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Callback {
    Created,
    Attached,
    Detached,
    AttributeChanged,
    Build,
    FirstInview,
    Viewport(bool),
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Created => f.write_str("created"),
            Callback::Attached => f.write_str("attached"),
            Callback::Detached => f.write_str("detached"),
            Callback::AttributeChanged => f.write_str("attribute_changed"),
            Callback::Build => f.write_str("build"),
            Callback::FirstInview => f.write_str("first_inview"),
            Callback::Viewport(in_viewport) => write!(f, "viewport({in_viewport})"),
        }
    }
}

/// One recorded callback
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    /// Loop time of the call
    pub at: Duration,
    /// `id` attribute of the element
    pub label: String,
    pub callback: Callback,
}

/// Per-element behaviour switches, read from attributes at creation
#[derive(Debug, Clone, Default)]
pub struct Behaviour {
    /// `data-fail-build`
    pub fail_build: bool,
    /// `data-fail-viewport`
    pub fail_viewport: bool,
    /// `data-prerender`
    pub prerender: bool,
}

impl Behaviour {
    fn from_host(host: &ElementHost) -> Self {
        Self {
            fail_build: host.attribute("data-fail-build").is_some(),
            fail_viewport: host.attribute("data-fail-viewport").is_some(),
            prerender: host.attribute("data-prerender").is_some(),
        }
    }
}

type Trace = Rc<RefCell<Vec<TraceEntry>>>;

/// Element implementation that records its callbacks
struct TracedElement {
    label: String,
    behaviour: Behaviour,
    event_loop: EventLoop,
    trace: Trace,
    hook: Option<ViewportHook>,
}

/// Runs inside a traced element's `viewport_callback`
pub type ViewportHook = Rc<dyn Fn(bool)>;

impl TracedElement {
    fn record(&self, callback: Callback) {
        self.trace.borrow_mut().push(TraceEntry {
            at: self.event_loop.now(),
            label: self.label.clone(),
            callback,
        });
    }
}

impl CustomElement for TracedElement {
    fn created_callback(&mut self) -> CallbackResult {
        self.record(Callback::Created);
        Ok(())
    }

    fn attached_callback(&mut self) -> CallbackResult {
        self.record(Callback::Attached);
        Ok(())
    }

    fn detached_callback(&mut self) -> CallbackResult {
        self.record(Callback::Detached);
        Ok(())
    }

    fn attribute_changed_callback(&mut self, _change: &AttributeChange) -> CallbackResult {
        self.record(Callback::AttributeChanged);
        Ok(())
    }

    fn build(&mut self) -> CallbackResult {
        self.record(Callback::Build);
        anyhow::ensure!(!self.behaviour.fail_build, "{} refuses to build", self.label);
        Ok(())
    }

    fn first_inview_callback(&mut self) -> CallbackResult {
        self.record(Callback::FirstInview);
        Ok(())
    }

    fn viewport_callback(&mut self, in_viewport: bool) -> CallbackResult {
        self.record(Callback::Viewport(in_viewport));
        if let Some(hook) = &self.hook {
            hook(in_viewport);
        }
        anyhow::ensure!(
            !self.behaviour.fail_viewport,
            "{} refuses viewport updates",
            self.label
        );
        Ok(())
    }

    fn prerender_allowed(&self) -> bool {
        self.behaviour.prerender
    }
}

/// Fixture for one scenario
pub struct ScenarioHarness {
    name: String,
    event_loop: EventLoop,
    page: Rc<HeadlessPage>,
    context: Rc<MipContext>,
    trace: Trace,
    hooks: Rc<RefCell<FxHashMap<String, ViewportHook>>>,
    nodes: FxHashMap<String, NodeId>,
}

impl ScenarioHarness {
    /// Viewport width of the default page
    pub const WIDTH: f64 = 375.0;
    /// Viewport height of the default page
    pub const HEIGHT: f64 = 667.0;

    pub fn new(name: &str) -> Result<Self> {
        Self::with_config(name, MipConfig::default())
    }

    pub fn with_config(name: &str, config: MipConfig) -> Result<Self> {
        let event_loop = EventLoop::manual();
        let page = Rc::new(HeadlessPage::new(Self::WIDTH, Self::HEIGHT));
        page.set_content_height(20_000.0);

        let context = MipContext::new(config, &event_loop, page.clone())
            .with_context(|| format!("creating context for {name}"))?;

        Ok(Self {
            name: name.to_string(),
            event_loop,
            page,
            context: Rc::new(context),
            trace: Trace::default(),
            hooks: Rc::new(RefCell::new(FxHashMap::default())),
            nodes: FxHashMap::default(),
        })
    }

    /// Register a traced element type
    pub fn register(&self, tag: &str) -> bool {
        self.register_with_style(tag, &format!("{tag} {{ display: block }}"))
    }

    pub fn register_with_style(&self, tag: &str, style: &str) -> bool {
        let event_loop = self.event_loop.clone();
        let trace = self.trace.clone();
        let hooks = self.hooks.clone();
        self.context.register_element_type(
            tag,
            move |host: &ElementHost| {
                let label = host.attribute("id").unwrap_or_default();
                let element = TracedElement {
                    behaviour: Behaviour::from_host(host),
                    event_loop: event_loop.clone(),
                    trace: trace.clone(),
                    hook: hooks.borrow().get(&label).cloned(),
                    label,
                };
                Box::new(element) as Box<dyn CustomElement>
            },
            style,
        )
    }

    /// Install a hook for the element labelled `id`; must precede its creation
    pub fn on_viewport(&self, id: &str, hook: impl Fn(bool) + 'static) {
        self.hooks.borrow_mut().insert(id.to_string(), Rc::new(hook));
    }

    /// Create a positioned node without inserting it
    pub fn create(
        &mut self,
        tag: &str,
        id: &str,
        rect: Rect,
        attrs: &[(&str, &str)],
    ) -> Result<NodeId> {
        if self.nodes.contains_key(id) {
            bail!("duplicate node id {id}");
        }
        let node = self.page.create_element(tag);
        self.page.set_attribute(node, "id", id)?;
        for (name, value) in attrs {
            self.page.set_attribute(node, name, value)?;
        }
        self.page.set_rect(node, rect);
        self.nodes.insert(id.to_string(), node);
        Ok(node)
    }

    /// Create a node, connect it and notify the context
    pub fn insert(
        &mut self,
        tag: &str,
        id: &str,
        rect: Rect,
        attrs: &[(&str, &str)],
    ) -> Result<NodeId> {
        let node = self.create(tag, id, rect, attrs)?;
        self.connect(id)?;
        Ok(node)
    }

    /// Connect an existing node and notify the context
    pub fn connect(&self, id: &str) -> Result<bool> {
        let node = self.node(id)?;
        self.page.connect(node);
        Ok(self.context.node_inserted(node))
    }

    /// Disconnect a node and notify the context
    pub fn disconnect(&self, id: &str) -> Result<bool> {
        let node = self.node(id)?;
        self.page.disconnect(node);
        Ok(self.context.node_removed(node))
    }

    /// Move the scrolling context and deliver one scroll tick
    pub fn scroll(&self, top: f64) {
        self.page.set_scroll(0.0, top);
        self.context.handle_scroll();
    }

    /// Scroll, then give the viewport time to settle and recompute
    pub fn scroll_and_settle(&self, top: f64) {
        self.scroll(top);
        self.advance_ms(100);
    }

    pub fn advance(&self, delta: Duration) -> usize {
        self.event_loop.advance(delta)
    }

    pub fn advance_ms(&self, millis: u64) -> usize {
        self.advance(Duration::from_millis(millis))
    }

    pub fn now(&self) -> Duration {
        self.event_loop.now()
    }

    pub fn node(&self, id: &str) -> Result<NodeId> {
        self.nodes
            .get(id)
            .copied()
            .ok_or_else(|| anyhow!("no node with id {id}"))
    }

    pub fn element(&self, id: &str) -> Result<Rc<ElementController>> {
        let node = self.node(id)?;
        self.context
            .element(node)
            .ok_or_else(|| anyhow!("{id} was never upgraded"))
    }

    pub fn in_viewport(&self, id: &str) -> Result<bool> {
        Ok(self.element(id)?.in_viewport())
    }

    pub fn resources(&self) -> Result<&Rc<Resources>> {
        self.context
            .resources()
            .ok_or_else(|| anyhow!("no element type registered yet"))
    }

    /// Callbacks recorded for the element labelled `id`
    pub fn calls(&self, id: &str) -> Vec<Callback> {
        self.trace
            .borrow()
            .iter()
            .filter(|entry| entry.label == id)
            .map(|entry| entry.callback)
            .collect()
    }

    pub fn count(&self, id: &str, callback: Callback) -> usize {
        self.calls(id).into_iter().filter(|c| *c == callback).count()
    }

    /// Loop times at which `callback` ran for `id`
    pub fn times(&self, id: &str, callback: Callback) -> Vec<Duration> {
        self.trace
            .borrow()
            .iter()
            .filter(|entry| entry.label == id && entry.callback == callback)
            .map(|entry| entry.at)
            .collect()
    }

    pub fn trace(&self) -> Vec<TraceEntry> {
        self.trace.borrow().clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn page(&self) -> &Rc<HeadlessPage> {
        &self.page
    }

    pub fn context(&self) -> &Rc<MipContext> {
        &self.context
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }
}

impl fmt::Debug for ScenarioHarness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioHarness")
            .field("name", &self.name)
            .field("now", &self.event_loop.now())
            .field("nodes", &self.nodes.len())
            .field("trace", &self.trace.borrow().len())
            .finish()
    }
}

/// A full-width row of `height` starting at `top`
pub fn row(top: f64, height: f64) -> Rect {
    Rect::new(0.0, top, ScenarioHarness::WIDTH, height)
}
