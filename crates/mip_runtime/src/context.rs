//! Runtime context
//!
//! [`MipContext`] owns everything that would otherwise be page-global: the
//! element registry, the viewport tracker, the lazily created resource
//! scheduler and the controllers of every upgraded node. The host creates one
//! per page and forwards its DOM and input notifications to it.

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use mip_core::EventLoop;
use mip_platform::{Document, GeometryProvider, NodeId, StyleHost};
use rustc_hash::FxHashMap;

use crate::config::MipConfig;
use crate::element::{AttributeChange, CustomElement, ElementController, ElementHost};
use crate::error::{MipError, Result};
use crate::layout::{LayoutApplier, StandardLayout};
use crate::performance::{FirstScreenTracker, PerformanceMonitor};
use crate::registry::{ElementDefinition, ElementRegistry};
use crate::resources::Resources;
use crate::viewport::Viewport;

/// Per-page element runtime
pub struct MipContext {
    config: MipConfig,
    event_loop: EventLoop,
    document: Rc<dyn Document>,
    geometry: Rc<dyn GeometryProvider>,
    styles: Rc<dyn StyleHost>,
    layout: Rc<dyn LayoutApplier>,
    performance: Rc<dyn PerformanceMonitor>,
    viewport: Rc<Viewport>,
    registry: RefCell<ElementRegistry>,
    resources: OnceCell<Rc<Resources>>,
    elements: RefCell<FxHashMap<NodeId, Rc<ElementController>>>,
}

impl MipContext {
    /// Create a context over a host implementing every collaborator.
    ///
    /// Fails only if `config` does not validate.
    pub fn new<H>(config: MipConfig, event_loop: &EventLoop, host: Rc<H>) -> Result<Self>
    where
        H: Document + GeometryProvider + StyleHost + 'static,
    {
        config.validate()?;

        let document: Rc<dyn Document> = host.clone();
        let geometry: Rc<dyn GeometryProvider> = host.clone();
        let styles: Rc<dyn StyleHost> = host;
        let viewport = Viewport::new(event_loop, geometry.clone(), &config);

        tracing::debug!(?config, "mip context created");
        Ok(Self {
            layout: Rc::new(StandardLayout::new(document.clone())),
            performance: Rc::new(FirstScreenTracker::new(event_loop)),
            config,
            event_loop: event_loop.clone(),
            document,
            geometry,
            styles,
            viewport,
            registry: RefCell::new(ElementRegistry::new()),
            resources: OnceCell::new(),
            elements: RefCell::new(FxHashMap::default()),
        })
    }

    /// Replace the layout collaborator
    pub fn with_layout(mut self, layout: Rc<dyn LayoutApplier>) -> Self {
        self.layout = layout;
        self
    }

    /// Replace the performance collaborator
    pub fn with_performance(mut self, performance: Rc<dyn PerformanceMonitor>) -> Self {
        self.performance = performance;
        self
    }

    /// Define a custom element type.
    ///
    /// Installs the stylesheet after the main runtime stylesheet, creates the
    /// resource scheduler on first use and upgrades connected nodes that
    /// already carry the tag. Returns false, with no other effect, if the tag
    /// is already defined.
    pub fn register_element_type<F>(&self, name: &str, factory: F, style: &str) -> bool
    where
        F: Fn(&ElementHost) -> Box<dyn CustomElement> + 'static,
    {
        let name = name.to_ascii_lowercase();
        let registered = self
            .registry
            .borrow_mut()
            .register(&name, Rc::new(factory), style);
        if !registered {
            tracing::debug!(error = %MipError::DuplicateRegistration(name), "registration ignored");
            return false;
        }

        if !style.is_empty() {
            let main = self.config.main_style_name.as_str();
            let after = (!main.is_empty()).then_some(main);
            self.styles.insert_style(&name, style, after);
        }
        self.ensure_resources();
        tracing::debug!(tag = %name, "element type registered");

        for node in self.document.nodes_with_tag(&name) {
            self.node_inserted(node);
        }
        true
    }

    /// The host inserted `node` into the document.
    ///
    /// Returns true if a registered element was attached.
    pub fn node_inserted(&self, node: NodeId) -> bool {
        let Some(resources) = self.resources.get().cloned() else {
            return false;
        };
        let element = match self.element(node) {
            Some(element) => element,
            None => {
                let Some(tag) = self.document.tag_name(node) else {
                    return false;
                };
                let definition = self.registry.borrow().get(&tag).cloned();
                let Some(definition) = definition else {
                    return false;
                };
                let element = self.create_element(node, &definition);
                self.elements.borrow_mut().insert(node, element.clone());
                element
            }
        };
        element.attach(self.layout.as_ref(), &resources)
    }

    /// The host removed `node` from the document.
    ///
    /// The controller is kept, so a later re-insertion reuses it.
    pub fn node_removed(&self, node: NodeId) -> bool {
        let (Some(element), Some(resources)) = (self.element(node), self.resources.get()) else {
            return false;
        };
        element.detach(resources, self.performance.as_ref())
    }

    /// Forward an attribute mutation to the node's implementation
    pub fn attribute_changed(
        &self,
        node: NodeId,
        name: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) -> bool {
        let Some(element) = self.element(node) else {
            return false;
        };
        element.attribute_changed(&AttributeChange {
            name: name.to_string(),
            old_value: old_value.map(str::to_string),
            new_value: new_value.map(str::to_string),
        })
    }

    /// Native scroll tick on the scrolling context
    pub fn handle_scroll(&self) {
        self.viewport.handle_scroll();
    }

    /// Native resize of the viewport
    pub fn handle_resize(&self) {
        self.viewport.handle_resize();
    }

    /// Swipe gesture ended with `velocity` px/ms
    pub fn handle_swipe(&self, velocity: f64) {
        if let Some(resources) = self.resources.get() {
            resources.on_swipe(velocity);
        }
    }

    /// The host finished parsing the document
    pub fn mark_dom_loaded(&self) {
        self.performance.dom_loaded();
    }

    /// Force the node's element into the in-viewport state.
    ///
    /// Only attached elements can be prerendered.
    pub fn prerender(&self, node: NodeId) -> bool {
        match (self.element(node), self.resources.get()) {
            (Some(element), Some(resources)) => resources.prerender_element(&element),
            _ => false,
        }
    }

    pub fn element(&self, node: NodeId) -> Option<Rc<ElementController>> {
        self.elements.borrow().get(&node).cloned()
    }

    pub fn element_count(&self) -> usize {
        self.elements.borrow().len()
    }

    pub fn viewport(&self) -> &Rc<Viewport> {
        &self.viewport
    }

    /// The scheduler, once the first element type is registered
    pub fn resources(&self) -> Option<&Rc<Resources>> {
        self.resources.get()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.borrow().is_registered(name)
    }

    pub fn registered_names(&self) -> Vec<String> {
        self.registry.borrow().names().to_vec()
    }

    pub fn definition(&self, name: &str) -> Option<ElementDefinition> {
        self.registry.borrow().get(name).cloned()
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    pub fn config(&self) -> &MipConfig {
        &self.config
    }

    pub fn document(&self) -> &Rc<dyn Document> {
        &self.document
    }

    pub fn performance(&self) -> &Rc<dyn PerformanceMonitor> {
        &self.performance
    }

    fn ensure_resources(&self) -> &Rc<Resources> {
        self.resources.get_or_init(|| {
            tracing::debug!("creating resource scheduler");
            let resources = Resources::new(&self.event_loop, self.geometry.clone(), &self.config);
            resources.bind_viewport(&self.viewport);
            resources
        })
    }

    fn create_element(&self, node: NodeId, definition: &ElementDefinition) -> Rc<ElementController> {
        let host = ElementHost::new(
            node,
            definition.name().to_string(),
            self.document.clone(),
            self.performance.clone(),
        );
        let implementation = definition.instantiate(&host);
        ElementController::create(&host, implementation, self.performance.as_ref())
    }
}

impl fmt::Debug for MipContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MipContext")
            .field("registry", &self.registry.borrow())
            .field("elements", &self.element_count())
            .field("resources", &self.resources.get())
            .field("viewport", &self.viewport)
            .finish()
    }
}
