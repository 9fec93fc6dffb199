//! Headless page
//!
//! An in-memory host: nodes carry an explicit page rectangle instead of being
//! laid out, the viewport is a fixed-size window over a scrollable page, and
//! stylesheets are kept as an ordered list.

use std::cell::RefCell;
use std::fmt;

use mip_core::Rect;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::document::{Document, NodeId};
use crate::error::{PlatformError, Result};
use crate::geometry::GeometryProvider;
use crate::style::StyleHost;

#[derive(Debug, Default)]
struct NodeData {
    tag: String,
    attributes: FxHashMap<String, String>,
    classes: SmallVec<[String; 4]>,
    styles: FxHashMap<String, String>,
    rect: Option<Rect>,
    connected: bool,
    /// Forces geometry queries for this node to fail
    geometry_broken: bool,
}

#[derive(Debug)]
struct PageState {
    nodes: SlotMap<NodeId, NodeData>,
    /// Connected nodes in insertion order
    order: Vec<NodeId>,
    viewport_width: f64,
    viewport_height: f64,
    content_height: f64,
    scroll_left: f64,
    scroll_top: f64,
    /// (name, css) in document order
    styles: Vec<(String, String)>,
    viewport_broken: bool,
}

/// In-memory implementation of every host collaborator
pub struct HeadlessPage {
    state: RefCell<PageState>,
}

impl HeadlessPage {
    /// Create a page with the given viewport size
    pub fn new(viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            state: RefCell::new(PageState {
                nodes: SlotMap::with_key(),
                order: Vec::new(),
                viewport_width,
                viewport_height,
                content_height: 0.0,
                scroll_left: 0.0,
                scroll_top: 0.0,
                styles: Vec::new(),
                viewport_broken: false,
            }),
        }
    }

    /// Create a detached element
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.state.borrow_mut().nodes.insert(NodeData {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        })
    }

    /// Position the node on the page
    pub fn set_rect(&self, node: NodeId, rect: Rect) {
        let mut state = self.state.borrow_mut();
        if let Some(data) = state.nodes.get_mut(node) {
            data.rect = Some(rect);
        }
        state.content_height = state.content_height.max(rect.bottom());
    }

    /// Insert the node into the document.
    ///
    /// Returns false if the node is unknown or already connected.
    pub fn connect(&self, node: NodeId) -> bool {
        let mut state = self.state.borrow_mut();
        match state.nodes.get_mut(node) {
            Some(data) if !data.connected => data.connected = true,
            _ => return false,
        }
        state.order.push(node);
        true
    }

    /// Remove the node from the document, keeping its data.
    ///
    /// Returns false if the node is unknown or not connected.
    pub fn disconnect(&self, node: NodeId) -> bool {
        let mut state = self.state.borrow_mut();
        match state.nodes.get_mut(node) {
            Some(data) if data.connected => data.connected = false,
            _ => return false,
        }
        state.order.retain(|entry| *entry != node);
        true
    }

    pub fn set_viewport_size(&self, width: f64, height: f64) {
        let mut state = self.state.borrow_mut();
        state.viewport_width = width;
        state.viewport_height = height;
    }

    /// Set the scroll offsets directly, without clamping
    pub fn set_scroll(&self, left: f64, top: f64) {
        let mut state = self.state.borrow_mut();
        state.scroll_left = left;
        state.scroll_top = top;
    }

    pub fn set_content_height(&self, height: f64) {
        self.state.borrow_mut().content_height = height;
    }

    /// Make geometry queries for `node` fail until restored
    pub fn break_geometry(&self, node: NodeId, broken: bool) {
        if let Some(data) = self.state.borrow_mut().nodes.get_mut(node) {
            data.geometry_broken = broken;
        }
    }

    /// Make viewport queries fail until restored
    pub fn break_viewport(&self, broken: bool) {
        self.state.borrow_mut().viewport_broken = broken;
    }

    pub fn classes(&self, node: NodeId) -> Vec<String> {
        self.state
            .borrow()
            .nodes
            .get(node)
            .map(|data| data.classes.to_vec())
            .unwrap_or_default()
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.state
            .borrow()
            .nodes
            .get(node)
            .and_then(|data| data.styles.get(property).cloned())
    }

    /// Stylesheet names in document order
    pub fn style_names(&self) -> Vec<String> {
        self.state
            .borrow()
            .styles
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Text of the stylesheet tagged `name`
    pub fn style_text(&self, name: &str) -> Option<String> {
        self.state
            .borrow()
            .styles
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, css)| css.clone())
    }

    fn with_node<R>(&self, node: NodeId, f: impl FnOnce(&mut NodeData) -> R) -> Result<R> {
        let mut state = self.state.borrow_mut();
        let data = state
            .nodes
            .get_mut(node)
            .ok_or(PlatformError::UnknownNode(node))?;
        Ok(f(data))
    }
}

impl Document for HeadlessPage {
    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.state.borrow().nodes.get(node).map(|data| data.tag.clone())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.state
            .borrow()
            .nodes
            .get(node)
            .and_then(|data| data.attributes.get(name).cloned())
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<Option<String>> {
        self.with_node(node, |data| {
            data.attributes.insert(name.to_string(), value.to_string())
        })
    }

    fn add_class(&self, node: NodeId, class: &str) -> Result<()> {
        self.with_node(node, |data| {
            if !data.classes.iter().any(|existing| existing == class) {
                data.classes.push(class.to_string());
            }
        })
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.state
            .borrow()
            .nodes
            .get(node)
            .is_some_and(|data| data.classes.iter().any(|existing| existing == class))
    }

    fn set_style(&self, node: NodeId, property: &str, value: &str) -> Result<()> {
        self.with_node(node, |data| {
            data.styles.insert(property.to_string(), value.to_string());
        })
    }

    fn nodes_with_tag(&self, tag: &str) -> Vec<NodeId> {
        let state = self.state.borrow();
        state
            .order
            .iter()
            .copied()
            .filter(|node| {
                state
                    .nodes
                    .get(*node)
                    .is_some_and(|data| data.tag.eq_ignore_ascii_case(tag))
            })
            .collect()
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.state
            .borrow()
            .nodes
            .get(node)
            .is_some_and(|data| data.connected)
    }
}

impl GeometryProvider for HeadlessPage {
    fn element_rect(&self, node: NodeId) -> Result<Rect> {
        let state = self.state.borrow();
        let data = state
            .nodes
            .get(node)
            .ok_or(PlatformError::UnknownNode(node))?;
        if !data.connected {
            return Err(PlatformError::Detached(node));
        }
        if data.geometry_broken {
            return Err(PlatformError::GeometryUnavailable(format!(
                "<{}> has no layout box",
                data.tag
            )));
        }
        data.rect.ok_or_else(|| {
            PlatformError::GeometryUnavailable(format!("<{}> was never positioned", data.tag))
        })
    }

    fn viewport_rect(&self) -> Result<Rect> {
        let state = self.state.borrow();
        if state.viewport_broken {
            return Err(PlatformError::GeometryUnavailable(
                "viewport is not measurable".to_string(),
            ));
        }
        Ok(Rect::new(
            state.scroll_left,
            state.scroll_top,
            state.viewport_width,
            state.viewport_height,
        ))
    }

    fn scroll_top(&self) -> f64 {
        self.state.borrow().scroll_top
    }

    fn scroll_left(&self) -> f64 {
        self.state.borrow().scroll_left
    }

    fn scroll_height(&self) -> f64 {
        let state = self.state.borrow();
        state.content_height.max(state.viewport_height)
    }

    fn scroll_to(&self, left: f64, top: f64) {
        let max_top = (self.scroll_height() - self.state.borrow().viewport_height).max(0.0);
        let mut state = self.state.borrow_mut();
        state.scroll_left = left.max(0.0);
        state.scroll_top = top.clamp(0.0, max_top);
    }
}

impl StyleHost for HeadlessPage {
    fn insert_style(&self, name: &str, css: &str, after: Option<&str>) {
        let mut state = self.state.borrow_mut();
        let index = after
            .and_then(|anchor| state.styles.iter().position(|(entry, _)| entry == anchor))
            .map_or(0, |position| position + 1);
        state.styles.insert(index, (name.to_string(), css.to_string()));
        tracing::trace!(name, index, "stylesheet inserted");
    }

    fn has_style(&self, name: &str) -> bool {
        self.state
            .borrow()
            .styles
            .iter()
            .any(|(entry, _)| entry == name)
    }
}

impl fmt::Debug for HeadlessPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("HeadlessPage")
            .field("nodes", &state.nodes.len())
            .field("connected", &state.order.len())
            .field("scroll_top", &state.scroll_top)
            .field("styles", &state.styles.len())
            .finish()
    }
}
