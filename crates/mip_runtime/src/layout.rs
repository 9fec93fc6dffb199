//! Layout collaborator
//!
//! Element sizing is declared in markup through the `layout`, `width` and
//! `height` attributes. Applying a layout only touches classes and inline
//! styles; actual box layout is the host's business.
//!
//! | layout         | classes                                  | styles             |
//! |----------------|------------------------------------------|--------------------|
//! | `nodisplay`    | `mip-layout-nodisplay`                   | `display: none`    |
//! | `fixed`        | `mip-layout-fixed`, size-defined         | `width`, `height`  |
//! | `fixed-height` | `mip-layout-fixed-height`, size-defined  | `height`           |
//! | `responsive`   | `mip-layout-responsive`, size-defined    | `padding-top: n%`  |
//! | `fill`         | `mip-layout-fill`, size-defined          |                    |
//! | `container`    | `mip-layout-container`                   |                    |
//! | `flex-item`    | `mip-layout-flex-item`, size-defined     |                    |

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use mip_platform::{Document, NodeId, Result};
use rustc_hash::FxHashMap;

/// Class added to every element whose box size is known from markup
pub const SIZE_DEFINED_CLASS: &str = "mip-layout-size-defined";

/// Declared layout of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    NoDisplay,
    Fixed,
    FixedHeight,
    Responsive,
    Fill,
    Container,
    FlexItem,
}

impl Layout {
    pub fn parse(name: &str) -> Option<Layout> {
        match name.trim().to_ascii_lowercase().as_str() {
            "nodisplay" => Some(Layout::NoDisplay),
            "fixed" => Some(Layout::Fixed),
            "fixed-height" => Some(Layout::FixedHeight),
            "responsive" => Some(Layout::Responsive),
            "fill" => Some(Layout::Fill),
            "container" => Some(Layout::Container),
            "flex-item" => Some(Layout::FlexItem),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Layout::NoDisplay => "nodisplay",
            Layout::Fixed => "fixed",
            Layout::FixedHeight => "fixed-height",
            Layout::Responsive => "responsive",
            Layout::Fill => "fill",
            Layout::Container => "container",
            Layout::FlexItem => "flex-item",
        }
    }

    pub fn class_name(&self) -> String {
        format!("mip-layout-{}", self.name())
    }

    /// Returns true if the element's size does not depend on its content
    pub fn is_size_defined(&self) -> bool {
        matches!(
            self,
            Layout::Fixed
                | Layout::FixedHeight
                | Layout::Responsive
                | Layout::Fill
                | Layout::FlexItem
        )
    }

    /// Layout implied by the attributes when `layout` is absent
    pub fn infer(width: Option<&str>, height: Option<&str>) -> Layout {
        match (width, height) {
            (Some(_), Some(_)) => Layout::Fixed,
            (None, Some(_)) => Layout::FixedHeight,
            _ => Layout::Container,
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse a length attribute: a bare number or a number with a `px` suffix
pub fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number.parse::<f64>().ok().filter(|n| n.is_finite() && *n >= 0.0)
}

/// Sizing step run on an element before it joins the scheduler
pub trait LayoutApplier {
    /// Apply the element's declared layout. Must be idempotent.
    fn apply_layout(&self, node: NodeId) -> Result<Layout>;
}

/// Class and inline-style based layout
pub struct StandardLayout {
    document: Rc<dyn Document>,
    applied: RefCell<FxHashMap<NodeId, Layout>>,
}

impl StandardLayout {
    pub fn new(document: Rc<dyn Document>) -> Self {
        Self {
            document,
            applied: RefCell::new(FxHashMap::default()),
        }
    }

    /// Layout previously applied to `node`
    pub fn applied(&self, node: NodeId) -> Option<Layout> {
        self.applied.borrow().get(&node).copied()
    }

    fn resolve(&self, node: NodeId) -> Layout {
        let width = self.document.attribute(node, "width");
        let height = self.document.attribute(node, "height");

        let declared = match self.document.attribute(node, "layout") {
            Some(name) => Layout::parse(&name).unwrap_or_else(|| {
                tracing::warn!(node = ?node, layout = %name, "unknown layout, using container");
                Layout::Container
            }),
            None => Layout::infer(width.as_deref(), height.as_deref()),
        };

        let width = width.as_deref().and_then(parse_length);
        let height = height.as_deref().and_then(parse_length);
        let complete = match declared {
            Layout::Fixed | Layout::Responsive => width.is_some() && height.is_some(),
            Layout::FixedHeight => height.is_some(),
            _ => true,
        };
        if complete {
            declared
        } else {
            tracing::warn!(node = ?node, layout = %declared, "layout is missing its dimensions, using container");
            Layout::Container
        }
    }
}

impl LayoutApplier for StandardLayout {
    fn apply_layout(&self, node: NodeId) -> Result<Layout> {
        if let Some(layout) = self.applied(node) {
            return Ok(layout);
        }

        let layout = self.resolve(node);
        let doc = &self.document;
        doc.add_class(node, &layout.class_name())?;
        if layout.is_size_defined() {
            doc.add_class(node, SIZE_DEFINED_CLASS)?;
        }

        let length = |name: &str| doc.attribute(node, name).as_deref().and_then(parse_length);
        match layout {
            Layout::NoDisplay => doc.set_style(node, "display", "none")?,
            Layout::Fixed => {
                if let (Some(width), Some(height)) = (length("width"), length("height")) {
                    doc.set_style(node, "width", &format!("{width}px"))?;
                    doc.set_style(node, "height", &format!("{height}px"))?;
                }
            }
            Layout::FixedHeight => {
                if let Some(height) = length("height") {
                    doc.set_style(node, "height", &format!("{height}px"))?;
                }
            }
            Layout::Responsive => {
                if let (Some(width), Some(height)) = (length("width"), length("height")) {
                    if width > 0.0 {
                        let ratio = height / width * 100.0;
                        doc.set_style(node, "padding-top", &format!("{ratio}%"))?;
                    }
                }
            }
            Layout::Fill | Layout::Container | Layout::FlexItem => {}
        }

        tracing::debug!(node = ?node, %layout, "layout applied");
        self.applied.borrow_mut().insert(node, layout);
        Ok(layout)
    }
}

impl fmt::Debug for StandardLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardLayout")
            .field("applied", &self.applied.borrow().len())
            .finish()
    }
}
