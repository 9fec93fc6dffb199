//! Geometry queries

use mip_core::Rect;

use crate::document::NodeId;
use crate::error::Result;

/// Page geometry of the host
///
/// Rectangles are page-absolute. The scrolling context may be the document
/// itself or an inner scroll container, depending on the host; the runtime
/// only ever sees the designated one.
pub trait GeometryProvider {
    /// Bounding rectangle of an element, adjusted for scroll
    fn element_rect(&self, node: NodeId) -> Result<Rect>;

    /// Visible viewport: scroll offset plus viewport size
    fn viewport_rect(&self) -> Result<Rect>;

    fn scroll_top(&self) -> f64;

    fn scroll_left(&self) -> f64;

    /// Total scrollable height of the scrolling context
    fn scroll_height(&self) -> f64;

    /// Move the scrolling context
    fn scroll_to(&self, left: f64, top: f64);
}
