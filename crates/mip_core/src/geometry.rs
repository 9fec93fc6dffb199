//! Page geometry
//!
//! All rectangles are page-absolute: element rectangles are already adjusted
//! for the current scroll offset, and the viewport rectangle is positioned at
//! the scroll offset of the scrolling context.

/// Axis-aligned rectangle in page coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        left: 0.0,
        top: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Build a rect from its four edges
    pub fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            width: (right - left).max(0.0),
            height: (bottom - top).max(0.0),
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Returns true if the two rectangles share at least one point.
    ///
    /// Touching edges count as overlapping, so a zero-height element sitting
    /// exactly on the viewport's bottom edge is considered visible.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.top <= other.bottom()
            && other.top <= self.bottom()
            && self.left <= other.right()
            && other.left <= self.right()
    }

    /// Offset the rect by a delta
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Rect {
            left: self.left + dx,
            top: self.top + dy,
            ..*self
        }
    }

    /// Grow the rect on every side (negative values shrink it)
    pub fn expand(&self, dx: f64, dy: f64) -> Self {
        Rect {
            left: self.left - dx,
            top: self.top - dy,
            width: (self.width + 2.0 * dx).max(0.0),
            height: (self.height + 2.0 * dy).max(0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}
