//! MIP Platform Abstraction Layer
//!
//! The element runtime never touches a real DOM. It talks to its host through
//! three collaborator traits:
//!
//! - [`Document`] - node identity, tag names, attributes, classes and styles
//! - [`GeometryProvider`] - page-absolute element and viewport rectangles,
//!   scroll offsets of the designated scrolling context
//! - [`StyleHost`] - stylesheet insertion for registered element types
//!
//! [`HeadlessPage`] implements all three in memory. It backs the runtime's
//! tests and the scenario suite, and is a reasonable starting point for
//! embedding the runtime in a non-browser host.
//!
//! # Example
//!
//! ```rust
//! use mip_core::Rect;
//! use mip_platform::{Document, GeometryProvider, HeadlessPage};
//!
//! let page = HeadlessPage::new(375.0, 667.0);
//! let img = page.create_element("mip-img");
//! page.set_rect(img, Rect::new(0.0, 1000.0, 375.0, 200.0));
//! page.connect(img);
//!
//! assert!(page.is_connected(img));
//! assert!(!page.viewport_rect().unwrap().overlaps(&page.element_rect(img).unwrap()));
//!
//! page.set_scroll(0.0, 600.0);
//! assert!(page.viewport_rect().unwrap().overlaps(&page.element_rect(img).unwrap()));
//! ```

mod document;
mod error;
mod geometry;
mod headless;
mod style;

// Re-export all public types
pub use document::{Document, NodeId};
pub use error::{PlatformError, Result};
pub use geometry::GeometryProvider;
pub use headless::HeadlessPage;
pub use style::StyleHost;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::document::{Document, NodeId};
    pub use crate::error::{PlatformError, Result};
    pub use crate::geometry::GeometryProvider;
    pub use crate::headless::HeadlessPage;
    pub use crate::style::StyleHost;
}
