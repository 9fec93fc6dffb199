//! MIP Element Runtime
//!
//! Custom element lifecycle and viewport-driven resource scheduling:
//!
//! - **Viewport Tracker**: redispatches scroll and resize, and detects when
//!   scrolling has settled
//! - **Element Registry**: first-wins mapping of tag names to element types
//! - **Lifecycle Controller**: per-element state machine dispatching the
//!   optional callbacks of a [`CustomElement`]
//! - **Resource Scheduler**: builds attached elements once and keeps their
//!   in-viewport flag in step with the page geometry
//!
//! Everything is single-threaded and driven by a [`mip_core::EventLoop`].
//! A failing user callback is logged and never affects other elements.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! use mip_core::{EventLoop, Rect};
//! use mip_platform::HeadlessPage;
//! use mip_runtime::{CustomElement, ElementHost, MipConfig, MipContext};
//!
//! struct Banner;
//! impl CustomElement for Banner {}
//!
//! let event_loop = EventLoop::manual();
//! let page = Rc::new(HeadlessPage::new(375.0, 667.0));
//! let context = MipContext::new(MipConfig::default(), &event_loop, page.clone()).unwrap();
//! context.register_element_type(
//!     "mip-banner",
//!     |_host: &ElementHost| Box::new(Banner) as Box<dyn CustomElement>,
//!     "mip-banner { display: block }",
//! );
//!
//! let node = page.create_element("mip-banner");
//! page.set_rect(node, Rect::new(0.0, 2000.0, 375.0, 100.0));
//! page.connect(node);
//! context.node_inserted(node);
//! assert!(!context.element(node).unwrap().in_viewport());
//!
//! page.set_scroll(0.0, 1500.0);
//! context.handle_scroll();
//! event_loop.advance(Duration::from_millis(100));
//! assert!(context.element(node).unwrap().in_viewport());
//! ```

pub mod config;
pub mod context;
pub mod element;
pub mod error;
pub mod layout;
pub mod performance;
pub mod registry;
pub mod resources;
pub mod viewport;


pub use config::MipConfig;
pub use context::MipContext;
pub use element::{
    AttributeChange, CallbackResult, CustomElement, ElementController, ElementHost,
    LifecycleEvent, LifecycleState,
};
pub use error::{LifecycleStage, MipError, Result};
pub use layout::{Layout, LayoutApplier, StandardLayout};
pub use performance::{
    FirstScreenTracker, PerformanceEvent, PerformanceEventKind, PerformanceMonitor,
};
pub use registry::{ElementDefinition, ElementFactory, ElementRegistry};
pub use resources::{ResourceId, Resources};
pub use viewport::{Viewport, ViewportEvent, ViewportEventKind};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::MipConfig;
    pub use crate::context::MipContext;
    pub use crate::element::{AttributeChange, CallbackResult, CustomElement, ElementHost};
    pub use crate::error::{MipError, Result};
    pub use crate::viewport::{ViewportEvent, ViewportEventKind};
}
