//! Element registry
//!
//! Maps tag names to element definitions. Registration is first-wins: a
//! second definition for the same tag is ignored.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::element::{CustomElement, ElementHost};

/// Builds the implementation for one node of a registered tag
pub type ElementFactory = Rc<dyn Fn(&ElementHost) -> Box<dyn CustomElement>>;

/// A registered element type
#[derive(Clone)]
pub struct ElementDefinition {
    name: String,
    factory: ElementFactory,
    style: String,
}

impl ElementDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stylesheet text installed with the definition
    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn factory(&self) -> &ElementFactory {
        &self.factory
    }

    /// Instantiate the implementation for `host`
    pub fn instantiate(&self, host: &ElementHost) -> Box<dyn CustomElement> {
        (self.factory)(host)
    }
}

impl fmt::Debug for ElementDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementDefinition")
            .field("name", &self.name)
            .field("style_len", &self.style.len())
            .finish()
    }
}

/// Tag name to definition mapping
#[derive(Default)]
pub struct ElementRegistry {
    definitions: FxHashMap<String, ElementDefinition>,
    order: Vec<String>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a definition. Names are matched case-insensitively.
    ///
    /// Returns false, leaving the stored definition untouched, if the name
    /// is already registered.
    pub fn register(&mut self, name: &str, factory: ElementFactory, style: &str) -> bool {
        let name = name.to_ascii_lowercase();
        if self.definitions.contains_key(&name) {
            return false;
        }
        self.order.push(name.clone());
        self.definitions.insert(
            name.clone(),
            ElementDefinition {
                name,
                factory,
                style: style.to_string(),
            },
        );
        true
    }

    pub fn get(&self, name: &str) -> Option<&ElementDefinition> {
        self.definitions.get(&name.to_ascii_lowercase())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in registration order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl fmt::Debug for ElementRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRegistry")
            .field("names", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blank;

    impl CustomElement for Blank {}

    fn factory() -> ElementFactory {
        Rc::new(|_host: &ElementHost| Box::new(Blank) as Box<dyn CustomElement>)
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = ElementRegistry::new();
        let first = factory();
        assert!(registry.register("mip-img", first.clone(), "mip-img{display:block}"));
        assert!(!registry.register("MIP-IMG", factory(), "mip-img{display:none}"));

        let definition = registry.get("mip-img").unwrap();
        assert_eq!(definition.style(), "mip-img{display:block}");
        assert!(Rc::ptr_eq(definition.factory(), &first));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_names_keep_registration_order() {
        let mut registry = ElementRegistry::new();
        for name in ["mip-video", "mip-img", "mip-carousel"] {
            registry.register(name, factory(), "");
        }
        assert_eq!(registry.names(), ["mip-video", "mip-img", "mip-carousel"]);
        assert!(registry.is_registered("Mip-Img"));
        assert!(!registry.is_registered("mip-map"));
    }
}
