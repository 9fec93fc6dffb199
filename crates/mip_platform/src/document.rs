//! Document access

use slotmap::{new_key_type, Key};

use crate::error::Result;

new_key_type! {
    /// Identity of a node in the host document
    pub struct NodeId;
}

impl NodeId {
    /// Convert to a raw u64 representation
    ///
    /// Useful when the host keeps node identities in its own tables.
    pub fn to_raw(self) -> u64 {
        self.data().as_ffi()
    }

    /// Create from a raw u64 representation
    ///
    /// The raw value must have been created by `to_raw()` from a valid NodeId.
    pub fn from_raw(raw: u64) -> Self {
        Self::from(slotmap::KeyData::from_ffi(raw))
    }
}

/// The slice of the DOM the element runtime reads and writes
pub trait Document {
    /// Lower-case tag name of the node
    fn tag_name(&self, node: NodeId) -> Option<String>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Set an attribute, returning the previous value
    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<Option<String>>;

    fn add_class(&self, node: NodeId, class: &str) -> Result<()>;

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    /// Set an inline style property
    fn set_style(&self, node: NodeId, property: &str, value: &str) -> Result<()>;

    /// Connected nodes with the given tag, in document order
    fn nodes_with_tag(&self, tag: &str) -> Vec<NodeId>;

    /// Returns true if the node is inserted in the document
    fn is_connected(&self, node: NodeId) -> bool;
}
