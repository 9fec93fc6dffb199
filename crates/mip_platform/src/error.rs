//! Platform error types

use thiserror::Error;

use crate::document::NodeId;

/// Host-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlatformError {
    /// The node does not exist in the document
    #[error("Unknown node: {0:?}")]
    UnknownNode(NodeId),

    /// The node exists but is not connected to the document
    #[error("Node is detached: {0:?}")]
    Detached(NodeId),

    /// The host could not produce geometry (no layout box, hidden frame, ...)
    #[error("Geometry unavailable: {0}")]
    GeometryUnavailable(String),

    /// Generic host error
    #[error("Platform error: {0}")]
    Other(String),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;
