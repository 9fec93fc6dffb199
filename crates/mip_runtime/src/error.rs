//! Error types for mip_runtime
//!
//! Apart from configuration loading, none of these errors reach the caller.
//! They are produced at the point of failure, logged, and the runtime carries
//! on with the remaining elements.

use std::fmt;

use mip_platform::PlatformError;
use thiserror::Error;

use crate::resources::ResourceId;

/// Lifecycle step during which a user implementation was invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleStage {
    Created,
    Attached,
    Detached,
    AttributeChanged,
    Build,
    FirstInview,
    Viewport,
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleStage::Created => "createdCallback",
            LifecycleStage::Attached => "attachedCallback",
            LifecycleStage::Detached => "detachedCallback",
            LifecycleStage::AttributeChanged => "attributeChangedCallback",
            LifecycleStage::Build => "build",
            LifecycleStage::FirstInview => "firstInviewCallback",
            LifecycleStage::Viewport => "viewportCallback",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in the element runtime
#[derive(Error, Debug)]
pub enum MipError {
    /// A user-supplied lifecycle callback failed
    #[error("<{tag}> {stage} failed: {source}")]
    Implementation {
        tag: String,
        stage: LifecycleStage,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A callback tried to re-enter its own element
    #[error("<{tag}> {stage} re-entered an element that is already running a callback")]
    Reentrant { tag: String, stage: LifecycleStage },

    /// The tag name already has a definition
    #[error("Element type already registered: {0}")]
    DuplicateRegistration(String),

    /// Geometry could not be measured
    #[error("Geometry unavailable: {0}")]
    GeometryUnavailable(#[from] PlatformError),

    /// Removal of an id that is not in the live set
    #[error("No live resource with id {0}")]
    UnknownRemoval(ResourceId),

    /// Invalid configuration values
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Configuration text could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl MipError {
    pub(crate) fn implementation(tag: &str, stage: LifecycleStage, err: anyhow::Error) -> Self {
        MipError::Implementation {
            tag: tag.to_string(),
            stage,
            source: err.into(),
        }
    }
}

/// Result type for mip_runtime operations
pub type Result<T> = std::result::Result<T, MipError>;
