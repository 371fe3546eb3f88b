//! Error types for the stackability search.

use stacker_primitive::PrimitiveError;
use thiserror::Error;

use crate::state::PartId;

/// Errors that can occur while setting up or running a search.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Invalid search or evaluator settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// A part id does not name a part of the controller.
    #[error("no such part: {0}")]
    MissingPart(PartId),

    /// A record or state does not have one box per mesh part.
    #[error("expected {expected} parts, found {found}")]
    PartCountMismatch {
        /// Parts in the mesh.
        expected: usize,
        /// Parts supplied.
        found: usize,
    },

    /// Configuration file could not be parsed.
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    /// Controller record could not be read or written.
    #[error("invalid record: {0}")]
    Record(#[from] serde_json::Error),

    /// Primitive fitting or deformation failed.
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),
}

/// Result type for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;
