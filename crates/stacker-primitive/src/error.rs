//! Error types for box primitives.

use thiserror::Error;

/// Errors that can occur while fitting or deforming a box primitive.
#[derive(Error, Debug)]
pub enum PrimitiveError {
    /// Mesh part has no vertices.
    #[error("mesh part is empty")]
    EmptyMesh,

    /// The mesh no longer matches the coordinates computed at fit time.
    #[error("mesh has {found} vertices but the primitive was fitted to {expected}")]
    VertexCountMismatch {
        /// Vertex count at fit time.
        expected: usize,
        /// Vertex count of the mesh passed in.
        found: usize,
    },

    /// Face index outside `0..6`.
    #[error("invalid box face id: {0}")]
    InvalidFace(usize),

    /// A triangle refers to a vertex the part does not have.
    #[error("triangle {triangle} of part {part} indexes past its {vertex_count} vertices")]
    TriangleIndexOutOfRange {
        /// Part index within the scene.
        part: usize,
        /// Triangle index within the part.
        triangle: usize,
        /// Vertex count of the part.
        vertex_count: usize,
    },

    /// An operation on the selected face was requested with nothing selected.
    #[error("no box face is selected")]
    NoFaceSelected,
}

/// Result type for primitive operations.
pub type Result<T> = std::result::Result<T, PrimitiveError>;
