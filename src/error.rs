//! Error types for building and managing hierarchies.

use crate::bvh::NodeId;
use crate::scene::MeshId;
use thiserror::Error;

/// Errors reported by the builder, the aggregator and the scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BvhError {
    /// Bounds were requested for an empty sequence of triangles or nodes.
    #[error("cannot compute bounds of an empty sequence")]
    EmptyInput,

    /// Fewer than two nodes were handed to the aggregator.
    #[error("cannot aggregate {count} node(s), a binary node needs at least 2")]
    AggregateUnderflow { count: usize },

    /// The handle refers to a node that has been destroyed.
    #[error("node {0} has been destroyed")]
    StaleNode(NodeId),

    /// The mesh is not (or no longer) part of the scene.
    #[error("unknown mesh {0}")]
    UnknownMesh(MeshId),

    /// More triangles than a 32-bit GPU index can address.
    #[error("{count} triangles exceed the 32-bit index range")]
    TooManyTriangles { count: usize },

    /// The build configuration is out of range.
    #[error("invalid build configuration: {0}")]
    InvalidConfig(String),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, BvhError>;
