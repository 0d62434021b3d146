#![cfg_attr(feature = "bench", feature(test))]
//! A crate which builds binary bounding volume hierarchies over the triangles of an
//! editable scene and flattens them into buffers a GPU ray traversal kernel can consume.
//!
//! ## About
//!
//! Every mesh of a scene gets its own BVH, built by recursively splitting the mesh's
//! triangles at the median centroid along the longest axis of the enclosing box until
//! at most eight triangles are left. The per-mesh roots are then merged into a single
//! scene tree. Mesh roots are *borrowed* by the scene tree: discarding the scene tree
//! on a rebuild never destroys a mesh tree, so unchanged meshes are reused as they are.
//!
//! All nodes live in a [`NodeArena`](bvh::NodeArena) and are addressed by generational
//! [`NodeId`](bvh::NodeId)s. Destruction is explicit and only follows owned links.
//!
//! ## Example
//!
//! ```
//! use scenebvh::scene::SceneBvh;
//! use scenebvh::triangle::Triangle;
//! use scenebvh::Point3;
//!
//! let mut triangles = Vec::new();
//! for i in 0..100 {
//!     let x = i as f32;
//!     triangles.push(Triangle::new(
//!         Point3::new(x, 0.0, 0.0),
//!         Point3::new(x + 1.0, 0.0, 0.0),
//!         Point3::new(x, 1.0, 0.0),
//!     ));
//! }
//!
//! let mut scene = SceneBvh::default();
//! scene.add_mesh(triangles);
//! scene.rebuild().unwrap();
//!
//! let flat = scene.flatten_indexed().unwrap();
//! assert!(flat.is_consistent());
//! let upload: &[u8] = flat.nodes_bytes();
//! assert_eq!(upload.len(), flat.nodes.len() * 32);
//! ```
//!
//! ## Features
//!
//! - `serde` (default **disabled**) - adds `Serialize` and `Deserialize` implementations for
//!   the configuration and box types
//! - `bench` (default **disabled**) - enables the nightly benchmarks
//!

#[cfg(all(feature = "bench", test))]
extern crate test;

/// Point math type used by this crate. Type alias for [`nalgebra::Point3`].
pub type Point3 = nalgebra::Point3<f32>;

/// Vector math type used by this crate. Type alias for [`nalgebra::Vector3`].
pub type Vector3 = nalgebra::Vector3<f32>;

/// Float type used by this crate.
pub type Real = f32;

/// A minimal floating value used as a lower bound.
pub const EPSILON: Real = 0.00001;

pub mod aabb;
pub mod axis;
pub mod bvh;
pub mod config;
pub mod error;
pub mod flat_bvh;
pub mod scene;
pub mod triangle;

pub use error::{BvhError, Result};

#[cfg(test)]
mod testbase;

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
