//! The node tree: storage, construction and merging of per-mesh trees.
//!
//! Every tree lives in a [`NodeArena`]. A [`BvhBuilder`] builds one tree per mesh and
//! [`aggregate`] merges the mesh roots into a scene tree which references, but does
//! not own, them.

mod aggregate;
mod arena;
mod build;
mod node;

pub use self::aggregate::*;
pub use self::arena::*;
pub use self::build::*;
pub use self::node::*;
