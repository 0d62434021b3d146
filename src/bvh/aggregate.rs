//! Merging independently built trees into one scene tree.

use crate::aabb::Aabb;
use crate::bvh::{BvhNode, Link, NodeArena, NodeId};
use crate::config::BuildConfig;
use crate::error::{BvhError, Result};
use log::{debug, error};

/// Outcome of [`aggregate`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Aggregate {
    /// The root of the merged tree.
    Node(NodeId),

    /// Fewer than two nodes were given. `id` is an empty node with default bounds and
    /// no children which references nothing; traversing it yields nothing.
    Degenerate { id: NodeId, count: usize },
}

impl Aggregate {
    /// Returns the created node, degenerate or not.
    pub fn id(&self) -> NodeId {
        match *self {
            Aggregate::Node(id) | Aggregate::Degenerate { id, .. } => id,
        }
    }

    /// Returns true for [`Aggregate::Degenerate`].
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Aggregate::Degenerate { .. })
    }

    /// Turns a degenerate outcome into [`BvhError::AggregateUnderflow`].
    ///
    /// The degenerate node is left in the arena; destroy it if it is not needed.
    pub fn into_result(self) -> Result<NodeId> {
        match self {
            Aggregate::Node(id) => Ok(id),
            Aggregate::Degenerate { count, .. } => Err(BvhError::AggregateUnderflow { count }),
        }
    }
}

/// Merges `nodes` into one binary tree and returns its root.
///
/// Two nodes become the children of a new node, in order. With three, the first two
/// are merged into the left child and the third becomes the right child. Longer
/// sequences are split at `len / 2` and each half is merged recursively.
///
/// Inputs flagged as model roots are linked as [`Link::Borrowed`] so destroying the
/// merged tree leaves them alive; every node created here is linked as
/// [`Link::Owned`]. Bounds are computed from the boxes of the inputs, never from
/// their triangles.
///
/// Fewer than two nodes cannot form a binary node. This is logged as an error and
/// answered with [`Aggregate::Degenerate`].
pub fn aggregate(
    arena: &mut NodeArena,
    nodes: &[NodeId],
    config: &BuildConfig,
) -> Result<Aggregate> {
    if nodes.len() < 2 {
        error!(
            "Cannot aggregate {} node(s) into a binary node, substituting an empty node",
            nodes.len()
        );
        let id = arena.alloc(BvhNode::new(Aabb::default()));
        return Ok(Aggregate::Degenerate {
            id,
            count: nodes.len(),
        });
    }

    let root = merge(arena, nodes, config)?;
    debug!("Aggregated {} trees into {}", nodes.len(), root);
    Ok(Aggregate::Node(root))
}

/// Merges at least two nodes.
fn merge(arena: &mut NodeArena, nodes: &[NodeId], config: &BuildConfig) -> Result<NodeId> {
    let boxes = nodes
        .iter()
        .map(|&id| arena.get(id).map(|node| node.bounds))
        .collect::<Result<Vec<Aabb>>>()?;
    let bounds = Aabb::enclosing(&boxes, config.shrink_factor)?;
    let id = arena.alloc(BvhNode::new(bounds));

    let (child_l, child_r) = match nodes {
        [first, second] => (input_link(arena, *first)?, input_link(arena, *second)?),
        [first, second, third] => {
            let child_l = merge(arena, &[*first, *second], config)?;
            (Link::Owned(child_l), input_link(arena, *third)?)
        }
        _ => {
            let (child_l_nodes, child_r_nodes) = nodes.split_at(nodes.len() / 2);
            (
                Link::Owned(merge(arena, child_l_nodes, config)?),
                Link::Owned(merge(arena, child_r_nodes, config)?),
            )
        }
    };
    arena.get_mut(id)?.attach(child_l, child_r);
    Ok(id)
}

fn input_link(arena: &NodeArena, id: NodeId) -> Result<Link> {
    if arena.get(id)?.is_model_root() {
        Ok(Link::Borrowed(id))
    } else {
        Ok(Link::Owned(id))
    }
}
