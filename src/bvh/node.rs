use crate::aabb::Aabb;
use std::fmt;

/// Handle of a [`BvhNode`] inside a [`NodeArena`].
///
/// The generation is bumped whenever a slot is freed, so a handle that outlives its
/// node is detected instead of silently aliasing a newer node.
///
/// [`NodeArena`]: struct.NodeArena.html
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Returns the slot index of this handle.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// An edge from a parent to a child, tagged with who owns the child.
///
/// Destruction follows `Owned` links only. `Borrowed` links point at model roots,
/// whose subtrees belong to their mesh.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Link {
    /// The parent owns the child and destroys it along with itself.
    Owned(NodeId),

    /// The child is owned elsewhere and outlives the parent.
    Borrowed(NodeId),
}

impl Link {
    /// Returns the node this link points at.
    pub fn id(&self) -> NodeId {
        match *self {
            Link::Owned(id) | Link::Borrowed(id) => id,
        }
    }

    /// Returns true for `Owned` links.
    pub fn is_owned(&self) -> bool {
        matches!(self, Link::Owned(_))
    }
}

/// A node of a binary bounding volume hierarchy.
///
/// A node is a leaf iff it has no children. Leaves hold indices into the scene's
/// triangle buffer; inner nodes hold none.
#[derive(Debug, Clone, PartialEq)]
pub struct BvhNode {
    /// Box enclosing everything below this node (up to the shrink factor).
    pub bounds: Aabb,

    left: Option<Link>,

    right: Option<Link>,

    triangles: Vec<u32>,

    is_model_root: bool,
}

impl BvhNode {
    /// Creates a childless node without triangles.
    pub fn new(bounds: Aabb) -> BvhNode {
        BvhNode {
            bounds,
            left: None,
            right: None,
            triangles: Vec::new(),
            is_model_root: false,
        }
    }

    /// Creates a leaf referencing `triangles`.
    pub fn leaf(bounds: Aabb, triangles: Vec<u32>) -> BvhNode {
        BvhNode {
            triangles,
            ..BvhNode::new(bounds)
        }
    }

    /// Attaches both children.
    pub(crate) fn attach(&mut self, left: Link, right: Link) {
        self.left = Some(left);
        self.right = Some(right);
    }

    /// Returns the link to the left child.
    pub fn left(&self) -> Option<Link> {
        self.left
    }

    /// Returns the link to the right child.
    pub fn right(&self) -> Option<Link> {
        self.right
    }

    /// Returns the id of the left child.
    pub fn left_id(&self) -> Option<NodeId> {
        self.left.map(|link| link.id())
    }

    /// Returns the id of the right child.
    pub fn right_id(&self) -> Option<NodeId> {
        self.right.map(|link| link.id())
    }

    /// Returns true if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Returns the triangle indices of a leaf. Empty for inner nodes.
    pub fn triangles(&self) -> &[u32] {
        &self.triangles
    }

    /// Returns true if this node roots a mesh-owned subtree.
    pub fn is_model_root(&self) -> bool {
        self.is_model_root
    }

    /// Marks or unmarks this node as the root of a mesh-owned subtree.
    pub fn set_model_root(&mut self, is_model_root: bool) {
        self.is_model_root = is_model_root;
    }
}

#[cfg(test)]
mod tests {
    use crate::aabb::Aabb;
    use crate::bvh::{BvhNode, Link, NodeId};

    #[test]
    fn test_leaf_and_inner_nodes() {
        let mut node = BvhNode::leaf(Aabb::default(), vec![3, 4]);
        assert!(node.is_leaf());
        assert_eq!(node.triangles(), &[3, 4]);

        let a = NodeId {
            index: 1,
            generation: 0,
        };
        let b = NodeId {
            index: 2,
            generation: 5,
        };
        node.attach(Link::Owned(a), Link::Borrowed(b));
        assert!(!node.is_leaf());
        assert_eq!(node.left_id(), Some(a));
        assert_eq!(node.right_id(), Some(b));
        assert!(node.left().unwrap().is_owned());
        assert!(!node.right().unwrap().is_owned());
        assert_eq!(b.to_string(), "#2v5");
    }
}
