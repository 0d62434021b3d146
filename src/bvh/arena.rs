//! Storage for [`BvhNode`]s and the explicit destruction of trees.

use crate::aabb::Bounded;
use crate::bvh::{BvhNode, Link, NodeId};
use crate::error::{BvhError, Result};
use crate::triangle::Triangle;
use crate::{Point3, Real, EPSILON};
use log::{debug, warn};
use std::iter::repeat;

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<BvhNode>,
}

/// Owner of every node of every tree of a scene.
///
/// Nodes are never freed implicitly: a tree stays allocated until [`NodeArena::destroy`]
/// is called on its root. Freed slots are recycled with a new generation.
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl NodeArena {
    /// Creates an empty arena.
    pub fn new() -> NodeArena {
        NodeArena::default()
    }

    /// Creates an empty arena with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> NodeArena {
        NodeArena {
            slots: Vec::with_capacity(capacity),
            ..NodeArena::default()
        }
    }

    /// Stores `node` and returns its handle.
    pub fn alloc(&mut self, node: BvhNode) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Returns the node behind `id`.
    pub fn get(&self, id: NodeId) -> Result<&BvhNode> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(BvhError::StaleNode(id))
    }

    /// Returns the node behind `id` mutably.
    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut BvhNode> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(BvhError::StaleNode(id))
    }

    /// Returns true if `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_ok()
    }

    /// Returns the number of live nodes.
    pub fn live_nodes(&self) -> usize {
        self.live
    }

    fn release(&mut self, id: NodeId) -> Option<BvhNode> {
        let slot = self
            .slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(node)
    }

    /// Destroys the tree rooted at `id` and returns the number of freed nodes.
    ///
    /// Children are destroyed depth-first before their parent. A child reached through
    /// a [`Link::Borrowed`] edge, or one flagged as a model root, is skipped together
    /// with its whole subtree: it belongs to its mesh and stays usable. The node `id`
    /// itself is always freed, even if it is a model root.
    pub fn destroy(&mut self, id: NodeId) -> Result<usize> {
        let node = self.release(id).ok_or(BvhError::StaleNode(id))?;
        let mut freed = 1;
        for link in [node.left(), node.right()].into_iter().flatten() {
            freed += self.destroy_child(link);
        }
        Ok(freed)
    }

    fn destroy_child(&mut self, link: Link) -> usize {
        let child = match link {
            Link::Owned(child) => child,
            Link::Borrowed(_) => return 0,
        };
        let is_model_root = match self.get(child) {
            Ok(node) => node.is_model_root(),
            Err(_) => {
                warn!("Skipping already destroyed child {}", child);
                return 0;
            }
        };
        if is_model_root {
            0
        } else {
            self.destroy(child).unwrap_or(0)
        }
    }

    /// Destroys the tree rooted at `id` if there is one and logs how many nodes were freed.
    pub(crate) fn destroy_tree(&mut self, id: Option<NodeId>) -> Result<()> {
        if let Some(id) = id {
            let freed = self.destroy(id)?;
            debug!("Destroyed tree {} ({} nodes)", id, freed);
        }
        Ok(())
    }

    /// Returns the number of nodes reachable from `root`, borrowed subtrees included.
    pub fn subtree_len(&self, root: NodeId) -> Result<usize> {
        let node = self.get(root)?;
        let mut len = 1;
        for child in [node.left_id(), node.right_id()].into_iter().flatten() {
            len += self.subtree_len(child)?;
        }
        Ok(len)
    }

    /// Returns the depth of the deepest leaf below `root`. A lone leaf has depth `0`.
    pub fn depth(&self, root: NodeId) -> Result<u32> {
        let node = self.get(root)?;
        let mut depth = 0;
        for child in [node.left_id(), node.right_id()].into_iter().flatten() {
            depth = depth.max(1 + self.depth(child)?);
        }
        Ok(depth)
    }

    /// Collects the triangle indices of all leaves below `root`, in pre-order.
    pub fn leaf_triangles(&self, root: NodeId) -> Result<Vec<u32>> {
        let mut triangles = Vec::new();
        self.collect_triangles(root, &mut triangles)?;
        Ok(triangles)
    }

    fn collect_triangles(&self, id: NodeId, triangles: &mut Vec<u32>) -> Result<()> {
        let node = self.get(id)?;
        triangles.extend_from_slice(node.triangles());
        for child in [node.left_id(), node.right_id()].into_iter().flatten() {
            self.collect_triangles(child, triangles)?;
        }
        Ok(())
    }

    /// Prints the tree below `root` in a tree-like visualization.
    pub fn pretty_print(&self, root: NodeId) {
        self.print_node(root, 0);
    }

    fn print_node(&self, id: NodeId, depth: usize) {
        let padding: String = repeat(" ").take(depth).collect();
        match self.get(id) {
            Ok(node) if node.is_leaf() => {
                println!("{}leaf={} {}", padding, id, node.bounds);
                println!("{}triangles\t{:?}", padding, node.triangles());
            }
            Ok(node) => {
                let model_root = if node.is_model_root() { " model-root" } else { "" };
                println!("{}node={}{} {}", padding, id, model_root, node.bounds);
                for link in [node.left(), node.right()].into_iter().flatten() {
                    self.print_node(link.id(), depth + 1);
                }
            }
            Err(err) => println!("{}{}", padding, err),
        }
    }

    /// Verifies that every node below `root` is alive, that every leaf holds between 1 and
    /// `leaf_size` triangles, and that the boxes enclose the geometry once the shrink
    /// factor is undone.
    ///
    /// A leaf's relaxed box must contain the vertices of its triangles. An inner node's
    /// relaxed box must contain either every vertex below it, as the builder guarantees,
    /// or both child boxes, as aggregation over already shrunk boxes guarantees.
    pub fn is_consistent(
        &self,
        root: NodeId,
        triangles: &[Triangle],
        shrink_factor: Real,
        leaf_size: usize,
    ) -> bool {
        self.check_subtree(root, triangles, shrink_factor, leaf_size)
            .is_ok()
    }

    /// Assert version of [`NodeArena::is_consistent`].
    pub fn assert_consistent(
        &self,
        root: NodeId,
        triangles: &[Triangle],
        shrink_factor: Real,
        leaf_size: usize,
    ) {
        if let Err(message) = self.check_subtree(root, triangles, shrink_factor, leaf_size) {
            panic!("{}", message);
        }
    }

    fn check_subtree(
        &self,
        id: NodeId,
        triangles: &[Triangle],
        shrink_factor: Real,
        leaf_size: usize,
    ) -> std::result::Result<GeometryHull, String> {
        let node = self.get(id).map_err(|err| err.to_string())?;
        let outer = node.bounds.relaxed(shrink_factor);
        // Rounding in `center +- size / 2` grows with the coordinates, not only the extent.
        let epsilon = outer.center.coords.amax().max(outer.size.amax()) * EPSILON + EPSILON;

        if node.is_leaf() {
            let count = node.triangles().len();
            if count == 0 || count > leaf_size {
                return Err(format!(
                    "Leaf {} holds {} triangles, expected 1..={}",
                    id, count, leaf_size
                ));
            }
            let mut hull: Option<GeometryHull> = None;
            for &index in node.triangles() {
                let triangle = triangles.get(index as usize).ok_or_else(|| {
                    format!("Node {} references missing triangle {}", id, index)
                })?;
                for vertex in triangle.vertices() {
                    if !outer.approx_contains_eps(&vertex, epsilon) {
                        return Err(format!(
                            "Vertex {} of triangle {} lies outside node {}.\n\tBounds: {}",
                            vertex, index, id, outer
                        ));
                    }
                }
                let (min, max) = triangle.extent();
                hull = Some(match hull {
                    Some(hull) => hull.join(&GeometryHull { min, max }),
                    None => GeometryHull { min, max },
                });
            }
            return hull.ok_or_else(|| format!("Leaf {} holds no triangles", id));
        }

        let (left_id, right_id) = match (node.left_id(), node.right_id()) {
            (Some(left), Some(right)) => (left, right),
            _ => return Err(format!("Inner node {} has a single child", id)),
        };
        let left = self.check_subtree(left_id, triangles, shrink_factor, leaf_size)?;
        let right = self.check_subtree(right_id, triangles, shrink_factor, leaf_size)?;
        let hull = left.join(&right);

        let covers_geometry = outer.approx_contains_eps(&hull.min, epsilon)
            && outer.approx_contains_eps(&hull.max, epsilon);
        let covers_children = [left_id, right_id].iter().all(|&child| {
            self.get(child)
                .map(|child| outer.approx_contains_aabb_eps(&child.bounds, epsilon))
                .unwrap_or(false)
        });
        if !covers_geometry && !covers_children {
            return Err(format!(
                "Node {} encloses neither its geometry ({} to {}) nor its children.\n\tBounds: {}",
                id, hull.min, hull.max, outer
            ));
        }
        Ok(hull)
    }
}

/// Corners of the vertices below a checked subtree.
struct GeometryHull {
    min: Point3,
    max: Point3,
}

impl GeometryHull {
    fn join(&self, other: &GeometryHull) -> GeometryHull {
        GeometryHull {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }
}
