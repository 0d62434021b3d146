//! This module flattens a node tree into arrays for upload to the GPU and for debug
//! drawing.
//!
//! All flattening walks the tree in pre-order: a node is emitted, then its left
//! subtree, then its right subtree. Borrowed links are followed like owned ones.

use crate::aabb::Aabb;
use crate::bvh::{BvhNode, NodeArena, NodeId};
use crate::error::Result;
use bytemuck::{Pod, Zeroable};

/// Child index of a record without that child.
pub const NO_CHILD: i32 = -1;

/// A node as the traversal kernel reads it (32 bytes).
///
/// `left` and `right` are indices into the same array, or [`NO_CHILD`]. A record
/// without children is a leaf.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GpuNode {
    pub center: [f32; 3],
    pub size: [f32; 3],
    pub left: i32,
    pub right: i32,
}

impl GpuNode {
    /// Creates a record for a node with the given box and child indices.
    pub fn new(bounds: &Aabb, left: i32, right: i32) -> GpuNode {
        GpuNode {
            center: bounds.center.into(),
            size: bounds.size.into(),
            left,
            right,
        }
    }

    /// Returns true if the record has no children.
    pub fn is_leaf(&self) -> bool {
        self.left == NO_CHILD && self.right == NO_CHILD
    }
}

/// A box for the debug overlay.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DebugBox {
    pub center: [f32; 3],
    pub size: [f32; 3],
}

impl From<&Aabb> for DebugBox {
    fn from(bounds: &Aabb) -> DebugBox {
        DebugBox {
            center: bounds.center.into(),
            size: bounds.size.into(),
        }
    }
}

/// The triangles referenced by the record with the same index: the slice
/// `triangle_indices[first..first + count]`. Empty for inner nodes.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct LeafRange {
    pub first: u32,
    pub count: u32,
}

/// A flattened tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatBvh {
    /// Node records in pre-order. The root, if any, is at index `0`.
    pub nodes: Vec<GpuNode>,

    /// One range per record in `nodes`.
    pub leaves: Vec<LeafRange>,

    /// Triangle indices of all leaves, concatenated in pre-order.
    pub triangle_indices: Vec<u32>,
}

impl FlatBvh {
    /// Returns the node records as raw bytes, ready for a storage buffer.
    pub fn nodes_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// Returns the leaf ranges as raw bytes.
    pub fn leaves_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.leaves)
    }

    /// Returns the leaf triangle indices as raw bytes.
    pub fn triangle_indices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangle_indices)
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the triangle indices of record `index`.
    pub fn leaf_triangles(&self, index: usize) -> &[u32] {
        match self.leaves.get(index) {
            Some(range) => {
                let first = range.first as usize;
                self.triangle_indices
                    .get(first..first + range.count as usize)
                    .unwrap_or(&[])
            }
            None => &[],
        }
    }

    /// Checks that every child index is [`NO_CHILD`] or points to a strictly later
    /// record, that every record but the root has exactly one parent, that records have
    /// either both children or none, and that every leaf range is in bounds.
    pub fn is_consistent(&self) -> bool {
        self.check().is_ok()
    }

    /// Assert version of [`FlatBvh::is_consistent`].
    pub fn assert_consistent(&self) {
        if let Err(message) = self.check() {
            panic!("{}", message);
        }
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.leaves.len() != self.nodes.len() {
            return Err(format!(
                "{} leaf ranges for {} records",
                self.leaves.len(),
                self.nodes.len()
            ));
        }

        let mut parents = vec![0u32; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            if (node.left == NO_CHILD) != (node.right == NO_CHILD) {
                return Err(format!("Record {} has a single child", index));
            }
            for child in [node.left, node.right] {
                if child == NO_CHILD {
                    continue;
                }
                if child <= index as i32 || child as usize >= self.nodes.len() {
                    return Err(format!(
                        "Record {} points to {}, expected an index in {}..{}",
                        index,
                        child,
                        index + 1,
                        self.nodes.len()
                    ));
                }
                parents[child as usize] += 1;
            }

            let range = self.leaves[index];
            if !node.is_leaf() && range.count != 0 {
                return Err(format!("Inner record {} references triangles", index));
            }
            if range.first as usize + range.count as usize > self.triangle_indices.len() {
                return Err(format!("Leaf range of record {} is out of bounds", index));
            }
        }

        for (index, &count) in parents.iter().enumerate() {
            let expected = if index == 0 { 0 } else { 1 };
            if count != expected {
                return Err(format!(
                    "Record {} has {} parents, expected {}",
                    index, count, expected
                ));
            }
        }
        Ok(())
    }

    /// Prints a textual representation of the records.
    pub fn pretty_print(&self) {
        for (i, node) in self.nodes.iter().enumerate() {
            println!(
                "{}\tleft {}\tright {}\ttriangles {:?}",
                i,
                node.left,
                node.right,
                self.leaf_triangles(i)
            );
        }
    }
}

/// Collects the boxes below `root` in pre-order for the debug overlay.
///
/// With `only_leaves` the boxes of inner nodes are left out; the walk still descends
/// through them. A missing root yields no boxes.
pub fn flatten(
    arena: &NodeArena,
    root: Option<NodeId>,
    only_leaves: bool,
) -> Result<Vec<DebugBox>> {
    let mut boxes = Vec::new();
    if let Some(root) = root {
        collect_boxes(arena, root, only_leaves, &mut boxes)?;
    }
    Ok(boxes)
}

fn collect_boxes(
    arena: &NodeArena,
    id: NodeId,
    only_leaves: bool,
    boxes: &mut Vec<DebugBox>,
) -> Result<()> {
    let node = arena.get(id)?;
    if !only_leaves || node.is_leaf() {
        boxes.push(DebugBox::from(&node.bounds));
    }
    for child in [node.left_id(), node.right_id()].into_iter().flatten() {
        collect_boxes(arena, child, only_leaves, boxes)?;
    }
    Ok(())
}

/// Flattens the tree below `root` into [`GpuNode`] records plus the leaf triangle
/// ranges. A missing root yields an empty [`FlatBvh`].
///
/// # Examples
/// ```
/// use scenebvh::bvh::{BvhBuilder, NodeArena};
/// use scenebvh::config::BuildConfig;
/// use scenebvh::flat_bvh::{flatten_indexed, NO_CHILD};
/// use scenebvh::triangle::Triangle;
/// use scenebvh::Point3;
///
/// let triangles = (0..20)
///     .map(|i| {
///         let x = i as f32;
///         Triangle::new(
///             Point3::new(x, 0.0, 0.0),
///             Point3::new(x + 0.5, 0.0, 0.0),
///             Point3::new(x, 0.5, 0.0),
///         )
///     })
///     .collect::<Vec<_>>();
/// let mut arena = NodeArena::new();
/// let tree = BvhBuilder::new(&mut arena, &triangles, &BuildConfig::default())
///     .build()
///     .unwrap();
///
/// let flat = flatten_indexed(&arena, Some(tree.root)).unwrap();
/// assert_eq!(flat.len(), tree.stats.nodes);
/// assert_eq!(flat.nodes[0].left, 1);
/// assert_ne!(flat.nodes[0].right, NO_CHILD);
/// assert_eq!(flat.triangle_indices.len(), 20);
/// flat.assert_consistent();
/// ```
pub fn flatten_indexed(arena: &NodeArena, root: Option<NodeId>) -> Result<FlatBvh> {
    let records = flatten_custom(arena, root, &|node, left, right| {
        (GpuNode::new(&node.bounds, left, right), node.triangles())
    })?;

    let mut flat = FlatBvh {
        nodes: Vec::with_capacity(records.len()),
        leaves: Vec::with_capacity(records.len()),
        triangle_indices: Vec::new(),
    };
    for (node, triangles) in records {
        flat.nodes.push(node);
        flat.leaves.push(LeafRange {
            first: flat.triangle_indices.len() as u32,
            count: triangles.len() as u32,
        });
        flat.triangle_indices.extend_from_slice(triangles);
    }
    Ok(flat)
}

/// Flattens the tree below `root` in pre-order, building each record with
/// `constructor`.
///
/// The constructor receives the node and the indices of its left and right records,
/// or [`NO_CHILD`].
pub fn flatten_custom<'a, F, T>(
    arena: &'a NodeArena,
    root: Option<NodeId>,
    constructor: &F,
) -> Result<Vec<T>>
where
    F: Fn(&'a BvhNode, i32, i32) -> T,
{
    let mut records = Vec::new();
    if let Some(root) = root {
        flatten_node(arena, root, &mut records, constructor)?;
    }
    Ok(records)
}

/// Emits `id` and its subtree and returns the index of the record for `id`.
fn flatten_node<'a, F, T>(
    arena: &'a NodeArena,
    id: NodeId,
    records: &mut Vec<T>,
    constructor: &F,
) -> Result<i32>
where
    F: Fn(&'a BvhNode, i32, i32) -> T,
{
    let node = arena.get(id)?;
    let index = records.len();

    // Reserve the slot, the child indices are only known once both subtrees are out.
    records.push(constructor(node, NO_CHILD, NO_CHILD));
    let left = match node.left_id() {
        Some(child) => flatten_node(arena, child, records, constructor)?,
        None => NO_CHILD,
    };
    let right = match node.right_id() {
        Some(child) => flatten_node(arena, child, records, constructor)?,
        None => NO_CHILD,
    };
    records[index] = constructor(node, left, right);
    Ok(index as i32)
}


#[cfg(all(feature = "bench", test))]
mod bench {
    use crate::bvh::{BvhBuilder, NodeArena};
    use crate::config::BuildConfig;
    use crate::flat_bvh::flatten_indexed;
    use crate::testbase::{create_n_cubes, default_bounds};

    #[bench]
    /// Benchmark the flattening of a tree over 120,000 triangles.
    fn bench_flatten_120k_triangles_bvh(b: &mut ::test::Bencher) {
        let triangles = create_n_cubes(10_000, &default_bounds());
        let mut arena = NodeArena::new();
        let tree = BvhBuilder::new(&mut arena, &triangles, &BuildConfig::default())
            .build()
            .unwrap();

        b.iter(|| flatten_indexed(&arena, Some(tree.root)).unwrap());
    }
}
