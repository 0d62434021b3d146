//! Median split construction of a per-mesh [`BvhNode`] tree.

use crate::aabb::Aabb;
use crate::bvh::{BvhNode, Link, NodeArena, NodeId};
use crate::config::BuildConfig;
use crate::error::{BvhError, Result};
use crate::triangle::Triangle;
use crate::Point3;
use log::debug;

/// Statistics gathered while building one tree.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Number of nodes allocated.
    pub nodes: usize,

    /// Number of leaves among them.
    pub leaves: usize,

    /// Depth of the deepest leaf. The root has depth `0`.
    pub max_depth: u32,
}

/// A tree freshly built by a [`BvhBuilder`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BuiltTree {
    /// Root of the new tree.
    pub root: NodeId,

    /// Statistics of the build.
    pub stats: BuildStats,
}

/// Builds a binary tree over the triangles of one mesh.
///
/// Every node gets the box of exactly the triangles below it. Sets of at most
/// [`BuildConfig::leaf_size`] triangles become leaves; larger sets are split at the
/// median centroid along [`Aabb::split_axis`], the lower half going left.
///
/// # Examples
/// ```
/// use scenebvh::bvh::{BvhBuilder, NodeArena};
/// use scenebvh::config::BuildConfig;
/// use scenebvh::triangle::Triangle;
/// use scenebvh::Point3;
///
/// let triangles = (0..9)
///     .map(|i| {
///         let x = i as f32;
///         Triangle::new(
///             Point3::new(x, 0.0, 0.0),
///             Point3::new(x + 0.5, 0.0, 0.0),
///             Point3::new(x, 0.5, 0.0),
///         )
///     })
///     .collect::<Vec<_>>();
///
/// let config = BuildConfig::default();
/// let mut arena = NodeArena::new();
/// let tree = BvhBuilder::new(&mut arena, &triangles, &config).build().unwrap();
///
/// let root = arena.get(tree.root).unwrap();
/// let left = arena.get(root.left_id().unwrap()).unwrap();
/// let right = arena.get(root.right_id().unwrap()).unwrap();
/// assert_eq!(left.triangles(), &[0, 1, 2, 3]);
/// assert_eq!(right.triangles(), &[4, 5, 6, 7, 8]);
/// ```
pub struct BvhBuilder<'a> {
    arena: &'a mut NodeArena,
    triangles: &'a [Triangle],
    centroids: Vec<Point3>,
    config: &'a BuildConfig,
    base: u32,
    model_root: bool,
    stats: BuildStats,
}

impl<'a> BvhBuilder<'a> {
    /// Creates a builder placing the nodes for `triangles` into `arena`.
    pub fn new(
        arena: &'a mut NodeArena,
        triangles: &'a [Triangle],
        config: &'a BuildConfig,
    ) -> BvhBuilder<'a> {
        BvhBuilder {
            arena,
            triangles,
            centroids: Vec::new(),
            config,
            base: 0,
            model_root: false,
            stats: BuildStats::default(),
        }
    }

    /// Offsets the triangle indices stored in the leaves by `base`, the position of the
    /// mesh's first triangle in the scene triangle buffer.
    pub fn with_base(mut self, base: u32) -> BvhBuilder<'a> {
        self.base = base;
        self
    }

    /// Flags the root of the new tree as a model root.
    pub fn as_model_root(mut self) -> BvhBuilder<'a> {
        self.model_root = true;
        self
    }

    /// Builds the tree. Fails with [`BvhError::EmptyInput`] if there are no triangles.
    pub fn build(mut self) -> Result<BuiltTree> {
        self.config.validate()?;
        if self.triangles.is_empty() {
            return Err(BvhError::EmptyInput);
        }
        let count = self.base as usize + self.triangles.len();
        if u32::try_from(count).is_err() {
            return Err(BvhError::TooManyTriangles { count });
        }

        self.centroids = self.triangles.iter().map(Triangle::centroid).collect();
        let mut indices = (0..self.triangles.len() as u32).collect::<Vec<u32>>();
        let root = self.build_node(&mut indices, 0)?;
        if self.model_root {
            self.arena.get_mut(root)?.set_model_root(true);
        }

        debug!(
            "Built tree {} over {} triangles: {} nodes, {} leaves, depth {}",
            root,
            self.triangles.len(),
            self.stats.nodes,
            self.stats.leaves,
            self.stats.max_depth
        );
        Ok(BuiltTree {
            root,
            stats: self.stats,
        })
    }

    /// Builds the subtree over `indices` and returns its root. Partitions `indices` in place.
    fn build_node(&mut self, indices: &mut [u32], depth: u32) -> Result<NodeId> {
        let triangles = self.triangles;
        let bounds = Aabb::enclosing(
            indices.iter().map(|&index| &triangles[index as usize]),
            self.config.shrink_factor,
        )?;
        self.stats.nodes += 1;
        self.stats.max_depth = self.stats.max_depth.max(depth);

        if indices.len() <= self.config.leaf_size {
            self.stats.leaves += 1;
            let mut leaf_triangles = indices
                .iter()
                .map(|&index| self.base + index)
                .collect::<Vec<u32>>();
            leaf_triangles.sort_unstable();
            return Ok(self.arena.alloc(BvhNode::leaf(bounds, leaf_triangles)));
        }

        // The parent exists before its children, they are attached once built.
        let id = self.arena.alloc(BvhNode::new(bounds));

        // Partition by centroid rank on the split axis, lower half first.
        let axis = bounds.split_axis();
        let median = indices.len() / 2;
        let centroids = &self.centroids;
        indices.select_nth_unstable_by(median, |&a, &b| {
            let a = axis.of(&centroids[a as usize].coords);
            a.total_cmp(&axis.of(&centroids[b as usize].coords))
        });

        let (child_l_indices, child_r_indices) = indices.split_at_mut(median);
        let child_l = self.build_node(child_l_indices, depth + 1)?;
        let child_r = self.build_node(child_r_indices, depth + 1)?;
        self.arena
            .get_mut(id)?
            .attach(Link::Owned(child_l), Link::Owned(child_r));
        Ok(id)
    }
}


#[cfg(all(feature = "bench", test))]
mod bench {
    use crate::bvh::{BvhBuilder, NodeArena};
    use crate::config::BuildConfig;
    use crate::testbase::{create_n_cubes, default_bounds};

    fn build_n_cubes(n: usize, b: &mut ::test::Bencher) {
        let triangles = create_n_cubes(n, &default_bounds());
        let config = BuildConfig::default();
        b.iter(|| {
            let mut arena = NodeArena::new();
            BvhBuilder::new(&mut arena, &triangles, &config)
                .build()
                .unwrap()
        });
    }

    #[bench]
    /// Benchmark the construction of a tree over 1,200 triangles.
    fn bench_build_1200_triangles_bvh(b: &mut ::test::Bencher) {
        build_n_cubes(100, b);
    }

    #[bench]
    /// Benchmark the construction of a tree over 12,000 triangles.
    fn bench_build_12k_triangles_bvh(b: &mut ::test::Bencher) {
        build_n_cubes(1_000, b);
    }

    #[bench]
    /// Benchmark the construction of a tree over 120,000 triangles.
    fn bench_build_120k_triangles_bvh(b: &mut ::test::Bencher) {
        build_n_cubes(10_000, b);
    }
}
