//! A scene of meshes and the tree over all of them.
//!
//! Every mesh owns a tree over its own triangles, flagged as a model root. The scene
//! tree merges the mesh roots and is thrown away on every rebuild, while the trees of
//! unchanged meshes are kept and linked in again.

use crate::bvh::{aggregate, Aggregate, BvhBuilder, NodeArena, NodeId};
use crate::config::BuildConfig;
use crate::error::{BvhError, Result};
use crate::flat_bvh::{flatten, flatten_indexed, DebugBox, FlatBvh};
use crate::triangle::Triangle;
use log::{debug, info};
use std::fmt;

/// Handle of a mesh added to a [`SceneBvh`]. Never reused within a scene.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u32);

impl MeshId {
    /// Returns the raw value, which is also written to [`Triangle::mesh_index`].
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct Mesh {
    id: MeshId,
    triangles: Vec<Triangle>,
    root: Option<NodeId>,
    /// Position of the first triangle in the scene triangle buffer at the last build.
    base: u32,
    dirty: bool,
}

/// Summary of a [`SceneBvh::rebuild`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RebuildStats {
    /// Number of meshes in the scene.
    pub meshes: usize,

    /// Number of mesh trees built by this rebuild.
    pub rebuilt_meshes: usize,

    /// Number of triangles in the scene triangle buffer.
    pub triangles: usize,

    /// Number of live nodes in the arena after the rebuild.
    pub nodes: usize,
}

/// The meshes of a scene together with the tree over all of their triangles.
///
/// Geometry edits only mark the scene dirty; [`SceneBvh::rebuild`] brings the tree up
/// to date. The tree and the triangle buffer returned by [`SceneBvh::triangles`] always
/// describe the state at the last rebuild.
///
/// # Examples
/// ```
/// use scenebvh::scene::SceneBvh;
/// use scenebvh::triangle::Triangle;
/// use scenebvh::Point3;
///
/// let triangle = |x: f32| {
///     Triangle::new(
///         Point3::new(x, 0.0, 0.0),
///         Point3::new(x + 1.0, 0.0, 0.0),
///         Point3::new(x, 1.0, 0.0),
///     )
/// };
///
/// let mut scene = SceneBvh::default();
/// let floor = scene.add_mesh((0..10).map(|i| triangle(i as f32)).collect());
/// let _chair = scene.add_mesh(vec![triangle(20.0), triangle(21.0)]);
/// assert!(scene.is_dirty());
///
/// let stats = scene.rebuild().unwrap();
/// assert_eq!(stats.rebuilt_meshes, 2);
/// assert_eq!(scene.triangles().len(), 12);
///
/// // Removing the floor keeps the chair's tree; it becomes the scene root.
/// scene.remove_mesh(floor).unwrap();
/// let stats = scene.rebuild().unwrap();
/// assert_eq!(stats.rebuilt_meshes, 1);
/// assert_eq!(scene.flatten_indexed().unwrap().len(), 1);
/// ```
#[derive(Debug)]
pub struct SceneBvh {
    config: BuildConfig,
    arena: NodeArena,
    meshes: Vec<Mesh>,
    next_mesh_id: u32,
    triangles: Vec<Triangle>,
    root: Option<NodeId>,
    owns_root: bool,
    dirty: bool,
}

impl Default for SceneBvh {
    fn default() -> SceneBvh {
        SceneBvh::with_valid_config(BuildConfig::default())
    }
}

impl SceneBvh {
    /// Creates an empty scene built with `config`.
    pub fn new(config: BuildConfig) -> Result<SceneBvh> {
        config.validate()?;
        Ok(SceneBvh::with_valid_config(config))
    }

    fn with_valid_config(config: BuildConfig) -> SceneBvh {
        SceneBvh {
            config,
            arena: NodeArena::new(),
            meshes: Vec::new(),
            next_mesh_id: 0,
            triangles: Vec::new(),
            root: None,
            owns_root: false,
            dirty: false,
        }
    }

    /// Adds a mesh and returns its handle. Every triangle's `mesh_index` is set to the
    /// handle's value.
    pub fn add_mesh(&mut self, triangles: Vec<Triangle>) -> MeshId {
        let id = MeshId(self.next_mesh_id);
        self.next_mesh_id += 1;
        self.meshes.push(Mesh {
            id,
            triangles: tag_triangles(triangles, id),
            root: None,
            base: 0,
            dirty: true,
        });
        self.dirty = true;
        id
    }

    /// Removes a mesh and frees its tree together with the scene tree, which may
    /// reference it. Returns the mesh's triangles.
    pub fn remove_mesh(&mut self, id: MeshId) -> Result<Vec<Triangle>> {
        let position = self.position(id)?;
        self.destroy_scene_tree()?;
        let mesh = self.meshes.remove(position);
        self.arena.destroy_tree(mesh.root)?;
        self.dirty = true;
        Ok(mesh.triangles)
    }

    /// Replaces the triangles of a mesh wholesale. Its tree is rebuilt on the next
    /// [`SceneBvh::rebuild`].
    pub fn replace_mesh_triangles(&mut self, id: MeshId, triangles: Vec<Triangle>) -> Result<()> {
        let position = self.position(id)?;
        let mesh = &mut self.meshes[position];
        mesh.triangles = tag_triangles(triangles, id);
        mesh.dirty = true;
        self.dirty = true;
        Ok(())
    }

    /// Requests a full rebuild: every mesh tree is rebuilt on the next
    /// [`SceneBvh::rebuild`], changed or not.
    pub fn request_rebuild(&mut self) {
        for mesh in &mut self.meshes {
            mesh.dirty = true;
        }
        self.dirty = true;
    }

    /// Returns true if the tree is out of date.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Brings the tree up to date. Does nothing if the scene is not dirty.
    ///
    /// The scene tree is destroyed first. Meshes that were edited, or whose triangles
    /// moved within the scene triangle buffer, get a new tree. The mesh roots are then
    /// merged into a new scene tree; a single mesh root is used as the scene root as is.
    pub fn rebuild(&mut self) -> Result<RebuildStats> {
        if !self.dirty {
            return Ok(self.stats(0));
        }
        self.destroy_scene_tree()?;

        let total = self
            .meshes
            .iter()
            .map(|mesh| mesh.triangles.len())
            .sum::<usize>();
        if u32::try_from(total).is_err() {
            return Err(BvhError::TooManyTriangles { count: total });
        }

        let mut rebuilt_meshes = 0;
        let mut base = 0;
        for mesh in &mut self.meshes {
            if mesh.dirty || mesh.base != base {
                self.arena.destroy_tree(mesh.root.take())?;
                if !mesh.triangles.is_empty() {
                    let tree = BvhBuilder::new(&mut self.arena, &mesh.triangles, &self.config)
                        .with_base(base)
                        .as_model_root()
                        .build()?;
                    mesh.root = Some(tree.root);
                }
                mesh.base = base;
                mesh.dirty = false;
                rebuilt_meshes += 1;
            }
            base += mesh.triangles.len() as u32;
        }

        self.triangles.clear();
        self.triangles.reserve(total);
        for mesh in &self.meshes {
            self.triangles.extend_from_slice(&mesh.triangles);
        }

        let roots = self
            .meshes
            .iter()
            .filter_map(|mesh| mesh.root)
            .collect::<Vec<NodeId>>();
        match roots.as_slice() {
            [] => {}
            [root] => self.root = Some(*root),
            _ => match aggregate(&mut self.arena, &roots, &self.config)? {
                Aggregate::Node(root) => {
                    self.root = Some(root);
                    self.owns_root = true;
                }
                Aggregate::Degenerate { id, count } => {
                    self.arena.destroy(id)?;
                    return Err(BvhError::AggregateUnderflow { count });
                }
            },
        }
        self.dirty = false;

        let stats = self.stats(rebuilt_meshes);
        info!(
            "Rebuilt scene BVH: {} meshes ({} rebuilt), {} triangles, {} nodes",
            stats.meshes, stats.rebuilt_meshes, stats.triangles, stats.nodes
        );
        Ok(stats)
    }

    fn stats(&self, rebuilt_meshes: usize) -> RebuildStats {
        RebuildStats {
            meshes: self.meshes.len(),
            rebuilt_meshes,
            triangles: self.triangles.len(),
            nodes: self.arena.live_nodes(),
        }
    }

    /// Frees the scene tree. Mesh roots used as the scene root are left alone.
    fn destroy_scene_tree(&mut self) -> Result<()> {
        let root = self.root.take();
        if std::mem::take(&mut self.owns_root) {
            self.arena.destroy_tree(root)?;
        }
        Ok(())
    }

    /// Frees every tree of the scene. The meshes stay and are rebuilt on the next
    /// [`SceneBvh::rebuild`].
    pub fn destroy(&mut self) -> Result<()> {
        self.destroy_scene_tree()?;
        for mesh in &mut self.meshes {
            self.arena.destroy_tree(mesh.root.take())?;
            mesh.dirty = true;
        }
        self.triangles.clear();
        self.dirty = true;
        debug!("Destroyed scene, {} nodes left", self.arena.live_nodes());
        Ok(())
    }

    /// Returns the root of the scene tree, if the scene has any triangles.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Returns the arena holding every node of the scene.
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    /// Returns the build configuration.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Returns the number of meshes.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Returns the root of a mesh's own tree, if it has been built.
    pub fn mesh_root(&self, id: MeshId) -> Result<Option<NodeId>> {
        Ok(self.meshes[self.position(id)?].root)
    }

    /// Returns the current triangles of a mesh.
    pub fn mesh_triangles(&self, id: MeshId) -> Result<&[Triangle]> {
        Ok(&self.meshes[self.position(id)?].triangles)
    }

    /// Returns the scene triangle buffer. Leaf triangle indices point into it.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Returns the scene triangle buffer as raw bytes.
    pub fn triangles_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }

    /// Flattens the scene tree for upload.
    pub fn flatten_indexed(&self) -> Result<FlatBvh> {
        flatten_indexed(&self.arena, self.root)
    }

    /// Returns the boxes of the scene tree for the debug overlay.
    pub fn debug_boxes(&self, only_leaves: bool) -> Result<Vec<DebugBox>> {
        flatten(&self.arena, self.root, only_leaves)
    }

    fn position(&self, id: MeshId) -> Result<usize> {
        self.meshes
            .iter()
            .position(|mesh| mesh.id == id)
            .ok_or(BvhError::UnknownMesh(id))
    }
}

fn tag_triangles(mut triangles: Vec<Triangle>, id: MeshId) -> Vec<Triangle> {
    for triangle in &mut triangles {
        triangle.mesh_index = id.get();
    }
    triangles
}
