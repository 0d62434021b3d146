#![no_main]
use std::fmt::{self, Debug, Formatter};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ordered_float::NotNan;
use scenebvh::scene::{MeshId, SceneBvh};
use scenebvh::triangle::Triangle;
use scenebvh::Point3;

type Float = f32;
const LIMIT: Float = 1_000_000.0;

fuzz_target!(|workload: Workload| {
    workload.fuzz();
});

#[derive(Arbitrary)]
struct ArbitraryPoint {
    coordinates: [NotNan<Float>; 3],
}

impl ArbitraryPoint {
    fn point(&self) -> Point3 {
        let [x, y, z] = self
            .coordinates
            .map(|f| f.into_inner().clamp(-LIMIT, LIMIT));
        Point3::new(x, y, z)
    }
}

#[derive(Arbitrary)]
struct ArbitraryTriangle {
    a: ArbitraryPoint,
    b: ArbitraryPoint,
    c: ArbitraryPoint,
}

impl ArbitraryTriangle {
    fn triangle(&self) -> Triangle {
        Triangle::new(self.a.point(), self.b.point(), self.c.point())
    }
}

impl Debug for ArbitraryTriangle {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(&self.triangle().vertices(), f)
    }
}

#[derive(Debug, Arbitrary)]
struct ArbitraryMesh {
    triangles: Vec<ArbitraryTriangle>,
}

impl ArbitraryMesh {
    fn triangles(&self) -> Vec<Triangle> {
        self.triangles.iter().map(ArbitraryTriangle::triangle).collect()
    }
}

#[derive(Debug, Arbitrary)]
enum ArbitraryMutation {
    Add(ArbitraryMesh),
    Remove(usize),
    Replace(usize, ArbitraryMesh),
    RequestRebuild,
    Destroy,
}

#[derive(Debug, Arbitrary)]
struct Workload {
    meshes: Vec<ArbitraryMesh>,
    mutations: Vec<ArbitraryMutation>,
}

impl Workload {
    fn fuzz(self) {
        let mut scene = SceneBvh::default();
        let mut ids: Vec<MeshId> = self
            .meshes
            .iter()
            .map(|mesh| scene.add_mesh(mesh.triangles()))
            .collect();

        let mut mutations = self.mutations.into_iter();
        loop {
            // Check that these don't panic.
            scene.rebuild().unwrap();
            assert!(!scene.is_dirty());
            if let Some(root) = scene.root() {
                scene.arena().assert_consistent(
                    root,
                    scene.triangles(),
                    scene.config().shrink_factor,
                    scene.config().leaf_size,
                );
                // Every node is reachable from the root, so nothing leaked.
                assert_eq!(
                    scene.arena().subtree_len(root).unwrap(),
                    scene.arena().live_nodes()
                );
            } else {
                assert_eq!(scene.arena().live_nodes(), 0);
            }

            let flat = scene.flatten_indexed().unwrap();
            flat.assert_consistent();
            let mut indices = flat.triangle_indices.clone();
            indices.sort_unstable();
            assert!(indices.iter().copied().eq(0..scene.triangles().len() as u32));
            let _boxes = scene.debug_boxes(true).unwrap();

            match mutations.next() {
                Some(ArbitraryMutation::Add(mesh)) => ids.push(scene.add_mesh(mesh.triangles())),
                Some(ArbitraryMutation::Remove(index)) => {
                    if !ids.is_empty() {
                        let id = ids.remove(index % ids.len());
                        scene.remove_mesh(id).unwrap();
                    }
                }
                Some(ArbitraryMutation::Replace(index, mesh)) => {
                    if !ids.is_empty() {
                        let id = ids[index % ids.len()];
                        scene.replace_mesh_triangles(id, mesh.triangles()).unwrap();
                    }
                }
                Some(ArbitraryMutation::RequestRebuild) => scene.request_rebuild(),
                Some(ArbitraryMutation::Destroy) => scene.destroy().unwrap(),
                None => break,
            }
        }
    }
}
