//! Common utilities shared by unit tests.
#![cfg(test)]

use crate::aabb::Aabb;
use crate::triangle::Triangle;
use crate::{Point3, Vector3};
use num::{FromPrimitive, Integer};
use obj::raw::object::Polygon;
use obj::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A vector represented as a tuple
pub type TupleVec = (f32, f32, f32);

/// Generate a `TupleVec` for [`proptest::strategy::Strategy`] from -10e10 to 10e10
/// A small enough range to prevent most fp32 errors from breaking certain tests
pub fn tuplevec_small_strategy() -> impl Strategy<Value = TupleVec> {
    (
        -10e10_f32..10e10_f32,
        -10e10_f32..10e10_f32,
        -10e10_f32..10e10_f32,
    )
}

/// Convert a `TupleVec` to a [`Point3`].
pub fn tuple_to_point(tpl: &TupleVec) -> Point3 {
    Point3::new(tpl.0, tpl.1, tpl.2)
}

/// Routes `log` output through the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates `n` small triangles in the XY plane, the `i`th one at `x = i`. Centroids
/// increase with the index and the X extent dominates from two triangles on.
pub fn colinear_triangles(n: usize) -> Vec<Triangle> {
    (0..n)
        .map(|i| {
            let x = i as f32;
            Triangle::new(
                Point3::new(x, 0.0, 0.0),
                Point3::new(x + 0.5, 0.0, 0.0),
                Point3::new(x, 0.5, 0.0),
            )
        })
        .collect()
}

/// Creates `n` triangles with vertices drawn uniformly from `[-100, 100]³`.
pub fn random_triangles(n: usize, seed: u64) -> Vec<Triangle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut point = || {
        Point3::new(
            rng.random_range(-100.0..100.0),
            rng.random_range(-100.0..100.0),
            rng.random_range(-100.0..100.0),
        )
    };
    (0..n)
        .map(|_| {
            let (a, b, c) = (point(), point(), point());
            Triangle::new(a, b, c)
        })
        .collect()
}

impl<I: FromPrimitive + Integer> FromRawVertex<I> for Triangle {
    fn process(
        vertices: Vec<(f32, f32, f32, f32)>,
        _: Vec<(f32, f32, f32)>,
        _: Vec<(f32, f32, f32)>,
        polygons: Vec<Polygon>,
    ) -> ObjResult<(Vec<Self>, Vec<I>)> {
        let points = vertices
            .into_iter()
            .map(|v| Point3::new(v.0, v.1, v.2))
            .collect::<Vec<_>>();

        // Polygons are fanned out around their first vertex.
        let mut triangles = Vec::with_capacity(polygons.len());
        let mut push_fan = |indices: Vec<usize>| {
            if let [anchor, rest @ ..] = indices.as_slice() {
                for pair in rest.windows(2) {
                    triangles.push(Triangle::new(
                        points[*anchor],
                        points[pair[0]],
                        points[pair[1]],
                    ));
                }
            }
        };
        for polygon in polygons {
            match polygon {
                Polygon::P(vec) => push_fan(vec),
                Polygon::PT(vec) | Polygon::PN(vec) => {
                    push_fan(vec.iter().map(|vertex| vertex.0).collect())
                }
                Polygon::PTN(vec) => push_fan(vec.iter().map(|vertex| vertex.0).collect()),
            }
        }
        Ok((triangles, Vec::new()))
    }
}

/// A unit cube with quad faces.
pub const CUBE_OBJ: &str = "\
v -0.5 -0.5 -0.5
v 0.5 -0.5 -0.5
v 0.5 0.5 -0.5
v -0.5 0.5 -0.5
v -0.5 -0.5 0.5
v 0.5 -0.5 0.5
v 0.5 0.5 0.5
v -0.5 0.5 0.5
f 1 4 3 2
f 5 6 7 8
f 1 2 6 5
f 2 3 7 6
f 3 4 8 7
f 4 1 5 8
";

/// Loads the triangles of an OBJ document.
pub fn load_obj_triangles(source: &str) -> Vec<Triangle> {
    let obj: Obj<Triangle, u32> = load_obj(source.as_bytes()).unwrap();
    obj.vertices
}

/// Creates a unit size cube centered at `pos` and pushes the triangles to `triangles`.
pub fn push_cube(pos: Point3, triangles: &mut Vec<Triangle>) {
    let corner = |x: f32, y: f32, z: f32| pos + Vector3::new(x, y, z);
    let top_front_right = corner(0.5, 0.5, -0.5);
    let top_back_right = corner(0.5, 0.5, 0.5);
    let top_back_left = corner(-0.5, 0.5, 0.5);
    let top_front_left = corner(-0.5, 0.5, -0.5);
    let bottom_front_right = corner(0.5, -0.5, -0.5);
    let bottom_back_right = corner(0.5, -0.5, 0.5);
    let bottom_back_left = corner(-0.5, -0.5, 0.5);
    let bottom_front_left = corner(-0.5, -0.5, -0.5);

    let faces = [
        (top_back_right, top_front_right, top_front_left),
        (top_front_left, top_back_left, top_back_right),
        (bottom_front_left, bottom_front_right, bottom_back_right),
        (bottom_back_right, bottom_back_left, bottom_front_left),
        (top_back_left, top_front_left, bottom_front_left),
        (bottom_front_left, bottom_back_left, top_back_left),
        (bottom_front_right, top_front_right, top_back_right),
        (top_back_right, bottom_back_right, bottom_front_right),
        (top_front_left, top_front_right, bottom_front_right),
        (bottom_front_right, bottom_front_left, top_front_left),
        (bottom_back_right, top_back_right, top_back_left),
        (top_back_left, bottom_back_left, bottom_back_right),
    ];
    triangles.extend(faces.iter().map(|&(a, b, c)| Triangle::new(a, b, c)));
}

/// Implementation of splitmix64.
/// For reference see: http://xoroshiro.di.unimi.it/splitmix64.c
fn splitmix64(x: &mut u64) -> u64 {
    *x = x.wrapping_add(0x9E3779B97F4A7C15u64);
    let mut z = *x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9u64);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EBu64);
    z ^ (z >> 31)
}

/// Generates a new `Point3`, which will lie inside the given `bounds`. Mutates the seed.
pub fn next_point3(seed: &mut u64, bounds: &Aabb) -> Point3 {
    let u = splitmix64(seed);
    let a = (u >> 32) as u32 as f32 / u32::MAX as f32;
    let b = u as u32 as f32 / u32::MAX as f32;
    let c = (u >> 16) as u32 as f32 / u32::MAX as f32;
    bounds.min() + bounds.size.component_mul(&Vector3::new(a, b, c))
}

/// Returns an [`Aabb`] which defines the default testing space bounds.
pub fn default_bounds() -> Aabb {
    Aabb::with_bounds(
        Point3::new(-100_000.0, -100_000.0, -100_000.0),
        Point3::new(100_000.0, 100_000.0, 100_000.0),
        1.0,
    )
}

/// Creates `n` deterministic random cubes. Returns the `Vec` of surface [`Triangle`]s.
pub fn create_n_cubes(n: usize, bounds: &Aabb) -> Vec<Triangle> {
    let mut triangles = Vec::with_capacity(n * 12);
    let mut seed = 0;
    for _ in 0..n {
        push_cube(next_point3(&mut seed, bounds), &mut triangles);
    }
    triangles
}

mod tests {
    use crate::testbase::{
        create_n_cubes, default_bounds, load_obj_triangles, next_point3, CUBE_OBJ,
    };

    #[test]
    fn test_obj_quads_are_fanned() {
        let triangles = load_obj_triangles(CUBE_OBJ);
        assert_eq!(triangles.len(), 12);
        for triangle in &triangles {
            assert!((triangle.face_normal().norm() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_random_points_stay_in_bounds() {
        let bounds = default_bounds();
        let mut seed = 7;
        for _ in 0..1000 {
            let point = next_point3(&mut seed, &bounds);
            assert!(bounds.approx_contains_eps(&point, 1.0));
        }
        assert_eq!(create_n_cubes(3, &bounds).len(), 36);
    }
}
