//! The triangle primitive shared by the builder and the GPU triangle buffer.

use crate::aabb::Bounded;
use crate::{Point3, Real, Vector3, EPSILON};
use bytemuck::{Pod, Zeroable};

/// A triangle as it is uploaded to the GPU (96 bytes).
///
/// Positions and the normal carry a fourth padding component so every vector
/// starts on a 16 byte boundary. `mesh_index` refers back to the owning mesh.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Triangle {
    pub v0: [f32; 4],
    pub v1: [f32; 4],
    pub v2: [f32; 4],
    pub normal: [f32; 4],
    pub color: [f32; 4],
    pub reflectiveness: f32,
    pub mesh_index: u32,
    _pad: [u32; 2],
}

fn pad(p: &Point3) -> [f32; 4] {
    [p.x, p.y, p.z, 1.0]
}

fn unpad(v: &[f32; 4]) -> Point3 {
    Point3::new(v[0], v[1], v[2])
}

impl Triangle {
    /// Creates a white, non-reflective triangle and precomputes its face normal.
    /// Degenerate triangles get a zero normal.
    pub fn new(a: Point3, b: Point3, c: Point3) -> Triangle {
        let normal = (b - a)
            .cross(&(c - a))
            .try_normalize(EPSILON)
            .unwrap_or_else(Vector3::zeros);
        Triangle {
            v0: pad(&a),
            v1: pad(&b),
            v2: pad(&c),
            normal: [normal.x, normal.y, normal.z, 0.0],
            color: [1.0, 1.0, 1.0, 1.0],
            reflectiveness: 0.0,
            mesh_index: 0,
            _pad: [0; 2],
        }
    }

    /// Sets the RGBA color.
    pub fn with_color(mut self, color: [f32; 4]) -> Triangle {
        self.color = color;
        self
    }

    /// Sets the reflectiveness.
    pub fn with_reflectiveness(mut self, reflectiveness: Real) -> Triangle {
        self.reflectiveness = reflectiveness;
        self
    }

    /// Returns the three vertex positions.
    pub fn vertices(&self) -> [Point3; 3] {
        [unpad(&self.v0), unpad(&self.v1), unpad(&self.v2)]
    }

    /// Returns the precomputed face normal.
    pub fn face_normal(&self) -> Vector3 {
        Vector3::new(self.normal[0], self.normal[1], self.normal[2])
    }

    /// Returns `(v0 + v1 + v2) / 3`, the point triangles are ranked by when splitting.
    pub fn centroid(&self) -> Point3 {
        let [a, b, c] = self.vertices();
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }
}

impl Bounded for Triangle {
    fn seed_point(&self) -> Point3 {
        unpad(&self.v0)
    }

    fn extent(&self) -> (Point3, Point3) {
        let [a, b, c] = self.vertices();
        (a.inf(&b).inf(&c), a.sup(&b).sup(&c))
    }
}
