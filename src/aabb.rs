//! Axis Aligned Bounding Boxes, stored as center and size.

use crate::axis::Axis;
use crate::error::{BvhError, Result};
use crate::{Point3, Real, Vector3};
use std::fmt;

/// Axis aligned box described by its `center` and its full extent `size`.
///
/// Boxes produced by [`Aabb::enclosing`] carry the shrink factor in `size`,
/// see [`SHRINK_FACTOR`](crate::config::SHRINK_FACTOR).
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    /// Center of the box.
    pub center: Point3,

    /// Full extent of the box along each axis.
    pub size: Vector3,
}

/// A trait implemented by things which can be enclosed by an [`Aabb`].
pub trait Bounded {
    /// The point the running minimum and maximum start from.
    fn seed_point(&self) -> Point3;

    /// The componentwise minimum and maximum which must be enclosed.
    fn extent(&self) -> (Point3, Point3);
}

impl Default for Aabb {
    /// A zero sized box at the origin. Used for degenerate nodes.
    fn default() -> Aabb {
        Aabb {
            center: Point3::origin(),
            size: Vector3::zeros(),
        }
    }
}

impl Aabb {
    /// Creates a new [`Aabb`] from its center and full extent.
    pub fn new(center: Point3, size: Vector3) -> Aabb {
        Aabb { center, size }
    }

    /// Creates the box spanning `min` to `max`, with the extent scaled by `shrink_factor`.
    pub fn with_bounds(min: Point3, max: Point3, shrink_factor: Real) -> Aabb {
        Aabb {
            center: nalgebra::center(&min, &max),
            size: (max - min) * shrink_factor,
        }
    }

    /// Computes the box enclosing every item of `items`.
    ///
    /// The running bounds are seeded with the first item's [`Bounded::seed_point`] and
    /// grown by the [`Bounded::extent`] of every item. Fails with
    /// [`BvhError::EmptyInput`] if `items` is empty.
    ///
    /// # Examples
    /// ```
    /// use scenebvh::aabb::Aabb;
    /// use scenebvh::triangle::Triangle;
    /// use scenebvh::{Point3, Vector3};
    ///
    /// let triangle = Triangle::new(
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(2.0, 0.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// );
    /// let aabb = Aabb::enclosing(&[triangle], 1.0).unwrap();
    /// assert_eq!(aabb.center, Point3::new(1.0, 0.5, 0.0));
    /// assert_eq!(aabb.size, Vector3::new(2.0, 1.0, 0.0));
    /// ```
    pub fn enclosing<'a, B, I>(items: I, shrink_factor: Real) -> Result<Aabb>
    where
        B: Bounded + 'a,
        I: IntoIterator<Item = &'a B>,
    {
        let mut items = items.into_iter().peekable();
        let seed = match items.peek() {
            Some(first) => first.seed_point(),
            None => return Err(BvhError::EmptyInput),
        };

        let (min, max) = items.fold((seed, seed), |(min, max), item| {
            let (lo, hi) = item.extent();
            (min.inf(&lo), max.sup(&hi))
        });
        Ok(Aabb::with_bounds(min, max, shrink_factor))
    }

    /// Returns the minimum corner.
    pub fn min(&self) -> Point3 {
        self.center - self.size / 2.0
    }

    /// Returns the maximum corner.
    pub fn max(&self) -> Point3 {
        self.center + self.size / 2.0
    }

    /// Returns this box with the shrink factor undone, i.e. the box the enclosed
    /// geometry is guaranteed to lie in.
    pub fn relaxed(&self, shrink_factor: Real) -> Aabb {
        Aabb {
            center: self.center,
            size: self.size / shrink_factor,
        }
    }

    /// Returns true if the [`Point3`] is inside the [`Aabb`].
    pub fn contains(&self, p: &Point3) -> bool {
        let (min, max) = (self.min(), self.max());
        p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y && p.z >= min.z && p.z <= max.z
    }

    /// Returns true if the [`Point3`] is approximately inside the [`Aabb`]
    /// with respect to some `epsilon`.
    pub fn approx_contains_eps(&self, p: &Point3, epsilon: Real) -> bool {
        let (min, max) = (self.min(), self.max());
        (p.x - min.x) > -epsilon
            && (p.x - max.x) < epsilon
            && (p.y - min.y) > -epsilon
            && (p.y - max.y) < epsilon
            && (p.z - min.z) > -epsilon
            && (p.z - max.z) < epsilon
    }

    /// Returns true if `other` lies approximately inside this [`Aabb`].
    pub fn approx_contains_aabb_eps(&self, other: &Aabb, epsilon: Real) -> bool {
        self.approx_contains_eps(&other.min(), epsilon)
            && self.approx_contains_eps(&other.max(), epsilon)
    }

    /// Returns true if the box has no extent along any axis.
    pub fn is_degenerate(&self) -> bool {
        self.size == Vector3::zeros()
    }

    /// Returns the axis this box would be split along.
    pub fn split_axis(&self) -> Axis {
        Axis::select(&self.size)
    }
}

/// A box trusts its own corners; aggregation never looks at the primitives below it.
impl Bounded for Aabb {
    fn seed_point(&self) -> Point3 {
        self.center
    }

    fn extent(&self) -> (Point3, Point3) {
        (self.min(), self.max())
    }
}

impl fmt::Display for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "center: ({}, {}, {}) size: ({}, {}, {})",
            self.center.x, self.center.y, self.center.z, self.size.x, self.size.y, self.size.z
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::aabb::Aabb;
    use crate::axis::Axis;
    use crate::config::SHRINK_FACTOR;
    use crate::error::BvhError;
    use crate::testbase::{tuple_to_point, tuplevec_small_strategy};
    use crate::triangle::Triangle;
    use crate::{Point3, Vector3};
    use float_eq::assert_float_eq;
    use proptest::prelude::*;

    #[test]
    fn test_enclosing_empty_is_rejected() {
        let triangles: Vec<Triangle> = Vec::new();
        assert_eq!(
            Aabb::enclosing(&triangles, SHRINK_FACTOR),
            Err(BvhError::EmptyInput)
        );
        let boxes: Vec<Aabb> = Vec::new();
        assert_eq!(
            Aabb::enclosing(&boxes, SHRINK_FACTOR),
            Err(BvhError::EmptyInput)
        );
    }

    #[test]
    fn test_enclosing_triangles_applies_shrink_factor() {
        let triangles = [
            Triangle::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ),
            Triangle::new(
                Point3::new(-3.0, 2.0, 4.0),
                Point3::new(1.0, 5.0, 0.0),
                Point3::new(0.0, 1.0, -4.0),
            ),
        ];
        let aabb = Aabb::enclosing(&triangles, SHRINK_FACTOR).unwrap();
        assert_eq!(aabb.center, Point3::new(-1.0, 2.5, 0.0));
        assert_float_eq!(aabb.size.x, 4.0 * 0.96, abs <= 1e-6);
        assert_float_eq!(aabb.size.y, 5.0 * 0.96, abs <= 1e-6);
        assert_float_eq!(aabb.size.z, 8.0 * 0.96, abs <= 1e-6);
    }

    #[test]
    fn test_enclosing_boxes_uses_corners() {
        let boxes = [
            Aabb::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(2.0, 2.0, 2.0)),
            Aabb::new(Point3::new(10.0, 0.0, 0.0), Vector3::new(4.0, 2.0, 2.0)),
        ];
        let aabb = Aabb::enclosing(&boxes, 1.0).unwrap();
        assert_eq!(aabb.min(), Point3::new(-1.0, -1.0, -1.0));
        assert_eq!(aabb.max(), Point3::new(12.0, 1.0, 1.0));
    }

    #[test]
    fn test_split_axis_follows_longest_extent() {
        let flat = Aabb::new(Point3::origin(), Vector3::new(1.0, 0.5, 0.0));
        assert_eq!(flat.split_axis(), Axis::X);
        let tall = Aabb::new(Point3::origin(), Vector3::new(1.0, 6.0, 2.0));
        assert_eq!(tall.split_axis(), Axis::Y);
        let deep = Aabb::new(Point3::origin(), Vector3::new(1.0, 6.0, 7.0));
        assert_eq!(deep.split_axis(), Axis::Z);
    }

    #[test]
    fn test_default_is_degenerate() {
        let aabb = Aabb::default();
        assert!(aabb.is_degenerate());
        assert!(aabb.contains(&Point3::origin()));
    }

    proptest! {
        // Test whether an AABB always contains its center.
        #[test]
        fn test_aabb_contains_center(a in tuplevec_small_strategy(), b in tuplevec_small_strategy()) {
            let p1 = tuple_to_point(&a);
            let p2 = tuple_to_point(&b);
            let aabb = Aabb::with_bounds(p1.inf(&p2), p1.sup(&p2), SHRINK_FACTOR);
            assert!(aabb.contains(&aabb.center));
        }

        // The relaxed box of a set of points contains all of them.
        #[test]
        fn test_relaxed_contains_all_points(points in proptest::collection::vec(tuplevec_small_strategy(), 1..20)) {
            let points = points.iter().map(tuple_to_point).collect::<Vec<Point3>>();
            let boxes = points
                .iter()
                .map(|p| Aabb::new(*p, Vector3::zeros()))
                .collect::<Vec<_>>();
            let aabb = Aabb::enclosing(&boxes, SHRINK_FACTOR).unwrap().relaxed(SHRINK_FACTOR);
            let epsilon = aabb.size.amax() * 1e-5 + 1e-5;
            for point in &points {
                prop_assert!(aabb.approx_contains_eps(point, epsilon));
            }
        }

        // Joining two boxes yields a box containing both.
        #[test]
        fn test_join_two_aabbs(a in tuplevec_small_strategy(), b in tuplevec_small_strategy(),
                               c in tuplevec_small_strategy(), d in tuplevec_small_strategy()) {
            let first = Aabb::with_bounds(tuple_to_point(&a).inf(&tuple_to_point(&b)), tuple_to_point(&a).sup(&tuple_to_point(&b)), 1.0);
            let second = Aabb::with_bounds(tuple_to_point(&c).inf(&tuple_to_point(&d)), tuple_to_point(&c).sup(&tuple_to_point(&d)), 1.0);
            let joint = Aabb::enclosing(&[first, second], 1.0).unwrap();
            let epsilon = joint.size.amax() * 1e-5 + 1e-5;
            prop_assert!(joint.approx_contains_aabb_eps(&first, epsilon));
            prop_assert!(joint.approx_contains_aabb_eps(&second, epsilon));
        }
    }
}
