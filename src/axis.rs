//! Axis enum for indexing three-dimensional structures and choosing split axes.

use crate::{Real, Vector3};
use std::fmt::{Display, Formatter, Result};
use std::ops::Index;

/// An `Axis` in a three-dimensional coordinate system.
/// Used to access coordinate arrays via index.
///
/// # Examples
/// ```
/// use scenebvh::axis::Axis;
///
/// let position = [1.0, 0.5, 42.0];
///
/// assert_eq!(position[Axis::Y], 0.5);
/// assert_eq!(position[Axis::Z], 42.0);
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Index of the X axis.
    X = 0,

    /// Index of the Y axis.
    Y = 1,

    /// Index of the Z axis.
    Z = 2,
}

impl Axis {
    /// Selects the axis to split a box of extent `size` along.
    ///
    /// X is the default. Y is taken only if it is strictly larger than both other
    /// extents; Z is checked afterwards with the same strict rule and overrides Y.
    /// On ties the earlier axis wins, which is not the same as an argmax.
    ///
    /// # Examples
    /// ```
    /// use scenebvh::axis::Axis;
    /// use scenebvh::Vector3;
    ///
    /// assert_eq!(Axis::select(&Vector3::new(2.0, 2.0, 1.0)), Axis::X);
    /// assert_eq!(Axis::select(&Vector3::new(1.0, 3.0, 2.0)), Axis::Y);
    /// assert_eq!(Axis::select(&Vector3::new(1.0, 2.0, 3.0)), Axis::Z);
    /// ```
    pub fn select(size: &Vector3) -> Axis {
        let mut axis = Axis::X;
        if size.y > size.x && size.y > size.z {
            axis = Axis::Y;
        }
        if size.z > size.x && size.z > size.y {
            axis = Axis::Z;
        }
        axis
    }

    /// Returns the coordinate of `v` along this axis.
    #[inline]
    pub fn of(self, v: &Vector3) -> Real {
        v.as_slice()[self]
    }
}

/// Display implementation for `Axis`.
impl Display for Axis {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(
            f,
            "{}",
            match *self {
                Axis::X => "x",
                Axis::Y => "y",
                Axis::Z => "z",
            }
        )
    }
}

/// Make slices indexable by `Axis`.
impl Index<Axis> for [Real] {
    type Output = Real;

    fn index(&self, axis: Axis) -> &Real {
        &self[axis as usize]
    }
}
