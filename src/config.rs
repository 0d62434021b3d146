//! Build configuration.

use crate::error::{BvhError, Result};
use crate::Real;

/// Maximum number of triangles a leaf holds by default.
pub const LEAF_SIZE: usize = 8;

/// Factor applied to the extent of every computed box.
///
/// Boxes come out 4% smaller than the geometry they enclose, so vertices may lie up to
/// 2% of the extent outside a box on each side.
pub const SHRINK_FACTOR: Real = 0.96;

/// Parameters of the partition builder and the aggregator.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BuildConfig {
    /// Triangle sets of at most this size become leaves.
    pub leaf_size: usize,

    /// Scale applied to the extent of every node box.
    pub shrink_factor: Real,
}

impl Default for BuildConfig {
    fn default() -> BuildConfig {
        BuildConfig {
            leaf_size: LEAF_SIZE,
            shrink_factor: SHRINK_FACTOR,
        }
    }
}

impl BuildConfig {
    /// Checks that the leaf size is non-zero and the shrink factor lies in `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.leaf_size == 0 {
            return Err(BvhError::InvalidConfig(
                "leaf_size must be at least 1".to_string(),
            ));
        }
        if !(self.shrink_factor > 0.0 && self.shrink_factor <= 1.0) {
            return Err(BvhError::InvalidConfig(format!(
                "shrink_factor must lie in (0, 1], got {}",
                self.shrink_factor
            )));
        }
        Ok(())
    }
}
