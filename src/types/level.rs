//! Mesh level index.
//!
//! Icosahedral meshes form a refinement hierarchy: level 0 is the
//! icosahedron itself and every further level splits each triangle into
//! four. A `MeshLevel` names one resolution in that hierarchy and keeps
//! level numbers from being mixed up with vertex or channel counts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Resolution level in an icosahedral subdivision hierarchy.
///
/// # Example
///
/// ```
/// use uscnn_rs::types::MeshLevel;
///
/// let level = MeshLevel::new(3);
/// assert_eq!(level.get(), 3);
/// assert_eq!(level.coarser(), Some(MeshLevel::new(2)));
/// assert_eq!(MeshLevel::ZERO.coarser(), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MeshLevel(usize);

impl MeshLevel {
    /// The coarsest level (the icosahedron).
    pub const ZERO: Self = Self(0);

    /// Create a new level index.
    #[inline]
    pub const fn new(level: usize) -> Self {
        Self(level)
    }

    /// Get the raw level value.
    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }

    /// The next coarser level, or `None` at level 0.
    #[inline]
    pub fn coarser(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }

    /// The next finer level.
    #[inline]
    pub fn finer(self) -> Self {
        Self(self.0 + 1)
    }

    /// Iterate over the inclusive range `[lo, hi]`.
    pub fn range_inclusive(lo: MeshLevel, hi: MeshLevel) -> impl Iterator<Item = MeshLevel> + ExactSizeIterator {
        (lo.0..hi.0 + 1).map(MeshLevel)
    }
}

impl fmt::Display for MeshLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl From<usize> for MeshLevel {
    #[inline]
    fn from(level: usize) -> Self {
        Self(level)
    }
}

impl From<MeshLevel> for usize {
    #[inline]
    fn from(level: MeshLevel) -> usize {
        level.0
    }
}
