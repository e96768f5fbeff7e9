//! Strongly-typed domain types.

mod level;

pub use level::MeshLevel;
