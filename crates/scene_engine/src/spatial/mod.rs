//! Spatial indices consumed by the scene queries
//!
//! - [`terrain`] - heightfield grid with height/normal lookups and line walks

pub mod terrain;

pub use terrain::{xz, MapPoint, MapRect, Terrain, TerrainError, TerrainVertex};
