//! Narrow-phase collision tests used by gameplay code
//!
//! - [`primitives`] - rays, triangles, spheres and capsules
//! - [`mesh`] - ray tests against triangle fans and strips

pub mod primitives;
pub mod mesh;

pub use primitives::{Capsule, Contact, Ray, Sphere, Triangle};
