//! Physics module
//!
//! Only the primitive sphere and ray tests gameplay relies on; there is no
//! rigid body simulation.

pub mod collision;

pub use collision::{Capsule, Contact, Ray, Sphere, Triangle};
