//! Per-node local transform with a lazily validated world matrix
//!
//! Position and rotation are private: every mutation goes through a setter
//! that clears the cached matrix, so a stale world matrix can never be read.
//! The scene graph additionally invalidates every descendant when an
//! ancestor moves.

use std::cell::Cell;

use crate::foundation::math::{Mat4, Quat, Vec3};

/// Local placement of a node relative to its parent
#[derive(Debug, Clone)]
pub struct NodeTransform {
    position: Vec3,
    rotation: Quat,
    world: Cell<Mat4>,
    valid: Cell<bool>,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::new(Vec3::zeros(), Quat::identity())
    }
}

impl NodeTransform {
    /// Create a transform; the world matrix starts invalid
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            world: Cell::new(Mat4::identity()),
            valid: Cell::new(false),
        }
    }

    /// Create from position only
    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::identity())
    }

    /// Position relative to the parent
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Rotation relative to the parent
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub(crate) fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.invalidate();
    }

    pub(crate) fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.invalidate();
    }

    /// `translate(position) * rotate(rotation)`
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position) * self.rotation.to_homogeneous()
    }

    /// Local forward axis (`+Z`) in parent space
    pub fn direction(&self) -> Vec3 {
        self.rotation * Vec3::z()
    }

    /// Local left axis (`+X`) in parent space
    pub fn left(&self) -> Vec3 {
        self.rotation * Vec3::x()
    }

    /// Local up axis (`+Y`) in parent space
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::y()
    }

    /// Whether the cached world matrix can be read as is
    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }

    pub(crate) fn invalidate(&self) {
        self.valid.set(false);
    }

    /// Return the cached world matrix, recomputing it from `parent_world`
    /// first when the cache is invalid.
    ///
    /// `parent_world` is only evaluated on a cache miss.
    pub(crate) fn world_matrix_with(&self, parent_world: impl FnOnce() -> Mat4) -> Mat4 {
        if !self.valid.get() {
            self.world.set(parent_world() * self.local_matrix());
            self.valid.set(true);
        }
        self.world.get()
    }
}
