//! The eye: camera state producing projection and view matrices
//!
//! An eye is not a scene node. It can be attached to one, in which case
//! [`Eye::update`] copies that node's world placement every frame.

use crate::config::EyeConfig;
use crate::foundation::math::{utils, Mat4, Mat4Ext, Quat, Quaternion, Vec3};
use crate::scene::frustum::{Frustum, Plane};
use crate::scene::scene_graph::{NodeId, SceneGraph};

/// Camera with an optional node to follow
#[derive(Debug, Clone)]
pub struct Eye {
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    fov_y_degrees: f32,
    aspect: f32,
    near_plane: f32,
    far_plane: f32,
    view_offset: Vec3,
    attached: Option<NodeId>,
    last_position: Vec3,
    velocity: Vec3,
    clip_plane: Option<Plane>,
    view: Mat4,
    view_inverse: Mat4,
    projection: Mat4,
}

impl Default for Eye {
    fn default() -> Self {
        Self::new(&EyeConfig::default())
    }
}

impl Eye {
    /// Create an unattached eye at the origin
    pub fn new(config: &EyeConfig) -> Self {
        let mut eye = Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            fov_y_degrees: config.fov_y_degrees,
            aspect: config.aspect,
            near_plane: config.near_plane,
            far_plane: config.far_plane,
            view_offset: config.view_offset,
            attached: None,
            last_position: Vec3::zeros(),
            velocity: Vec3::zeros(),
            clip_plane: None,
            view: Mat4::identity(),
            view_inverse: Mat4::identity(),
            projection: Mat4::identity(),
        };
        eye.sync_matrices();
        eye
    }

    /// Follow `node` from the next update on
    pub fn attach(&mut self, node: NodeId) {
        self.attached = Some(node);
    }

    /// Stop following
    pub fn detach(&mut self) {
        self.attached = None;
    }

    /// Node being followed
    pub fn attached(&self) -> Option<NodeId> {
        self.attached
    }

    /// Copy the attached node's world placement and measure velocity
    pub fn update(&mut self, graph: &SceneGraph, delta: f32) {
        if let Some(node) = self.attached {
            match (graph.world_position(node), graph.world_rotation(node)) {
                (Some(position), Some(rotation)) => {
                    self.position = position;
                    self.rotation = rotation;
                }
                _ => {
                    log::debug!("eye target {node:?} no longer exists, detaching");
                    self.attached = None;
                }
            }
        }
        if delta > 0.0 {
            self.velocity = (self.position - self.last_position) / delta;
        }
        self.last_position = self.position;
        self.sync_matrices();
    }

    /// World position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Move the eye
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.sync_matrices();
    }

    /// World rotation
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Turn the eye
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.sync_matrices();
    }

    /// Scale applied after the view offset, `(1, -1, 1)` for mirrored passes
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.sync_matrices();
    }

    /// Change the aspect ratio, e.g. after a resize
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.sync_matrices();
    }

    /// Viewing direction
    pub fn direction(&self) -> Vec3 {
        self.rotation * Vec3::z()
    }

    /// Up vector
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::y()
    }

    /// Velocity measured by the last update
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Near clipping distance
    pub fn near_plane(&self) -> f32 {
        self.near_plane
    }

    /// Far clipping distance
    pub fn far_plane(&self) -> f32 {
        self.far_plane
    }

    /// Active user clipping plane
    pub fn clip_plane(&self) -> Option<Plane> {
        self.clip_plane
    }

    /// Set or clear the user clipping plane
    pub fn set_clip_plane(&mut self, plane: Option<Plane>) {
        self.clip_plane = plane;
    }

    /// World to eye transform
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    /// Eye to world transform
    pub fn view_matrix_inverse(&self) -> &Mat4 {
        &self.view_inverse
    }

    /// Perspective projection
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// World-space frustum of the current matrices
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrices(&self.projection, &self.view)
    }

    /// Detached copy mirrored about the horizontal plane at `water_height`,
    /// clipped so that only geometry on the eye's side of the water shows.
    pub fn mirrored(&self, water_height: f32, clip_offset: f32) -> Eye {
        let mut mirrored = self.clone();
        mirrored.detach();

        let q = self.rotation.quaternion();
        mirrored.rotation = Quat::new_normalize(Quaternion::new(q.w, -q.i, q.j, -q.k));
        mirrored.position.y = -self.position.y + 2.0 * water_height;
        mirrored.scale = Vec3::new(1.0, -1.0, 1.0);
        mirrored.clip_plane = Some(if self.position.y > water_height {
            Plane::new(Vec3::y(), -water_height + clip_offset)
        } else {
            Plane::new(-Vec3::y(), water_height + clip_offset)
        });
        mirrored.sync_matrices();
        mirrored
    }

    /// Copy clipped to the far side of the water, for the refraction pass
    pub fn refracted(&self, water_height: f32, clip_offset: f32) -> Eye {
        let mut refracted = self.clone();
        refracted.detach();
        refracted.clip_plane = Some(if self.position.y > water_height {
            Plane::new(-Vec3::y(), water_height + clip_offset)
        } else {
            Plane::new(Vec3::y(), -water_height + clip_offset)
        });
        refracted
    }

    fn sync_matrices(&mut self) {
        self.projection = Mat4::perspective(
            utils::deg_to_rad(self.fov_y_degrees),
            self.aspect,
            self.near_plane,
            self.far_plane,
        );
        self.view_inverse = Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::rotation_y(std::f32::consts::PI)
            * Mat4::new_translation(&self.view_offset)
            * Mat4::new_nonuniform_scaling(&self.scale);
        self.view = self.view_inverse.try_inverse().unwrap_or_else(Mat4::identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_view_looks_along_direction() {
        let mut eye = Eye::default();
        eye.set_position(Vec3::new(0.0, 5.0, 0.0));

        // a point in front of the eye ends up on the negative view z axis
        let ahead = eye.view_matrix() * Vec4::new(0.0, 5.0, 10.0, 1.0);
        assert_relative_eq!(ahead.x, 0.0, epsilon = EPSILON);
        assert_relative_eq!(ahead.y, 0.0, epsilon = EPSILON);
        assert_relative_eq!(ahead.z, -10.0, epsilon = EPSILON);

        let frustum = eye.frustum();
        assert!(frustum.is_point_in_frustum(&Vec3::new(0.0, 5.0, 10.0)));
        assert!(!frustum.is_point_in_frustum(&Vec3::new(0.0, 5.0, -10.0)));
    }

    #[test]
    fn test_mirrored_eye() {
        let mut eye = Eye::default();
        eye.set_position(Vec3::new(1.0, 7.0, 2.0));
        eye.attach(NodeId::default());

        let mirrored = eye.mirrored(2.0, 0.01);
        assert_eq!(mirrored.attached(), None);
        assert_relative_eq!(mirrored.position(), Vec3::new(1.0, -3.0, 2.0), epsilon = EPSILON);

        let plane = mirrored.clip_plane().expect("mirrored eye is clipped");
        assert_relative_eq!(plane.normal, Vec3::y(), epsilon = EPSILON);
        assert_relative_eq!(plane.distance, -1.99, epsilon = EPSILON);

        // the mirrored view maps the mirrored point to the same eye coordinates
        let point = Vec4::new(3.0, 4.0, 9.0, 1.0);
        let reflected = Vec4::new(3.0, 0.0, 9.0, 1.0);
        let a = eye.view_matrix() * point;
        let b = mirrored.view_matrix() * reflected;
        assert_relative_eq!(a, b, epsilon = 1e-4);
    }

    #[test]
    fn test_refracted_eye_clips_far_side() {
        let mut eye = Eye::default();
        eye.set_position(Vec3::new(0.0, 5.0, 0.0));
        let plane = eye.refracted(0.0, 0.01).clip_plane().expect("clipped");
        assert!(plane.distance_to_point(&Vec3::new(0.0, -1.0, 0.0)) > 0.0);
        assert!(plane.distance_to_point(&Vec3::new(0.0, 1.0, 0.0)) < 0.0);
    }
}
