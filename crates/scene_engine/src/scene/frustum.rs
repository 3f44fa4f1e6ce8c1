//! View frustum extraction and containment tests
//!
//! Planes are pulled out of `projection * view` with the Gribb-Hartmann
//! row sums and stored normalized, so `distance_to_point` is a true
//! distance. Positive means inside.

use crate::foundation::math::{Mat4, Mat4Ext, Vec3, Vec4};

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal, pointing into the kept half-space
    pub normal: Vec3,
    /// Offset along the normal (the plane's `w` component)
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Plane through `point` facing `normal`
    pub fn from_point_normal(point: &Vec3, normal: &Vec3) -> Self {
        let normal = normal.normalize();
        Self { normal, distance: -normal.dot(point) }
    }

    /// Build from raw `(a, b, c, d)` coefficients, normalized by `|(a, b, c)|`
    pub fn from_coefficients(v: &Vec4) -> Self {
        let length = v.xyz().norm();
        if length <= f32::EPSILON {
            return Self::new(Vec3::zeros(), v.w);
        }
        Self::new(v.xyz() / length, v.w / length)
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// Coefficients as a 4-vector
    pub fn as_vec4(&self) -> Vec4 {
        Vec4::new(self.normal.x, self.normal.y, self.normal.z, self.distance)
    }
}

/// Index of each plane inside [`Frustum::planes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumSide {
    /// `row3 - row0`
    Right = 0,
    /// `row3 + row0`
    Left = 1,
    /// `row3 + row1`
    Bottom = 2,
    /// `row3 - row1`
    Top = 3,
    /// `row3 - row2`
    Far = 4,
    /// `row3 + row2`
    Near = 5,
}

/// Six clip planes snapshot for one pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Default for Frustum {
    fn default() -> Self {
        Self::from_matrices(&Mat4::identity(), &Mat4::identity())
    }
}

impl Frustum {
    /// Frustum of `projection * view`
    pub fn from_matrices(projection: &Mat4, view: &Mat4) -> Self {
        let mut frustum = Self { planes: [Plane::new(Vec3::zeros(), 0.0); 6] };
        frustum.sync(projection, view);
        frustum
    }

    /// Recompute the planes from new matrices
    pub fn sync(&mut self, projection: &Mat4, view: &Mat4) {
        let clip = projection * view;
        let r0 = clip.row_vec(0);
        let r1 = clip.row_vec(1);
        let r2 = clip.row_vec(2);
        let r3 = clip.row_vec(3);

        self.planes = [
            Plane::from_coefficients(&(r3 - r0)),
            Plane::from_coefficients(&(r3 + r0)),
            Plane::from_coefficients(&(r3 + r1)),
            Plane::from_coefficients(&(r3 - r1)),
            Plane::from_coefficients(&(r3 - r2)),
            Plane::from_coefficients(&(r3 + r2)),
        ];
    }

    /// All six planes
    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    /// One plane by side
    pub fn plane(&self, side: FrustumSide) -> &Plane {
        &self.planes[side as usize]
    }

    /// True iff `point` is strictly inside all six planes
    pub fn is_point_in_frustum(&self, point: &Vec3) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(point) > 0.0)
    }

    /// True unless the sphere lies entirely outside one plane.
    ///
    /// Spheres straddling a plane are kept.
    pub fn is_sphere_in_frustum(&self, center: &Vec3, radius: f32) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(center) > -radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::utils::deg_to_rad;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    /// Camera at the origin looking down -Z, 90 degree fov, near 1, far 100
    fn camera_frustum() -> Frustum {
        let projection = Mat4::perspective(deg_to_rad(90.0), 1.0, 1.0, 100.0);
        Frustum::from_matrices(&projection, &Mat4::identity())
    }

    #[test]
    fn test_planes_are_normalized() {
        for plane in camera_frustum().planes() {
            assert_relative_eq!(plane.normal.norm(), 1.0, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_near_and_far_plane_positions() {
        let frustum = camera_frustum();
        let near = frustum.plane(FrustumSide::Near);
        let far = frustum.plane(FrustumSide::Far);

        assert_relative_eq!(near.distance_to_point(&Vec3::new(0.0, 0.0, -1.0)), 0.0, epsilon = EPSILON);
        assert_relative_eq!(far.distance_to_point(&Vec3::new(0.0, 0.0, -100.0)), 0.0, epsilon = 1e-3);
        assert_relative_eq!(near.normal, Vec3::new(0.0, 0.0, -1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_point_containment() {
        let frustum = camera_frustum();
        assert!(frustum.is_point_in_frustum(&Vec3::new(0.0, 0.0, -10.0)));
        assert!(frustum.is_point_in_frustum(&Vec3::new(4.0, -4.0, -10.0)));
        assert!(!frustum.is_point_in_frustum(&Vec3::new(0.0, 0.0, 10.0)));
        assert!(!frustum.is_point_in_frustum(&Vec3::new(20.0, 0.0, -10.0)));
        assert!(!frustum.is_point_in_frustum(&Vec3::new(0.0, 0.0, -200.0)));
        assert!(!frustum.is_point_in_frustum(&Vec3::new(0.0, 0.0, -0.5)));
    }

    #[test]
    fn test_sphere_fully_outside_is_rejected() {
        let frustum = camera_frustum();
        // behind the camera
        assert!(!frustum.is_sphere_in_frustum(&Vec3::new(0.0, 0.0, 10.0), 2.0));
        // far to the right of the 45 degree side plane
        assert!(!frustum.is_sphere_in_frustum(&Vec3::new(50.0, 0.0, -10.0), 5.0));
        // beyond the far plane
        assert!(!frustum.is_sphere_in_frustum(&Vec3::new(0.0, 0.0, -150.0), 10.0));
    }

    #[test]
    fn test_sphere_with_center_inside_is_kept_for_any_radius() {
        let frustum = camera_frustum();
        let center = Vec3::new(1.0, 2.0, -30.0);
        for radius in [0.0, 0.001, 1.0, 50.0, 1.0e6] {
            assert!(frustum.is_sphere_in_frustum(&center, radius));
        }
    }

    #[test]
    fn test_straddling_sphere_is_kept() {
        let frustum = camera_frustum();
        // center just outside the right plane, radius reaches back in
        let center = Vec3::new(11.0, 0.0, -10.0);
        assert!(!frustum.is_point_in_frustum(&center));
        assert!(frustum.is_sphere_in_frustum(&center, 2.0));
    }

    #[test]
    fn test_view_matrix_moves_frustum() {
        let projection = Mat4::perspective(deg_to_rad(90.0), 1.0, 1.0, 100.0);
        let view = Mat4::new_translation(&Vec3::new(0.0, 0.0, -50.0));
        let frustum = Frustum::from_matrices(&projection, &view);

        // world origin now sits 50 units in front of the camera
        assert!(frustum.is_point_in_frustum(&Vec3::zeros()));
        assert!(!frustum.is_point_in_frustum(&Vec3::new(0.0, 0.0, -60.0)));
    }

    #[test]
    fn test_plane_from_point_normal() {
        let plane = Plane::from_point_normal(&Vec3::new(0.0, 2.0, 0.0), &Vec3::new(0.0, 3.0, 0.0));
        assert_relative_eq!(plane.distance_to_point(&Vec3::new(5.0, 5.0, 5.0)), 3.0);
        assert_relative_eq!(plane.as_vec4(), Vec4::new(0.0, 1.0, 0.0, -2.0));
    }
}
