//! Math utilities and types
//!
//! Thin aliases over nalgebra plus the handful of helpers the scene graph,
//! terrain and gameplay code share. Conventions follow the classic OpenGL
//! setup: right-handed world, Y up, clip-space depth in `[-1, 1]`. A node's
//! local forward direction is `+Z`, left is `+X` and up is `+Y`.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Tolerance used by geometric tests to reject degenerate input
    pub const GEOMETRY_EPSILON: f32 = f32::EPSILON;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Quat, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Rotation that turns `from` onto `to`.
    ///
    /// Both inputs are expected to be unit length. Parallel vectors yield the
    /// identity; anti-parallel vectors yield a half turn around any
    /// perpendicular axis.
    pub fn rotation_from_to(from: &Vec3, to: &Vec3) -> Quat {
        Quat::rotation_between(from, to).unwrap_or_else(|| {
            if from.dot(to) > 0.0 {
                return Quat::identity();
            }
            let axis = if from.x.abs() < 0.9 { Vec3::x() } else { Vec3::z() };
            let perpendicular = from.cross(&axis).normalize();
            Quat::from_axis_angle(&nalgebra::Unit::new_unchecked(perpendicular), constants::PI)
        })
    }

    /// Rotation whose local `+Z` axis points along `direction` with `up` as
    /// the reference up vector.
    ///
    /// Returns the identity when `direction` is parallel to `up` or zero.
    pub fn look_rotation(direction: &Vec3, up: &Vec3) -> Quat {
        if direction.norm_squared() <= f32::EPSILON
            || direction.normalize().cross(up).norm_squared() <= f32::EPSILON
        {
            return Quat::identity();
        }
        Quat::face_towards(direction, up)
    }

    /// Normalized linear quaternion interpolation along the shortest arc.
    pub fn nlerp(a: &Quat, b: &Quat, t: f32) -> Quat {
        let mut target = *b.quaternion();
        if a.quaternion().dot(&target) < 0.0 {
            target = -target;
        }
        let blended = a.quaternion().lerp(&target, t);
        Quat::new_normalize(blended)
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a rotation matrix around the X axis
    fn rotation_x(angle: f32) -> Mat4;

    /// Create a rotation matrix around the Y axis
    fn rotation_y(angle: f32) -> Mat4;

    /// Create a rotation matrix around the Z axis
    fn rotation_z(angle: f32) -> Mat4;

    /// Create an OpenGL style perspective projection (depth in `[-1, 1]`).
    ///
    /// `fov_y` is in radians.
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Row `index` of the matrix as a 4-vector
    fn row_vec(&self, index: usize) -> Vec4;
}

impl Mat4Ext for Mat4 {
    fn rotation_x(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::x_axis(), angle)
    }

    fn rotation_y(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::y_axis(), angle)
    }

    fn rotation_z(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::z_axis(), angle)
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let f = 1.0 / (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = f / aspect;
        result[(1, 1)] = f;
        result[(2, 2)] = (far + near) / (near - far);
        result[(2, 3)] = (2.0 * far * near) / (near - far);
        result[(3, 2)] = -1.0;
        result
    }

    fn row_vec(&self, index: usize) -> Vec4 {
        self.row(index).transpose()
    }
}
