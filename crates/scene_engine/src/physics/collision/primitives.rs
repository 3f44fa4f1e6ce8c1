//! Primitive collision shapes and intersection algorithms
//!
//! Immutable value types used as operands of gameplay collision tests.
//! Every test reports failure through `None`; degenerate input (parallel
//! rays, zero directions, coincident centers) is a miss or an omitted
//! normal, never an error.

use crate::foundation::math::{constants::GEOMETRY_EPSILON, Vec3};

/// A ray, or a line segment when paired with a length
///
/// The direction is not normalized: distances returned by the tests are in
/// multiples of `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point
    pub origin: Vec3,
    /// Direction (length defines the distance unit)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Penetration reported by the overlap tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// How far the shapes overlap
    pub depth: f32,
    /// Unit vector from the first shape towards the second one; `None` when
    /// the direction is undefined (coincident centers)
    pub normal: Option<Vec3>,
}

/// A triangle given by three points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub p: Vec3,
    /// Second vertex
    pub q: Vec3,
    /// Third vertex
    pub r: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(p: Vec3, q: Vec3, r: Vec3) -> Self {
        Self { p, q, r }
    }

    /// Face normal, normalized `(q - p) x (r - p)`
    ///
    /// Zero for degenerate triangles.
    pub fn normal(&self) -> Vec3 {
        let n = (self.q - self.p).cross(&(self.r - self.p));
        n.try_normalize(GEOMETRY_EPSILON).unwrap_or_else(Vec3::zeros)
    }

    /// Calculates the centroid (center point) of the triangle
    pub fn centroid(&self) -> Vec3 {
        (self.p + self.q + self.r) / 3.0
    }

    /// Möller-Trumbore ray/triangle test accepting both windings.
    ///
    /// Returns the signed distance along the ray, which may be negative when
    /// the triangle lies behind the origin.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let edge1 = self.q - self.p;
        let edge2 = self.r - self.p;

        let p_vec = ray.direction.cross(&edge2);
        let det = edge1.dot(&p_vec);
        if det.abs() < GEOMETRY_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;

        let t_vec = ray.origin - self.p;
        let u = t_vec.dot(&p_vec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q_vec = t_vec.cross(&edge1);
        let v = ray.direction.dot(&q_vec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        Some(edge2.dot(&q_vec) * inv_det)
    }

    /// Like [`Triangle::intersect_ray`] but rejects hits behind the origin
    pub fn intersect_culled_ray(&self, ray: &Ray) -> Option<f32> {
        self.intersect_ray(ray).filter(|t| *t >= 0.0)
    }
}

/// A sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Center position
    pub center: Vec3,
    /// Radius
    pub radius: f32,
}

impl Sphere {
    /// Creates a new sphere
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Whether `point` lies strictly inside
    pub fn contains_point(&self, point: &Vec3) -> bool {
        (point - self.center).norm_squared() < self.radius * self.radius
    }

    /// Ray test against the solid sphere.
    ///
    /// An origin inside the sphere is an immediate hit at distance 0.
    /// Otherwise the nearest non-negative root is returned.
    pub fn intersect_culled_ray(&self, ray: &Ray) -> Option<f32> {
        let rel_origin = ray.origin - self.center;
        let c = rel_origin.norm_squared() - self.radius * self.radius;
        if c < 0.0 {
            return Some(0.0);
        }
        self.nearest_root(ray, c)
    }

    /// Ray test against the sphere surface.
    ///
    /// Starting inside yields the exit distance instead of 0.
    pub fn intersect_ray_hull(&self, ray: &Ray) -> Option<f32> {
        let rel_origin = ray.origin - self.center;
        let c = rel_origin.norm_squared() - self.radius * self.radius;
        self.nearest_root(ray, c)
    }

    fn nearest_root(&self, ray: &Ray, c: f32) -> Option<f32> {
        let a = ray.direction.norm_squared();
        if a < GEOMETRY_EPSILON {
            return None;
        }
        let b = 2.0 * ray.direction.dot(&(ray.origin - self.center));

        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }

        // numerically stable form: q = -(b + sign(b) * sqrt(disc)) / 2
        let disc_sqrt = disc.sqrt();
        let q = if b < 0.0 { (-b + disc_sqrt) / 2.0 } else { (-b - disc_sqrt) / 2.0 };
        let (mut t0, mut t1) = if q == 0.0 { (0.0, 0.0) } else { (q / a, c / q) };
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }

        if t1 < 0.0 {
            return None;
        }
        Some(if t0 < 0.0 { t1 } else { t0 })
    }

    /// Sphere/sphere overlap.
    ///
    /// Overlap iff the center distance is below the sum of radii. The normal
    /// points from `self` towards `other`.
    pub fn intersect_sphere(&self, other: &Sphere) -> Option<Contact> {
        contact_between(&self.center, self.radius, &other.center, other.radius)
    }
}

/// A capsule: the set of points within `radius` of a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    /// First segment end
    pub start: Vec3,
    /// Second segment end
    pub end: Vec3,
    /// Radius around the segment
    pub radius: f32,
}

impl Capsule {
    /// Creates a new capsule
    pub fn new(start: Vec3, end: Vec3, radius: f32) -> Self {
        Self { start, end, radius }
    }

    /// Closest point to `point` on the capsule's segment
    pub fn closest_point_on_axis(&self, point: &Vec3) -> Vec3 {
        let axis = self.end - self.start;
        let length_squared = axis.norm_squared();
        if length_squared < GEOMETRY_EPSILON {
            return self.start;
        }
        let factor = ((point - self.start).dot(&axis) / length_squared).clamp(0.0, 1.0);
        self.start + axis * factor
    }

    /// Capsule/sphere overlap, normal pointing from the axis to the sphere
    pub fn intersect_sphere(&self, sphere: &Sphere) -> Option<Contact> {
        let closest = self.closest_point_on_axis(&sphere.center);
        contact_between(&closest, self.radius, &sphere.center, sphere.radius)
    }
}

fn contact_between(a: &Vec3, radius_a: f32, b: &Vec3, radius_b: f32) -> Option<Contact> {
    let relative = b - a;
    let distance = relative.norm();
    let radii = radius_a + radius_b;
    if distance >= radii {
        return None;
    }
    let normal = (distance > GEOMETRY_EPSILON).then(|| relative / distance);
    Some(Contact {
        depth: radii - distance,
        normal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-6;

    fn floor_triangle() -> Triangle {
        Triangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
        )
    }

    #[test]
    fn test_triangle_normal() {
        assert_relative_eq!(floor_triangle().normal(), Vec3::y(), epsilon = EPSILON);
        let degenerate = Triangle::new(Vec3::zeros(), Vec3::x(), Vec3::x() * 2.0);
        assert_relative_eq!(degenerate.normal(), Vec3::zeros());
    }

    #[test]
    fn test_triangle_ray_hits_from_both_sides() {
        let tri = floor_triangle();
        let down = Ray::new(Vec3::new(0.25, 5.0, 0.25), Vec3::new(0.0, -1.0, 0.0));
        let up = Ray::new(Vec3::new(0.25, -5.0, 0.25), Vec3::new(0.0, 1.0, 0.0));

        assert_relative_eq!(tri.intersect_ray(&down).unwrap(), 5.0, epsilon = EPSILON);
        assert_relative_eq!(tri.intersect_ray(&up).unwrap(), 5.0, epsilon = EPSILON);
    }

    #[test]
    fn test_triangle_culled_ray_rejects_hits_behind() {
        let tri = floor_triangle();
        let away = Ray::new(Vec3::new(0.25, 5.0, 0.25), Vec3::new(0.0, 1.0, 0.0));

        assert_relative_eq!(tri.intersect_ray(&away).unwrap(), -5.0, epsilon = EPSILON);
        assert!(tri.intersect_culled_ray(&away).is_none());
    }

    #[test]
    fn test_triangle_parallel_and_outside_rays_miss() {
        let tri = floor_triangle();
        let parallel = Ray::new(Vec3::new(-1.0, 0.0, 0.25), Vec3::new(1.0, 0.0, 0.0));
        let outside = Ray::new(Vec3::new(0.9, 5.0, 0.9), Vec3::new(0.0, -1.0, 0.0));
        let zero = Ray::new(Vec3::new(0.25, 5.0, 0.25), Vec3::zeros());

        assert!(tri.intersect_ray(&parallel).is_none());
        assert!(tri.intersect_ray(&outside).is_none());
        assert!(tri.intersect_ray(&zero).is_none());
    }

    #[test]
    fn test_sphere_culled_ray_from_inside_hits_at_zero() {
        let sphere = Sphere::new(Vec3::zeros(), 2.0);
        for dir in [Vec3::x(), -Vec3::y(), Vec3::new(1.0, 1.0, 1.0)] {
            let ray = Ray::new(Vec3::new(0.5, 0.5, 0.0), dir);
            assert_relative_eq!(sphere.intersect_culled_ray(&ray).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_sphere_culled_ray_pointing_away_misses() {
        let sphere = Sphere::new(Vec3::zeros(), 1.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::z());
        assert!(sphere.intersect_culled_ray(&ray).is_none());
    }

    #[test]
    fn test_sphere_culled_ray_nearest_root() {
        let sphere = Sphere::new(Vec3::zeros(), 1.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::z());
        assert_relative_eq!(sphere.intersect_culled_ray(&ray).unwrap(), 4.0, epsilon = EPSILON);

        // scaled direction measures distance in direction units
        let scaled = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::z() * 2.0);
        assert_relative_eq!(sphere.intersect_culled_ray(&scaled).unwrap(), 2.0, epsilon = EPSILON);

        let miss = Ray::new(Vec3::new(0.0, 3.0, 5.0), -Vec3::z());
        assert!(sphere.intersect_culled_ray(&miss).is_none());
    }

    #[test]
    fn test_sphere_hull_from_inside_returns_exit() {
        let sphere = Sphere::new(Vec3::zeros(), 2.0);
        let ray = Ray::new(Vec3::zeros(), Vec3::x());
        assert_relative_eq!(sphere.intersect_ray_hull(&ray).unwrap(), 2.0, epsilon = EPSILON);
    }

    #[test]
    fn test_sphere_sphere_contact() {
        let a = Sphere::new(Vec3::zeros(), 1.0);
        let b = Sphere::new(Vec3::new(1.5, 0.0, 0.0), 1.0);

        let contact = a.intersect_sphere(&b).unwrap();
        assert_relative_eq!(contact.depth, 0.5, epsilon = EPSILON);
        assert_relative_eq!(contact.normal.unwrap(), Vec3::x(), epsilon = EPSILON);

        let far = Sphere::new(Vec3::new(3.0, 0.0, 0.0), 1.0);
        assert!(a.intersect_sphere(&far).is_none());
    }

    #[test]
    fn test_sphere_sphere_coincident_centers_omit_normal() {
        let a = Sphere::new(Vec3::new(1.0, 2.0, 3.0), 1.0);
        let contact = a.intersect_sphere(&a).unwrap();
        assert_relative_eq!(contact.depth, 2.0);
        assert!(contact.normal.is_none());
    }

    #[test]
    fn test_capsule_sphere_side_contact() {
        let capsule = Capsule::new(Vec3::zeros(), Vec3::new(0.0, 10.0, 0.0), 1.0);
        let sphere = Sphere::new(Vec3::new(0.0, 5.0, 0.5), 1.0);

        let contact = capsule.intersect_sphere(&sphere).unwrap();
        assert_relative_eq!(contact.normal.unwrap(), Vec3::z(), epsilon = EPSILON);
        // (r1 + r2) - distance = 2 - 0.5
        assert_relative_eq!(contact.depth, 1.5, epsilon = EPSILON);
    }

    #[test]
    fn test_capsule_clamps_to_end_caps() {
        let capsule = Capsule::new(Vec3::zeros(), Vec3::new(0.0, 10.0, 0.0), 1.0);

        let above = Sphere::new(Vec3::new(0.0, 11.5, 0.0), 1.0);
        let contact = capsule.intersect_sphere(&above).unwrap();
        assert_relative_eq!(contact.normal.unwrap(), Vec3::y(), epsilon = EPSILON);
        assert_relative_eq!(contact.depth, 0.5, epsilon = EPSILON);

        let below = Sphere::new(Vec3::new(0.0, -2.5, 0.0), 1.0);
        assert!(capsule.intersect_sphere(&below).is_none());
    }

    #[test]
    fn test_capsule_sphere_on_axis_has_no_normal() {
        let capsule = Capsule::new(Vec3::zeros(), Vec3::new(0.0, 10.0, 0.0), 1.0);
        let sphere = Sphere::new(Vec3::new(0.0, 4.0, 0.0), 0.5);
        let contact = capsule.intersect_sphere(&sphere).unwrap();
        assert!(contact.normal.is_none());
        assert_relative_eq!(contact.depth, 1.5, epsilon = EPSILON);
    }
}
