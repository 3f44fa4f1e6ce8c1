//! Ray tests against indexed-free triangle fans and strips
//!
//! Model geometry is stored in model space; vertices are mapped through the
//! model matrix on the fly so the same buffers serve drawing and picking.

use super::primitives::{Ray, Triangle};
use crate::foundation::math::{Mat4, Point3, Vec3};

fn to_world(model: &Mat4, v: &Vec3) -> Vec3 {
    model.transform_point(&Point3::from(*v)).coords
}

/// Triangles of a fan: `(v0, v[i-1], v[i])` for every `i >= 2`
pub fn fan_triangles<'a>(vertices: &'a [Vec3], model: &'a Mat4) -> impl Iterator<Item = Triangle> + 'a {
    let hub = vertices.first().map(|v| to_world(model, v));
    vertices
        .windows(2)
        .skip(1)
        .filter_map(move |pair| hub.map(|hub| Triangle::new(hub, to_world(model, &pair[0]), to_world(model, &pair[1]))))
}

/// Triangles of a strip: `(v[i-2], v[i-1], v[i])` for every `i >= 2`
pub fn strip_triangles<'a>(vertices: &'a [Vec3], model: &'a Mat4) -> impl Iterator<Item = Triangle> + 'a {
    vertices
        .windows(3)
        .map(move |w| Triangle::new(to_world(model, &w[0]), to_world(model, &w[1]), to_world(model, &w[2])))
}

fn nearest(triangles: impl Iterator<Item = Triangle>, ray: &Ray) -> Option<f32> {
    triangles
        .filter_map(|t| t.intersect_culled_ray(ray))
        .min_by(f32::total_cmp)
}

/// Nearest non-negative hit of `ray` against a triangle fan
pub fn intersect_triangle_fan(vertices: &[Vec3], model: &Mat4, ray: &Ray) -> Option<f32> {
    nearest(fan_triangles(vertices, model), ray)
}

/// Nearest non-negative hit of `ray` against a triangle strip
pub fn intersect_triangle_strip(vertices: &[Vec3], model: &Mat4, ray: &Ray) -> Option<f32> {
    nearest(strip_triangles(vertices, model), ray)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square_strip() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn test_strip_split_line_hits_flat_cell() {
        let ray = Ray::new(Vec3::new(0.5, 10.0, 0.5), Vec3::new(0.0, -1.0, 0.0));
        let t = intersect_triangle_strip(&unit_square_strip(), &Mat4::identity(), &ray).unwrap();
        assert_relative_eq!(t, 10.0, epsilon = 1e-6);
        assert_relative_eq!(ray.point_at(t).y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_strip_uses_model_matrix() {
        let model = Mat4::new_translation(&Vec3::new(0.0, 3.0, 0.0));
        let ray = Ray::new(Vec3::new(0.75, 10.0, 0.75), Vec3::new(0.0, -1.0, 0.0));
        let t = intersect_triangle_strip(&unit_square_strip(), &model, &ray).unwrap();
        assert_relative_eq!(t, 7.0, epsilon = 1e-6);
    }

    #[test]
    fn test_fan_returns_nearest_hit() {
        // two stacked fans folded into one: a square at y=0 and one at y=2
        let fan = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let raised = Mat4::new_translation(&Vec3::new(0.0, 2.0, 0.0));
        let ray = Ray::new(Vec3::new(0.3, 5.0, 0.6), Vec3::new(0.0, -1.0, 0.0));

        assert_relative_eq!(intersect_triangle_fan(&fan, &Mat4::identity(), &ray).unwrap(), 5.0, epsilon = 1e-6);
        assert_relative_eq!(intersect_triangle_fan(&fan, &raised, &ray).unwrap(), 3.0, epsilon = 1e-6);
        assert_eq!(fan_triangles(&fan, &raised).count(), 2);
    }

    #[test]
    fn test_short_buffers_produce_no_triangles() {
        let two = [Vec3::zeros(), Vec3::x()];
        assert_eq!(strip_triangles(&two, &Mat4::identity()).count(), 0);
        assert_eq!(fan_triangles(&[], &Mat4::identity()).count(), 0);
    }
}
