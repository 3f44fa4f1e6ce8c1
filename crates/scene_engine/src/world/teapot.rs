//! The teapot the player can drag around

use crate::foundation::math::{utils, Vec3};
use crate::physics::collision::{Capsule, Sphere};
use crate::scene::node::{
    Behavior, Collidable, DrawContext, Drawable, NodeRef, Updatable, UpdateContext,
};
use crate::scene::render::{DrawCommand, MeshKind};
use crate::scene::scene_graph::NodeId;
use crate::spatial::terrain::xz;
use crate::world::landscape::Landscape;

/// Height of the collision capsule's axis
const BODY_HEIGHT: f32 = 2.0;

/// Rate at which the teapot settles onto the terrain slope
const SETTLE_RATE: f32 = 33.0;

/// Terrain-aligned obstacle; also what the dummies chase
pub struct Teapot {
    landscape: NodeId,
}

impl Teapot {
    /// Teapot standing on the terrain of `landscape`
    pub fn new(landscape: NodeId) -> Self {
        Self { landscape }
    }
}

impl Updatable for Teapot {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let Some(landscape) = ctx.graph.behavior::<Landscape>(self.landscape) else {
            return;
        };
        let upright = landscape.terrain().normal_rotation(xz(&ctx.position()), &Vec3::y());
        let rotation = utils::nlerp(&ctx.rotation(), &upright, (SETTLE_RATE * ctx.delta).min(1.0));
        ctx.set_rotation(rotation);
    }
}

impl Drawable for Teapot {
    fn draw(&self, ctx: &mut DrawContext<'_>) {
        ctx.backend.submit(DrawCommand::Mesh(MeshKind::Teapot));
    }
}

impl Collidable for Teapot {
    fn collide_sphere(&self, node: NodeRef<'_>, radius: f32, center: &mut Vec3, normal: &mut Vec3) -> bool {
        let base = node.world_position();
        let body = Capsule::new(base, base + Vec3::new(0.0, BODY_HEIGHT, 0.0), node.bounding_radius() / 2.0);
        let Some(contact) = body.intersect_sphere(&Sphere::new(*center, radius)) else {
            return false;
        };
        let push = contact.normal.unwrap_or_else(Vec3::y);
        *center += push * contact.depth;
        *normal += push;
        true
    }
}

impl Behavior for Teapot {
    fn name(&self) -> &'static str {
        "teapot"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use crate::scene::scene_graph::SceneGraph;
    use crate::scene::transform::NodeTransform;
    use crate::world::testing::{run_frame, spawn_landscape};
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_capsule_pushes_sphere_sideways() {
        let mut graph = SceneGraph::new();
        let root = graph.create(NodeTransform::default(), 0.0, None);
        let landscape = graph.create(NodeTransform::default(), 0.0, None);
        let teapot = graph.spawn_child(root, Teapot::new(landscape), Vec3::zeros(), 2.0).unwrap();

        let collision = graph.collide_sphere(root, None, 1.0, Vec3::new(0.0, 1.0, 1.5));
        assert_eq!(collision.colliders, vec![teapot]);
        assert_relative_eq!(collision.center, Vec3::new(0.0, 1.0, 2.0), epsilon = EPSILON);
        assert_relative_eq!(collision.normal, Vec3::z(), epsilon = EPSILON);

        let clear = graph.collide_sphere(root, None, 1.0, Vec3::new(0.0, 1.0, 2.5));
        assert!(!clear.collided());
    }

    #[test]
    fn test_settles_upright_on_flat_ground() {
        let mut graph = SceneGraph::new();
        let root = graph.create(NodeTransform::default(), 0.0, None);
        let landscape = spawn_landscape(&mut graph, root, 5);
        let tilted = Quat::from_axis_angle(&Vec3::x_axis(), 0.5);
        let teapot = graph.create(
            NodeTransform::new(Vec3::new(0.0, 5.0, 0.0), tilted),
            2.0,
            Some(Box::new(Teapot::new(landscape))),
        );
        graph.add_child(root, teapot).unwrap();

        run_frame(&mut graph, root, 1.0);

        assert_relative_eq!(graph.rotation(teapot).unwrap().angle(), 0.0, epsilon = 1e-3);
    }
}
