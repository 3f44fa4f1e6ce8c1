//! Instanced trees planted on the terrain
//!
//! A forest node sits over the center of its group. The trees themselves
//! are kept in world space and drawn as one instanced batch; each trunk is
//! a capsule that pushes spheres aside.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::{EngineSettings, ForestConfig};
use crate::foundation::math::{
    constants::{DEG_TO_RAD, TAU},
    Mat4, Quat, Vec2, Vec3,
};
use crate::physics::collision::{Capsule, Sphere};
use crate::scene::node::{Behavior, Collidable, DrawContext, Drawable, NodeRef, Updatable};
use crate::scene::render::{DrawCommand, MeshKind};
use crate::spatial::terrain::Terrain;

/// Highest draw priority and vegetation quality
pub const MAX_PRIORITY: u8 = 99;

const MAX_PLACEMENT_TRIES: u32 = 1000;
/// Trees are sunk into the ground so their roots never float
const SINK_DEPTH: f32 = 1.0;
const MIN_SCALE: f32 = 0.1;
const MAX_SCALE: f32 = 0.25;
const MAX_LEAN: f32 = 10.0 * DEG_TO_RAD;

/// Trunk ends along the model's up axis, in model units
const TRUNK_BOTTOM: f32 = -10.0;
const TRUNK_TOP: f32 = 60.0;
/// Only the torso of a colliding sphere is stopped by a trunk
const TORSO_FACTOR: f32 = 1.0 / 3.0;

/// One planted tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tree {
    transform: Mat4,
    trunk: Capsule,
}

impl Tree {
    /// Tree standing at `base`, uniformly scaled, then turned by `rotation`
    pub fn new(base: Vec3, scale: f32, rotation: Quat) -> Self {
        let up = rotation * Vec3::y() * scale;
        Self {
            transform: Mat4::new_translation(&base) * Mat4::new_scaling(scale) * rotation.to_homogeneous(),
            trunk: Capsule::new(base + up * TRUNK_BOTTOM, base + up * TRUNK_TOP, scale),
        }
    }

    /// Model matrix of the instance
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    /// Collision shape of the trunk
    pub fn trunk(&self) -> &Capsule {
        &self.trunk
    }
}

/// Group of trees around a center
pub struct Forest {
    trees: Vec<Tree>,
    priority: u8,
    center: Vec3,
    bounding_radius: f32,
}

impl Forest {
    /// Forest of the given trees, bounded by a sphere around `center`
    pub fn new(trees: Vec<Tree>, priority: u8, center: Vec3, bounding_radius: f32) -> Self {
        Self {
            trees,
            priority: priority.min(MAX_PRIORITY),
            center,
            bounding_radius,
        }
    }

    /// Plant the trees of `config` on dry ground.
    ///
    /// Gives up on the remaining trees when no spot above `water_height`
    /// turns up within a thousand tries.
    pub fn plant(config: &ForestConfig, terrain: &Terrain, water_height: f32) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut trees = Vec::with_capacity(config.trees);

        'planting: for _ in 0..config.trees {
            let mut tries = 0;
            let base = loop {
                tries += 1;
                if tries > MAX_PLACEMENT_TRIES {
                    log::warn!("giving up planting trees, no dry spot found near {:?}", config.position);
                    break 'planting;
                }
                let spot = config.position + in_unit_circle(&mut rng) * config.radius;
                let base = Vec3::new(spot.x, terrain.height(spot) - SINK_DEPTH, spot.y);
                if base.y >= water_height {
                    break base;
                }
            };
            let scale = rng.gen_range(MIN_SCALE..=MAX_SCALE);
            let turn = Quat::from_axis_angle(&Vec3::y_axis(), rng.gen_range(0.0..TAU));
            let rotation = lean(&mut rng) * turn * lean(&mut rng);
            trees.push(Tree::new(base, scale, rotation));
        }
        log::debug!("planted {} of {} trees around {:?}", trees.len(), config.trees, config.position);

        let center = Vec3::new(config.position.x, terrain.height(config.position), config.position.y);
        Self::new(trees, config.priority, center, config.radius + MAX_SCALE * TRUNK_TOP)
    }

    /// Planted trees
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Draw priority
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Where the forest node belongs
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Radius enclosing every tree around [`Forest::center`]
    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    /// Whether the vegetation quality of `settings` keeps this forest
    pub fn is_drawn(&self, settings: &EngineSettings) -> bool {
        self.priority >= MAX_PRIORITY - settings.vegetation_quality.min(MAX_PRIORITY)
    }
}

fn in_unit_circle(rng: &mut impl Rng) -> Vec2 {
    loop {
        let candidate = Vec2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0));
        if candidate.norm_squared() <= 1.0 {
            return candidate;
        }
    }
}

fn lean(rng: &mut impl Rng) -> Quat {
    Quat::from_axis_angle(&Vec3::x_axis(), rng.gen_range(-MAX_LEAN..=MAX_LEAN))
}

impl Updatable for Forest {}

impl Drawable for Forest {
    fn draw(&self, ctx: &mut DrawContext<'_>) {
        if self.trees.is_empty() || !self.is_drawn(ctx.settings) {
            return;
        }
        ctx.load_world_space();
        ctx.backend.submit(DrawCommand::Instances {
            mesh: MeshKind::Tree,
            transforms: self.trees.iter().map(|tree| tree.transform).collect(),
        });
        ctx.load_model_space();
    }
}

impl Collidable for Forest {
    fn collide_sphere(&self, node: NodeRef<'_>, radius: f32, center: &mut Vec3, normal: &mut Vec3) -> bool {
        let bounds = Sphere::new(node.world_position(), node.bounding_radius());
        if bounds.intersect_sphere(&Sphere::new(*center, radius)).is_none() {
            return false;
        }

        let mut collided = false;
        for tree in &self.trees {
            let torso = Sphere::new(*center, radius * TORSO_FACTOR);
            let Some(contact) = tree.trunk.intersect_sphere(&torso) else {
                continue;
            };
            let push = contact.normal.unwrap_or_else(Vec3::x);
            *center += push * contact.depth;
            *normal += push;
            collided = true;
        }
        collided
    }
}

impl Behavior for Forest {
    fn name(&self) -> &'static str {
        "forest"
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
    use crate::config::Quality;
    use crate::scene::eye::Eye;
    use crate::scene::render::RecordingBackend;
    use crate::scene::scene_graph::{NodeId, SceneGraph};
    use crate::scene::transform::NodeTransform;
    use crate::world::testing::flat_terrain;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-4;

    fn config(trees: usize) -> ForestConfig {
        ForestConfig { position: Vec2::new(10.0, 10.0), radius: 8.0, trees, priority: 50, seed: 9 }
    }

    /// One upright tree at the origin of a flat ground at height 5
    fn single_tree_forest(graph: &mut SceneGraph) -> (NodeId, NodeId) {
        let root = graph.create(NodeTransform::default(), 0.0, None);
        let tree = Tree::new(Vec3::new(0.0, 4.0, 0.0), 0.2, Quat::identity());
        let forest = Forest::new(vec![tree], 50, Vec3::new(0.0, 5.0, 0.0), 20.0);
        let id = graph.spawn_child(root, forest, Vec3::new(0.0, 5.0, 0.0), 20.0).unwrap();
        (root, id)
    }

    #[test]
    fn test_trees_are_planted_within_the_radius() {
        let forest = Forest::plant(&config(20), &flat_terrain(5), -10.0);
        assert_eq!(forest.trees().len(), 20);
        assert_relative_eq!(forest.center(), Vec3::new(10.0, 5.0, 10.0), epsilon = EPSILON);

        for tree in forest.trees() {
            let m = tree.transform();
            let base = Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
            assert!((Vec2::new(base.x, base.z) - Vec2::new(10.0, 10.0)).norm() <= 8.0 + EPSILON);
            assert_relative_eq!(base.y, 4.0, epsilon = EPSILON);
            let scale = tree.trunk().radius;
            assert!((MIN_SCALE..=MAX_SCALE).contains(&scale));
            assert!(tree.trunk().end.y > base.y);
        }
    }

    #[test]
    fn test_same_seed_plants_the_same_forest() {
        let terrain = flat_terrain(5);
        let first = Forest::plant(&config(5), &terrain, -10.0);
        let second = Forest::plant(&config(5), &terrain, -10.0);
        assert_eq!(first.trees(), second.trees());
    }

    #[test]
    fn test_planting_gives_up_under_water() {
        let forest = Forest::plant(&config(3), &flat_terrain(5), 20.0);
        assert!(forest.trees().is_empty());
        assert_eq!(forest.priority(), 50);
    }

    #[test]
    fn test_trunk_pushes_the_torso_aside() {
        let mut graph = SceneGraph::new();
        let (root, forest) = single_tree_forest(&mut graph);

        // torso radius 1 against a trunk of radius 0.2 along x = 0
        let collision = graph.collide_sphere(root, None, 3.0, Vec3::new(1.0, 7.0, 0.0));
        assert_eq!(collision.colliders, vec![forest]);
        assert_relative_eq!(collision.center, Vec3::new(1.2, 7.0, 0.0), epsilon = EPSILON);
        assert_relative_eq!(collision.normal, Vec3::x(), epsilon = EPSILON);

        // inside the forest bounds but clear of the trunk
        assert!(!graph.collide_sphere(root, None, 3.0, Vec3::new(5.0, 7.0, 0.0)).collided());
        // outside the forest bounds
        assert!(!graph.collide_sphere(root, None, 3.0, Vec3::new(100.0, 7.0, 100.0)).collided());
    }

    #[test]
    fn test_vegetation_quality_gates_drawing() {
        let mut graph = SceneGraph::new();
        let (root, _) = single_tree_forest(&mut graph);
        let mut eye = Eye::default();
        eye.set_position(Vec3::new(0.0, 10.0, -30.0));
        let instances = |backend: &RecordingBackend| {
            backend.count_draws(|c| matches!(c, DrawCommand::Instances { mesh: MeshKind::Tree, .. }))
        };

        let mut backend = RecordingBackend::new();
        graph.draw(root, &eye, &mut backend, &EngineSettings::default(), Quality::High);
        assert_eq!(instances(&backend), 1);

        // priority 50 needs a vegetation quality of at least 49
        let sparse = EngineSettings { vegetation_quality: 48, ..EngineSettings::default() };
        let mut backend = RecordingBackend::new();
        graph.draw(root, &eye, &mut backend, &sparse, Quality::High);
        assert_eq!(instances(&backend), 0);

        let enough = EngineSettings { vegetation_quality: 49, ..EngineSettings::default() };
        graph.draw(root, &eye, &mut backend, &enough, Quality::High);
        assert_eq!(instances(&backend), 1);
    }
}
