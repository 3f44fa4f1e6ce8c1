//! Hitscan laser carried by the player
//!
//! The laser is a child node of whoever carries it. Firing traces a line
//! from the barrel through the whole scene (skipping the laser itself),
//! damages the creature hit and leaves a fading beam plus a burst of impact
//! sparks. After each shot the barrel needs three seconds to cool down,
//! which also reloads the clip.

use crate::foundation::math::{utils, Mat4, Quat, Vec3};
use crate::scene::node::{Behavior, Collidable, DrawContext, Drawable, Updatable, UpdateContext};
use crate::scene::render::{DrawCommand, MeshKind};
use crate::world::particles::ParticleSystem;

const AMMO: i32 = 20;
const CLIP_SIZE: i32 = 1;
const RANGE: f32 = 250.0;
const DAMAGE: i32 = 50;
/// Seconds between two shots
const COOL_DOWN: f32 = 3.0;
/// Seconds the beam stays visible
const TRAIL_DURATION: f32 = 1.0;
/// Smallest cosine between barrel axis and target for aiming at it
const MAX_AIM_DOT: f32 = 0.3;
const AIM_RATE: f32 = 20.0;
const IMPACT_PARTICLES: usize = 64;

/// Points credited to the carrier for each kill
pub const KILL_POINTS: i32 = 100;

/// The player's weapon
pub struct Laser {
    ammo: i32,
    clip_ammo: i32,
    heat: f32,
    drawn: bool,
    trigger: bool,
    target: Option<Vec3>,
    beam_start: Vec3,
    beam_end: Vec3,
    beam_alpha: f32,
    impact: ParticleSystem,
}

impl Default for Laser {
    fn default() -> Self {
        Self::new()
    }
}

impl Laser {
    /// Holstered laser with a full load
    pub fn new() -> Self {
        Self {
            ammo: AMMO,
            clip_ammo: CLIP_SIZE,
            heat: 0.0,
            drawn: false,
            trigger: false,
            target: None,
            beam_start: Vec3::zeros(),
            beam_end: Vec3::zeros(),
            beam_alpha: 0.0,
            impact: ParticleSystem::new(IMPACT_PARTICLES)
                .with_size(0.25)
                .with_gravity(Vec3::new(0.0, -20.0, 0.0))
                .with_drag(0.75)
                .with_life(1.0, 2.0),
        }
    }

    /// Take the laser out; only a drawn laser aims and fires
    pub fn pull(&mut self) {
        self.drawn = true;
    }

    /// Put the laser away
    pub fn holster(&mut self) {
        self.drawn = false;
    }

    /// Whether the laser is out
    pub fn is_drawn(&self) -> bool {
        self.drawn
    }

    /// Hold or release the trigger
    pub fn set_trigger(&mut self, pressed: bool) {
        self.trigger = pressed;
    }

    /// World point the barrel turns towards
    pub fn set_target(&mut self, target: Option<Vec3>) {
        self.target = target;
    }

    /// Restore the full ammunition
    pub fn refill(&mut self) {
        self.ammo = AMMO;
    }

    /// Shots left in total
    pub fn ammo(&self) -> i32 {
        self.ammo
    }

    /// Seconds until the next shot is possible
    pub fn heat(&self) -> f32 {
        self.heat
    }

    /// Impact sparks
    pub fn impact_particles(&self) -> &ParticleSystem {
        &self.impact
    }

    /// Local rotation pointing the barrel at the target, identity when the
    /// target lies too far off the carrier's forward axis
    fn rotation_to_target(&self, ctx: &UpdateContext<'_>) -> Quat {
        let Some(target) = self.target else {
            return Quat::identity();
        };
        let parent_world = ctx
            .graph
            .parent(ctx.node)
            .and_then(|parent| ctx.graph.world_matrix(parent))
            .unwrap_or_else(Mat4::identity);
        let Some(inverse) = parent_world.try_inverse() else {
            return Quat::identity();
        };
        let local_target = inverse.transform_point(&target.into()).coords;
        let Some(direction) = (local_target - ctx.position()).try_normalize(f32::EPSILON) else {
            return Quat::identity();
        };
        if direction.dot(&Vec3::z()) < MAX_AIM_DOT {
            Quat::identity()
        } else {
            utils::rotation_from_to(&Vec3::z(), &direction)
        }
    }

    fn fire(&mut self, ctx: &mut UpdateContext<'_>) {
        self.heat = COOL_DOWN;
        self.beam_alpha = 1.0;
        self.beam_start = ctx.world_position();
        let direction = ctx.graph.world_direction(ctx.node).unwrap_or_else(Vec3::z);

        let root = ctx.graph.root_of(ctx.node);
        let hit = ctx.graph.intersect_line(root, Some(ctx.node), &self.beam_start, &direction, RANGE);
        let distance = hit.map_or(RANGE, |hit| hit.distance);
        self.beam_end = self.beam_start + direction * distance;
        self.clip_ammo -= 1;
        self.ammo -= 1;

        let Some(hit) = hit else {
            return;
        };
        self.impact.emit_spherical(
            &mut *ctx.rng,
            self.beam_end,
            IMPACT_PARTICLES,
            5.0,
            10.0,
            Vec3::new(0.0, 10.0, 0.0),
        );
        let killed = ctx.damage_creature(hit.node, DAMAGE, Some(self.beam_end), Some(direction));
        if killed == Some(true) {
            if let Some(carrier) = ctx.graph.parent(ctx.node) {
                ctx.award_points(carrier, KILL_POINTS);
            }
        }
    }
}

impl Updatable for Laser {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        self.impact.update(ctx.delta);

        if self.drawn {
            let goal = self.rotation_to_target(ctx);
            let t = (AIM_RATE * ctx.delta).min(1.0);
            let rotation = ctx.rotation().try_slerp(&goal, t, f32::EPSILON).unwrap_or(goal);
            ctx.set_rotation(rotation);

            if self.trigger && self.heat <= 0.0 && self.clip_ammo > 0 && self.ammo > 0 {
                self.fire(ctx);
            }
        }

        if self.heat > ctx.delta {
            self.heat -= ctx.delta;
        } else {
            self.heat = 0.0;
            self.clip_ammo = CLIP_SIZE;
        }

        if self.beam_alpha > ctx.delta {
            self.beam_alpha -= ctx.delta / TRAIL_DURATION;
        } else {
            self.beam_alpha = 0.0;
        }
    }
}

impl Drawable for Laser {
    fn draw(&self, ctx: &mut DrawContext<'_>) {
        if self.drawn {
            ctx.backend.submit(DrawCommand::Mesh(MeshKind::Laser));
        }
    }

    fn draw2(&self, ctx: &mut DrawContext<'_>) {
        ctx.load_world_space();
        self.impact.draw(&mut *ctx.backend);
        if self.beam_alpha > 0.0 {
            ctx.backend.submit(DrawCommand::Beam {
                start: self.beam_start,
                end: self.beam_end,
                alpha: self.beam_alpha,
            });
        }
        ctx.load_model_space();
    }
}

impl Collidable for Laser {}

impl Behavior for Laser {
    fn name(&self) -> &'static str {
        "laser"
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
    use crate::config::{EngineSettings, Quality};
    use crate::physics::collision::{Ray, Sphere};
    use crate::scene::eye::Eye;
    use crate::scene::node::{Creature, NodeRef};
    use crate::scene::render::RecordingBackend;
    use crate::scene::scene_graph::{NodeId, SceneGraph};
    use crate::scene::transform::NodeTransform;
    use crate::world::creature::{CreatureState, Vitals};
    use crate::world::testing::run_frame;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-4;

    /// Sphere of radius 1 that dies from a single laser hit
    struct Target {
        vitals: Vitals,
        points: i32,
    }

    impl Target {
        fn new() -> Self {
            Self { vitals: Vitals::new(DAMAGE, CreatureState::Alive), points: 0 }
        }
    }

    impl Updatable for Target {}
    impl Drawable for Target {}

    impl Collidable for Target {
        fn intersect_line(
            &self,
            node: NodeRef<'_>,
            origin: &Vec3,
            direction: &Vec3,
            length: f32,
        ) -> Option<(f32, Option<Vec3>)> {
            Sphere::new(node.world_position(), 1.0)
                .intersect_culled_ray(&Ray::new(*origin, *direction))
                .filter(|&t| t < length)
                .map(|t| (t, None))
        }
    }

    impl Creature for Target {
        fn life(&self) -> i32 {
            self.vitals.life
        }

        fn is_alive(&self) -> bool {
            self.vitals.life > 0
        }

        fn receive_damage(
            &mut self,
            _ctx: &mut UpdateContext<'_>,
            damage: i32,
            _position: Option<Vec3>,
            _direction: Option<Vec3>,
        ) -> bool {
            self.vitals.damage(damage)
        }

        fn receive_points(&mut self, points: i32) {
            self.points += points;
        }
    }

    impl Behavior for Target {
        fn name(&self) -> &'static str {
            "target"
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }

        fn as_creature(&self) -> Option<&dyn Creature> {
            Some(self)
        }

        fn as_creature_mut(&mut self) -> Option<&mut dyn Creature> {
            Some(self)
        }
    }

    struct Range {
        root: NodeId,
        carrier: NodeId,
        laser: NodeId,
        target: NodeId,
    }

    /// Laser at the world origin facing +Z, target sphere 20 units ahead
    fn range() -> (SceneGraph, Range) {
        let mut graph = SceneGraph::new();
        let root = graph.create(NodeTransform::default(), 0.0, None);
        let carrier = graph.spawn_child(root, Target::new(), Vec3::new(0.0, 0.0, -100.0), 0.0).unwrap();
        let laser = graph.spawn_child(carrier, Laser::new(), Vec3::new(0.0, 0.0, 100.0), 0.0).unwrap();
        let target = graph.spawn_child(root, Target::new(), Vec3::new(0.0, 0.0, 20.0), 0.0).unwrap();
        (graph, Range { root, carrier, laser, target })
    }

    #[test]
    fn test_shot_kills_target_and_credits_carrier() {
        let (mut graph, range) = range();
        {
            let laser = graph.behavior_mut::<Laser>(range.laser).unwrap();
            laser.pull();
            laser.set_trigger(true);
        }

        run_frame(&mut graph, range.root, 0.1);

        assert!(!graph.creature(range.target).unwrap().is_alive());
        assert_eq!(graph.behavior::<Target>(range.carrier).unwrap().points, KILL_POINTS);
        let laser = graph.behavior::<Laser>(range.laser).unwrap();
        assert_eq!(laser.ammo(), AMMO - 1);
        assert_relative_eq!(laser.heat(), COOL_DOWN - 0.1, epsilon = EPSILON);
        assert_eq!(laser.impact_particles().live_count(), IMPACT_PARTICLES);
        assert_relative_eq!(laser.beam_end, Vec3::new(0.0, 0.0, 19.0), epsilon = EPSILON);
    }

    #[test]
    fn test_cool_down_gates_the_next_shot() {
        let (mut graph, range) = range();
        {
            let laser = graph.behavior_mut::<Laser>(range.laser).unwrap();
            laser.pull();
            laser.set_trigger(true);
        }

        run_frame(&mut graph, range.root, 0.1);
        run_frame(&mut graph, range.root, 0.1);
        assert_eq!(graph.behavior::<Laser>(range.laser).unwrap().ammo(), AMMO - 1);

        // cools down and reloads, then fires on the following frame
        run_frame(&mut graph, range.root, COOL_DOWN);
        assert_eq!(graph.behavior::<Laser>(range.laser).unwrap().heat(), 0.0);
        run_frame(&mut graph, range.root, 0.1);
        assert_eq!(graph.behavior::<Laser>(range.laser).unwrap().ammo(), AMMO - 2);
    }

    #[test]
    fn test_holstered_laser_neither_fires_nor_draws() {
        let (mut graph, range) = range();
        graph.behavior_mut::<Laser>(range.laser).unwrap().set_trigger(true);

        run_frame(&mut graph, range.root, 0.1);
        assert!(graph.creature(range.target).unwrap().is_alive());

        let mut backend = RecordingBackend::new();
        let eye = Eye::default();
        let settings = EngineSettings::default();
        graph.draw(range.root, &eye, &mut backend, &settings, Quality::High);
        graph.draw2(range.root, &eye, &mut backend, &settings, Quality::High);
        assert_eq!(backend.count_draws(|c| matches!(c, DrawCommand::Mesh(MeshKind::Laser))), 0);
        assert_eq!(backend.count_draws(|c| matches!(c, DrawCommand::Beam { .. })), 0);
    }

    #[test]
    fn test_barrel_turns_towards_target_in_front_only() {
        let (mut graph, range) = range();
        let beside = Vec3::new(10.0, 0.0, 10.0);
        {
            let laser = graph.behavior_mut::<Laser>(range.laser).unwrap();
            laser.pull();
            laser.set_target(Some(beside));
        }

        // the barrel sits at the world origin
        run_frame(&mut graph, range.root, 1.0);
        let direction = graph.world_direction(range.laser).unwrap();
        assert_relative_eq!(direction, beside.normalize(), epsilon = EPSILON);

        graph.behavior_mut::<Laser>(range.laser).unwrap().set_target(Some(Vec3::new(0.0, 0.0, -10.0)));
        run_frame(&mut graph, range.root, 1.0);
        assert_relative_eq!(graph.world_direction(range.laser).unwrap(), Vec3::z(), epsilon = EPSILON);
    }
}
