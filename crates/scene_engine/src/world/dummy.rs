//! Enemy that drifts towards the teapot

use rand::Rng;

use crate::foundation::math::{utils, Vec3};
use crate::physics::collision::{Ray, Sphere};
use crate::scene::node::{
    Behavior, Collidable, Creature, DrawContext, Drawable, NodeRef, Updatable, UpdateContext,
};
use crate::scene::render::{DrawCommand, MeshKind};
use crate::spatial::terrain::xz;
use crate::world::creature::{CreatureState, Vitals};
use crate::world::landscape::Landscape;
use crate::world::splatter::SplatterSystem;
use crate::world::WorldHandles;

/// Radius of the body sphere
pub const BODY_RADIUS: f32 = 4.0;
const MAX_LIFE: i32 = 100;
const HOVER_HEIGHT: f32 = 6.0;
const DEAD_HEIGHT: f32 = 3.0;
const SPAWN_DROP: f32 = 10.0;
const SPEED: f32 = 10.0;
const TURN_RATE: f32 = 0.05;
const GRAVITY: f32 = -3.0;

/// Hovering sphere creature
pub struct Dummy {
    handles: WorldHandles,
    spawn_extent: f32,
    vitals: Vitals,
    height_above_ground: f32,
    velocity_y: f32,
}

impl Dummy {
    /// Dummy that picks a random spot within `spawn_extent` of the origin
    /// on its first update
    pub fn new(handles: WorldHandles, spawn_extent: f32) -> Self {
        Self {
            handles,
            spawn_extent: spawn_extent.abs(),
            vitals: Vitals::new(MAX_LIFE, CreatureState::Spawning),
            height_above_ground: HOVER_HEIGHT,
            velocity_y: 0.0,
        }
    }

    /// Life cycle state
    pub fn state(&self) -> CreatureState {
        self.vitals.state
    }

    /// Bring a dead dummy back at a new random spot
    pub fn respawn(&mut self) {
        self.vitals.respawn();
    }

    fn spawn(&mut self, ctx: &mut UpdateContext<'_>) {
        let extent = self.spawn_extent;
        let x = ctx.rng.gen_range(-extent..=extent);
        let z = ctx.rng.gen_range(-extent..=extent);
        let ground = ctx
            .graph
            .behavior::<Landscape>(self.handles.landscape)
            .map_or(0.0, |landscape| landscape.terrain().height(xz(&Vec3::new(x, 0.0, z))));
        ctx.set_position(Vec3::new(x, ground + SPAWN_DROP, z));
        self.vitals = Vitals::new(MAX_LIFE, CreatureState::Alive);
        self.height_above_ground = HOVER_HEIGHT;
        self.velocity_y = 0.0;
        log::debug!("dummy {:?} spawned at ({x:.1}, {z:.1})", ctx.node);
    }

    fn chase_teapot(&mut self, ctx: &mut UpdateContext<'_>) {
        if let Some(teapot) = ctx.graph.world_position(self.handles.teapot) {
            if let Some(direction) = (teapot - ctx.world_position()).try_normalize(f32::EPSILON) {
                let goal = utils::look_rotation(&direction, &Vec3::y());
                let rotation = ctx.rotation();
                ctx.set_rotation(rotation.try_slerp(&goal, TURN_RATE, f32::EPSILON).unwrap_or(goal));
            }
        }
        let forward = ctx.rotation() * Vec3::z();
        ctx.set_position(ctx.position() + forward * (SPEED * ctx.delta));
    }

    fn hover(&mut self, ctx: &mut UpdateContext<'_>) {
        self.velocity_y += GRAVITY * ctx.delta;
        let mut position = ctx.position();
        position.y += self.velocity_y * ctx.delta;

        let ground = ctx
            .graph
            .behavior::<Landscape>(self.handles.landscape)
            .and_then(|landscape| landscape.terrain().try_height(xz(&position)));
        if let Some(ground) = ground {
            if ground + self.height_above_ground > position.y {
                position.y = ground + self.height_above_ground;
                self.velocity_y = self.velocity_y.max(0.0);
            }
        }
        ctx.set_position(position);
    }
}

impl Updatable for Dummy {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        match self.vitals.state {
            CreatureState::Spawning => self.spawn(ctx),
            CreatureState::Alive => {
                self.chase_teapot(ctx);
                if self.vitals.life <= 0 {
                    self.vitals.state = CreatureState::Dying;
                }
            }
            CreatureState::Dying => {
                self.vitals.state = CreatureState::Dead;
                self.height_above_ground = DEAD_HEIGHT;
            }
            CreatureState::Dead => {}
        }
        self.hover(ctx);
    }
}

impl Drawable for Dummy {
    fn draw(&self, ctx: &mut DrawContext<'_>) {
        ctx.backend.submit(DrawCommand::Mesh(MeshKind::Dummy));
    }
}

impl Collidable for Dummy {
    fn intersect_line(
        &self,
        node: NodeRef<'_>,
        origin: &Vec3,
        direction: &Vec3,
        length: f32,
    ) -> Option<(f32, Option<Vec3>)> {
        let center = node.world_position();
        Sphere::new(center, BODY_RADIUS)
            .intersect_culled_ray(&Ray::new(*origin, *direction))
            .filter(|&distance| distance < length)
            .map(|distance| (distance, Some(origin - center)))
    }
}

impl Creature for Dummy {
    fn life(&self) -> i32 {
        self.vitals.life
    }

    fn is_alive(&self) -> bool {
        self.vitals.is_alive()
    }

    fn receive_damage(
        &mut self,
        ctx: &mut UpdateContext<'_>,
        damage: i32,
        position: Option<Vec3>,
        _direction: Option<Vec3>,
    ) -> bool {
        let killed = self.vitals.damage(damage);
        let source = position.unwrap_or_else(|| ctx.world_position());
        // corpses bleed less
        let size = if self.vitals.state == CreatureState::Dead {
            damage as f32 / 2.0
        } else {
            damage as f32
        };
        SplatterSystem::spray_in(&mut *ctx.graph, &mut *ctx.rng, self.handles.splatter, source, size);
        if killed {
            log::info!("dummy {:?} killed", ctx.node);
        }
        killed
    }
}

impl Behavior for Dummy {
    fn name(&self) -> &'static str {
        "dummy"
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
