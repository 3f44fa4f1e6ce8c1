//! Behavior of the world's root node: clock, levels, lights and fog

use crate::config::WorldConfig;
use crate::foundation::math::{Vec3, Vec4};
use crate::input::Actions;
use crate::scene::node::{Behavior, Collidable, DrawContext, Drawable, Updatable, UpdateContext};
use crate::scene::scene_graph::{NodeId, SceneGraph};
use crate::world::creature::CreatureState;
use crate::world::dummy::{Dummy, BODY_RADIUS};
use crate::world::player::Player;
use crate::world::sky::Sky;
use crate::world::WorldHandles;

/// Fog starts and ends at these fractions of the far plane
const FOG_START: f32 = 0.9;
const FOG_END: f32 = 1.1;

/// Game clock and level progression
pub struct WorldRoot {
    handles: WorldHandles,
    level: u32,
    level_time: f32,
    level_duration: f32,
    time_of_day: f32,
    time_of_day_speed: f32,
    time_lapse_speed: f32,
    spawn_extent: f32,
    enemies: Vec<NodeId>,
}

impl WorldRoot {
    /// Level 1 at midnight
    pub fn new(config: &WorldConfig, handles: WorldHandles) -> Self {
        Self {
            handles,
            level: 1,
            level_time: 0.0,
            level_duration: config.level_duration,
            time_of_day: 0.0,
            time_of_day_speed: config.time_of_day_speed,
            time_lapse_speed: config.time_lapse_speed,
            spawn_extent: config.enemy_spawn_extent,
            enemies: Vec::new(),
        }
    }

    /// Current level, starting at 1
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Fraction of the day in `[0, 1)`
    pub fn time_of_day(&self) -> f32 {
        self.time_of_day
    }

    /// Enemy nodes, dead or alive
    pub fn enemies(&self) -> &[NodeId] {
        &self.enemies
    }

    /// Spawn a dummy somewhere in the world
    pub fn add_enemy(&mut self, graph: &mut SceneGraph) {
        let dummy = Dummy::new(self.handles, self.spawn_extent);
        match graph.spawn_child(self.handles.root, dummy, Vec3::zeros(), BODY_RADIUS) {
            Ok(id) => self.enemies.push(id),
            Err(err) => log::warn!("cannot add enemy: {err}"),
        }
    }

    fn advance_clock(&mut self, ctx: &mut UpdateContext<'_>) {
        let mut speed = self.time_of_day_speed;
        if ctx.input.is_held(Actions::TIME_LAPSE) {
            speed += self.time_lapse_speed;
        }
        if ctx.input.is_held(Actions::TIME_REVERSE) {
            speed -= self.time_lapse_speed;
        }
        self.time_of_day += speed * ctx.delta;
        self.time_of_day -= self.time_of_day.floor();

        if let Some(sky) = ctx.graph.behavior_mut::<Sky>(self.handles.sky) {
            sky.set_time_of_day(self.time_of_day);
        }
    }

    fn next_level(&mut self, ctx: &mut UpdateContext<'_>) {
        self.level_time = 0.0;
        self.level += 1;
        log::info!("level {}", self.level);

        if let Some(player) = ctx.graph.behavior_mut::<Player>(self.handles.player) {
            player.show_message(format!("Level {}", self.level));
        }
        // forget enemies destroyed from outside
        self.enemies.retain(|&id| ctx.graph.contains(id));
        for &id in &self.enemies {
            if let Some(dummy) = ctx.graph.behavior_mut::<Dummy>(id) {
                if dummy.state() == CreatureState::Dead {
                    dummy.respawn();
                }
            }
        }
        self.add_enemy(ctx.graph);
    }
}

impl Updatable for WorldRoot {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        self.advance_clock(ctx);

        self.level_time += ctx.delta;
        if self.level_time >= self.level_duration {
            self.next_level(ctx);
        }
    }
}

impl Drawable for WorldRoot {
    fn draw(&self, ctx: &mut DrawContext<'_>) {
        for (index, light) in ctx.graph.lights(ctx.node).iter().enumerate() {
            ctx.backend.set_light(index, light);
        }
        let fog = ctx
            .graph
            .behavior::<Sky>(self.handles.sky)
            .map(Sky::base_color)
            .unwrap_or_else(Vec4::zeros);
        let far = ctx.eye.far_plane();
        ctx.backend.set_fog(fog, far * FOG_START, far * FOG_END);
    }
}

impl Collidable for WorldRoot {}

impl Behavior for WorldRoot {
    fn name(&self) -> &'static str {
        "world"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
