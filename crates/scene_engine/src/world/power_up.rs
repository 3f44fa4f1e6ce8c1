//! Rotating collectibles scattered over the terrain

use rand::Rng;

use crate::config::{PowerUpConfig, PowerUpKind};
use crate::foundation::math::{constants::DEG_TO_RAD, Quat, Vec2, Vec3};
use crate::physics::collision::{mesh, Ray};
use crate::scene::node::{
    Behavior, Collidable, DrawContext, Drawable, NodeRef, Updatable, UpdateContext,
};
use crate::scene::render::{DrawCommand, MeshKind};
use crate::world::landscape::Landscape;
use crate::world::laser::Laser;
use crate::world::player::Player;
use crate::world::WorldHandles;

/// Degrees per second
const SPIN_SPEED: f32 = 100.0;
/// Player distance at which the power-up is collected
const PICKUP_DISTANCE: f32 = 2.0;
/// Hover height above the terrain
const HOVER_HEIGHT: f32 = 1.5;
/// Half extent of the drawn quad
const HALF_EXTENT: f32 = 0.7;

/// Life added by a health power-up
pub const HEALTH_BONUS: i32 = 25;
/// Armor added by an armor power-up
pub const ARMOR_BONUS: i32 = 40;
/// Cap for life and armor raised by power-ups
pub const BONUS_CAP: i32 = 100;

/// Collectible that respawns somewhere on its disc after being taken
pub struct PowerUp {
    kind: PowerUpKind,
    center: Vec2,
    radius: f32,
    handles: WorldHandles,
    angle: f32,
    cooldown: f32,
    respawning: bool,
    placed: bool,
}

impl PowerUp {
    /// Power-up that places itself on its first update
    pub fn new(config: &PowerUpConfig, handles: WorldHandles) -> Self {
        Self {
            kind: config.kind,
            center: config.position,
            radius: config.radius,
            handles,
            angle: 0.0,
            cooldown: 0.0,
            respawning: true,
            placed: false,
        }
    }

    /// What the player receives
    pub fn kind(&self) -> PowerUpKind {
        self.kind
    }

    /// Whether the power-up is hidden and waiting to reappear
    pub fn is_respawning(&self) -> bool {
        self.respawning
    }

    fn respawn(&mut self, ctx: &mut UpdateContext<'_>) {
        let offset = loop {
            let candidate = Vec2::new(ctx.rng.gen_range(-1.0..=1.0), ctx.rng.gen_range(-1.0..=1.0));
            if candidate.norm_squared() <= 1.0 {
                break candidate * self.radius;
            }
        };
        let spot = self.center + offset;
        let ground = ctx
            .graph
            .behavior::<Landscape>(self.handles.landscape)
            .map_or(0.0, |landscape| landscape.terrain().height(spot));
        ctx.set_position(Vec3::new(spot.x, ground + HOVER_HEIGHT, spot.y));

        self.cooldown = ctx.rng.gen_range(1.0..=3.0);
        self.respawning = true;
        self.placed = true;
    }

    fn give_to_player(&self, ctx: &mut UpdateContext<'_>) {
        match self.kind {
            PowerUpKind::Health => {
                if let Some(player) = ctx.graph.behavior_mut::<Player>(self.handles.player) {
                    player.heal(HEALTH_BONUS);
                }
            }
            PowerUpKind::Armor => {
                if let Some(player) = ctx.graph.behavior_mut::<Player>(self.handles.player) {
                    player.add_armor(ARMOR_BONUS);
                }
            }
            PowerUpKind::WeaponLaser => {
                if let Some(laser) = ctx.graph.behavior_mut::<Laser>(self.handles.laser) {
                    laser.refill();
                }
            }
        }
        log::debug!("player collected {:?}", self.kind);
    }

    fn quad() -> [Vec3; 4] {
        [
            Vec3::new(-HALF_EXTENT, HALF_EXTENT, 0.0),
            Vec3::new(-HALF_EXTENT, -HALF_EXTENT, 0.0),
            Vec3::new(HALF_EXTENT, HALF_EXTENT, 0.0),
            Vec3::new(HALF_EXTENT, -HALF_EXTENT, 0.0),
        ]
    }
}

impl Updatable for PowerUp {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        if !self.placed {
            self.respawn(ctx);
        }

        self.angle = (self.angle + ctx.delta * SPIN_SPEED) % 360.0;
        ctx.set_rotation(Quat::from_axis_angle(&Vec3::y_axis(), self.angle * DEG_TO_RAD));

        if self.respawning {
            self.cooldown -= ctx.delta;
            if self.cooldown < 0.0 {
                self.cooldown = 0.0;
                self.respawning = false;
            }
            return;
        }

        let player_alive = ctx
            .graph
            .creature(self.handles.player)
            .is_some_and(|player| player.is_alive());
        let Some(player_position) = ctx.graph.world_position(self.handles.player) else {
            return;
        };
        if player_alive && (player_position - ctx.world_position()).norm() <= PICKUP_DISTANCE {
            self.give_to_player(ctx);
            self.respawn(ctx);
        }
    }
}

impl Drawable for PowerUp {
    fn draw(&self, ctx: &mut DrawContext<'_>) {
        if !self.respawning {
            ctx.backend.submit(DrawCommand::Mesh(MeshKind::PowerUp(self.kind)));
        }
    }
}

impl Collidable for PowerUp {
    fn intersect_line(
        &self,
        node: NodeRef<'_>,
        origin: &Vec3,
        direction: &Vec3,
        length: f32,
    ) -> Option<(f32, Option<Vec3>)> {
        if self.respawning {
            return None;
        }
        let quad = Self::quad();
        let model = node.world_matrix();
        mesh::intersect_triangle_strip(&quad, &model, &Ray::new(*origin, *direction))
            .filter(|&distance| distance < length)
            .map(|distance| (distance, None))
    }
}

impl Behavior for PowerUp {
    fn name(&self) -> &'static str {
        "power-up"
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
    use crate::world::testing::{run_frame, test_world};
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn test_places_itself_on_the_disc_above_ground() {
        let (mut graph, handles) = test_world();
        let config = PowerUpConfig { kind: PowerUpKind::Armor, position: Vec2::new(10.0, -10.0), radius: 3.0 };
        let id = graph.spawn_child(handles.root, PowerUp::new(&config, handles), Vec3::zeros(), 1.0).unwrap();

        run_frame(&mut graph, handles.root, 0.1);

        let position = graph.position(id).unwrap();
        assert!((Vec2::new(position.x, position.z) - config.position).norm() <= 3.0 + EPSILON);
        assert_relative_eq!(position.y, 5.0 + HOVER_HEIGHT, epsilon = EPSILON);
        assert!(graph.behavior::<PowerUp>(id).unwrap().is_respawning());
    }

    #[test]
    fn test_armor_pickup_caps_and_respawns() {
        let (mut graph, handles) = test_world();
        let player_position = graph.position(handles.player).unwrap();
        let config = PowerUpConfig {
            kind: PowerUpKind::Armor,
            position: Vec2::new(player_position.x, player_position.z),
            radius: 0.0,
        };
        let id = graph.spawn_child(handles.root, PowerUp::new(&config, handles), Vec3::zeros(), 1.0).unwrap();

        // first frame places it, the cooldown is at most three seconds
        run_frame(&mut graph, handles.root, 0.1);
        run_frame(&mut graph, handles.root, 3.5);
        assert!(!graph.behavior::<PowerUp>(id).unwrap().is_respawning());

        // hover right at the player
        graph.set_position(id, graph.world_position(handles.player).unwrap()).unwrap();
        graph.behavior_mut::<Player>(handles.player).unwrap().add_armor(50);
        run_frame(&mut graph, handles.root, 0.01);

        assert_eq!(graph.behavior::<Player>(handles.player).unwrap().armor(), BONUS_CAP);
        assert!(graph.behavior::<PowerUp>(id).unwrap().is_respawning());
    }

    #[test]
    fn test_visible_quad_blocks_lines() {
        let (mut graph, handles) = test_world();
        let config = PowerUpConfig { kind: PowerUpKind::Health, position: Vec2::new(30.0, 30.0), radius: 0.0 };
        let id = graph.spawn_child(handles.root, PowerUp::new(&config, handles), Vec3::zeros(), 1.0).unwrap();
        run_frame(&mut graph, handles.root, 0.1);
        let center = graph.world_position(id).unwrap();
        let origin = center + Vec3::new(0.2, -0.3, -10.0);

        // hidden while respawning
        let hit = graph.intersect_line(id, None, &origin, &Vec3::z(), 100.0);
        assert!(hit.is_none());

        run_frame(&mut graph, handles.root, 3.5);
        graph.set_rotation(id, Quat::identity()).unwrap();
        let hit = graph.intersect_line(id, None, &origin, &Vec3::z(), 100.0).expect("quad faces the ray");
        assert_relative_eq!(hit.distance, 10.0, epsilon = EPSILON);
    }
}
