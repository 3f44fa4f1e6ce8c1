//! First-person player
//!
//! Movement follows the ground when it is flat enough, vertical motion is
//! integrated separately with gravity, buoyancy and fluid drag blended by
//! how deep the player stands in the water. Every frame the player
//! collides its body sphere (radius = eye height) with the whole scene and
//! casts a line along the view direction to find what it is aiming at.

use crate::config::PlayerConfig;
use crate::foundation::math::{constants::DEG_TO_RAD, Mat4, Quat, Vec2, Vec3};
use crate::input::Actions;
use crate::physics::collision::Sphere;
use crate::scene::node::{
    Behavior, Collidable, Creature, DrawContext, Drawable, Updatable, UpdateContext,
};
use crate::scene::render::DrawCommand;
use crate::world::creature::{CreatureState, Vitals};
use crate::world::landscape::Landscape;
use crate::world::laser::Laser;
use crate::world::WorldHandles;

const MAX_LIFE: i32 = 100;
const MAX_ARMOR: i32 = 100;

const WALK_SPEED: f32 = 8.0;
const FLY_SPEED: f32 = 30.0;
const FLY_BOOST: f32 = 10.0;
const SPRINT_FACTOR: f32 = 2.0;
/// Seconds of sprinting before the cool-down kicks in
const SPRINT_DURATION: f32 = 3.0;
const SPRINT_COOL_DOWN: f32 = 2.0;
const SWIM_FACTOR: f32 = 0.5;
const SWIM_FORCE: f32 = 8.0;

const GRAVITY: f32 = -80.0;
const BUOYANT_GRAVITY: f32 = -0.5;
const AIR_DRAG: f32 = 0.01;
const WATER_DRAG: f32 = 1.0;
const JUMP_SPEED: f32 = 20.0;
/// Ground normals with a smaller Y component are too steep to walk on
const WALKABLE_SLOPE: f32 = 0.7;

const DUCK_HEIGHT: f32 = 1.0;
const STAND_UP_SPEED: f32 = 10.0;

/// Degrees of rotation per pixel of mouse movement
const MOUSE_SENSITIVITY: f32 = 1.0 / 5.0;
const MAX_PITCH: f32 = 80.0;

const MESSAGE_DURATION: f32 = 4.0;

/// The torch can be picked up from within this distance
const TORCH_REACH: f32 = 2.5;
/// Seconds between two uses of the torch
const TORCH_COOL_DOWN: f32 = 0.5;
/// How far ahead of the player a torch is placed
const TORCH_PLACE_DISTANCE: f32 = 1.0;

/// Zooming, fading on-screen text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    /// Text shown
    pub text: String,
    /// Grows while the message is shown
    pub zoom: f32,
    /// Opacity in `0..=255`
    pub fade: f32,
    /// Seconds left
    pub time: f32,
}

impl Message {
    fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), zoom: 0.0, fade: 255.0, time: MESSAGE_DURATION }
    }

    fn update(&mut self, delta: f32) {
        if self.time > 0.0 && !self.text.is_empty() {
            self.zoom += delta * 10.0;
            self.fade -= delta * 50.0;
            self.time -= delta;
        } else {
            self.fade = 0.0;
        }
    }

    fn is_visible(&self) -> bool {
        self.fade > 0.0 && !self.text.is_empty()
    }
}

/// The creature steered by the input
pub struct Player {
    handles: WorldHandles,
    vitals: Vitals,
    armor: i32,
    god_mode: bool,
    standing_height: f32,
    height_above_ground: f32,
    target_distance: f32,
    pitch: f32,
    yaw: f32,
    velocity_y: f32,
    sprint_time: f32,
    sprint_cool_down: f32,
    on_ground: bool,
    ground_normal: Vec3,
    under_water: bool,
    immersion: f32,
    target: Vec3,
    target_available: bool,
    points: i32,
    kill_timer: f32,
    alive_time: f32,
    torch_timer: f32,
    message: Message,
}

impl Player {
    /// Player about to spawn
    pub fn new(config: &PlayerConfig, handles: WorldHandles) -> Self {
        Self {
            handles,
            vitals: Vitals::new(MAX_LIFE, CreatureState::Spawning),
            armor: config.armor.clamp(0, MAX_ARMOR),
            god_mode: config.god_mode,
            standing_height: config.height_above_ground,
            height_above_ground: config.height_above_ground,
            target_distance: config.target_distance,
            pitch: 0.0,
            yaw: 0.0,
            velocity_y: 0.0,
            sprint_time: 0.0,
            sprint_cool_down: 0.0,
            on_ground: false,
            ground_normal: Vec3::y(),
            under_water: false,
            immersion: 0.0,
            target: Vec3::zeros(),
            target_available: false,
            points: 0,
            kill_timer: 0.0,
            alive_time: 0.0,
            torch_timer: 0.0,
            message: Message::default(),
        }
    }

    /// Life cycle state
    pub fn state(&self) -> CreatureState {
        self.vitals.state
    }

    /// Add life, capped at 100
    pub fn heal(&mut self, amount: i32) {
        self.vitals.heal(amount);
    }

    /// Add armor, capped at 100
    pub fn add_armor(&mut self, amount: i32) {
        self.armor = (self.armor + amount).min(MAX_ARMOR);
    }

    /// Armor left
    pub fn armor(&self) -> i32 {
        self.armor
    }

    /// Score
    pub fn points(&self) -> i32 {
        self.points
    }

    /// Seconds since the player spawned
    pub fn alive_time(&self) -> f32 {
        self.alive_time
    }

    /// Point the player is looking at, if anything is within reach
    pub fn target(&self) -> Option<Vec3> {
        self.target_available.then_some(self.target)
    }

    /// Whether flying and invulnerability are on
    pub fn god_mode(&self) -> bool {
        self.god_mode
    }

    /// Switch flying and invulnerability
    pub fn set_god_mode(&mut self, god_mode: bool) {
        self.god_mode = god_mode;
    }

    /// Whether the eye is below the water surface
    pub fn is_under_water(&self) -> bool {
        self.under_water
    }

    /// On-screen message, while it is visible
    pub fn message(&self) -> Option<&Message> {
        self.message.is_visible().then_some(&self.message)
    }

    /// Show `text` on screen for a few seconds
    pub fn show_message(&mut self, text: impl Into<String>) {
        self.message = Message::new(text);
    }

    fn update_rotation(&mut self, ctx: &mut UpdateContext<'_>) {
        let mouse = ctx.input.mouse_delta;
        self.yaw -= mouse.x * MOUSE_SENSITIVITY;
        self.pitch = (self.pitch + mouse.y * MOUSE_SENSITIVITY).clamp(-MAX_PITCH, MAX_PITCH);
        let around_y = Quat::from_axis_angle(&Vec3::y_axis(), self.yaw * DEG_TO_RAD);
        let around_x = Quat::from_axis_angle(&Vec3::x_axis(), self.pitch * DEG_TO_RAD);
        ctx.set_rotation(around_y * around_x);
    }

    fn control(&self, ctx: &UpdateContext<'_>, vertical: bool) -> Vec3 {
        let held = |action| if ctx.input.is_held(action) { 1.0 } else { 0.0 };
        let mut control = Vec3::new(
            held(Actions::LEFT) - held(Actions::RIGHT),
            0.0,
            held(Actions::FORWARD) - held(Actions::BACKWARD),
        );
        if vertical {
            control.y = held(Actions::UP) - held(Actions::DOWN);
        }
        control.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros)
    }

    fn fly(&mut self, ctx: &mut UpdateContext<'_>) {
        let mut speed = FLY_SPEED;
        if ctx.input.is_held(Actions::SPEED) {
            speed *= FLY_BOOST;
        }
        let control = self.control(ctx, true);
        let rotation = ctx.rotation();
        let movement = rotation * Vec3::x() * control.x + rotation * Vec3::y() * control.y + rotation * Vec3::z() * control.z;
        ctx.set_position(ctx.position() + movement * (speed * ctx.delta));
    }

    fn walk(&mut self, ctx: &mut UpdateContext<'_>) {
        let delta = ctx.delta;
        let mut speed = WALK_SPEED;
        if ctx.input.is_held(Actions::SPEED) && self.sprint_cool_down <= 0.0 {
            speed *= SPRINT_FACTOR;
            self.sprint_time += delta;
        }
        if self.sprint_time >= SPRINT_DURATION {
            self.sprint_cool_down = SPRINT_COOL_DOWN;
            self.sprint_time = 0.0;
        }
        if self.sprint_cool_down > 0.0 {
            self.sprint_cool_down -= delta;
        }
        if self.under_water {
            speed *= SWIM_FACTOR;
        }
        let control = self.control(ctx, self.under_water);

        let left = ctx.rotation() * Vec3::x();
        let level_forward = left.cross(&Vec3::y());
        let mut movement = if self.on_ground && self.ground_normal.y > WALKABLE_SLOPE {
            let ground_forward = left.cross(&self.ground_normal);
            let ground_left = self.ground_normal.cross(&ground_forward);
            ground_forward * control.z + ground_left * control.x
        } else {
            level_forward * control.z + left * control.x
        };
        movement = movement.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros);
        if self.on_ground {
            // never walk into the ground
            movement -= self.ground_normal * movement.dot(&self.ground_normal).min(0.0);
        }
        let mut position = ctx.position() + movement * (speed * delta);

        let (mut force, drag) = if self.under_water {
            (control.y * SWIM_FORCE, WATER_DRAG)
        } else {
            (0.0, AIR_DRAG)
        };
        force += GRAVITY * (1.0 - self.immersion) + BUOYANT_GRAVITY * self.immersion;
        let friction = 0.5 * drag * self.velocity_y * self.velocity_y;
        if friction.is_finite() {
            if self.velocity_y > f32::EPSILON {
                force -= friction;
            } else if self.velocity_y < -f32::EPSILON {
                force += friction;
            }
        } else {
            self.velocity_y = 0.0;
            force = 0.0;
        }
        self.velocity_y += force * delta;

        if ctx.input.is_held(Actions::UP) && self.on_ground && self.ground_normal.y > WALKABLE_SLOPE {
            self.velocity_y = JUMP_SPEED;
        }
        if ctx.input.is_held(Actions::DOWN) {
            self.height_above_ground = DUCK_HEIGHT;
        } else if self.height_above_ground < self.standing_height {
            self.height_above_ground = (self.height_above_ground + STAND_UP_SPEED * delta).min(self.standing_height);
        }

        position.y += self.velocity_y * delta;
        ctx.set_position(position);
    }

    fn collide(&mut self, ctx: &mut UpdateContext<'_>) {
        let root = ctx.graph.root_of(ctx.node);
        let collision = ctx.graph.collide_sphere(root, Some(ctx.node), self.height_above_ground, ctx.position());
        self.on_ground = collision.collided();
        if self.on_ground {
            self.ground_normal = collision.normal.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y);
            if self.ground_normal.y > WALKABLE_SLOPE && self.velocity_y < 0.0 {
                self.velocity_y = 0.0;
            }
            ctx.set_position(collision.center);
        }
    }

    fn update_water(&mut self, ctx: &mut UpdateContext<'_>) {
        let Some(water) = ctx.graph.behavior::<Landscape>(self.handles.landscape).map(Landscape::water_height) else {
            return;
        };
        let y = ctx.position().y;
        let height = self.height_above_ground;
        self.under_water = y - height / 4.0 < water;
        self.immersion = ((water - y + height) / height).clamp(0.0, 1.0);

        let near_water = y - height / 2.0 < water;
        if let Some(laser) = ctx.graph.behavior_mut::<Laser>(self.handles.laser) {
            if self.under_water && laser.is_drawn() {
                laser.holster();
            } else if !near_water && !laser.is_drawn() {
                laser.pull();
            }
        }
    }

    fn update_target(&mut self, ctx: &mut UpdateContext<'_>) {
        let position = ctx.position();
        let direction = ctx.rotation() * Vec3::z();
        let root = ctx.graph.root_of(ctx.node);
        let hit = ctx.graph.intersect_line(root, Some(ctx.node), &position, &direction, self.target_distance);
        self.target_available = hit.is_some();
        let distance = hit.map_or(self.target_distance, |hit| hit.distance);
        self.target = position + direction * distance;
    }

    fn update_laser(&mut self, ctx: &mut UpdateContext<'_>) {
        let direction = ctx.rotation() * Vec3::z();
        let holder = Vec3::new(-0.5, -0.5 - 0.1 * Vec3::y().dot(&direction), 0.5);
        if let Err(err) = ctx.graph.set_position(self.handles.laser, holder) {
            log::warn!("laser lost: {err}");
            return;
        }
        let trigger = ctx.input.is_held(Actions::FIRE);
        if let Some(laser) = ctx.graph.behavior_mut::<Laser>(self.handles.laser) {
            laser.set_target(Some(self.target));
            laser.set_trigger(trigger);
        }
    }

    /// Place the carried torch in front of the player, or take the placed
    /// one back when it is within reach
    fn update_torch(&mut self, ctx: &mut UpdateContext<'_>) {
        if self.torch_timer <= TORCH_COOL_DOWN || !ctx.input.is_held(Actions::USE) {
            return;
        }
        let torch = self.handles.torch;
        let position = ctx.world_position();

        let result = if let Some(parent) = ctx.graph.parent(torch) {
            let within_reach = ctx
                .graph
                .world_position(torch)
                .is_some_and(|at| Sphere::new(position, TORCH_REACH).contains_point(&at));
            if !within_reach {
                return;
            }
            log::debug!("player took the torch");
            ctx.graph.remove_child(parent, torch)
        } else {
            let direction = ctx.rotation() * Vec3::z();
            let spot = position + direction * TORCH_PLACE_DISTANCE;
            let ground = ctx
                .graph
                .behavior::<Landscape>(self.handles.landscape)
                .map_or(spot.y, |landscape| landscape.terrain().height(Vec2::new(spot.x, spot.z)));
            let root = ctx.graph.root_of(ctx.node);
            log::debug!("player placed the torch at ({:.1}, {ground:.1}, {:.1})", spot.x, spot.z);
            ctx.graph
                .set_position(torch, Vec3::new(spot.x, ground, spot.z))
                .and_then(|()| ctx.graph.add_child(root, torch))
        };
        if let Err(err) = result {
            log::warn!("cannot use the torch: {err}");
            return;
        }
        self.torch_timer = 0.0;
    }
}

impl Updatable for Player {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        self.alive_time += ctx.delta;
        self.kill_timer += ctx.delta;
        self.torch_timer += ctx.delta;
        self.message.update(ctx.delta);

        if self.god_mode {
            self.vitals.state = CreatureState::Alive;
            self.vitals.life = MAX_LIFE;
        }

        match self.vitals.state {
            CreatureState::Spawning => {
                self.vitals.state = CreatureState::Alive;
                self.alive_time = 0.0;
            }
            CreatureState::Alive => {
                self.update_rotation(ctx);
                if self.god_mode {
                    self.fly(ctx);
                } else {
                    self.walk(ctx);
                }
                self.collide(ctx);
                self.update_water(ctx);
                self.update_target(ctx);
                self.update_laser(ctx);
                self.update_torch(ctx);
            }
            CreatureState::Dying => {
                self.vitals.state = CreatureState::Dead;
                self.show_message("GAME OVER!");
                log::info!("player died with {} points", self.points);
            }
            CreatureState::Dead => {}
        }
    }

    fn update2(&mut self, ctx: &mut UpdateContext<'_>) {
        if !self.target_available || !ctx.input.is_held(Actions::DRAG) {
            return;
        }
        if let Err(err) = ctx.graph.set_position(self.handles.teapot, self.target) {
            log::warn!("cannot drag the teapot: {err}");
        }
    }
}

impl Drawable for Player {
    fn draw2(&self, ctx: &mut DrawContext<'_>) {
        // screen space overlays, main view only
        if ctx.eye.clip_plane().is_some() {
            return;
        }
        ctx.backend.load_matrix(&Mat4::identity());
        if self.vitals.state == CreatureState::Alive {
            ctx.backend.submit(DrawCommand::Crosshair);
        }
        if let Some(message) = self.message() {
            ctx.backend.submit(DrawCommand::Text {
                text: message.text.clone(),
                zoom: message.zoom,
                alpha: message.fade / 255.0,
            });
        }
        ctx.load_model_space();
    }
}

impl Collidable for Player {}

impl Creature for Player {
    fn life(&self) -> i32 {
        self.vitals.life
    }

    fn is_alive(&self) -> bool {
        self.vitals.is_alive()
    }

    fn receive_damage(
        &mut self,
        _ctx: &mut UpdateContext<'_>,
        damage: i32,
        _position: Option<Vec3>,
        _direction: Option<Vec3>,
    ) -> bool {
        if self.god_mode {
            return false;
        }
        let absorbed = damage.min(self.armor).max(0);
        self.armor -= absorbed;
        self.vitals.damage(damage - absorbed);
        if self.vitals.life <= 0 && self.vitals.state == CreatureState::Alive {
            self.vitals.state = CreatureState::Dying;
            return true;
        }
        false
    }

    fn receive_points(&mut self, points: i32) {
        let multiplier = match self.kill_timer {
            t if t < 1.0 => 5.0,
            t if t < 3.0 => 3.0,
            t if t < 5.0 => 2.0,
            t if t < 10.0 => 1.5,
            _ => 1.0,
        };
        let earned = (points as f32 * multiplier) as i32;
        self.points += earned;
        self.show_message(earned.to_string());
        self.kill_timer = 0.0;
    }
}

impl Behavior for Player {
    fn name(&self) -> &'static str {
        "player"
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
