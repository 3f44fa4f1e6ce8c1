//! Blood particles and the ground decals they leave

use rand::{Rng, RngCore};

use crate::config::{Quality, SplatterConfig};
use crate::foundation::math::{Vec2, Vec3};
use crate::scene::node::{Behavior, Collidable, DrawContext, Drawable, Updatable, UpdateContext};
use crate::scene::render::DrawCommand;
use crate::scene::scene_graph::{NodeId, SceneGraph};
use crate::spatial::terrain::Terrain;
use crate::world::landscape::Landscape;
use crate::world::particles::ParticleSystem;

const PARTICLE_SIZE: f32 = 4.0;
const PARTICLE_GRAVITY: f32 = -120.0;
const PARTICLE_DRAG: f32 = 0.25;
/// Decal opacity lost per second
const FADE_SPEED: f32 = 0.3;
/// Spray sizes are clamped to this range
const MIN_SPRAY: f32 = 10.0;
const MAX_SPRAY: f32 = 100.0;

/// One ground decal
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Splatter {
    /// Lower XZ corner
    pub min: Vec2,
    /// Edge length
    pub size: f32,
    /// Opacity; the slot is free once it drops to zero
    pub fade: f32,
}

impl Splatter {
    fn is_visible(&self) -> bool {
        self.fade > 0.0
    }
}

/// Shared effect node; creatures spray into it when they get hit
pub struct SplatterSystem {
    landscape: NodeId,
    particles: ParticleSystem,
    splatters: Vec<Splatter>,
    splat_below: bool,
}

impl SplatterSystem {
    /// Effect reading the ground from the terrain of `landscape`
    pub fn new(config: &SplatterConfig, landscape: NodeId) -> Self {
        Self {
            landscape,
            particles: ParticleSystem::new(config.max_particles)
                .with_size(PARTICLE_SIZE)
                .with_gravity(Vec3::new(0.0, PARTICLE_GRAVITY, 0.0))
                .with_drag(PARTICLE_DRAG),
            splatters: vec![Splatter::default(); config.max_splatters.max(1)],
            splat_below: true,
        }
    }

    /// Whether a spray close to the ground immediately leaves a decal
    pub fn splat_below(&self) -> bool {
        self.splat_below
    }

    /// The particle pool
    pub fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    /// Decals still visible
    pub fn splatters(&self) -> impl Iterator<Item = &Splatter> {
        self.splatters.iter().filter(|splatter| splatter.is_visible())
    }

    /// Burst of particles at `source`; `size` grows the burst and is
    /// clamped to `[10, 100]`.
    pub fn spray(&mut self, terrain: Option<&Terrain>, rng: &mut dyn RngCore, source: Vec3, size: f32) {
        let size = size.clamp(MIN_SPRAY, MAX_SPRAY);
        let count = ((0.5 * size) as usize).max(1);
        self.particles.emit_spherical(rng, source, count, 0.25 * size, size, Vec3::zeros());

        let near_ground = terrain.is_some_and(|terrain| terrain.height_above_ground(&source) < size * 0.5);
        if self.splat_below && near_ground {
            let splat_size = size * rng.gen_range(0.2..=0.3);
            splat(&mut self.splatters, source, splat_size);
        }
    }

    /// Same as [`SplatterSystem::spray`] on the splatter node `id`
    pub fn spray_in(graph: &mut SceneGraph, rng: &mut dyn RngCore, id: NodeId, source: Vec3, size: f32) {
        let sprayed = graph.with_behavior_mut::<Self, _>(id, |splatter, graph| {
            let terrain = graph.behavior::<Landscape>(splatter.landscape).map(Landscape::terrain);
            splatter.spray(terrain, rng, source, size);
        });
        if sprayed.is_none() {
            log::warn!("no splatter system at {id:?}");
        }
    }
}

/// Reuse the first free decal slot, or the most faded one
fn splat(splatters: &mut [Splatter], source: Vec3, size: f32) {
    let slot = splatters
        .iter()
        .position(|splatter| !splatter.is_visible())
        .or_else(|| {
            splatters
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.fade.total_cmp(&b.fade))
                .map(|(index, _)| index)
        });
    if let Some(slot) = slot {
        splatters[slot] = Splatter {
            min: Vec2::new(source.x - size * 0.5, source.z - size * 0.5),
            size,
            fade: 1.0,
        };
    }
}

impl Updatable for SplatterSystem {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        self.splat_below = ctx.settings.max_quality == Quality::Medium;
        for splatter in &mut self.splatters {
            splatter.fade -= FADE_SPEED * ctx.delta;
        }

        let splat_on_impact = ctx.settings.max_quality == Quality::High;
        let Some(landscape) = ctx.graph.behavior::<Landscape>(self.landscape) else {
            self.particles.update(ctx.delta);
            return;
        };
        let terrain = landscape.terrain();
        let water = landscape.water_height();
        let half_size = self.particles.size() / 2.0;
        let gravity = self.particles.gravity();
        let splatters = &mut self.splatters;
        let rng = &mut *ctx.rng;

        self.particles.update_with(ctx.delta, |delta, particle| {
            let under_water = particle.position.y - water < -half_size;
            if under_water {
                // buoyancy cancels most of the gravity
                particle.velocity -= gravity / 1.1 * delta;
            }
            if terrain.height_above_ground(&particle.position) < -half_size {
                particle.life = 0.0;
                if !under_water && splat_on_impact {
                    let size = PARTICLE_SIZE * rng.gen_range(0.5..=2.0);
                    splat(splatters, particle.position, size);
                }
            }
        });
    }
}

impl Drawable for SplatterSystem {
    fn draw2(&self, ctx: &mut DrawContext<'_>) {
        ctx.load_world_space();
        self.particles.draw(&mut *ctx.backend);
        for splatter in self.splatters() {
            ctx.backend.submit(DrawCommand::Decal {
                min: [splatter.min.x, splatter.min.y],
                size: splatter.size,
                fade: splatter.fade,
            });
        }
    }
}

impl Collidable for SplatterSystem {}

impl Behavior for SplatterSystem {
    fn name(&self) -> &'static str {
        "splatter"
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
    use crate::config::EngineSettings;
    use crate::input::InputState;
    use crate::scene::transform::NodeTransform;
    use crate::world::testing::{flat_terrain, spawn_landscape};
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    const EPSILON: f32 = 1e-5;

    fn config(max_splatters: usize) -> SplatterConfig {
        SplatterConfig { max_splatters, max_particles: 64 }
    }

    #[test]
    fn test_spray_clamps_size_and_splats_near_ground() {
        let mut rng = StdRng::seed_from_u64(31);
        let terrain = flat_terrain(5);
        let mut system = SplatterSystem::new(&config(4), NodeId::default());

        // clamped up to 10: five particles, close enough to the ground to splat
        system.spray(Some(&terrain), &mut rng, Vec3::new(0.0, 6.0, 0.0), 1.0);
        assert_eq!(system.particles().live_count(), 5);
        let decals: Vec<_> = system.splatters().copied().collect();
        assert_eq!(decals.len(), 1);
        assert!((2.0..=3.0).contains(&decals[0].size));
        assert_relative_eq!(decals[0].min.x + decals[0].size / 2.0, 0.0, epsilon = EPSILON);

        // high above the ground nothing lands
        system.spray(Some(&terrain), &mut rng, Vec3::new(0.0, 80.0, 0.0), 10.0);
        assert_eq!(system.splatters().count(), 1);
    }

    #[test]
    fn test_splat_replaces_most_faded_decal() {
        let mut splatters = vec![
            Splatter { min: Vec2::zeros(), size: 1.0, fade: 0.8 },
            Splatter { min: Vec2::zeros(), size: 1.0, fade: 0.2 },
            Splatter { min: Vec2::zeros(), size: 1.0, fade: 0.5 },
        ];
        splat(&mut splatters, Vec3::new(10.0, 0.0, 20.0), 4.0);
        assert_eq!(splatters[1], Splatter { min: Vec2::new(8.0, 18.0), size: 4.0, fade: 1.0 });

        splatters[2].fade = 0.0;
        splat(&mut splatters, Vec3::zeros(), 2.0);
        assert_relative_eq!(splatters[2].fade, 1.0);
    }

    #[test]
    fn test_particles_die_in_the_ground_and_decals_fade() {
        let mut graph = SceneGraph::new();
        let root = graph.create(NodeTransform::default(), 0.0, None);
        let landscape = spawn_landscape(&mut graph, root, 5);
        let id = graph.spawn_child(root, SplatterSystem::new(&config(8), landscape), Vec3::zeros(), 0.0).unwrap();

        let mut rng = StdRng::seed_from_u64(32);
        SplatterSystem::spray_in(&mut graph, &mut rng, id, Vec3::new(0.0, 6.0, 0.0), 20.0);
        let system = graph.behavior::<SplatterSystem>(id).unwrap();
        assert_eq!(system.particles().live_count(), 10);
        assert_eq!(system.splatters().count(), 1);

        let settings = EngineSettings { max_quality: Quality::Medium, ..EngineSettings::default() };
        let input = InputState::default();
        for _ in 0..40 {
            graph.update(root, 0.1, &settings, &input, &mut rng);
        }

        let system = graph.behavior::<SplatterSystem>(id).unwrap();
        assert!(system.splat_below());
        assert_eq!(system.particles().live_count(), 0);
        // 4 seconds at 0.3 per second
        assert_eq!(system.splatters().count(), 0);
    }
}
