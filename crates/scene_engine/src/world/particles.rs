//! Fixed-size particle pool
//!
//! Particles are simulated in world space. A dead particle (life <= 0) is
//! a free slot that the next emission may reuse.

use rand::{Rng, RngCore};

use crate::foundation::math::Vec3;
use crate::scene::render::{DrawCommand, RenderBackend};

/// One particle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Particle {
    /// World position
    pub position: Vec3,
    /// Units per second
    pub velocity: Vec3,
    /// Seconds left
    pub life: f32,
}

impl Particle {
    /// Whether the slot is in use
    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }
}

/// Uniformly distributed unit vector
pub fn random_direction(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let candidate = Vec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        let length_squared = candidate.norm_squared();
        if length_squared > 1.0e-6 && length_squared <= 1.0 {
            return candidate / length_squared.sqrt();
        }
    }
}

/// Pool of particles sharing gravity, drag, size and life span
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    min_life: f32,
    max_life: f32,
    drag: f32,
    size: f32,
    gravity: Vec3,
}

impl ParticleSystem {
    /// Pool of `capacity` dead particles
    pub fn new(capacity: usize) -> Self {
        Self {
            particles: vec![Particle::default(); capacity],
            min_life: 1.0,
            max_life: 2.0,
            drag: 1.0,
            size: 1.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
        }
    }

    /// Life span range of emitted particles, in seconds
    pub fn with_life(mut self, min_life: f32, max_life: f32) -> Self {
        self.min_life = min_life.min(max_life);
        self.max_life = max_life.max(min_life);
        self
    }

    /// Fraction of the velocity kept after one second
    pub fn with_drag(mut self, drag: f32) -> Self {
        self.drag = drag;
        self
    }

    /// Half extent of the drawn quads
    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    /// Constant acceleration
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Pool size
    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    /// Half extent of the drawn quads
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Constant acceleration
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Live particles
    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|particle| particle.is_alive())
    }

    /// Number of live particles
    pub fn live_count(&self) -> usize {
        self.particles().count()
    }

    /// Advance every live particle by `delta` seconds
    pub fn update(&mut self, delta: f32) {
        self.update_with(delta, |_, _| {});
    }

    /// Advance every live particle, then let `interact` react to its new
    /// state (e.g. kill it when it enters the ground)
    pub fn update_with(&mut self, delta: f32, mut interact: impl FnMut(f32, &mut Particle)) {
        let delta_velocity = self.gravity * delta;
        let drag = self.drag.powf(delta);
        for particle in self.particles.iter_mut().filter(|particle| particle.is_alive()) {
            particle.position += particle.velocity * delta;
            particle.velocity *= drag;
            particle.velocity += delta_velocity;
            particle.life -= delta;
            interact(delta, particle);
        }
    }

    /// Emit up to `count` particles from `source` in random directions with
    /// a speed in `[min_speed, max_speed]`, plus `velocity_offset`.
    ///
    /// Returns how many free slots were used.
    pub fn emit_spherical(
        &mut self,
        rng: &mut dyn RngCore,
        source: Vec3,
        count: usize,
        min_speed: f32,
        max_speed: f32,
        velocity_offset: Vec3,
    ) -> usize {
        let mut emitted = 0;
        for particle in self.particles.iter_mut().filter(|particle| !particle.is_alive()) {
            if emitted == count {
                break;
            }
            let speed = rng.gen_range(min_speed.min(max_speed)..=max_speed.max(min_speed));
            particle.velocity = random_direction(rng) * speed + velocity_offset;
            particle.position = source;
            particle.life = rng.gen_range(self.min_life..=self.max_life);
            emitted += 1;
        }
        emitted
    }

    /// Submit the live particles; expects world space to be loaded
    pub fn draw(&self, backend: &mut dyn RenderBackend) {
        let positions: Vec<Vec3> = self.particles().map(|particle| particle.position).collect();
        if positions.is_empty() {
            return;
        }
        backend.submit(DrawCommand::Particles { positions, size: self.size });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::render::RecordingBackend;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_random_direction_is_unit() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..32 {
            assert_relative_eq!(random_direction(&mut rng).norm(), 1.0, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_emit_uses_free_slots_only() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut system = ParticleSystem::new(8);

        assert_eq!(system.emit_spherical(&mut rng, Vec3::zeros(), 5, 1.0, 2.0, Vec3::zeros()), 5);
        assert_eq!(system.emit_spherical(&mut rng, Vec3::zeros(), 5, 1.0, 2.0, Vec3::zeros()), 3);
        assert_eq!(system.live_count(), 8);
        assert_eq!(system.emit_spherical(&mut rng, Vec3::zeros(), 1, 1.0, 2.0, Vec3::zeros()), 0);
    }

    #[test]
    fn test_particle_life_cycle() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut system = ParticleSystem::new(4)
            .with_life(1.0, 1.0)
            .with_gravity(Vec3::new(0.0, -10.0, 0.0));
        system.emit_spherical(&mut rng, Vec3::new(0.0, 5.0, 0.0), 4, 0.0, 0.0, Vec3::zeros());

        system.update(0.5);
        assert_eq!(system.live_count(), 4);
        // no initial speed: the first step only gains velocity
        for particle in system.particles() {
            assert_relative_eq!(particle.position, Vec3::new(0.0, 5.0, 0.0), epsilon = EPSILON);
            assert_relative_eq!(particle.velocity, Vec3::new(0.0, -5.0, 0.0), epsilon = EPSILON);
        }

        system.update(0.5);
        assert_eq!(system.live_count(), 0);
    }

    #[test]
    fn test_emitted_speed_and_offset() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut system = ParticleSystem::new(16);
        let offset = Vec3::new(0.0, 10.0, 0.0);
        system.emit_spherical(&mut rng, Vec3::zeros(), 16, 5.0, 10.0, offset);

        for particle in system.particles() {
            let speed = (particle.velocity - offset).norm();
            assert!((5.0 - EPSILON..=10.0 + EPSILON).contains(&speed), "speed {speed}");
            assert!((1.0..=2.0).contains(&particle.life));
        }
    }

    #[test]
    fn test_interaction_can_kill() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut system = ParticleSystem::new(2);
        system.emit_spherical(&mut rng, Vec3::zeros(), 2, 1.0, 1.0, Vec3::zeros());
        system.update_with(0.1, |_, particle| particle.life = 0.0);
        assert_eq!(system.live_count(), 0);
    }

    #[test]
    fn test_draw_skips_empty_pool() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut backend = RecordingBackend::new();
        let mut system = ParticleSystem::new(3).with_size(0.25);
        system.draw(&mut backend);
        assert_eq!(backend.draws().count(), 0);

        system.emit_spherical(&mut rng, Vec3::x(), 2, 1.0, 1.0, Vec3::zeros());
        system.draw(&mut backend);
        assert_eq!(
            backend.draws().next(),
            Some(&DrawCommand::Particles { positions: vec![Vec3::x(), Vec3::x()], size: 0.25 })
        );
    }
}
