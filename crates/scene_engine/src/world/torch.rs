//! Placeable torch
//!
//! A point light with a slowly changing hue and a spinning flare above the
//! handle. The torch only lights the scene while it is part of the tree;
//! the player detaches it to carry it around.

use crate::foundation::math::{Mat4, Point3, Vec3, Vec4};
use crate::scene::node::{Behavior, Collidable, DrawContext, Drawable, LightEmitting, NodeRef, Updatable, UpdateContext};
use crate::scene::render::{DrawCommand, LightSource, MeshKind};

/// Height of the flare above the torch origin
const FLARE_HEIGHT: f32 = 1.6;
const FLARE_SIZE: f32 = 5.0;
/// Degrees per second
const FLARE_SPIN: f32 = 20.0;
/// Hue advance per update
const HUE_STEP: f32 = 0.0005;
const SATURATION: f32 = 0.5;
const LINEAR_ATTENUATION: f32 = 0.05;

/// Bounding radius of a torch node, flare included
pub const TORCH_RADIUS: f32 = FLARE_HEIGHT + FLARE_SIZE;

/// Colored light on a stick
#[derive(Debug, Clone, PartialEq)]
pub struct Torch {
    hue: f32,
    color: Vec4,
    flare_rotation: f32,
}

impl Default for Torch {
    fn default() -> Self {
        Self::new()
    }
}

impl Torch {
    /// Red torch with an unrotated flare
    pub fn new() -> Self {
        Self { hue: 0.0, color: hsv_to_rgb(0.0, SATURATION, 1.0).push(1.0), flare_rotation: 0.0 }
    }

    /// Current light and flare color
    pub fn color(&self) -> Vec4 {
        self.color
    }

    /// Flare rotation in degrees
    pub fn flare_rotation(&self) -> f32 {
        self.flare_rotation
    }

    fn flare_offset() -> Vec3 {
        Vec3::new(0.0, FLARE_HEIGHT, 0.0)
    }
}

/// RGB of a color given as hue, saturation and value, all in `[0, 1]`
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Vec3 {
    let sector = (hue - hue.floor()) * 6.0;
    let fraction = sector.fract();
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * fraction);
    let t = value * (1.0 - saturation * (1.0 - fraction));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = sector as u32;
    match index {
        0 => Vec3::new(value, t, p),
        1 => Vec3::new(q, value, p),
        2 => Vec3::new(p, value, t),
        3 => Vec3::new(p, q, value),
        4 => Vec3::new(t, p, value),
        _ => Vec3::new(value, p, q),
    }
}

impl Updatable for Torch {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        self.hue = (self.hue + HUE_STEP).fract();
        self.color = hsv_to_rgb(self.hue, SATURATION, 1.0).push(1.0);
        self.flare_rotation = (self.flare_rotation + FLARE_SPIN * ctx.delta) % 360.0;
    }
}

impl Drawable for Torch {
    fn draw(&self, ctx: &mut DrawContext<'_>) {
        ctx.backend.submit(DrawCommand::Mesh(MeshKind::Torch));
    }

    fn draw2(&self, ctx: &mut DrawContext<'_>) {
        // no flares in the water reflection
        if ctx.eye.clip_plane().is_some() {
            return;
        }
        let flare = ctx.model_view * Mat4::new_translation(&Self::flare_offset());
        ctx.backend.load_matrix(&flare);
        ctx.backend.submit(DrawCommand::Flare {
            color: self.color,
            size: FLARE_SIZE,
            rotation: self.flare_rotation,
        });
        ctx.load_model_space();
    }
}

impl Collidable for Torch {}

impl LightEmitting for Torch {
    fn light(&self, node: NodeRef<'_>) -> Option<LightSource> {
        let position = node.world_matrix().transform_point(&Point3::from(Self::flare_offset()));
        let color = self.color.xyz();
        Some(LightSource::point(
            position.coords,
            color,
            color,
            Vec3::zeros(),
            Vec3::new(0.0, LINEAR_ATTENUATION, 0.0),
        ))
    }
}

impl Behavior for Torch {
    fn name(&self) -> &'static str {
        "torch"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn as_light(&self) -> Option<&dyn LightEmitting> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineSettings, Quality};
    use crate::input::InputState;
    use crate::scene::eye::Eye;
    use crate::scene::render::RecordingBackend;
    use crate::scene::scene_graph::SceneGraph;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_hsv_primaries() {
        assert_relative_eq!(hsv_to_rgb(0.0, 0.5, 1.0), Vec3::new(1.0, 0.5, 0.5), epsilon = EPSILON);
        assert_relative_eq!(hsv_to_rgb(1.0 / 3.0, 0.5, 1.0), Vec3::new(0.5, 1.0, 0.5), epsilon = EPSILON);
        assert_relative_eq!(hsv_to_rgb(2.0 / 3.0, 1.0, 1.0), Vec3::new(0.0, 0.0, 1.0), epsilon = EPSILON);
        assert_relative_eq!(hsv_to_rgb(0.25, 0.0, 0.4), Vec3::new(0.4, 0.4, 0.4), epsilon = EPSILON);
    }

    #[test]
    fn test_update_cycles_hue_and_spins_flare() {
        let mut graph = SceneGraph::new();
        let id = graph.spawn(Torch::new());
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..10 {
            graph.update(id, 0.5, &EngineSettings::default(), &InputState::default(), &mut rng);
        }

        let torch = graph.behavior::<Torch>(id).unwrap();
        assert_relative_eq!(torch.flare_rotation(), 100.0, epsilon = 1e-3);
        let expected = hsv_to_rgb(10.0 * HUE_STEP, SATURATION, 1.0);
        assert_relative_eq!(torch.color().xyz(), expected, epsilon = EPSILON);
        assert!(torch.color().y > 0.5);
    }

    #[test]
    fn test_light_sits_at_the_flare() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn(Torch::new());
        graph.set_position(root, Vec3::new(3.0, 5.0, 4.0)).unwrap();

        let lights = graph.lights(root);
        assert_eq!(lights.len(), 1);
        let light = lights[0];
        assert!(!light.is_directional());
        assert_relative_eq!(light.position.xyz(), Vec3::new(3.0, 6.6, 4.0), epsilon = EPSILON);
        assert_relative_eq!(light.diffuse, Vec3::new(1.0, 0.5, 0.5), epsilon = EPSILON);
        assert_relative_eq!(light.attenuation, Vec3::new(0.0, LINEAR_ATTENUATION, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_flare_skips_mirrored_pass() {
        let mut graph = SceneGraph::new();
        let id = graph.spawn(Torch::new());
        let settings = EngineSettings::default();
        let eye = Eye::default();
        let mirrored = eye.mirrored(-5.0, 0.01);
        let flare = |c: &DrawCommand| matches!(c, DrawCommand::Flare { size, .. } if *size == FLARE_SIZE);

        let mut backend = RecordingBackend::new();
        graph.draw(id, &eye, &mut backend, &settings, Quality::High);
        assert_eq!(backend.count_draws(|c| *c == DrawCommand::Mesh(MeshKind::Torch)), 1);

        graph.draw2(id, &mirrored, &mut backend, &settings, Quality::High);
        assert_eq!(backend.count_draws(flare), 0);
        graph.draw2(id, &eye, &mut backend, &settings, Quality::High);
        assert_eq!(backend.count_draws(flare), 1);
    }
}
