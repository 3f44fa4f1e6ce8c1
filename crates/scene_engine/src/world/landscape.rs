//! Terrain, ground plane and water
//!
//! The landscape node sits at the world origin; its terrain is stored in
//! world coordinates. Besides the visible patches around the eye it draws
//! the water surface, rendering the whole scene twice more beforehand: once
//! mirrored about the water plane and once clipped below it.

use rand::{Rng, RngCore};

use crate::config::{LandscapeConfig, Quality};
use crate::foundation::math::{constants::TAU, Vec2, Vec3};
use crate::scene::eye::Eye;
use crate::scene::frustum::Frustum;
use crate::scene::node::{Behavior, Collidable, DrawContext, Drawable, NodeRef, Updatable};
use crate::scene::render::{DrawCommand, RenderTarget};
use crate::spatial::terrain::{xz, MapRect, Terrain, TerrainError};

const PROCEDURAL_OCTAVES: i32 = 6;

/// Heights for a square map of `resolution²` samples, spanning the full
/// `0..=255` range.
///
/// Sums a few octaves of randomly oriented sine waves.
pub fn procedural_heights(resolution: usize, rng: &mut dyn RngCore) -> Vec<u8> {
    let base_frequency = TAU / resolution.max(1) as f32;
    let waves: Vec<(Vec2, f32, f32)> = (0..PROCEDURAL_OCTAVES)
        .map(|octave| {
            let angle = rng.gen_range(0.0..TAU);
            let frequency = base_frequency * 2f32.powi(octave);
            let phase = rng.gen_range(0.0..TAU);
            (Vec2::new(angle.cos(), angle.sin()) * frequency, phase, 0.5f32.powi(octave))
        })
        .collect();

    let raw: Vec<f32> = (0..resolution * resolution)
        .map(|index| {
            let point = Vec2::new((index % resolution) as f32, (index / resolution) as f32);
            waves
                .iter()
                .map(|(wave, phase, amplitude)| amplitude * (wave.dot(&point) + phase).sin())
                .sum()
        })
        .collect();

    let min = raw.iter().copied().fold(f32::INFINITY, f32::min);
    let max = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let span = (max - min).max(f32::EPSILON);
    raw.iter()
        .map(|height| ((height - min) / span * 255.0).round() as u8)
        .collect()
}

/// Terrain from the configured heightmap, or a procedural one
pub fn load_terrain(config: &LandscapeConfig, rng: &mut dyn RngCore) -> Result<Terrain, TerrainError> {
    match &config.heightmap {
        Some(path) => Terrain::from_image(path, config.size, config.offset, config.smoothing_passes),
        None => {
            let resolution = config.procedural_resolution as usize;
            log::info!("generating {resolution}x{resolution} procedural terrain");
            let heights = procedural_heights(resolution, rng);
            Terrain::from_heights(
                resolution,
                resolution,
                &heights,
                config.size,
                config.offset,
                config.smoothing_passes,
            )
        }
    }
}

/// Terrain node
pub struct Landscape {
    terrain: Terrain,
    water_height: f32,
    water_clip_offset: f32,
    patches_per_side: u32,
}

impl Landscape {
    /// Wrap `terrain` with the water settings of `config`
    pub fn new(terrain: Terrain, config: &LandscapeConfig) -> Self {
        if config.patches_per_side == 0 {
            log::warn!("patches_per_side is 0, drawing a single patch");
        }
        Self {
            terrain,
            water_height: config.water_height,
            water_clip_offset: config.water_clip_offset,
            patches_per_side: config.patches_per_side.max(1),
        }
    }

    /// The heightfield
    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    /// Water surface height
    pub fn water_height(&self) -> f32 {
        self.water_height
    }

    /// Map rectangles worth drawing for `eye`, one per patch row.
    ///
    /// A square of `2·far` around the eye is split into
    /// `patches_per_side²` patches; the patches of a row whose bounding
    /// sphere touches the frustum are merged and clipped to the grid.
    pub fn visible_patches(&self, eye: &Eye, frustum: &Frustum) -> Vec<MapRect> {
        let far = eye.far_plane();
        let count = self.patches_per_side;
        let offset_y = self.terrain.offset().y;
        let step = Vec3::new(
            2.0 * far / count as f32,
            self.terrain.size().y,
            2.0 * far / count as f32,
        );
        let radius = step.norm() / 2.0;
        let eye_xz = Vec3::new(eye.position().x, 0.0, eye.position().z);

        let mut rects = Vec::new();
        for row in 0..count {
            let mut merged: Option<(Vec2, Vec2)> = None;
            for column in 0..count {
                let corner = Vec3::new(-far + column as f32 * step.x, offset_y, -far + row as f32 * step.z);
                let center = eye_xz + corner + step / 2.0;
                if !frustum.is_sphere_in_frustum(&center, radius) {
                    continue;
                }
                let min = xz(&(eye_xz + corner));
                let max = min + Vec2::new(step.x, step.z);
                merged = Some(match merged {
                    Some((low, high)) => (low.inf(&min), high.sup(&max)),
                    None => (min, max),
                });
            }
            if let Some((min, max)) = merged {
                let rect = self.terrain.to_map_rect(min, max - min);
                rects.extend(self.terrain.clip_patch(&rect));
            }
        }
        rects
    }

    fn plane(&self, eye: &Eye, height: f32, water: bool) -> DrawCommand {
        let far = eye.far_plane();
        let center = xz(&eye.position());
        DrawCommand::InfinitePlane {
            height,
            min: [center.x - far, center.y - far],
            max: [center.x + far, center.y + far],
            water,
        }
    }
}

impl Updatable for Landscape {}

impl Drawable for Landscape {
    fn draw_post(&self, ctx: &mut DrawContext<'_>) {
        for rect in self.visible_patches(ctx.eye, ctx.frustum) {
            ctx.backend.submit(DrawCommand::TerrainPatch {
                x: rect.x as usize,
                y: rect.y as usize,
                width: rect.width as usize,
                height: rect.height as usize,
            });
        }
        let ground = self.plane(ctx.eye, self.terrain.offset().y, false);
        ctx.backend.submit(ground);
    }

    fn draw2_post(&self, ctx: &mut DrawContext<'_>) {
        // mirrored passes never draw water themselves
        if ctx.eye.clip_plane().is_some() {
            return;
        }

        let root = ctx.graph.root_of(ctx.node);
        let passes = [
            (RenderTarget::Reflection, ctx.eye.mirrored(self.water_height, self.water_clip_offset)),
            (RenderTarget::Refraction, ctx.eye.refracted(self.water_height, self.water_clip_offset)),
        ];

        ctx.backend.set_max_quality(Quality::Low);
        for (target, eye) in &passes {
            ctx.backend.begin_target(*target);
            ctx.graph.draw(root, eye, &mut *ctx.backend, ctx.settings, Quality::Low);
            ctx.graph.draw2(root, eye, &mut *ctx.backend, ctx.settings, Quality::Low);
            ctx.backend.end_target(*target);
        }
        ctx.backend.set_max_quality(ctx.quality);

        ctx.backend.load_projection(ctx.eye.projection_matrix());
        ctx.backend.set_clip_plane(ctx.eye.clip_plane());
        ctx.load_world_space();
        let water = self.plane(ctx.eye, self.water_height, true);
        ctx.backend.submit(water);
    }
}

impl Collidable for Landscape {
    fn intersect_line(
        &self,
        _node: NodeRef<'_>,
        origin: &Vec3,
        direction: &Vec3,
        length: f32,
    ) -> Option<(f32, Option<Vec3>)> {
        self.terrain
            .intersect_line(origin, direction, length)
            .map(|(distance, normal)| (distance, Some(normal)))
    }

    fn collide_sphere(&self, _node: NodeRef<'_>, radius: f32, center: &mut Vec3, normal: &mut Vec3) -> bool {
        // off the grid the ground plane at the terrain base takes over
        let (ground, ground_normal) = match self.terrain.try_height(xz(center)) {
            Some(height) => (height, None),
            None => (self.terrain.offset().y, Some(Vec3::y())),
        };
        let depth = ground + radius - center.y;
        if depth <= 0.0 {
            return false;
        }
        center.y += depth;
        *normal += ground_normal.unwrap_or_else(|| self.terrain.normal(xz(center)));
        true
    }
}

impl Behavior for Landscape {
    fn name(&self) -> &'static str {
        "landscape"
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
    use crate::config::{EngineSettings, EyeConfig};
    use crate::scene::render::{RecordingBackend, RenderCall};
    use crate::scene::scene_graph::SceneGraph;
    use crate::world::testing::flat_terrain;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    const EPSILON: f32 = 1e-4;

    fn landscape(ground: u8) -> Landscape {
        let config = LandscapeConfig { water_height: -10.0, ..LandscapeConfig::default() };
        Landscape::new(flat_terrain(ground), &config)
    }

    #[test]
    fn test_procedural_heights_span_full_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let heights = procedural_heights(33, &mut rng);
        assert_eq!(heights.len(), 33 * 33);
        assert_eq!(heights.iter().copied().min(), Some(0));
        assert_eq!(heights.iter().copied().max(), Some(255));
    }

    #[test]
    fn test_load_procedural_terrain() {
        let mut rng = StdRng::seed_from_u64(12);
        let config = LandscapeConfig { procedural_resolution: 17, ..LandscapeConfig::default() };
        let terrain = load_terrain(&config, &mut rng).expect("procedural terrain");
        assert_eq!(terrain.map_width(), 17);
        assert_eq!(terrain.map_height(), 17);

        let tiny = LandscapeConfig { procedural_resolution: 1, ..LandscapeConfig::default() };
        assert!(matches!(load_terrain(&tiny, &mut rng), Err(TerrainError::MapTooSmall { .. })));
    }

    #[test]
    fn test_collide_sphere_pushes_out_of_ground() {
        let mut graph = SceneGraph::new();
        let id = graph.spawn(landscape(5));
        let node = NodeRef { graph: &graph, id };
        let landscape = graph.behavior::<Landscape>(id).unwrap();

        let mut center = Vec3::new(0.0, 5.5, 0.0);
        let mut normal = Vec3::zeros();
        assert!(landscape.collide_sphere(node, 2.0, &mut center, &mut normal));
        assert_relative_eq!(center, Vec3::new(0.0, 7.0, 0.0), epsilon = EPSILON);
        assert_relative_eq!(normal, Vec3::y(), epsilon = EPSILON);

        let mut above = Vec3::new(0.0, 8.0, 0.0);
        assert!(!landscape.collide_sphere(node, 2.0, &mut above, &mut normal));
    }

    #[test]
    fn test_collide_sphere_off_grid_uses_base_plane() {
        let mut graph = SceneGraph::new();
        let id = graph.spawn(landscape(5));
        let node = NodeRef { graph: &graph, id };
        let landscape = graph.behavior::<Landscape>(id).unwrap();

        let mut center = Vec3::new(500.0, 0.5, 500.0);
        let mut normal = Vec3::zeros();
        assert!(landscape.collide_sphere(node, 1.0, &mut center, &mut normal));
        assert_relative_eq!(center.y, 1.0, epsilon = EPSILON);
        assert_relative_eq!(normal, Vec3::y(), epsilon = EPSILON);
    }

    #[test]
    fn test_intersect_line_reports_terrain_normal() {
        let mut graph = SceneGraph::new();
        let id = graph.spawn(landscape(5));
        let hit = graph
            .intersect_line(id, None, &Vec3::new(1.0, 15.0, 1.0), &-Vec3::y(), 100.0)
            .expect("ground below");
        assert_eq!(hit.node, id);
        assert_relative_eq!(hit.distance, 10.0, epsilon = EPSILON);
        assert_relative_eq!(hit.normal.unwrap(), Vec3::y(), epsilon = EPSILON);
    }

    #[test]
    fn test_visible_patches_skip_rows_behind_the_eye() {
        let mut rng = StdRng::seed_from_u64(13);
        let config = LandscapeConfig { procedural_resolution: 33, ..LandscapeConfig::default() };
        let landscape = Landscape::new(load_terrain(&config, &mut rng).unwrap(), &config);

        let mut eye = Eye::new(&EyeConfig::default());
        eye.set_position(Vec3::new(0.0, 10.0, 0.0));
        let rects = landscape.visible_patches(&eye, &eye.frustum());

        assert!(!rects.is_empty());
        for rect in &rects {
            assert!(rect.y > 0, "row behind the eye drawn: {rect:?}");
            assert!(rect.x >= 0 && rect.x + rect.width <= 32);
            assert!(rect.y + rect.height <= 32);
        }
    }

    #[test]
    fn test_water_passes_redraw_the_scene() {
        let mut graph = SceneGraph::new();
        let id = graph.spawn(landscape(5));
        let mut eye = Eye::default();
        eye.set_position(Vec3::new(0.0, 10.0, 0.0));

        let mut backend = RecordingBackend::new();
        graph.draw2(id, &eye, &mut backend, &EngineSettings::default(), Quality::High);
        let calls = backend.calls();

        let position = |call: RenderCall| calls.iter().position(|c| *c == call).expect("call recorded");
        let reflection = position(RenderCall::BeginTarget(RenderTarget::Reflection));
        let reflection_end = position(RenderCall::EndTarget(RenderTarget::Reflection));
        let refraction = position(RenderCall::BeginTarget(RenderTarget::Refraction));
        assert!(reflection < reflection_end && reflection_end < refraction);
        assert_eq!(calls[reflection - 1], RenderCall::MaxQuality(Quality::Low));

        // the nested opaque pass drew the terrain into the reflection
        assert!(calls[reflection..reflection_end]
            .iter()
            .any(|call| matches!(call, RenderCall::Draw(DrawCommand::TerrainPatch { .. }))));

        let water = backend.count_draws(|c| matches!(c, DrawCommand::InfinitePlane { water: true, .. }));
        assert_eq!(water, 1);
        assert!(calls.contains(&RenderCall::MaxQuality(Quality::High)));
        assert_eq!(calls.last(), Some(&RenderCall::Draw(landscape(5).plane(&eye, -10.0, true))));
    }
}
