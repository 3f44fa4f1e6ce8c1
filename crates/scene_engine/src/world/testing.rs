//! Fixtures shared by the gameplay tests

use rand::{rngs::StdRng, SeedableRng};

use crate::config::{EngineSettings, LandscapeConfig, WorldConfig};
use crate::foundation::math::Vec3;
use crate::input::InputState;
use crate::scene::scene_graph::{NodeId, SceneGraph};
use crate::spatial::terrain::Terrain;
use crate::world::landscape::Landscape;
use crate::world::{World, WorldHandles};

/// 11x11 grid at constant height `ground`, covering `[-55, 45]` on X and Z
pub fn flat_terrain(ground: u8) -> Terrain {
    Terrain::from_heights(
        11,
        11,
        &[ground; 121],
        Vec3::new(110.0, 256.0, 110.0),
        Vec3::new(-55.0, 0.0, -55.0),
        0,
    )
    .expect("valid flat terrain")
}

/// Flat landscape below `parent`, water far below the ground
pub fn spawn_landscape(graph: &mut SceneGraph, parent: NodeId, ground: u8) -> NodeId {
    let config = LandscapeConfig { water_height: -10.0, ..LandscapeConfig::default() };
    graph
        .spawn_child(parent, Landscape::new(flat_terrain(ground), &config), Vec3::zeros(), 0.0)
        .expect("parent exists")
}

/// Configuration of [`test_world`]: no enemies, power-ups or forests
pub fn test_config() -> WorldConfig {
    WorldConfig {
        initial_enemies: 0,
        power_ups: Vec::new(),
        landscape: LandscapeConfig { water_height: -10.0, forests: Vec::new(), ..LandscapeConfig::default() },
        ..WorldConfig::default()
    }
}

/// Full world over a flat terrain at height 5, player standing at `(0, 7, -20)`
pub fn test_world() -> (SceneGraph, WorldHandles) {
    let world = test_world_with(&test_config());
    (world.graph, world.handles)
}

/// Full world over a flat terrain at height 5
pub fn test_world_with(config: &WorldConfig) -> World {
    World::with_terrain(config, &EngineSettings::default(), flat_terrain(5)).expect("test world")
}

/// Both update passes with no input held
pub fn run_frame(graph: &mut SceneGraph, root: NodeId, delta: f32) {
    run_frame_with(graph, root, delta, &InputState::default());
}

/// Both update passes with `input` held
pub fn run_frame_with(graph: &mut SceneGraph, root: NodeId, delta: f32, input: &InputState) {
    let mut rng = StdRng::seed_from_u64(17);
    let settings = EngineSettings::default();
    graph.update(root, delta, &settings, input, &mut rng);
    graph.update2(root, delta, &settings, input, &mut rng);
}
