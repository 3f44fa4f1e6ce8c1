//! The game world built on top of the scene graph
//!
//! [`World`] owns the graph and the eye. Its root node carries the
//! [`WorldRoot`](root::WorldRoot) behavior, below which sit the landscape,
//! the sky, the teapot, the splatter system, the player (holding the laser),
//! the power-ups and the enemies, in that order.

use std::path::Path;

use rand::RngCore;

use crate::config::{Config, ConfigError, EngineSettings, WorldConfig};
use crate::foundation::math::{Vec2, Vec3};
use crate::input::InputState;
use crate::scene::eye::Eye;
use crate::scene::render::RenderBackend;
use crate::scene::scene_graph::{NodeId, SceneError, SceneGraph};
use crate::scene::transform::NodeTransform;
use crate::spatial::terrain::{Terrain, TerrainError};

pub mod creature;
pub mod dummy;
pub mod forest;
pub mod landscape;
pub mod laser;
pub mod particles;
pub mod player;
pub mod power_up;
pub mod root;
pub mod sky;
pub mod splatter;
pub mod teapot;
pub mod torch;

#[cfg(test)]
pub(crate) mod testing;

use dummy::Dummy;
use forest::Forest;
use landscape::{load_terrain, Landscape};
use laser::Laser;
use player::Player;
use power_up::PowerUp;
use root::WorldRoot;
use sky::Sky;
use splatter::SplatterSystem;
use teapot::Teapot;
use torch::{Torch, TORCH_RADIUS};

/// Bounding radius of the teapot node
const TEAPOT_RADIUS: f32 = 2.0;
/// Bounding radius of a power-up node
const POWER_UP_RADIUS: f32 = 1.0;

/// Errors raised while building a world
#[derive(thiserror::Error, Debug)]
pub enum WorldError {
    /// The terrain could not be built
    #[error("terrain: {0}")]
    Terrain(#[from] TerrainError),

    /// The node hierarchy could not be assembled
    #[error("scene: {0}")]
    Scene(#[from] SceneError),

    /// The world configuration could not be read
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

/// Well-known nodes of a world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldHandles {
    /// Root carrying the world behavior
    pub root: NodeId,
    /// Terrain and water
    pub landscape: NodeId,
    /// Sky and sun light
    pub sky: NodeId,
    /// The teapot enemies chase
    pub teapot: NodeId,
    /// Blood particles and decals
    pub splatter: NodeId,
    /// The player
    pub player: NodeId,
    /// The player's weapon
    pub laser: NodeId,
    /// Torch the player places and picks up; detached while carried
    pub torch: NodeId,
}

impl WorldConfig {
    /// Validate values that would make the world degenerate
    fn sanitized(&self) -> Self {
        let mut config = self.clone();
        if config.level_duration <= 0.0 {
            log::warn!("level duration {} is not positive, using 20", config.level_duration);
            config.level_duration = 20.0;
        }
        if config.enemy_spawn_extent < 0.0 {
            log::warn!("negative enemy spawn extent, using its magnitude");
            config.enemy_spawn_extent = config.enemy_spawn_extent.abs();
        }
        config
    }
}

/// Scene graph, eye and settings of one game
pub struct World {
    graph: SceneGraph,
    handles: WorldHandles,
    eye: Eye,
    settings: EngineSettings,
}

impl World {
    /// Build a world, loading or generating its terrain
    pub fn new(
        config: &WorldConfig,
        settings: &EngineSettings,
        rng: &mut dyn RngCore,
    ) -> Result<Self, WorldError> {
        let terrain = load_terrain(&config.landscape, rng)?;
        Self::with_terrain(config, settings, terrain)
    }

    /// Build a world from a configuration file (defaults when missing)
    pub fn from_file(
        path: impl AsRef<Path>,
        settings: &EngineSettings,
        rng: &mut dyn RngCore,
    ) -> Result<Self, WorldError> {
        let config = WorldConfig::load_or_default(path)?;
        Self::new(&config, settings, rng)
    }

    /// Build a world over an already constructed terrain
    pub fn with_terrain(
        config: &WorldConfig,
        settings: &EngineSettings,
        terrain: Terrain,
    ) -> Result<Self, WorldError> {
        let config = config.sanitized();
        let mut graph = SceneGraph::new();

        // behaviors need every handle, so nodes are created empty first
        let teapot_height = terrain.height(Vec2::zeros());
        let spawn = config.player.spawn_position;
        let player_height = terrain.height(spawn) + config.player.height_above_ground;
        let forests: Vec<Forest> = config
            .landscape
            .forests
            .iter()
            .map(|forest| Forest::plant(forest, &terrain, config.landscape.water_height))
            .collect();

        let handles = WorldHandles {
            root: graph.create(NodeTransform::default(), 0.0, None),
            landscape: graph.create(NodeTransform::default(), 0.0, None),
            sky: graph.create(NodeTransform::default(), 0.0, None),
            teapot: graph.create(
                NodeTransform::from_position(Vec3::new(0.0, teapot_height, 0.0)),
                TEAPOT_RADIUS,
                None,
            ),
            splatter: graph.create(NodeTransform::default(), 0.0, None),
            player: graph.create(
                NodeTransform::from_position(Vec3::new(spawn.x, player_height, spawn.y)),
                0.0,
                None,
            ),
            laser: graph.create(NodeTransform::default(), 0.0, None),
            torch: graph.create(
                NodeTransform::from_position(Vec3::new(0.0, teapot_height, 0.0)),
                TORCH_RADIUS,
                None,
            ),
        };

        for child in [handles.landscape, handles.sky, handles.teapot, handles.splatter, handles.player] {
            graph.add_child(handles.root, child)?;
        }
        graph.add_child(handles.player, handles.laser)?;

        graph.set_behavior(handles.landscape, Box::new(Landscape::new(terrain, &config.landscape)))?;
        graph.set_behavior(handles.sky, Box::new(Sky::new(&config.sky)))?;
        graph.set_behavior(handles.teapot, Box::new(Teapot::new(handles.landscape)))?;
        graph.set_behavior(
            handles.splatter,
            Box::new(SplatterSystem::new(&config.splatter, handles.landscape)),
        )?;
        graph.set_behavior(handles.player, Box::new(Player::new(&config.player, handles)))?;
        graph.set_behavior(handles.laser, Box::new(Laser::new()))?;
        graph.set_behavior(handles.torch, Box::new(Torch::new()))?;

        let forest_count = forests.len();
        for forest in forests {
            let (center, radius) = (forest.center(), forest.bounding_radius());
            graph.spawn_child(handles.landscape, forest, center, radius)?;
        }

        for power_up in &config.power_ups {
            let position = Vec3::new(power_up.position.x, 0.0, power_up.position.y);
            graph.spawn_child(handles.root, PowerUp::new(power_up, handles), position, POWER_UP_RADIUS)?;
        }

        let mut root = WorldRoot::new(&config, handles);
        for _ in 0..config.initial_enemies {
            root.add_enemy(&mut graph);
        }
        graph.set_behavior(handles.root, Box::new(root))?;

        let mut eye = Eye::new(&config.eye);
        eye.attach(handles.player);
        eye.update(&graph, 0.0);

        log::info!(
            "world built: {} nodes, {} forests, {} power-ups, {} enemies",
            graph.len(),
            forest_count,
            config.power_ups.len(),
            config.initial_enemies
        );
        Ok(Self { graph, handles, eye, settings: settings.clone() })
    }

    /// First update pass over the whole tree
    pub fn update(&mut self, delta: f32, input: &InputState, rng: &mut dyn RngCore) {
        self.graph.update(self.handles.root, delta, &self.settings, input, rng);
    }

    /// Second update pass, then the eye follows the player
    pub fn update2(&mut self, delta: f32, input: &InputState, rng: &mut dyn RngCore) {
        self.graph.update2(self.handles.root, delta, &self.settings, input, rng);
        self.eye.update(&self.graph, delta);
    }

    /// Opaque pass at the configured maximum quality
    pub fn draw(&self, backend: &mut dyn RenderBackend) {
        let quality = self.settings.max_quality;
        self.graph.draw(self.handles.root, &self.eye, backend, &self.settings, quality);
    }

    /// Transparent and overlay pass at the configured maximum quality
    pub fn draw2(&self, backend: &mut dyn RenderBackend) {
        let quality = self.settings.max_quality;
        self.graph.draw2(self.handles.root, &self.eye, backend, &self.settings, quality);
    }

    /// The scene
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// The scene, mutably
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Well-known nodes
    pub fn handles(&self) -> WorldHandles {
        self.handles
    }

    /// Camera following the player
    pub fn eye(&self) -> &Eye {
        &self.eye
    }

    /// Camera, mutably (e.g. to change the aspect ratio)
    pub fn eye_mut(&mut self) -> &mut Eye {
        &mut self.eye
    }

    /// Settings passed to every hook
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Current level
    pub fn level(&self) -> u32 {
        self.graph.behavior::<WorldRoot>(self.handles.root).map_or(1, WorldRoot::level)
    }

    /// The player behavior
    pub fn player(&self) -> Option<&Player> {
        self.graph.behavior::<Player>(self.handles.player)
    }

    /// Number of enemies taking part in the game, those still spawning
    /// included
    pub fn living_enemies(&self) -> usize {
        self.graph
            .behavior::<WorldRoot>(self.handles.root)
            .map_or(0, |root| {
                root.enemies()
                    .iter()
                    .filter(|&&id| {
                        self.graph.behavior::<Dummy>(id).is_some()
                            && self.graph.creature(id).is_some_and(|c| c.is_alive())
                    })
                    .count()
            })
    }
}
