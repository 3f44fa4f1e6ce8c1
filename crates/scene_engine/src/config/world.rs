//! World description: terrain, sky, camera and gameplay tuning

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::Config;
use crate::foundation::math::{Vec2, Vec3};

/// Camera parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeConfig {
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    /// Width / height
    pub aspect: f32,
    /// Near clipping distance
    pub near_plane: f32,
    /// Far clipping distance, also the radius of the drawn terrain patch grid
    pub far_plane: f32,
    /// Offset of the view point relative to the attached node
    pub view_offset: Vec3,
}

impl Default for EyeConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 60.0,
            aspect: 1.0,
            near_plane: 0.1,
            far_plane: 500.0,
            view_offset: Vec3::zeros(),
        }
    }
}

/// Terrain and water
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandscapeConfig {
    /// Grayscale heightmap; a procedural map is generated when absent
    pub heightmap: Option<PathBuf>,
    /// Grid resolution of the procedural map
    pub procedural_resolution: u32,
    /// World extent of the terrain
    pub size: Vec3,
    /// World position of grid vertex (0, 0) at height 0
    pub offset: Vec3,
    /// Number of 3x3 blur passes applied to the heights
    pub smoothing_passes: u32,
    /// Water surface height
    pub water_height: f32,
    /// Offset of the water clipping plane used by the mirrored passes
    pub water_clip_offset: f32,
    /// Patch grid dimension around the eye
    pub patches_per_side: u32,
    /// Tree groups planted on the terrain
    pub forests: Vec<ForestConfig>,
}

impl Default for LandscapeConfig {
    fn default() -> Self {
        Self {
            heightmap: None,
            procedural_resolution: 129,
            size: Vec3::new(1000.0, 100.0, 1000.0),
            offset: Vec3::new(-500.0, -50.0, -500.0),
            smoothing_passes: 1,
            water_height: 0.0,
            water_clip_offset: 0.01,
            patches_per_side: 3,
            forests: vec![
                ForestConfig { position: Vec2::new(60.0, 40.0), radius: 30.0, trees: 40, priority: 20, seed: 1 },
                ForestConfig { position: Vec2::new(-80.0, -60.0), radius: 45.0, trees: 60, priority: 60, seed: 2 },
            ],
        }
    }
}

/// One group of trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Center on the XZ plane
    pub position: Vec2,
    /// Trees are planted within this distance of the center
    pub radius: f32,
    /// Number of trees
    pub trees: usize,
    /// Draw priority in `0..=99`, higher survives lower vegetation quality
    pub priority: u8,
    /// Seed of the placement, so a forest looks the same every run
    pub seed: u64,
}

/// Day/night cycle and sun lighting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyConfig {
    /// Axis the sun rotates about over one day
    pub axis: Vec3,
    /// Sun direction at time of day 0
    pub sun_initial_direction: Vec3,
    /// Diffuse factor at noon
    pub diffuse_day: f32,
    /// Diffuse factor at midnight
    pub diffuse_night: f32,
    /// Upper clamp of the diffuse factor
    pub diffuse_max: f32,
    /// Specular factor at noon
    pub specular_day: f32,
    /// Specular factor at midnight
    pub specular_night: f32,
    /// Upper clamp of the specular factor
    pub specular_max: f32,
    /// Ambient factor at noon
    pub ambient_day: f32,
    /// Ambient factor at midnight
    pub ambient_night: f32,
    /// Upper clamp of the ambient factor
    pub ambient_max: f32,
    /// Horizon color at noon (RGBA)
    pub horizon_day: [f32; 4],
    /// Horizon color at midnight (RGBA)
    pub horizon_night: [f32; 4],
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            axis: Vec3::new(1.0, 0.0, 1.0),
            sun_initial_direction: Vec3::new(0.0, 0.0, -1.0),
            diffuse_day: 3.0,
            diffuse_night: 0.2,
            diffuse_max: 2.0,
            specular_day: 2.0,
            specular_night: 0.3,
            specular_max: 2.0,
            ambient_day: 0.3,
            ambient_night: 0.1,
            ambient_max: 0.2,
            horizon_day: [0.62, 0.77, 0.93, 1.0],
            horizon_night: [0.02, 0.03, 0.08, 1.0],
        }
    }
}

/// Player tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Fly freely without gravity or damage
    pub god_mode: bool,
    /// Starting armor
    pub armor: i32,
    /// Standing eye height above the ground
    pub height_above_ground: f32,
    /// Maximum distance for target acquisition
    pub target_distance: f32,
    /// Starting point on the XZ plane
    pub spawn_position: Vec2,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            god_mode: false,
            armor: 25,
            height_above_ground: 2.0,
            target_distance: 300.0,
            spawn_position: Vec2::new(0.0, -20.0),
        }
    }
}

/// Kind of collectible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// +25 life, capped at 100
    Health,
    /// +40 armor, capped at 100
    Armor,
    /// Refills the laser
    WeaponLaser,
}

/// Placement of one collectible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUpConfig {
    /// What the player receives
    pub kind: PowerUpKind,
    /// Center of the spawn disc on the XZ plane
    pub position: Vec2,
    /// Radius of the spawn disc
    pub radius: f32,
}

/// Blood splatter effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplatterConfig {
    /// Ground decals kept alive at once
    pub max_splatters: usize,
    /// Particle pool size
    pub max_particles: usize,
}

impl Default for SplatterConfig {
    fn default() -> Self {
        Self {
            max_splatters: 32,
            max_particles: 256,
        }
    }
}

/// Everything needed to build a [`World`](crate::world::World)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Seconds per level
    pub level_duration: f32,
    /// Enemies present at level 1
    pub initial_enemies: usize,
    /// Enemies spawn within `[-extent, extent]` on X and Z
    pub enemy_spawn_extent: f32,
    /// Day fraction advanced per second
    pub time_of_day_speed: f32,
    /// Extra day fraction per second while time lapse is held
    pub time_lapse_speed: f32,
    /// Terrain and water
    pub landscape: LandscapeConfig,
    /// Sky
    pub sky: SkyConfig,
    /// Camera
    pub eye: EyeConfig,
    /// Player
    pub player: PlayerConfig,
    /// Blood splatter effect
    pub splatter: SplatterConfig,
    /// Collectibles
    pub power_ups: Vec<PowerUpConfig>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            level_duration: 20.0,
            initial_enemies: 1,
            enemy_spawn_extent: 100.0,
            time_of_day_speed: 0.002,
            time_lapse_speed: 0.2,
            landscape: LandscapeConfig::default(),
            sky: SkyConfig::default(),
            eye: EyeConfig::default(),
            player: PlayerConfig::default(),
            splatter: SplatterConfig::default(),
            power_ups: vec![
                PowerUpConfig { kind: PowerUpKind::Health, position: Vec2::new(20.0, 20.0), radius: 10.0 },
                PowerUpConfig { kind: PowerUpKind::Armor, position: Vec2::new(-20.0, 20.0), radius: 10.0 },
                PowerUpConfig { kind: PowerUpKind::WeaponLaser, position: Vec2::new(0.0, -30.0), radius: 10.0 },
            ],
        }
    }
}

impl Config for WorldConfig {}
