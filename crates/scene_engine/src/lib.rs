//! # Scene Engine
//!
//! Scene graph and spatial queries for a first-person game world.
//!
//! ## Features
//!
//! - **Arena scene graph**: nodes addressed by handles, lazily cached world matrices
//! - **Two-pass traversals**: `update`/`update2` and frustum-culled `draw`/`draw2`
//! - **Spatial queries**: nearest line hit and sphere push-out over the whole tree
//! - **Terrain index**: heightfield grid with height, normal and line walk lookups
//! - **Game world**: landscape, sky, player, enemies, weapon and effects as node behaviors
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = EngineSettings::default();
//!     let mut rng = StdRng::seed_from_u64(1);
//!     let world = World::new(&WorldConfig::default(), &settings, &mut rng)?;
//!
//!     let mut driver = FrameDriver::new(world, RecordingBackend::new(), 1);
//!     for _ in 0..60 {
//!         driver.frame(1.0 / 60.0, InputState::default());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod input;
pub mod physics;
pub mod scene;
pub mod spatial;
pub mod world;

mod engine;

pub use engine::FrameDriver;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        FrameDriver,
        config::{Config, ConfigError, EngineSettings, Quality, WorldConfig},
        foundation::{
            math::{Mat4, Quat, Vec2, Vec3},
            time::{Stopwatch, Timer},
        },
        input::{Actions, InputState},
        scene::{
            Behavior, Collidable, Creature, DrawContext, Drawable, Eye, NodeId, RecordingBackend,
            RenderBackend, SceneGraph, Updatable, UpdateContext,
        },
        spatial::Terrain,
        world::{World, WorldError, WorldHandles},
    };
}
