//! Headless world demo
//!
//! Builds a world over a procedural (or configured) heightmap, drives it for
//! a number of frames with scripted input into a recording backend and logs
//! what happened.
//!
//! Usage: `world_demo [world.toml|world.ron] [frames] [seed]`

use rand::{rngs::StdRng, SeedableRng};
use scene_engine::config::{Config, ConfigError, EngineSettings, WorldConfig};
use scene_engine::foundation::{logging, math::Vec2, time::Stopwatch};
use scene_engine::input::{Actions, InputState};
use scene_engine::scene::{Creature, DrawCommand, Node, NodeId, RecordingBackend};
use scene_engine::world::{World, WorldError};
use scene_engine::FrameDriver;

const DEFAULT_FRAMES: u32 = 1200;
const DEFAULT_SEED: u64 = 1;
const FRAME_DELTA: f32 = 1.0 / 60.0;
const REPORT_EVERY: u32 = 300;

#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid argument {0:?}")]
    InvalidArgument(String),
}

struct Options {
    config_path: Option<String>,
    frames: u32,
    seed: u64,
}

impl Options {
    fn from_args() -> Result<Self, DemoError> {
        let mut args = std::env::args().skip(1);
        let config_path = args.next();
        let frames = args
            .next()
            .map(|arg| arg.parse().map_err(|_| DemoError::InvalidArgument(arg)))
            .transpose()?
            .unwrap_or(DEFAULT_FRAMES);
        let seed = args
            .next()
            .map(|arg| arg.parse().map_err(|_| DemoError::InvalidArgument(arg)))
            .transpose()?
            .unwrap_or(DEFAULT_SEED);
        Ok(Self { config_path, frames, seed })
    }
}

/// Walk in a slow circle, look around, fire in bursts and drop the torch
/// now and then
fn scripted_input(frame: u32) -> InputState {
    let mut actions = Actions::FORWARD;
    if frame % 120 < 30 {
        actions |= Actions::FIRE;
    }
    if frame % 600 >= 540 {
        actions |= Actions::TIME_LAPSE;
    }
    if frame % 240 == 0 {
        actions |= Actions::UP;
    }
    if frame % 400 == 200 {
        actions |= Actions::USE;
    }
    let sway = (frame as f32 * 0.05).sin();
    InputState { actions, mouse_delta: Vec2::new(2.0, sway * 3.0) }
}

fn node_name(world: &World, id: NodeId) -> &'static str {
    world.graph().node(id).map_or("?", Node::name)
}

fn report(driver: &FrameDriver<RecordingBackend>, frame: u32, query: &mut Stopwatch) {
    let world = driver.world();
    let eye = world.eye();

    // one line query straight ahead, timed
    query.start();
    let hit = world.graph().intersect_line(
        world.handles().root,
        Some(world.handles().player),
        &eye.position(),
        &eye.direction(),
        eye.far_plane(),
    );
    query.stop();

    let draws = driver.backend().draws().count();
    let patches = driver
        .backend()
        .count_draws(|command| matches!(command, DrawCommand::TerrainPatch { .. }));
    let (points, life) = world
        .player()
        .map_or((0, 0), |player| (player.points(), player.life()));

    log::info!(
        "frame {frame}: level {}, {} enemies alive, player life {life} points {points}, \
         {draws} draws ({patches} terrain patches), looking at {}",
        world.level(),
        world.living_enemies(),
        hit.map_or_else(|| "nothing".to_owned(), |hit| format!("{} at {:.1}", node_name(world, hit.node), hit.distance)),
    );
}

fn run() -> Result<(), DemoError> {
    let options = Options::from_args()?;
    let config = match &options.config_path {
        Some(path) => WorldConfig::load_or_default(path)?,
        None => WorldConfig::default(),
    };
    let settings = EngineSettings::default();

    let mut rng = StdRng::seed_from_u64(options.seed);
    let world = World::new(&config, &settings, &mut rng)?;
    let mut driver = FrameDriver::new(world, RecordingBackend::new(), options.seed);

    log::info!("running {} frames with seed {}", options.frames, options.seed);
    let mut query = Stopwatch::new();
    for frame in 0..options.frames {
        driver.frame(FRAME_DELTA, scripted_input(frame));
        if frame % REPORT_EVERY == 0 {
            report(&driver, frame, &mut query);
        }
    }

    let timer = driver.timer();
    log::info!(
        "simulated {:.1}s in {} frames ({:.0} fps), line queries took {:.3} ms in total",
        timer.total_time(),
        timer.frame_count(),
        timer.fps(),
        query.elapsed_millis()
    );
    Ok(())
}

fn main() {
    logging::init_with_default("info");
    log::info!("Starting world demo");

    if let Err(err) = run() {
        log::error!("world demo failed: {err}");
        std::process::exit(1);
    }
}
