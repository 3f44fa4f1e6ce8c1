//! Per-frame driver
//!
//! One frame is `begin_frame`, `update`, `update2`, `draw`, `draw2` and
//! `end_frame`, in that order. While paused the two update passes are
//! skipped and the world is still drawn.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::foundation::time::Timer;
use crate::input::InputState;
use crate::scene::render::RenderBackend;
use crate::world::World;

/// Drives a [`World`] frame by frame into a render backend
pub struct FrameDriver<B: RenderBackend> {
    world: World,
    backend: B,
    timer: Timer,
    rng: StdRng,
    input: InputState,
    paused: bool,
}

impl<B: RenderBackend> FrameDriver<B> {
    /// Driver whose random draws are reproducible from `seed`
    pub fn new(world: World, backend: B, seed: u64) -> Self {
        let paused = world.settings().start_paused;
        if paused {
            log::info!("starting paused");
        }
        Self {
            world,
            backend,
            timer: Timer::new(),
            rng: StdRng::seed_from_u64(seed),
            input: InputState::default(),
            paused,
        }
    }

    /// Start a frame of `delta` seconds (at least one nanosecond)
    /// with `input` held
    pub fn begin_frame(&mut self, delta: f32, input: InputState) {
        self.timer.advance(delta);
        self.input = input;
        let quality = self.world.settings().max_quality;
        self.backend.begin_frame();
        self.backend.set_max_quality(quality);
    }

    /// First update pass, skipped while paused
    pub fn update(&mut self) {
        if self.paused {
            return;
        }
        let delta = self.timer.delta_time();
        self.world.update(delta, &self.input, &mut self.rng);
    }

    /// Second update pass, skipped while paused
    pub fn update2(&mut self) {
        if self.paused {
            return;
        }
        let delta = self.timer.delta_time();
        self.world.update2(delta, &self.input, &mut self.rng);
    }

    /// Opaque draw pass
    pub fn draw(&mut self) {
        self.world.draw(&mut self.backend);
    }

    /// Transparent and overlay draw pass
    pub fn draw2(&mut self) {
        self.world.draw2(&mut self.backend);
    }

    /// Finish the frame
    pub fn end_frame(&mut self) {
        self.backend.end_frame();
        log::trace!("frame {} done", self.timer.frame_count());
    }

    /// Run one whole frame
    pub fn frame(&mut self, delta: f32, input: InputState) {
        self.begin_frame(delta, input);
        self.update();
        self.update2();
        self.draw();
        self.draw2();
        self.end_frame();
    }

    /// Suspend or resume the update passes
    pub fn set_paused(&mut self, paused: bool) {
        if paused != self.paused {
            log::info!("{}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    /// Flip the pause state
    pub fn toggle_pause(&mut self) {
        self.set_paused(!self.paused);
    }

    /// Whether the update passes are suspended
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Frame timing
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// The driven world
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The driven world, mutably
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The render backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The render backend, mutably
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Give back the world and the backend
    pub fn into_parts(self) -> (World, B) {
        (self.world, self.backend)
    }
}
