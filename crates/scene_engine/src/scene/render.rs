//! Rendering seam
//!
//! The scene graph never talks to a graphics API. Draw passes load
//! pre-computed model-view matrices and submit abstract [`DrawCommand`]s to
//! a [`RenderBackend`]; a real backend turns them into API calls, the
//! [`RecordingBackend`] just remembers them for tests and headless runs.

use crate::config::{PowerUpKind, Quality};
use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::scene::frustum::Plane;

/// Offscreen surfaces drawn by the mirrored water passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// Scene mirrored about the water plane
    Reflection,
    /// Scene below the water plane
    Refraction,
}

/// Static meshes a backend is expected to provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshKind {
    /// The draggable teapot
    Teapot,
    /// Enemy body, a sphere of radius 4
    Dummy,
    /// Laser barrel
    Laser,
    /// Rotating collectible
    PowerUp(PowerUpKind),
    /// Forest tree, instanced
    Tree,
    /// Torch on its spear
    Torch,
}

/// Light description handed to the backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSource {
    /// Homogeneous position; `w == 0` means a directional light
    pub position: Vec4,
    /// Diffuse color
    pub diffuse: Vec3,
    /// Specular color
    pub specular: Vec3,
    /// Ambient color
    pub ambient: Vec3,
    /// Constant, linear and quadratic distance attenuation
    pub attenuation: Vec3,
}

impl LightSource {
    /// Directional light shining from `direction` (towards the origin)
    pub fn directional(direction: Vec3, diffuse: Vec3, specular: Vec3, ambient: Vec3) -> Self {
        Self {
            position: Vec4::new(direction.x, direction.y, direction.z, 0.0),
            diffuse,
            specular,
            ambient,
            attenuation: Vec3::x(),
        }
    }

    /// Point light at world `position`
    pub fn point(position: Vec3, diffuse: Vec3, specular: Vec3, ambient: Vec3, attenuation: Vec3) -> Self {
        Self {
            position: position.push(1.0),
            diffuse,
            specular,
            ambient,
            attenuation,
        }
    }

    /// Whether the light has no position
    pub fn is_directional(&self) -> bool {
        self.position.w == 0.0
    }
}

/// Abstract draw command, interpreted relative to the last loaded matrix
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Rows of terrain triangle strips covering a map rectangle
    TerrainPatch {
        /// First map column
        x: usize,
        /// First map row
        y: usize,
        /// Columns covered
        width: usize,
        /// Rows covered
        height: usize,
    },
    /// Flat quad at `height` spanning `[min, max]` on XZ
    InfinitePlane {
        /// Plane height
        height: f32,
        /// Lower XZ corner
        min: [f32; 2],
        /// Upper XZ corner
        max: [f32; 2],
        /// Water surface (textured from the offscreen targets) rather than ground
        water: bool,
    },
    /// Sky dome, stars and clouds around the eye
    SkyDome {
        /// Unit vector pointing at the sun
        sun_direction: Vec3,
        /// Horizon color
        base_color: Vec4,
    },
    /// Sun flare billboard
    SunFlare {
        /// Unit vector pointing at the sun
        sun_direction: Vec3,
    },
    /// A static mesh at the current matrix
    Mesh(MeshKind),
    /// One mesh drawn once per transform, relative to the current matrix
    Instances {
        /// Mesh drawn
        mesh: MeshKind,
        /// Per-instance model matrices
        transforms: Vec<Mat4>,
    },
    /// Camera-facing quads, one per live particle
    Particles {
        /// World positions of the live particles
        positions: Vec<Vec3>,
        /// Half extent of each quad
        size: f32,
    },
    /// Ground decal covering a world-space XZ square
    Decal {
        /// Lower XZ corner
        min: [f32; 2],
        /// Edge length
        size: f32,
        /// Remaining opacity in `(0, 1]`
        fade: f32,
    },
    /// Fading laser beam
    Beam {
        /// World start point
        start: Vec3,
        /// World end point
        end: Vec3,
        /// Opacity in `(0, 1]`
        alpha: f32,
    },
    /// Two counter-rotating additive billboards at the current origin
    Flare {
        /// Tint (RGBA)
        color: Vec4,
        /// Half extent of the billboard
        size: f32,
        /// Rotation of the first billboard in degrees
        rotation: f32,
    },
    /// Wireframe sphere of `radius` around the current origin
    DebugSphere {
        /// Bounding radius being visualised
        radius: f32,
    },
    /// Screen-space crosshair
    Crosshair,
    /// Screen-space text
    Text {
        /// Message
        text: String,
        /// Zoom factor grown over the message lifetime
        zoom: f32,
        /// Opacity in `[0, 1]`
        alpha: f32,
    },
}

/// What a draw pass needs from a graphics backend
pub trait RenderBackend {
    /// Replace the current model-view matrix
    fn load_matrix(&mut self, model_view: &Mat4);

    /// Replace the projection matrix
    fn load_projection(&mut self, projection: &Mat4);

    /// Submit geometry at the current matrix
    fn submit(&mut self, command: DrawCommand);

    /// Configure light slot `index`
    fn set_light(&mut self, index: usize, light: &LightSource);

    /// Set or clear the user clipping plane (world space)
    fn set_clip_plane(&mut self, plane: Option<Plane>);

    /// Linear fog between `start` and `end` eye distance
    fn set_fog(&mut self, color: Vec4, start: f32, end: f32);

    /// Redirect output to an offscreen target until [`RenderBackend::end_target`]
    fn begin_target(&mut self, target: RenderTarget);

    /// Restore the previous output target
    fn end_target(&mut self, target: RenderTarget);

    /// Upper bound for the quality of effects drawn from now on
    fn set_max_quality(&mut self, _quality: Quality) {}

    /// Called once before the first pass of a frame
    fn begin_frame(&mut self) {}

    /// Called once after the last pass of a frame
    fn end_frame(&mut self) {}
}

/// One call received by a [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    /// [`RenderBackend::load_matrix`]
    LoadMatrix(Mat4),
    /// [`RenderBackend::load_projection`]
    LoadProjection(Mat4),
    /// [`RenderBackend::submit`]
    Draw(DrawCommand),
    /// [`RenderBackend::set_light`]
    Light(usize, LightSource),
    /// [`RenderBackend::set_clip_plane`]
    ClipPlane(Option<Plane>),
    /// [`RenderBackend::set_fog`]
    Fog {
        /// Fog color
        color: Vec4,
        /// Start distance
        start: f32,
        /// End distance
        end: f32,
    },
    /// [`RenderBackend::begin_target`]
    BeginTarget(RenderTarget),
    /// [`RenderBackend::end_target`]
    EndTarget(RenderTarget),
    /// [`RenderBackend::set_max_quality`]
    MaxQuality(Quality),
}

/// Backend that records every call of the current frame
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<RenderCall>,
    frames: u64,
}

impl RecordingBackend {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls received since the last [`RenderBackend::begin_frame`]
    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    /// Draw commands received since the last frame began
    pub fn draws(&self) -> impl Iterator<Item = &DrawCommand> {
        self.calls.iter().filter_map(|call| match call {
            RenderCall::Draw(command) => Some(command),
            _ => None,
        })
    }

    /// Number of recorded draw commands matching `predicate`
    pub fn count_draws(&self, predicate: impl Fn(&DrawCommand) -> bool) -> usize {
        self.draws().filter(|command| predicate(command)).count()
    }

    /// Completed frames
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Forget all recorded calls
    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl RenderBackend for RecordingBackend {
    fn load_matrix(&mut self, model_view: &Mat4) {
        self.calls.push(RenderCall::LoadMatrix(*model_view));
    }

    fn load_projection(&mut self, projection: &Mat4) {
        self.calls.push(RenderCall::LoadProjection(*projection));
    }

    fn submit(&mut self, command: DrawCommand) {
        self.calls.push(RenderCall::Draw(command));
    }

    fn set_light(&mut self, index: usize, light: &LightSource) {
        self.calls.push(RenderCall::Light(index, *light));
    }

    fn set_clip_plane(&mut self, plane: Option<Plane>) {
        self.calls.push(RenderCall::ClipPlane(plane));
    }

    fn set_fog(&mut self, color: Vec4, start: f32, end: f32) {
        self.calls.push(RenderCall::Fog { color, start, end });
    }

    fn begin_target(&mut self, target: RenderTarget) {
        self.calls.push(RenderCall::BeginTarget(target));
    }

    fn end_target(&mut self, target: RenderTarget) {
        self.calls.push(RenderCall::EndTarget(target));
    }

    fn set_max_quality(&mut self, quality: Quality) {
        self.calls.push(RenderCall::MaxQuality(quality));
    }

    fn begin_frame(&mut self) {
        self.calls.clear();
    }

    fn end_frame(&mut self) {
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_recording_backend_keeps_one_frame() {
        let mut backend = RecordingBackend::new();
        backend.begin_frame();
        backend.load_matrix(&Mat4::identity());
        backend.submit(DrawCommand::Crosshair);
        backend.submit(DrawCommand::Mesh(MeshKind::Teapot));
        backend.end_frame();

        assert_eq!(backend.calls().len(), 3);
        assert_eq!(backend.count_draws(|c| matches!(c, DrawCommand::Mesh(_))), 1);
        assert_eq!(backend.frames(), 1);

        backend.begin_frame();
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_directional_and_point_lights() {
        let light = LightSource::directional(Vec3::y(), Vec3::x(), Vec3::x(), Vec3::z());
        assert!(light.is_directional());

        let attenuation = Vec3::new(0.0, 0.05, 0.0);
        let point = LightSource::point(Vec3::new(1.0, 2.0, 3.0), Vec3::x(), Vec3::x(), Vec3::zeros(), attenuation);
        assert!(!point.is_directional());
        assert_eq!(point.position, Vec4::new(1.0, 2.0, 3.0, 1.0));
        assert_eq!(point.attenuation, attenuation);
    }

    #[test]
    fn test_mesh_kinds_are_hashable() {
        let kinds: HashSet<MeshKind> = [
            MeshKind::Teapot,
            MeshKind::PowerUp(PowerUpKind::Health),
            MeshKind::PowerUp(PowerUpKind::Armor),
            MeshKind::PowerUp(PowerUpKind::Health),
            MeshKind::Tree,
        ]
        .into_iter()
        .collect();
        assert_eq!(kinds.len(), 4);
        assert!(kinds.contains(&MeshKind::PowerUp(PowerUpKind::Armor)));
    }
}
