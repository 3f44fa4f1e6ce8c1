//! Sky dome and sun light
//!
//! The sun turns about a fixed axis once per day. Its height above the
//! horizon blends the light factors between night and day and picks the
//! horizon color used for the light and the fog.

use crate::config::SkyConfig;
use crate::foundation::math::{constants::TAU, utils, Mat4, Quat, Unit, Vec3, Vec4};
use crate::scene::node::{Behavior, Collidable, DrawContext, Drawable, LightEmitting, NodeRef, Updatable};
use crate::scene::render::{DrawCommand, LightSource};

/// Day/night cycle node
pub struct Sky {
    config: SkyConfig,
    time_of_day: f32,
    sun_direction: Vec3,
    base_color: Vec4,
    light: LightSource,
}

impl Sky {
    /// Sky at midnight (time of day 0)
    pub fn new(config: &SkyConfig) -> Self {
        let mut sky = Self {
            config: config.clone(),
            time_of_day: 0.0,
            sun_direction: Vec3::y(),
            base_color: Vec4::from(config.horizon_night),
            light: LightSource::directional(Vec3::y(), Vec3::zeros(), Vec3::zeros(), Vec3::zeros()),
        };
        sky.set_time_of_day(0.0);
        sky
    }

    /// Fraction of the day in `[0, 1)`
    pub fn time_of_day(&self) -> f32 {
        self.time_of_day
    }

    /// Move the sun; any value is wrapped into `[0, 1)`
    pub fn set_time_of_day(&mut self, time_of_day: f32) {
        let wrapped = time_of_day - time_of_day.floor();
        self.time_of_day = if wrapped >= 1.0 { 0.0 } else { wrapped };
        self.refresh();
    }

    /// Unit vector pointing at the sun
    pub fn sun_direction(&self) -> Vec3 {
        self.sun_direction
    }

    /// Horizon color, also used as fog color
    pub fn base_color(&self) -> Vec4 {
        self.base_color
    }

    /// Directional light of the sun
    pub fn sun_light(&self) -> LightSource {
        self.light
    }

    fn refresh(&mut self) {
        let axis = Unit::try_new(self.config.axis, f32::EPSILON).unwrap_or_else(Vec3::y_axis);
        let initial = self
            .config
            .sun_initial_direction
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vec3::z);
        self.sun_direction = Quat::from_axis_angle(&axis, self.time_of_day * TAU) * initial;

        // 0 with the sun straight below, 1 straight above
        let daylight = (self.sun_direction.y + 1.0) * 0.5;
        let config = &self.config;
        self.base_color = Vec4::from(config.horizon_night).lerp(&Vec4::from(config.horizon_day), daylight);
        let diffuse = utils::lerp(config.diffuse_night, config.diffuse_day, daylight).min(config.diffuse_max);
        let specular = utils::lerp(config.specular_night, config.specular_day, daylight).min(config.specular_max);
        let ambient = utils::lerp(config.ambient_night, config.ambient_day, daylight).min(config.ambient_max);

        let color = self.base_color.xyz();
        let ambient_color = color.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros);
        self.light = LightSource::directional(
            self.sun_direction,
            color * diffuse,
            color * specular,
            ambient_color * ambient,
        );
    }
}

impl Updatable for Sky {}

impl Drawable for Sky {
    fn draw(&self, ctx: &mut DrawContext<'_>) {
        // centred on the eye and never clipped by the water plane
        let around_eye = ctx.eye.view_matrix() * Mat4::new_translation(&ctx.eye.position());
        ctx.backend.load_matrix(&around_eye);
        ctx.backend.set_clip_plane(None);
        ctx.backend.submit(DrawCommand::SkyDome {
            sun_direction: self.sun_direction,
            base_color: self.base_color,
        });
        ctx.backend.set_clip_plane(ctx.eye.clip_plane());
        ctx.load_model_space();
    }

    fn draw2(&self, ctx: &mut DrawContext<'_>) {
        if ctx.eye.clip_plane().is_some() {
            return;
        }
        ctx.backend.submit(DrawCommand::SunFlare { sun_direction: self.sun_direction });
    }
}

impl Collidable for Sky {}

impl LightEmitting for Sky {
    fn light(&self, _node: NodeRef<'_>) -> Option<LightSource> {
        Some(self.light)
    }
}

impl Behavior for Sky {
    fn name(&self) -> &'static str {
        "sky"
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
