//! Node kinds as capability traits
//!
//! A scene node is just a transform plus hierarchy. What it does is
//! supplied by an optional [`Behavior`]: a bundle of the capability traits
//! [`Updatable`], [`Drawable`] and [`Collidable`], all of which default to
//! doing nothing. Behaviors that can be hurt expose [`Creature`] and light
//! sources expose [`LightEmitting`] through the accessors on [`Behavior`].

use std::any::Any;

use rand::RngCore;

use crate::config::{EngineSettings, Quality};
use crate::foundation::math::{Mat4, Quat, Vec3};
use crate::input::InputState;
use crate::scene::eye::Eye;
use crate::scene::frustum::Frustum;
use crate::scene::render::{LightSource, RenderBackend};
use crate::scene::scene_graph::{NodeId, SceneGraph};

/// Everything an update hook may touch
///
/// The hook's own behavior is detached from its node while the hook runs,
/// so `graph` can be mutated freely. Queries issued from a hook therefore
/// never see the calling node's own geometry.
pub struct UpdateContext<'a> {
    /// The whole scene
    pub graph: &'a mut SceneGraph,
    /// Node whose hook is running
    pub node: NodeId,
    /// Seconds since the previous frame, at least one nanosecond
    pub delta: f32,
    /// Process-wide switches
    pub settings: &'a EngineSettings,
    /// Input held this frame
    pub input: &'a InputState,
    /// Random source for spawning and effects
    pub rng: &'a mut dyn RngCore,
}

impl UpdateContext<'_> {
    /// Local position of the running node
    pub fn position(&self) -> Vec3 {
        self.graph.position(self.node).unwrap_or_else(Vec3::zeros)
    }

    /// Local rotation of the running node
    pub fn rotation(&self) -> Quat {
        self.graph.rotation(self.node).unwrap_or_else(Quat::identity)
    }

    /// World position of the running node
    pub fn world_position(&self) -> Vec3 {
        self.graph.world_position(self.node).unwrap_or_else(Vec3::zeros)
    }

    /// Move the running node (invalidates its subtree)
    pub fn set_position(&mut self, position: Vec3) {
        if let Err(err) = self.graph.set_position(self.node, position) {
            log::warn!("cannot move {:?}: {err}", self.node);
        }
    }

    /// Turn the running node (invalidates its subtree)
    pub fn set_rotation(&mut self, rotation: Quat) {
        if let Err(err) = self.graph.set_rotation(self.node, rotation) {
            log::warn!("cannot turn {:?}: {err}", self.node);
        }
    }

    /// Re-borrow this context for another node, e.g. to hand a creature
    /// its own context while it receives damage
    pub fn for_node(&mut self, node: NodeId) -> UpdateContext<'_> {
        UpdateContext {
            graph: &mut *self.graph,
            node,
            delta: self.delta,
            settings: self.settings,
            input: self.input,
            rng: &mut *self.rng,
        }
    }

    /// Hurt the creature at `victim` with a context of its own.
    ///
    /// `None` when `victim` is gone or not a creature, otherwise whether
    /// the hit killed it.
    pub fn damage_creature(
        &mut self,
        victim: NodeId,
        damage: i32,
        position: Option<Vec3>,
        direction: Option<Vec3>,
    ) -> Option<bool> {
        let (delta, settings, input) = (self.delta, self.settings, self.input);
        let rng = &mut *self.rng;
        self.graph.with_creature_mut(victim, |creature, graph| {
            let mut ctx = UpdateContext { graph, node: victim, delta, settings, input, rng };
            creature.receive_damage(&mut ctx, damage, position, direction)
        })
    }

    /// Credit `points` to the creature at `node`, if there is one
    pub fn award_points(&mut self, node: NodeId, points: i32) {
        if self.graph.with_creature_mut(node, |creature, _| creature.receive_points(points)).is_none() {
            log::debug!("{node:?} cannot score");
        }
    }
}

/// Everything a draw hook may touch
pub struct DrawContext<'a> {
    /// The whole scene, read only
    pub graph: &'a SceneGraph,
    /// Node whose hook is running
    pub node: NodeId,
    /// Eye of the current pass (mirrored during water passes)
    pub eye: &'a Eye,
    /// World-space frustum of `eye`
    pub frustum: &'a Frustum,
    /// Output
    pub backend: &'a mut dyn RenderBackend,
    /// Process-wide switches
    pub settings: &'a EngineSettings,
    /// Quality of this pass, never above `settings.max_quality`
    pub quality: Quality,
    /// `eye.view_matrix() * world_matrix(node)`, already loaded
    pub model_view: Mat4,
}

impl DrawContext<'_> {
    /// World position of the running node
    pub fn world_position(&self) -> Vec3 {
        self.graph.world_position(self.node).unwrap_or_else(Vec3::zeros)
    }

    /// Load the eye's view matrix, for geometry given in world space
    pub fn load_world_space(&mut self) {
        let view = *self.eye.view_matrix();
        self.backend.load_matrix(&view);
    }

    /// Load this node's model-view matrix again
    pub fn load_model_space(&mut self) {
        let model_view = self.model_view;
        self.backend.load_matrix(&model_view);
    }
}

/// Read-only view of one node, handed to query hooks
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    /// The scene
    pub graph: &'a SceneGraph,
    /// The node
    pub id: NodeId,
}

impl NodeRef<'_> {
    /// World matrix, validated on demand
    pub fn world_matrix(&self) -> Mat4 {
        self.graph.world_matrix(self.id).unwrap_or_else(Mat4::identity)
    }

    /// Translation part of the world matrix
    pub fn world_position(&self) -> Vec3 {
        self.world_matrix().column(3).xyz()
    }

    /// Local position
    pub fn position(&self) -> Vec3 {
        self.graph.position(self.id).unwrap_or_else(Vec3::zeros)
    }

    /// Bounding sphere radius
    pub fn bounding_radius(&self) -> f32 {
        self.graph.bounding_radius(self.id).unwrap_or(0.0)
    }
}

/// Per-frame simulation hooks
///
/// `update` runs before the node's children are updated and `update_post`
/// after; the `update2` pair runs in a second pass over the whole tree.
pub trait Updatable {
    /// Pre-children hook of the first pass
    fn update(&mut self, _ctx: &mut UpdateContext<'_>) {}
    /// Post-children hook of the first pass
    fn update_post(&mut self, _ctx: &mut UpdateContext<'_>) {}
    /// Pre-children hook of the second pass
    fn update2(&mut self, _ctx: &mut UpdateContext<'_>) {}
    /// Post-children hook of the second pass
    fn update2_post(&mut self, _ctx: &mut UpdateContext<'_>) {}
}

/// Rendering hooks, mirroring [`Updatable`]
pub trait Drawable {
    /// Opaque geometry, before the children
    fn draw(&self, _ctx: &mut DrawContext<'_>) {}
    /// Opaque geometry, after the children
    fn draw_post(&self, _ctx: &mut DrawContext<'_>) {}
    /// Transparent and overlay geometry, before the children
    fn draw2(&self, _ctx: &mut DrawContext<'_>) {}
    /// Transparent and overlay geometry, after the children
    fn draw2_post(&self, _ctx: &mut DrawContext<'_>) {}
}

/// Geometry visible to the spatial queries
pub trait Collidable {
    /// Nearest hit of the segment `origin + direction * t`, `0 <= t < length`,
    /// against this node's own geometry, with the surface normal if known.
    fn intersect_line(
        &self,
        _node: NodeRef<'_>,
        _origin: &Vec3,
        _direction: &Vec3,
        _length: f32,
    ) -> Option<(f32, Option<Vec3>)> {
        None
    }

    /// Push a sphere of `radius` at `center` out of this node's geometry.
    ///
    /// Returns whether they collided; on collision `center` is corrected and
    /// the contact normal is added to `normal`.
    fn collide_sphere(
        &self,
        _node: NodeRef<'_>,
        _radius: f32,
        _center: &mut Vec3,
        _normal: &mut Vec3,
    ) -> bool {
        false
    }
}

/// Something that lights the scene
pub trait LightEmitting {
    /// Current light of the source at `node`, if switched on
    fn light(&self, node: NodeRef<'_>) -> Option<LightSource>;
}

/// Something with life that weapons can hurt
pub trait Creature {
    /// Remaining life
    fn life(&self) -> i32;

    /// Whether the creature still takes part in the game
    fn is_alive(&self) -> bool;

    /// Apply `damage` coming from `direction` at `position`.
    ///
    /// `ctx.node` is the creature's own node. Returns `true` when this hit
    /// killed the creature.
    fn receive_damage(
        &mut self,
        ctx: &mut UpdateContext<'_>,
        damage: i32,
        position: Option<Vec3>,
        direction: Option<Vec3>,
    ) -> bool;

    /// Score `points`; creatures that do not keep score ignore this
    fn receive_points(&mut self, _points: i32) {}
}

/// The concrete kind of a node
pub trait Behavior: Updatable + Drawable + Collidable + Any {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Downcasting support
    fn as_any(&self) -> &dyn Any;

    /// Downcasting support
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Creature capability, if any
    fn as_creature(&self) -> Option<&dyn Creature> {
        None
    }

    /// Creature capability, if any
    fn as_creature_mut(&mut self) -> Option<&mut dyn Creature> {
        None
    }

    /// Light capability, if any
    fn as_light(&self) -> Option<&dyn LightEmitting> {
        None
    }
}

/// Nearest result of [`SceneGraph::intersect_line`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineHit {
    /// Node whose geometry was hit
    pub node: NodeId,
    /// Distance along the (unnormalized) direction
    pub distance: f32,
    /// Surface normal, when the hit geometry provides one
    pub normal: Option<Vec3>,
}

/// Result of [`SceneGraph::collide_sphere`]
#[derive(Debug, Clone, PartialEq)]
pub struct SphereCollision {
    /// Corrected sphere center
    pub center: Vec3,
    /// Nodes the sphere touched, in traversal order
    pub colliders: Vec<NodeId>,
    /// Sum of the contact normals (not normalized)
    pub normal: Vec3,
}

impl SphereCollision {
    /// Whether anything was touched
    pub fn collided(&self) -> bool {
        !self.colliders.is_empty()
    }
}
