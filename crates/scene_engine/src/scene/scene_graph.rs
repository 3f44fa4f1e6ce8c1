//! Arena scene graph
//!
//! Nodes live in a [`SlotMap`] and refer to each other by [`NodeId`]. A node
//! owns its children: destroying a node destroys its subtree, and adding a
//! node somewhere detaches it from its previous parent first.
//!
//! World matrices are cached per node and validated lazily. Moving or
//! re-parenting a node invalidates its whole subtree, so a valid cache
//! always implies valid caches on every ancestor.

use rand::RngCore;
use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

use crate::config::{EngineSettings, Quality};
use crate::foundation::math::{constants::GEOMETRY_EPSILON, Mat4, Quat, Vec3};
use crate::input::InputState;
use crate::scene::eye::Eye;
use crate::scene::frustum::Frustum;
use crate::scene::node::{
    Behavior, Creature, DrawContext, LineHit, NodeRef, SphereCollision, UpdateContext,
};
use crate::scene::render::{DrawCommand, LightSource, RenderBackend};
use crate::scene::transform::NodeTransform;

new_key_type! {
    /// Handle of a node inside a [`SceneGraph`]
    pub struct NodeId;
}

/// Malformed tree operations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    /// The handle is stale or was never issued by this graph
    #[error("node {0:?} does not exist")]
    NodeNotFound(NodeId),
    /// The child is the parent itself or one of its ancestors
    #[error("adding {child:?} below {parent:?} would create a cycle")]
    CycleDetected {
        /// Requested parent
        parent: NodeId,
        /// Requested child
        child: NodeId,
    },
    /// The node is not a child of the given parent
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild {
        /// Given parent
        parent: NodeId,
        /// Given child
        child: NodeId,
    },
}

/// One entity of the hierarchy
pub struct Node {
    transform: NodeTransform,
    bounding_radius: f32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    behavior: Option<Box<dyn Behavior>>,
}

impl Node {
    /// Local transform
    pub fn transform(&self) -> &NodeTransform {
        &self.transform
    }

    /// Bounding sphere radius; 0 means never culled
    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    /// Owning node, `None` for roots
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Owned nodes in update and draw order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Node kind; `None` while one of its own update hooks runs
    pub fn behavior(&self) -> Option<&dyn Behavior> {
        self.behavior.as_deref()
    }

    /// Name for logs
    pub fn name(&self) -> &'static str {
        self.behavior.as_ref().map_or("node", |behavior| behavior.name())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pass {
    First,
    Second,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Stage {
    Pre,
    Post,
}

struct FrameArgs<'a> {
    delta: f32,
    settings: &'a EngineSettings,
    input: &'a InputState,
    rng: &'a mut dyn RngCore,
}

struct DrawArgs<'a> {
    eye: &'a Eye,
    frustum: Frustum,
    settings: &'a EngineSettings,
    quality: Quality,
}

/// Hierarchy of transformable nodes
#[derive(Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Create a detached node
    pub fn create(
        &mut self,
        transform: NodeTransform,
        bounding_radius: f32,
        behavior: Option<Box<dyn Behavior>>,
    ) -> NodeId {
        let node = Node {
            transform,
            bounding_radius,
            parent: None,
            children: Vec::new(),
            behavior,
        };
        let name = node.name();
        let id = self.nodes.insert(node);
        log::debug!("created {name} {id:?}");
        id
    }

    /// Create a detached node at the origin with `behavior`
    pub fn spawn<B: Behavior>(&mut self, behavior: B) -> NodeId {
        self.create(NodeTransform::default(), 0.0, Some(Box::new(behavior)))
    }

    /// Create a node with `behavior` at `position` below `parent`
    pub fn spawn_child<B: Behavior>(
        &mut self,
        parent: NodeId,
        behavior: B,
        position: Vec3,
        bounding_radius: f32,
    ) -> Result<NodeId, SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        let id = self.create(
            NodeTransform::from_position(position),
            bounding_radius,
            Some(Box::new(behavior)),
        );
        self.add_child(parent, id)?;
        Ok(id)
    }

    /// Parent of `id`
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    /// Children of `id`, empty for unknown nodes
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |node| node.children.as_slice())
    }

    /// Whether `ancestor` lies on the parent chain of `id` (or is `id`)
    pub fn is_in_subtree(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Topmost ancestor of `id`, `id` itself for roots
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Append `child` to `parent`'s children, detaching it from its previous
    /// parent first.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        if !self.contains(child) {
            return Err(SceneError::NodeNotFound(child));
        }
        if self.is_in_subtree(parent, child) {
            return Err(SceneError::CycleDetected { parent, child });
        }

        self.detach(child);
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        self.invalidate_subtree(child);
        Ok(())
    }

    /// Detach `child` from `parent`. The subtree stays alive as a root.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        if self.parent(child) != Some(parent) {
            return Err(if self.contains(child) {
                SceneError::NotAChild { parent, child }
            } else {
                SceneError::NodeNotFound(child)
            });
        }
        self.detach(child);
        self.invalidate_subtree(child);
        Ok(())
    }

    /// Detach and drop `id` together with its whole subtree
    pub fn destroy(&mut self, id: NodeId) -> Result<(), SceneError> {
        if !self.contains(id) {
            return Err(SceneError::NodeNotFound(id));
        }
        self.detach(id);

        let mut stack = vec![id];
        let mut destroyed = 0usize;
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children.iter().copied());
                destroyed += 1;
            }
        }
        log::debug!("destroyed {id:?} and {} descendants", destroyed - 1);
        Ok(())
    }

    fn detach(&mut self, child: NodeId) {
        let Some(old_parent) = self.nodes.get_mut(child).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(old_parent) {
            parent.children.retain(|&id| id != child);
        }
    }

    fn invalidate_subtree(&self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                node.transform.invalidate();
                stack.extend(node.children.iter().copied());
            }
        }
    }

    /// Local position
    pub fn position(&self, id: NodeId) -> Option<Vec3> {
        self.nodes.get(id).map(|node| node.transform.position())
    }

    /// Local rotation
    pub fn rotation(&self, id: NodeId) -> Option<Quat> {
        self.nodes.get(id).map(|node| node.transform.rotation())
    }

    /// Bounding sphere radius
    pub fn bounding_radius(&self, id: NodeId) -> Option<f32> {
        self.nodes.get(id).map(|node| node.bounding_radius)
    }

    /// Move a node relative to its parent
    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
        node.transform.set_position(position);
        self.invalidate_subtree(id);
        Ok(())
    }

    /// Move a node by `offset`
    pub fn translate(&mut self, id: NodeId, offset: Vec3) -> Result<(), SceneError> {
        let position = self.position(id).ok_or(SceneError::NodeNotFound(id))?;
        self.set_position(id, position + offset)
    }

    /// Turn a node relative to its parent
    pub fn set_rotation(&mut self, id: NodeId, rotation: Quat) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
        node.transform.set_rotation(rotation);
        self.invalidate_subtree(id);
        Ok(())
    }

    /// Change the culling radius
    pub fn set_bounding_radius(&mut self, id: NodeId, radius: f32) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
        node.bounding_radius = radius;
        Ok(())
    }

    /// Local-to-world matrix, recomputed only when invalid
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let node = self.nodes.get(id)?;
        Some(node.transform.world_matrix_with(|| {
            node.parent
                .and_then(|parent| self.world_matrix(parent))
                .unwrap_or_else(Mat4::identity)
        }))
    }

    /// Origin of the node in world space
    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        self.world_matrix(id).map(|world| world.column(3).xyz())
    }

    /// Accumulated rotation of the node and its ancestors
    pub fn world_rotation(&self, id: NodeId) -> Option<Quat> {
        let mut node = self.nodes.get(id)?;
        let mut rotation = node.transform.rotation();
        while let Some(parent) = node.parent.and_then(|parent| self.nodes.get(parent)) {
            rotation = parent.transform.rotation() * rotation;
            node = parent;
        }
        Some(rotation)
    }

    /// Forward axis in world space
    pub fn world_direction(&self, id: NodeId) -> Option<Vec3> {
        self.world_rotation(id).map(|rotation| rotation * Vec3::z())
    }

    /// Concrete behavior of `id`, if it is a `T`
    pub fn behavior<T: Behavior>(&self, id: NodeId) -> Option<&T> {
        let behavior = self.nodes.get(id)?.behavior.as_deref()?;
        behavior.as_any().downcast_ref::<T>()
    }

    /// Concrete behavior of `id`, if it is a `T`
    pub fn behavior_mut<T: Behavior>(&mut self, id: NodeId) -> Option<&mut T> {
        let behavior = self.nodes.get_mut(id)?.behavior.as_deref_mut()?;
        behavior.as_any_mut().downcast_mut::<T>()
    }

    /// Creature capability of `id`
    pub fn creature(&self, id: NodeId) -> Option<&dyn Creature> {
        self.nodes.get(id)?.behavior.as_deref()?.as_creature()
    }

    /// Run `f` on the `T` behavior of `id` while the rest of the graph stays
    /// mutable. The behavior is detached for the duration of the call.
    pub fn with_behavior_mut<T: Behavior, R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut T, &mut SceneGraph) -> R,
    ) -> Option<R> {
        let mut behavior = self.nodes.get_mut(id)?.behavior.take()?;
        let result = behavior
            .as_any_mut()
            .downcast_mut::<T>()
            .map(|concrete| f(concrete, self));
        self.restore_behavior(id, behavior);
        result
    }

    /// Like [`SceneGraph::with_behavior_mut`] for any creature
    pub fn with_creature_mut<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut dyn Creature, &mut SceneGraph) -> R,
    ) -> Option<R> {
        let mut behavior = self.nodes.get_mut(id)?.behavior.take()?;
        let result = behavior.as_creature_mut().map(|creature| f(creature, self));
        self.restore_behavior(id, behavior);
        result
    }

    /// Replace the behavior of `id`, returning the previous one
    pub fn set_behavior(
        &mut self,
        id: NodeId,
        behavior: Box<dyn Behavior>,
    ) -> Result<Option<Box<dyn Behavior>>, SceneError> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
        Ok(node.behavior.replace(behavior))
    }

    fn restore_behavior(&mut self, id: NodeId, behavior: Box<dyn Behavior>) {
        match self.nodes.get_mut(id) {
            Some(node) => node.behavior = Some(behavior),
            None => log::debug!("{} dropped together with {id:?}", behavior.name()),
        }
    }

    /// First update pass over the subtree of `root`
    pub fn update(
        &mut self,
        root: NodeId,
        delta: f32,
        settings: &EngineSettings,
        input: &InputState,
        rng: &mut dyn RngCore,
    ) {
        let mut frame = FrameArgs { delta, settings, input, rng };
        self.update_node(root, Pass::First, &mut frame);
    }

    /// Second update pass, run after [`SceneGraph::update`] finished
    pub fn update2(
        &mut self,
        root: NodeId,
        delta: f32,
        settings: &EngineSettings,
        input: &InputState,
        rng: &mut dyn RngCore,
    ) {
        let mut frame = FrameArgs { delta, settings, input, rng };
        self.update_node(root, Pass::Second, &mut frame);
    }

    fn update_node(&mut self, id: NodeId, pass: Pass, frame: &mut FrameArgs<'_>) {
        if self.world_matrix(id).is_none() {
            return;
        }
        self.run_update_hook(id, pass, Stage::Pre, frame);

        let children = self.children(id).to_vec();
        for child in children {
            // an earlier hook of this pass may have moved or destroyed it
            if self.parent(child) != Some(id) {
                log::trace!("skipping {child:?}, no longer below {id:?}");
                continue;
            }
            self.update_node(child, pass, frame);
        }

        self.run_update_hook(id, pass, Stage::Post, frame);
    }

    fn run_update_hook(&mut self, id: NodeId, pass: Pass, stage: Stage, frame: &mut FrameArgs<'_>) {
        let Some(mut behavior) = self.nodes.get_mut(id).and_then(|node| node.behavior.take()) else {
            return;
        };
        {
            let mut ctx = UpdateContext {
                graph: self,
                node: id,
                delta: frame.delta,
                settings: frame.settings,
                input: frame.input,
                rng: &mut *frame.rng,
            };
            match (pass, stage) {
                (Pass::First, Stage::Pre) => behavior.update(&mut ctx),
                (Pass::First, Stage::Post) => behavior.update_post(&mut ctx),
                (Pass::Second, Stage::Pre) => behavior.update2(&mut ctx),
                (Pass::Second, Stage::Post) => behavior.update2_post(&mut ctx),
            }
        }
        self.restore_behavior(id, behavior);
    }

    /// Opaque draw pass of the subtree of `root` as seen by `eye`.
    ///
    /// `quality` is capped by `settings.max_quality`.
    pub fn draw(
        &self,
        root: NodeId,
        eye: &Eye,
        backend: &mut dyn RenderBackend,
        settings: &EngineSettings,
        quality: Quality,
    ) {
        self.draw_pass(root, Pass::First, eye, backend, settings, quality);
    }

    /// Transparent and overlay draw pass
    pub fn draw2(
        &self,
        root: NodeId,
        eye: &Eye,
        backend: &mut dyn RenderBackend,
        settings: &EngineSettings,
        quality: Quality,
    ) {
        self.draw_pass(root, Pass::Second, eye, backend, settings, quality);
    }

    fn draw_pass(
        &self,
        root: NodeId,
        pass: Pass,
        eye: &Eye,
        backend: &mut dyn RenderBackend,
        settings: &EngineSettings,
        quality: Quality,
    ) {
        let args = DrawArgs {
            eye,
            frustum: eye.frustum(),
            settings,
            quality: quality.min(settings.max_quality),
        };
        backend.load_projection(eye.projection_matrix());
        backend.set_clip_plane(eye.clip_plane());
        self.draw_node(root, pass, &args, backend);
    }

    fn draw_node(&self, id: NodeId, pass: Pass, args: &DrawArgs<'_>, backend: &mut dyn RenderBackend) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let world = self.world_matrix(id).unwrap_or_else(Mat4::identity);
        let model_view = args.eye.view_matrix() * world;

        backend.load_matrix(&model_view);
        self.run_draw_hook(node, id, pass, Stage::Pre, args, backend, model_view);

        for &child in &node.children {
            if !self.is_visible(child, &args.frustum) {
                log::trace!("culled {child:?}");
                continue;
            }
            self.draw_node(child, pass, args, backend);
        }

        backend.load_matrix(&model_view);
        self.run_draw_hook(node, id, pass, Stage::Post, args, backend, model_view);

        if pass == Pass::First && args.settings.debug_bounding_spheres && node.bounding_radius > GEOMETRY_EPSILON {
            backend.submit(DrawCommand::DebugSphere { radius: node.bounding_radius });
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_draw_hook(
        &self,
        node: &Node,
        id: NodeId,
        pass: Pass,
        stage: Stage,
        args: &DrawArgs<'_>,
        backend: &mut dyn RenderBackend,
        model_view: Mat4,
    ) {
        let Some(behavior) = node.behavior.as_deref() else {
            return;
        };
        let mut ctx = DrawContext {
            graph: self,
            node: id,
            eye: args.eye,
            frustum: &args.frustum,
            backend,
            settings: args.settings,
            quality: args.quality,
            model_view,
        };
        match (pass, stage) {
            (Pass::First, Stage::Pre) => behavior.draw(&mut ctx),
            (Pass::First, Stage::Post) => behavior.draw_post(&mut ctx),
            (Pass::Second, Stage::Pre) => behavior.draw2(&mut ctx),
            (Pass::Second, Stage::Post) => behavior.draw2_post(&mut ctx),
        }
    }

    fn is_visible(&self, id: NodeId, frustum: &Frustum) -> bool {
        let radius = self.bounding_radius(id).unwrap_or(0.0);
        if radius <= GEOMETRY_EPSILON {
            return true;
        }
        self.world_position(id)
            .is_some_and(|center| frustum.is_sphere_in_frustum(&center, radius))
    }

    /// Lights of every node below `root`, in pre-order
    pub fn lights(&self, root: NodeId) -> Vec<LightSource> {
        let mut lights = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            let node_ref = NodeRef { graph: self, id };
            if let Some(light) = node.behavior.as_deref().and_then(|b| b.as_light()).and_then(|l| l.light(node_ref)) {
                lights.push(light);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        lights
    }

    /// Nearest hit of the segment `origin + direction * t`, `0 <= t < length`,
    /// against every node below `root` except the subtree of `exclude`.
    ///
    /// Only a strictly shorter hit replaces the current one, so the result
    /// does not depend on child order.
    pub fn intersect_line(
        &self,
        root: NodeId,
        exclude: Option<NodeId>,
        origin: &Vec3,
        direction: &Vec3,
        length: f32,
    ) -> Option<LineHit> {
        let mut nearest = None;
        let mut limit = length;
        self.intersect_node(root, exclude, origin, direction, &mut limit, &mut nearest);
        nearest
    }

    fn intersect_node(
        &self,
        id: NodeId,
        exclude: Option<NodeId>,
        origin: &Vec3,
        direction: &Vec3,
        limit: &mut f32,
        nearest: &mut Option<LineHit>,
    ) {
        if exclude == Some(id) {
            return;
        }
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        for &child in &node.children {
            self.intersect_node(child, exclude, origin, direction, limit, nearest);
        }
        let Some(behavior) = node.behavior.as_deref() else {
            return;
        };
        let node_ref = NodeRef { graph: self, id };
        if let Some((distance, normal)) = behavior.intersect_line(node_ref, origin, direction, *limit) {
            if distance < *limit {
                *limit = distance;
                *nearest = Some(LineHit { node: id, distance, normal });
            }
        }
    }

    /// Push a sphere out of every node below `root` except the subtree of
    /// `exclude`.
    ///
    /// Each collider sees the center as corrected by the colliders visited
    /// before it, so with several overlapping colliders the result depends
    /// on traversal order.
    pub fn collide_sphere(
        &self,
        root: NodeId,
        exclude: Option<NodeId>,
        radius: f32,
        center: Vec3,
    ) -> SphereCollision {
        let mut collision = SphereCollision {
            center,
            colliders: Vec::new(),
            normal: Vec3::zeros(),
        };
        self.collide_node(root, exclude, radius, &mut collision);
        collision
    }

    fn collide_node(&self, id: NodeId, exclude: Option<NodeId>, radius: f32, collision: &mut SphereCollision) {
        if exclude == Some(id) {
            return;
        }
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        for &child in &node.children {
            self.collide_node(child, exclude, radius, collision);
        }
        let Some(behavior) = node.behavior.as_deref() else {
            return;
        };
        let node_ref = NodeRef { graph: self, id };
        if behavior.collide_sphere(node_ref, radius, &mut collision.center, &mut collision.normal) {
            collision.colliders.push(id);
        }
    }
}
