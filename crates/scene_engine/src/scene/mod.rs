//! Scene graph, camera and the rendering seam
//!
//! - [`transform`] - per-node transform with a lazily validated world matrix
//! - [`frustum`] - six-plane visibility tests
//! - [`eye`] - the camera
//! - [`render`] - backend trait and abstract draw commands
//! - [`node`] - capability traits implemented by node kinds
//! - [`scene_graph`] - the arena, its traversals and spatial queries

pub mod transform;
pub mod frustum;
pub mod eye;
pub mod render;
pub mod node;
pub mod scene_graph;

pub use eye::Eye;
pub use frustum::{Frustum, FrustumSide, Plane};
pub use node::{
    Behavior, Collidable, Creature, DrawContext, Drawable, LightEmitting, LineHit, NodeRef,
    SphereCollision, Updatable, UpdateContext,
};
pub use render::{
    DrawCommand, LightSource, MeshKind, RecordingBackend, RenderBackend, RenderCall, RenderTarget,
};
pub use scene_graph::{Node, NodeId, SceneError, SceneGraph};
pub use transform::NodeTransform;
