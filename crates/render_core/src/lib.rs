//! # Render Core
//!
//! Reference-counted GPU resource caching and a hierarchical scene graph for
//! real-time 3D rendering.
//!
//! ## Features
//!
//! - **Resource Pools**: one live instance per key, handed out as counted
//!   handles and destroyed only by an explicit sweep
//! - **Resource Manager**: shader programs, shader stages, textures, materials
//!   and built-in models behind one context object
//! - **Scene Graph**: arena of nodes with local transforms, visibility and
//!   per-variant draw hooks
//! - **Rendering Context**: model matrix stack, camera and projection
//! - **Device Seam**: every GPU call goes through [`render::GraphicsDevice`];
//!   [`render::HeadlessDevice`] runs everything without a GPU
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use render_core::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::default();
//!     let device: Rc<dyn GraphicsDevice> = Rc::new(HeadlessDevice::new());
//!     let mut resources = ResourceManager::new(Rc::clone(&device), config.assets.clone());
//!     let mut ctx = RenderingContext::new(device, config.renderer.clone());
//!
//!     let mut scene = SceneGraph::new();
//!     let tile = ModelNode::new(resources.get_model("tile")?, resources.get_default_material());
//!     let node = SceneNode::model(tile).with_position(Vec3::new(0.0, 0.0, -3.0));
//!     scene.add_child(scene.root(), node)?;
//!
//!     ctx.set_camera(Vec3::new(0.0, 2.0, 5.0), Vec3::zeros());
//!     scene.render(&mut ctx);
//!     resources.clear_unused();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod core;

pub mod assets;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        assets::{AssetError, Handle, ResourceManager, SweepReport},
        core::{ApplicationConfig, AssetConfig, Config, EngineConfig, RendererConfig},
        foundation::math::{Mat4, Vec3, Vec4},
        render::{GraphicsDevice, HeadlessDevice, Material, RenderingContext},
        scene::{ModelNode, NodeBehavior, NodeId, NodeKind, SceneError, SceneGraph, SceneNode},
    };
}
