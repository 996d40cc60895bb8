//! Per-node draw behavior
//!
//! Traversal calls the hooks of [`NodeBehavior`] in a fixed order around the
//! node's transform push and its children:
//!
//! ```text
//! before_draw, [push], draw, children..., [pop], after_draw
//! ```
//!
//! The depth pass calls only `depth_draw`, which defaults to `draw`.

use crate::assets::Handle;
use crate::render::{Geometry, Material, RenderingContext};

/// Draw hooks invoked by scene traversal
pub trait NodeBehavior {
    /// Runs before the node's transform is applied
    fn before_draw(&self, _ctx: &mut RenderingContext) {}

    /// Draws the node itself with its transform applied
    fn draw(&self, _ctx: &mut RenderingContext) {}

    /// Draws the node into the depth buffer
    fn depth_draw(&self, ctx: &mut RenderingContext) {
        self.draw(ctx);
    }

    /// Runs after the node's transform is reverted
    fn after_draw(&self, _ctx: &mut RenderingContext) {}
}

/// Geometry drawn with a material
///
/// Holds its handles for as long as the node exists, keeping the pooled
/// resources resident.
#[derive(Debug, Clone)]
pub struct ModelNode {
    geometry: Handle<Geometry>,
    material: Handle<Material>,
    depth_material: Option<Handle<Material>>,
}

impl ModelNode {
    /// Draw `geometry` with `material`
    pub fn new(geometry: Handle<Geometry>, material: Handle<Material>) -> Self {
        Self {
            geometry,
            material,
            depth_material: None,
        }
    }

    /// Use `material` instead of the regular one in the depth pass
    pub fn with_depth_material(mut self, material: Handle<Material>) -> Self {
        self.depth_material = Some(material);
        self
    }

    /// Geometry
    pub fn geometry(&self) -> &Handle<Geometry> {
        &self.geometry
    }

    /// Material
    pub fn material(&self) -> &Handle<Material> {
        &self.material
    }

    /// Depth-pass material, if any
    pub fn depth_material(&self) -> Option<&Handle<Material>> {
        self.depth_material.as_ref()
    }

    fn draw_with(&self, material: &Material, ctx: &mut RenderingContext) {
        ctx.update();
        material.bind(ctx);
        self.geometry.draw(ctx.device());
    }
}

impl NodeBehavior for ModelNode {
    fn draw(&self, ctx: &mut RenderingContext) {
        self.draw_with(&self.material, ctx);
    }

    fn depth_draw(&self, ctx: &mut RenderingContext) {
        match &self.depth_material {
            Some(material) => self.draw_with(material, ctx),
            None => self.draw(ctx),
        }
    }
}

/// Closed set of node variants
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Draws nothing; groups children under a shared transform
    Group,
    /// Regular model
    Model(ModelNode),
    /// Model drawn without depth testing and left out of the depth pass
    Overlay(ModelNode),
}

impl NodeBehavior for NodeKind {
    fn before_draw(&self, ctx: &mut RenderingContext) {
        if let Self::Overlay(_) = self {
            ctx.device().set_depth_test(false);
        }
    }

    fn draw(&self, ctx: &mut RenderingContext) {
        match self {
            Self::Group => {}
            Self::Model(model) | Self::Overlay(model) => model.draw(ctx),
        }
    }

    fn depth_draw(&self, ctx: &mut RenderingContext) {
        match self {
            Self::Group | Self::Overlay(_) => {}
            Self::Model(model) => model.depth_draw(ctx),
        }
    }

    fn after_draw(&self, ctx: &mut RenderingContext) {
        if let Self::Overlay(_) = self {
            ctx.device().set_depth_test(true);
        }
    }
}
