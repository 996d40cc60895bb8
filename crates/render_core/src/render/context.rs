//! # Rendering Context
//!
//! Per-frame transform state shared by everything that draws: the current
//! model, view and projection matrices, their product, the stack of saved
//! model matrices and the camera.
//!
//! ## Matrix Stack
//!
//! Scene traversal descends the graph by saving the current model matrix,
//! post-multiplying a node's local transform and restoring the saved matrix
//! on the way back up. [`RenderingContext::with_transform`] performs the
//! save/restore pair around a closure so a traversal step cannot leave the
//! stack unbalanced. [`push_matrix`](RenderingContext::push_matrix) and
//! [`pop_matrix`](RenderingContext::pop_matrix) remain available for callers
//! that manage the pairing themselves.
//!
//! ## Coordinate System
//!
//! Right-handed, Y-up by default (see [`RendererConfig::camera_up`]). The
//! combined matrix is `projection * view * model`.

use std::rc::Rc;

use crate::core::config::RendererConfig;
use crate::foundation::math::{utils, Mat4, Point3, Vec3};
use crate::render::device::GraphicsDevice;
use crate::scene::{NodeId, SceneError, SceneGraph};

/// Camera position used until the first `set_camera`
pub const DEFAULT_CAMERA_POSITION: Vec3 = Vec3::new(0.0, 0.0, 5.0);

/// Transform stack, camera and device for one render target
pub struct RenderingContext {
    model: Mat4,
    view: Mat4,
    projection: Mat4,
    mvp: Mat4,
    matrix_stack: Vec<Mat4>,
    camera_position: Vec3,
    camera_target: Vec3,
    viewport: (u32, u32),
    config: RendererConfig,
    device: Rc<dyn GraphicsDevice>,
}

impl RenderingContext {
    /// Create a context sized to the configured initial viewport, looking at
    /// the origin from [`DEFAULT_CAMERA_POSITION`]
    pub fn new(device: Rc<dyn GraphicsDevice>, config: RendererConfig) -> Self {
        let mut ctx = Self {
            model: Mat4::identity(),
            view: Mat4::identity(),
            projection: Mat4::identity(),
            mvp: Mat4::identity(),
            matrix_stack: Vec::new(),
            camera_position: DEFAULT_CAMERA_POSITION,
            camera_target: Vec3::zeros(),
            viewport: (config.initial_width, config.initial_height),
            config,
            device,
        };

        let (width, height) = ctx.viewport;
        ctx.reshape(width, height);
        ctx.set_camera(DEFAULT_CAMERA_POSITION, Vec3::zeros());
        ctx.update();
        ctx
    }

    /// Device draw calls go to
    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    /// Projection parameters in use
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Recompute the combined model-view-projection matrix
    ///
    /// Must run after any model, view or projection change and before a
    /// shader program consumes [`mvp`](Self::mvp).
    pub fn update(&mut self) {
        self.mvp = self.projection * self.view * self.model;
    }

    /// Place the camera at `position` looking at `target`
    ///
    /// A target equal to the position has no direction; the call is ignored
    /// with a warning. A view direction parallel to the configured up axis
    /// (a camera straight above or below its target) is oriented with a
    /// substitute up axis instead.
    pub fn set_camera(&mut self, position: Vec3, target: Vec3) {
        let Some(direction) = (target - position).try_normalize(0.0) else {
            log::warn!("Ignoring camera with coincident position and target {:?}", position);
            return;
        };

        let up = view_up(&direction, &self.config.up());
        self.camera_position = position;
        self.camera_target = target;
        self.view = Mat4::look_at_rh(&Point3::from(position), &Point3::from(target), &up);
        log::trace!("Camera at {:?} looking at {:?}", position, target);
    }

    /// Place the camera at `position` looking at the world-space origin of
    /// `node`
    pub fn set_camera_target_node(
        &mut self,
        position: Vec3,
        scene: &SceneGraph,
        node: NodeId,
    ) -> Result<(), SceneError> {
        let target = scene.world_position(node)?;
        self.set_camera(position, target);
        Ok(())
    }

    /// Adapt the projection to a new viewport size
    ///
    /// Field of view and clip planes stay fixed; only the aspect ratio
    /// changes. Zero dimensions are clamped to one pixel.
    pub fn reshape(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        self.viewport = (width, height);

        let aspect = width as f32 / height as f32;
        self.projection = Mat4::new_perspective(
            aspect,
            utils::deg_to_rad(self.config.fov_degrees),
            self.config.near_plane,
            self.config.far_plane,
        );
        log::debug!("Viewport reshaped to {}x{} (aspect {:.3})", width, height, aspect);
    }

    /// Save the current model matrix
    pub fn push_matrix(&mut self) {
        self.matrix_stack.push(self.model);
        log::trace!("push_matrix (depth {})", self.matrix_stack.len());
    }

    /// Restore the most recently saved model matrix
    ///
    /// Every pop must pair with an earlier push. An unpaired pop is a defect:
    /// debug builds panic; release builds log it and keep the current matrix.
    pub fn pop_matrix(&mut self) {
        let saved = self.matrix_stack.pop();
        debug_assert!(saved.is_some(), "pop_matrix called on an empty matrix stack");
        match saved {
            Some(model) => {
                self.model = model;
                log::trace!("pop_matrix (depth {})", self.matrix_stack.len());
            }
            None => log::error!("pop_matrix called on an empty matrix stack"),
        }
    }

    /// Run `f` with `transform` appended to the model matrix, restoring the
    /// previous model matrix afterwards
    pub fn with_transform<T>(&mut self, transform: &Mat4, f: impl FnOnce(&mut Self) -> T) -> T {
        self.push_matrix();
        self.model = self.model * transform;
        let result = f(self);
        self.pop_matrix();
        result
    }

    /// Number of saved model matrices
    pub fn stack_depth(&self) -> usize {
        self.matrix_stack.len()
    }

    /// Current model matrix
    pub fn model_matrix(&self) -> &Mat4 {
        &self.model
    }

    /// Replace the current model matrix
    pub fn set_model_matrix(&mut self, model: Mat4) {
        self.model = model;
    }

    /// Current view matrix
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    /// Current projection matrix
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// Combined matrix as of the last [`update`](Self::update)
    pub fn mvp(&self) -> &Mat4 {
        &self.mvp
    }

    /// Camera position in world space
    pub fn camera_position(&self) -> Vec3 {
        self.camera_position
    }

    /// Camera target in world space
    pub fn camera_target(&self) -> Vec3 {
        self.camera_target
    }

    /// Viewport size after clamping
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }
}

/// Up axis for a camera looking along unit `direction`
///
/// Falls back to the world axis least aligned with `direction` when the
/// preferred up is parallel to it.
fn view_up(direction: &Vec3, preferred: &Vec3) -> Vec3 {
    let preferred = preferred.try_normalize(0.0).unwrap_or_else(Vec3::y);
    if direction.cross(&preferred).norm_squared() > f32::EPSILON {
        return preferred;
    }

    let fallback = [Vec3::z(), Vec3::x(), Vec3::y()]
        .into_iter()
        .min_by(|a, b| direction.dot(a).abs().total_cmp(&direction.dot(b).abs()))
        .unwrap_or_else(Vec3::z);
    log::debug!("Camera looks along its up axis; orienting with {:?}", fallback);
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use crate::render::device::HeadlessDevice;
    use approx::assert_relative_eq;

    fn context() -> RenderingContext {
        RenderingContext::new(Rc::new(HeadlessDevice::new()), RendererConfig::default())
    }

    #[test]
    fn test_new_context_is_balanced_and_identity() {
        let ctx = context();
        assert_eq!(ctx.stack_depth(), 0);
        assert_eq!(ctx.model_matrix(), &Mat4::identity());
        assert_eq!(ctx.viewport(), (800, 600));
        assert_eq!(ctx.camera_position(), DEFAULT_CAMERA_POSITION);
    }

    #[test]
    fn test_push_pop_restores_model() {
        let mut ctx = context();
        let moved = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));

        ctx.push_matrix();
        ctx.set_model_matrix(moved);
        assert_eq!(ctx.stack_depth(), 1);
        ctx.pop_matrix();

        assert_eq!(ctx.model_matrix(), &Mat4::identity());
        assert_eq!(ctx.stack_depth(), 0);
    }

    #[test]
    fn test_with_transform_composes_and_restores() {
        let mut ctx = context();
        let outer = Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0));
        let inner = Mat4::new_translation(&Vec3::new(0.0, 1.0, 0.0));

        let seen = ctx.with_transform(&outer, |ctx| {
            ctx.with_transform(&inner, |ctx| {
                assert_eq!(ctx.stack_depth(), 2);
                *ctx.model_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0)
            })
        });

        assert_relative_eq!(seen, Vec4::new(1.0, 1.0, 0.0, 1.0));
        assert_eq!(ctx.stack_depth(), 0);
        assert_eq!(ctx.model_matrix(), &Mat4::identity());
    }

    #[test]
    fn test_nested_transforms_compose_parent_first() {
        let mut ctx = context();
        let parent = Mat4::from_euler_angles(0.0, utils::deg_to_rad(90.0), 0.0);
        let child = Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0));

        let (model, origin) = ctx.with_transform(&parent, |ctx| {
            ctx.with_transform(&child, |ctx| {
                let model = *ctx.model_matrix();
                (model, model * Vec4::new(0.0, 0.0, 0.0, 1.0))
            })
        });

        assert_relative_eq!(model, parent * child, epsilon = 1e-6);
        // Child offset along X, turned by the parent's yaw onto -Z
        assert_relative_eq!(origin, Vec4::new(0.0, 0.0, -1.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "empty matrix stack")]
    fn test_unbalanced_pop_is_a_defect() {
        let mut ctx = context();
        ctx.pop_matrix();
    }

    #[test]
    fn test_update_combines_in_pvm_order() {
        let mut ctx = context();
        let model = Mat4::new_translation(&Vec3::new(0.5, 0.0, 0.0));
        ctx.set_model_matrix(model);
        ctx.update();

        let expected = ctx.projection_matrix() * ctx.view_matrix() * model;
        assert_relative_eq!(*ctx.mvp(), expected);
    }

    #[test]
    fn test_camera_view_maps_target_onto_negative_z() {
        let mut ctx = context();
        ctx.set_camera(Vec3::new(0.0, 0.0, 10.0), Vec3::zeros());

        let target_in_view = ctx.view_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(target_in_view, Vec4::new(0.0, 0.0, -10.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_degenerate_camera_ignored() {
        let mut ctx = context();
        let view = *ctx.view_matrix();
        ctx.set_camera(Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(ctx.view_matrix(), &view);
        assert_eq!(ctx.camera_position(), DEFAULT_CAMERA_POSITION);
    }

    #[test]
    fn test_top_down_camera_stays_finite() {
        let mut ctx = context();
        ctx.set_camera(Vec3::new(0.0, 10.0, 0.0), Vec3::zeros());
        ctx.update();

        assert!(ctx.view_matrix().iter().all(|v| v.is_finite()));
        assert!(ctx.mvp().iter().all(|v| v.is_finite()));
        assert_eq!(ctx.camera_position(), Vec3::new(0.0, 10.0, 0.0));

        let target_in_view = ctx.view_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(target_in_view, Vec4::new(0.0, 0.0, -10.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_bottom_up_camera_stays_finite() {
        let mut ctx = context();
        ctx.set_camera(Vec3::new(0.0, -3.0, 0.0), Vec3::new(0.0, 4.0, 0.0));
        assert!(ctx.view_matrix().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_reshape_changes_aspect_only() {
        let mut ctx = context();
        ctx.reshape(1000, 500);
        let wide = *ctx.projection_matrix();
        ctx.reshape(500, 500);
        let square = *ctx.projection_matrix();

        // Vertical scale depends on fov only
        assert_relative_eq!(wide[(1, 1)], square[(1, 1)]);
        assert_relative_eq!(wide[(0, 0)] * 2.0, square[(0, 0)], epsilon = 1e-5);
    }

    #[test]
    fn test_zero_height_is_clamped() {
        let mut ctx = context();
        ctx.reshape(640, 0);
        assert_eq!(ctx.viewport(), (640, 1));
        assert!(ctx.projection_matrix().iter().all(|v| v.is_finite()));
    }
}
