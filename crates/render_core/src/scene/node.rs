//! Scene nodes and their local transforms

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3, Vec4};
use crate::scene::node_kind::{ModelNode, NodeKind};
use crate::scene::NodeId;

/// Position, rotation and scale of a node relative to its parent
///
/// Rotation is in degrees around X, then Y, then Z. The local matrix is
/// rebuilt eagerly by every setter as `T * Rx * Ry * Rz * S`, leaving out
/// the factors that are identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    local: Mat4,
}

impl Transform {
    /// Identity transform
    pub fn identity() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::repeat(1.0),
            local: Mat4::identity(),
        }
    }

    /// Position relative to the parent
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Rotation in degrees
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    /// Per-axis scale
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Local matrix
    pub fn matrix(&self) -> &Mat4 {
        &self.local
    }

    /// Set the position
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.rebuild();
    }

    /// Set the rotation in degrees
    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.rebuild();
    }

    /// Set the scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.rebuild();
    }

    fn has_position(&self) -> bool {
        self.position != Vec3::zeros()
    }

    fn has_rotation(&self) -> bool {
        self.rotation != Vec3::zeros()
    }

    fn has_scale(&self) -> bool {
        self.scale != Vec3::repeat(1.0)
    }

    /// Whether any component differs from identity
    ///
    /// Decided on the components, not on the matrix: a full turn still counts
    /// as a rotation.
    pub fn is_identity(&self) -> bool {
        !(self.has_position() || self.has_rotation() || self.has_scale())
    }

    fn rebuild(&mut self) {
        let mut local = Mat4::identity();
        if self.has_position() {
            local *= Mat4::new_translation(&self.position);
        }
        if self.rotation.x != 0.0 {
            local *= Mat4::rotation_x(utils::deg_to_rad(self.rotation.x));
        }
        if self.rotation.y != 0.0 {
            local *= Mat4::rotation_y(utils::deg_to_rad(self.rotation.y));
        }
        if self.rotation.z != 0.0 {
            local *= Mat4::rotation_z(utils::deg_to_rad(self.rotation.z));
        }
        if self.has_scale() {
            local *= Mat4::new_nonuniform_scaling(&self.scale);
        }
        self.local = local;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// One node of a [`SceneGraph`](crate::scene::SceneGraph)
#[derive(Debug)]
pub struct SceneNode {
    name: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    transform: Transform,
    visible: bool,
    kind: NodeKind,
}

impl SceneNode {
    /// Visible node of the given kind with an identity transform
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: None,
            parent: None,
            children: Vec::new(),
            transform: Transform::identity(),
            visible: true,
            kind,
        }
    }

    /// Grouping node that draws nothing itself
    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    /// Node drawing a model
    pub fn model(model: ModelNode) -> Self {
        Self::new(NodeKind::Model(model))
    }

    /// Node drawing a model on top of everything, without depth testing
    pub fn overlay(model: ModelNode) -> Self {
        Self::new(NodeKind::Overlay(model))
    }

    /// Attach a name used in diagnostics
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder form of [`set_position`](Self::set_position)
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.set_position(position);
        self
    }

    /// Builder form of [`set_rotation`](Self::set_rotation)
    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.set_rotation(rotation);
        self
    }

    /// Builder form of [`set_scale`](Self::set_scale)
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.set_scale(scale);
        self
    }

    /// Builder form of [`set_visibility`](Self::set_visibility)
    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Parent node, if attached
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in draw order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// What this node draws
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Mutable access to what this node draws
    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Local transform
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Local matrix
    pub fn local_transform(&self) -> &Mat4 {
        self.transform.matrix()
    }

    /// Whether traversal pushes a matrix for this node
    pub fn has_transform(&self) -> bool {
        !self.transform.is_identity()
    }

    /// Set the position relative to the parent
    pub fn set_position(&mut self, position: Vec3) {
        self.transform.set_position(position);
    }

    /// Set the rotation in degrees
    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.transform.set_rotation(rotation);
    }

    /// Set the scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.set_scale(scale);
    }

    /// Show or hide this node together with its whole subtree
    pub fn set_visibility(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Whether this node (and so its subtree) is drawn
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Map `v` from this node's space into its parent's space
    pub fn relative_coordinates(&self, v: &Vec4) -> Vec4 {
        self.transform.matrix() * v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_node_is_identity_and_visible() {
        let node = SceneNode::group();
        assert!(!node.has_transform());
        assert!(node.is_visible());
        assert_eq!(node.local_transform(), &Mat4::identity());
    }

    #[test]
    fn test_translate_then_rotate() {
        let node = SceneNode::group()
            .with_position(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation(Vec3::new(0.0, 90.0, 0.0));

        let expected = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0))
            * Mat4::rotation_y(utils::deg_to_rad(90.0));
        assert_relative_eq!(*node.local_transform(), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_order_is_x_then_y_then_z() {
        let node = SceneNode::group().with_rotation(Vec3::new(30.0, 45.0, 60.0));
        let expected = Mat4::rotation_x(utils::deg_to_rad(30.0))
            * Mat4::rotation_y(utils::deg_to_rad(45.0))
            * Mat4::rotation_z(utils::deg_to_rad(60.0));
        assert_relative_eq!(*node.local_transform(), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_scale_applies_last() {
        let node = SceneNode::group()
            .with_position(Vec3::new(5.0, 0.0, 0.0))
            .with_scale(Vec3::new(2.0, 2.0, 2.0));

        let moved = node.relative_coordinates(&Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_relative_eq!(moved, Vec4::new(7.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_full_turn_still_counts_as_transform() {
        let node = SceneNode::group().with_rotation(Vec3::new(0.0, 360.0, 0.0));
        assert!(node.has_transform());
    }

    #[test]
    fn test_resetting_components_returns_to_identity() {
        let mut node = SceneNode::group().with_position(Vec3::new(1.0, 0.0, 0.0));
        assert!(node.has_transform());

        node.set_position(Vec3::zeros());
        assert!(!node.has_transform());
        assert_eq!(node.local_transform(), &Mat4::identity());
    }
}
