//! Scene graph arena and traversal
//!
//! The graph owns every node. A node is either attached (it has a parent and
//! is reached by traversal from the root) or unattached (freshly inserted or
//! detached). Destroying a node destroys its whole subtree and removes it
//! from its parent's child list, so no parent ever refers to a dead child.

use slotmap::SlotMap;

use crate::foundation::math::{utils, Vec3, Vec4};
use crate::render::RenderingContext;
use crate::scene::node::SceneNode;
use crate::scene::node_kind::NodeBehavior;
use crate::scene::{NodeId, SceneError};

/// Hierarchical scene rooted at an implicit group node
#[derive(Debug)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, SceneNode>,
    root: NodeId,
}

impl SceneGraph {
    /// Create a graph holding only the root
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::group().with_name("root"));
        Self { nodes, root }
    }

    /// Root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether only the root exists
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Whether `id` refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Borrow a node
    pub fn node(&self, id: NodeId) -> Result<&SceneNode, SceneError> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Mutably borrow a node
    ///
    /// Structure (parent and children) can only change through the graph.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Parent of `id`, `None` for the root and unattached nodes
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, SceneError> {
        Ok(self.node(id)?.parent)
    }

    /// Children of `id` in draw order
    pub fn children(&self, id: NodeId) -> Result<&[NodeId], SceneError> {
        Ok(self.node(id)?.children())
    }

    /// Add an unattached node to the arena
    pub fn insert(&mut self, mut node: SceneNode) -> NodeId {
        node.parent = None;
        node.children.clear();
        self.nodes.insert(node)
    }

    /// Insert `node` and attach it as the last child of `parent`
    pub fn add_child(&mut self, parent: NodeId, node: SceneNode) -> Result<NodeId, SceneError> {
        self.node(parent)?;
        let id = self.insert(node);
        self.add_member(parent, id)?;
        Ok(id)
    }

    /// Attach the unattached node `member` as the last child of `parent`
    pub fn add_member(&mut self, parent: NodeId, member: NodeId) -> Result<(), SceneError> {
        self.node(parent)?;
        let current_parent = self.node(member)?.parent;
        if member == self.root {
            return Err(SceneError::RootNode(member));
        }
        if current_parent.is_some() {
            return Err(SceneError::AlreadyAttached(member));
        }
        if self.ancestors_and_self(parent).any(|ancestor| ancestor == member) {
            return Err(SceneError::WouldCreateCycle { parent, child: member });
        }

        if let Some(node) = self.nodes.get_mut(member) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(member);
        }
        log::trace!("Attached {:?} under {:?}", member, parent);
        Ok(())
    }

    /// Detach `node` from its parent, keeping it and its subtree alive
    ///
    /// Detaching an unattached node is a no-op.
    pub fn detach(&mut self, node: NodeId) -> Result<NodeId, SceneError> {
        if node == self.root {
            return Err(SceneError::RootNode(node));
        }
        let parent = self.node_mut(node)?.parent.take();
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|&child| child != node);
        }
        Ok(node)
    }

    /// Destroy `member`, a direct child of `parent`, with its subtree
    ///
    /// Returns the number of nodes destroyed.
    pub fn remove_member(&mut self, parent: NodeId, member: NodeId) -> Result<usize, SceneError> {
        self.node(parent)?;
        if self.node(member)?.parent != Some(parent) {
            return Err(SceneError::NotAMember { parent, member });
        }
        self.destroy(member)
    }

    /// Destroy `node` with its whole subtree, releasing the handles held by
    /// every destroyed node
    ///
    /// Returns the number of nodes destroyed.
    pub fn destroy(&mut self, node: NodeId) -> Result<usize, SceneError> {
        self.detach(node)?;

        let mut pending = vec![node];
        let mut destroyed = 0;
        while let Some(id) = pending.pop() {
            if let Some(removed) = self.nodes.remove(id) {
                pending.extend(removed.children);
                destroyed += 1;
            }
        }
        log::debug!("Destroyed {} scene nodes", destroyed);
        Ok(destroyed)
    }

    /// Set the position of `id`
    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> Result<(), SceneError> {
        self.node_mut(id)?.set_position(position);
        Ok(())
    }

    /// Set the rotation of `id` in degrees
    pub fn set_rotation(&mut self, id: NodeId, rotation: Vec3) -> Result<(), SceneError> {
        self.node_mut(id)?.set_rotation(rotation);
        Ok(())
    }

    /// Set the scale of `id`
    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) -> Result<(), SceneError> {
        self.node_mut(id)?.set_scale(scale);
        Ok(())
    }

    /// Show or hide `id` with its subtree
    pub fn set_visibility(&mut self, id: NodeId, visible: bool) -> Result<(), SceneError> {
        self.node_mut(id)?.set_visibility(visible);
        Ok(())
    }

    /// Map `v` from the space of `id` into its parent's space
    pub fn relative_coordinates(&self, id: NodeId, v: &Vec4) -> Result<Vec4, SceneError> {
        Ok(self.node(id)?.relative_coordinates(v))
    }

    /// Map `v` from the space of `id` into world space
    ///
    /// Applies the local transforms of `id` and each of its ancestors in
    /// turn. An unattached node's own space stands in for its parent's.
    pub fn world_coordinates(&self, id: NodeId, v: &Vec4) -> Result<Vec4, SceneError> {
        self.node(id)?;
        Ok(self
            .ancestors_and_self(id)
            .filter_map(|ancestor| self.nodes.get(ancestor))
            .fold(*v, |point, node| node.relative_coordinates(&point)))
    }

    /// World-space position of the origin of `id`
    pub fn world_position(&self, id: NodeId) -> Result<Vec3, SceneError> {
        let origin = utils::point(Vec3::zeros());
        Ok(utils::truncate(self.world_coordinates(id, &origin)?))
    }

    /// Render the whole scene from the root
    pub fn render(&self, ctx: &mut RenderingContext) {
        self.render_node(self.root, ctx);
    }

    /// Render the subtree under `id` in the context's current model space
    pub fn render_from(&self, id: NodeId, ctx: &mut RenderingContext) -> Result<(), SceneError> {
        self.node(id)?;
        self.render_node(id, ctx);
        Ok(())
    }

    /// Render the whole scene into the depth buffer
    pub fn depth_render(&self, ctx: &mut RenderingContext) {
        self.depth_render_node(self.root, ctx);
    }

    /// Depth-render the subtree under `id`
    pub fn depth_render_from(
        &self,
        id: NodeId,
        ctx: &mut RenderingContext,
    ) -> Result<(), SceneError> {
        self.node(id)?;
        self.depth_render_node(id, ctx);
        Ok(())
    }

    fn render_node(&self, id: NodeId, ctx: &mut RenderingContext) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if !node.is_visible() {
            return;
        }

        node.kind().before_draw(ctx);
        Self::with_local_transform(node, ctx, |ctx| {
            node.kind().draw(ctx);
            for &child in node.children() {
                self.render_node(child, ctx);
            }
        });
        node.kind().after_draw(ctx);
    }

    fn depth_render_node(&self, id: NodeId, ctx: &mut RenderingContext) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if !node.is_visible() {
            return;
        }

        Self::with_local_transform(node, ctx, |ctx| {
            node.kind().depth_draw(ctx);
            for &child in node.children() {
                self.depth_render_node(child, ctx);
            }
        });
    }

    fn with_local_transform(
        node: &SceneNode,
        ctx: &mut RenderingContext,
        f: impl FnOnce(&mut RenderingContext),
    ) {
        if node.has_transform() {
            ctx.with_transform(node.local_transform(), f);
        } else {
            f(ctx);
        }
    }

    fn ancestors_and_self(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |&current| {
            self.nodes.get(current).and_then(|node| node.parent)
        })
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
