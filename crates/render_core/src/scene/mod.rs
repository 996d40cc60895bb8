//! Scene graph system
//!
//! Hierarchical scene with per-node transforms, visibility and draw
//! behavior. Nodes live in an arena owned by [`SceneGraph`] and refer to
//! each other by [`NodeId`].

pub mod node;
pub mod node_kind;
pub mod scene_graph;

pub use node::{SceneNode, Transform};
pub use node_kind::{ModelNode, NodeBehavior, NodeKind};
pub use scene_graph::SceneGraph;

use thiserror::Error;

slotmap::new_key_type! {
    /// Stable identifier of a node inside a [`SceneGraph`]
    pub struct NodeId;
}

/// Scene graph structure errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// No node with this id exists (never inserted, or destroyed)
    #[error("Node {0:?} not found")]
    NodeNotFound(NodeId),

    /// Node already has a parent and must be detached first
    #[error("Node {0:?} is already attached to a parent")]
    AlreadyAttached(NodeId),

    /// Attaching would make a node its own ancestor
    #[error("Attaching {child:?} under {parent:?} would create a cycle")]
    WouldCreateCycle {
        /// Requested parent
        parent: NodeId,
        /// Requested child
        child: NodeId,
    },

    /// Node is not a direct child of the given parent
    #[error("Node {member:?} is not a member of {parent:?}")]
    NotAMember {
        /// Expected parent
        parent: NodeId,
        /// Expected child
        member: NodeId,
    },

    /// The root node cannot be attached, detached or destroyed
    #[error("Operation not permitted on the root node {0:?}")]
    RootNode(NodeId),
}
