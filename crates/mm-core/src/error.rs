//! Error taxonomy shared by the store, the mutator and the render queue.

use crate::id::NodeId;

pub type Result<T> = std::result::Result<T, MapError>;

/// Operations that are never allowed on the root node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootOp {
    Delete,
    Reparent,
    Move,
    CreateSecondRoot,
}

impl std::fmt::Display for RootOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RootOp::Delete => "delete the root node",
            RootOp::Reparent => "reparent the root node",
            RootOp::Move => "move the root node",
            RootOp::CreateSecondRoot => "create a second root node",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("node not found: {0}")]
    NotFound(NodeId),

    #[error("moving {node} under {new_parent} would create a cycle")]
    Cycle { node: NodeId, new_parent: NodeId },

    #[error("cannot {0}")]
    InvalidRootOperation(RootOp),

    #[error("content render failed for {node}: {message}")]
    RenderFailure { node: NodeId, message: String },

    #[error("node id already used in this map: {0}")]
    DuplicateId(NodeId),

    #[error("node {0} still has children")]
    HasChildren(NodeId),

    #[error("invalid map data: {message}")]
    InvalidData { message: String },
}

impl MapError {
    pub fn invalid_data(message: impl Into<String>) -> Self {
        MapError::InvalidData {
            message: message.into(),
        }
    }
}
