use crate::NodeId;
use thiserror::Error;

/// Reasons a graph is rejected as a whole.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate node id `{id}` at position {position}")]
    DuplicateNode { id: NodeId, position: usize },
    #[error("Link {link} references unknown node `{id}`")]
    UnknownNode { link: usize, id: NodeId },
    #[error("Link {link} is a self-loop on node `{id}`")]
    SelfLoop { link: usize, id: NodeId },
    #[error("Link {link} has non-positive value {value}")]
    NonPositiveValue { link: usize, value: f64 },
}
