use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;
pub mod input;
pub mod model;

pub use error::ValidationError;
pub use input::{NodeRef, RawGraph, RawLink, RawNode, RawNodeId};
pub use model::{GraphModel, LinkIndex, NodeIndex};

/// Stable key of a node. Integer ids from the input are kept as their decimal text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Input description of a node, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    pub category: Option<String>,
}

impl NodeSpec {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Input description of a link, with endpoints already resolved to ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub source: NodeId,
    pub target: NodeId,
    pub value: f64,
}

impl LinkSpec {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>, value: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            value,
        }
    }
}

/// A validated node of a [`GraphModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub category: Option<String>,
    /// `max(sum of incoming, sum of outgoing)` link values.
    pub value: f64,
    pub incoming: Vec<LinkIndex>,
    pub outgoing: Vec<LinkIndex>,
}

impl Node {
    /// Grouping key used for colors; the node id when no category was given.
    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn name(&self) -> &str {
        self.id.as_str()
    }

    pub fn is_source(&self) -> bool {
        self.incoming.is_empty() && !self.outgoing.is_empty()
    }

    pub fn is_sink(&self) -> bool {
        self.outgoing.is_empty() && !self.incoming.is_empty()
    }

    pub fn is_isolated(&self) -> bool {
        self.incoming.is_empty() && self.outgoing.is_empty()
    }
}

/// A validated link of a [`GraphModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
    pub source_idx: NodeIndex,
    pub target_idx: NodeIndex,
    pub value: f64,
}

impl Link {
    pub fn touches(&self, node: NodeIndex) -> bool {
        self.source_idx == node || self.target_idx == node
    }
}
