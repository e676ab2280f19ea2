//! JSON input format as produced by the graph loader.
//!
//! Link endpoints may be either a node id or a zero-based index into `nodes`;
//! [`RawGraph::resolve`] turns every endpoint into an id before validation.

use crate::{LinkSpec, NodeId, NodeSpec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNodeId {
    Number(i64),
    Text(String),
}

impl RawNodeId {
    fn into_node_id(self) -> NodeId {
        match self {
            RawNodeId::Number(n) => NodeId(n.to_string()),
            RawNodeId::Text(s) => NodeId(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(alias = "name")]
    pub id: RawNodeId,
    #[serde(default)]
    pub category: Option<String>,
}

/// Link endpoint: an index into the node list or a node id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeRef {
    Index(u64),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLink {
    pub source: NodeRef,
    pub target: NodeRef,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGraph {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub links: Vec<RawLink>,
}

impl RawGraph {
    /// Resolve node ids and index endpoints.
    ///
    /// An index that falls outside the node list is kept as an id, so the
    /// model build reports it as an unknown node instead of dropping it.
    pub fn resolve(self) -> (Vec<NodeSpec>, Vec<LinkSpec>) {
        let nodes: Vec<NodeSpec> = self
            .nodes
            .into_iter()
            .map(|raw| NodeSpec {
                id: raw.id.into_node_id(),
                category: raw.category,
            })
            .collect();

        let resolve = |endpoint: NodeRef| -> NodeId {
            match endpoint {
                NodeRef::Index(i) => usize::try_from(i)
                    .ok()
                    .and_then(|i| nodes.get(i))
                    .map(|node| node.id.clone())
                    .unwrap_or_else(|| NodeId(i.to_string())),
                NodeRef::Id(id) => NodeId(id),
            }
        };

        let links = self
            .links
            .into_iter()
            .map(|raw| LinkSpec {
                source: resolve(raw.source),
                target: resolve(raw.target),
                value: raw.value,
            })
            .collect();

        (nodes, links)
    }
}
