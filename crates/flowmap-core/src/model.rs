use crate::error::ValidationError;
use crate::{Link, LinkSpec, Node, NodeId, NodeSpec, RawGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::ops::Index;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkIndex(pub usize);

impl fmt::Display for LinkIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated, immutable flow graph.
///
/// Nodes and links keep their input order; that order is the tie-break for
/// every deterministic decision made downstream (layering, ordering, colors).
#[derive(Debug, Clone)]
pub struct GraphModel {
    nodes: Vec<Node>,
    links: Vec<Link>,
    node_map: HashMap<NodeId, NodeIndex>,
}

impl GraphModel {
    /// Validate `nodes` and `links` and build the model.
    ///
    /// The whole graph is rejected on the first problem found; nothing is
    /// silently dropped.
    pub fn build(nodes: Vec<NodeSpec>, links: Vec<LinkSpec>) -> Result<Self, ValidationError> {
        let mut node_map = HashMap::with_capacity(nodes.len());
        let mut built_nodes = Vec::with_capacity(nodes.len());

        for (position, spec) in nodes.into_iter().enumerate() {
            match node_map.entry(spec.id.clone()) {
                Entry::Occupied(_) => {
                    return Err(ValidationError::DuplicateNode {
                        id: spec.id,
                        position,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(NodeIndex(position));
                }
            }
            built_nodes.push(Node {
                id: spec.id,
                category: spec.category,
                value: 0.0,
                incoming: Vec::new(),
                outgoing: Vec::new(),
            });
        }

        let mut built_links = Vec::with_capacity(links.len());
        for (i, spec) in links.into_iter().enumerate() {
            let lookup = |id: &NodeId| {
                node_map
                    .get(id)
                    .copied()
                    .ok_or_else(|| ValidationError::UnknownNode {
                        link: i,
                        id: id.clone(),
                    })
            };
            let source_idx = lookup(&spec.source)?;
            let target_idx = lookup(&spec.target)?;

            if source_idx == target_idx {
                return Err(ValidationError::SelfLoop {
                    link: i,
                    id: spec.source,
                });
            }
            if !(spec.value > 0.0) || !spec.value.is_finite() {
                return Err(ValidationError::NonPositiveValue {
                    link: i,
                    value: spec.value,
                });
            }

            let link_idx = LinkIndex(i);
            built_nodes[source_idx.0].outgoing.push(link_idx);
            built_nodes[target_idx.0].incoming.push(link_idx);
            built_links.push(Link {
                source: spec.source,
                target: spec.target,
                source_idx,
                target_idx,
                value: spec.value,
            });
        }

        for node in &mut built_nodes {
            let incoming: f64 = node.incoming.iter().map(|l| built_links[l.0].value).sum();
            let outgoing: f64 = node.outgoing.iter().map(|l| built_links[l.0].value).sum();
            node.value = incoming.max(outgoing);
        }

        tracing::debug!(
            nodes = built_nodes.len(),
            links = built_links.len(),
            "Built graph model"
        );

        Ok(Self {
            nodes: built_nodes,
            links: built_links,
            node_map,
        })
    }

    /// Resolve a loader payload and build the model from it.
    pub fn from_raw(raw: RawGraph) -> Result<Self, ValidationError> {
        let (nodes, links) = raw.resolve();
        Self::build(nodes, links)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex)
    }

    pub fn link_indices(&self) -> impl Iterator<Item = LinkIndex> {
        (0..self.links.len()).map(LinkIndex)
    }

    pub fn index_of(&self, id: &NodeId) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.index_of(id).map(|idx| &self.nodes[idx.0])
    }

    pub fn link_endpoints(&self, index: LinkIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.links
            .get(index.0)
            .map(|l| (l.source_idx, l.target_idx))
    }

    /// Largest node value in the graph.
    pub fn max_node_value(&self) -> f64 {
        self.nodes.iter().map(|n| n.value).fold(0.0, f64::max)
    }
}

impl Index<NodeIndex> for GraphModel {
    type Output = Node;
    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index.0]
    }
}

impl Index<LinkIndex> for GraphModel {
    type Output = Link;
    fn index(&self, index: LinkIndex) -> &Self::Output {
        &self.links[index.0]
    }
}
