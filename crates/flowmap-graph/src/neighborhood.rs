use flowmap_core::{GraphModel, LinkIndex, NodeIndex};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Adjacency {
    incoming: BTreeSet<NodeIndex>,
    outgoing: BTreeSet<NodeIndex>,
    links: Vec<LinkIndex>,
}

/// Per-node neighbor sets built once from a [`GraphModel`].
///
/// `incoming` holds the sources of links ending at a node and `outgoing` the
/// targets of links starting at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborhoodIndex {
    entries: Vec<Adjacency>,
}

impl NeighborhoodIndex {
    pub fn build(model: &GraphModel) -> Self {
        let mut entries = vec![Adjacency::default(); model.node_count()];
        for (i, link) in model.links().iter().enumerate() {
            let link_idx = LinkIndex(i);
            let (s, t) = (link.source_idx, link.target_idx);
            entries[s.0].outgoing.insert(t);
            entries[s.0].links.push(link_idx);
            entries[t.0].incoming.insert(s);
            entries[t.0].links.push(link_idx);
        }

        tracing::debug!(
            nodes = entries.len(),
            links = model.link_count(),
            "Built neighborhood index"
        );
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn incoming(&self, node: NodeIndex) -> &BTreeSet<NodeIndex> {
        &self.entries[node.0].incoming
    }

    pub fn outgoing(&self, node: NodeIndex) -> &BTreeSet<NodeIndex> {
        &self.entries[node.0].outgoing
    }

    /// `incoming ∪ outgoing`, without the node itself.
    pub fn neighborhood(&self, node: NodeIndex) -> BTreeSet<NodeIndex> {
        let entry = &self.entries[node.0];
        entry.incoming.union(&entry.outgoing).copied().collect()
    }

    /// Links with `node` as either endpoint, in link input order.
    pub fn links_touching(&self, node: NodeIndex) -> &[LinkIndex] {
        &self.entries[node.0].links
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowmap_core::{LinkSpec, NodeSpec};

    #[test]
    fn test_neighborhood() {
        let model = GraphModel::build(
            vec![
                NodeSpec::new("a"),
                NodeSpec::new("b"),
                NodeSpec::new("c"),
                NodeSpec::new("d"),
            ],
            vec![
                LinkSpec::new("a", "b", 1.0),
                LinkSpec::new("b", "c", 1.0),
                LinkSpec::new("a", "b", 2.0),
            ],
        )
        .unwrap();
        let index = NeighborhoodIndex::build(&model);

        let b = NodeIndex(1);
        assert_eq!(index.incoming(b).iter().copied().collect::<Vec<_>>(), vec![NodeIndex(0)]);
        assert_eq!(index.outgoing(b).iter().copied().collect::<Vec<_>>(), vec![NodeIndex(2)]);
        assert_eq!(
            index.neighborhood(b).into_iter().collect::<Vec<_>>(),
            vec![NodeIndex(0), NodeIndex(2)]
        );
        assert_eq!(
            index.links_touching(b),
            &[LinkIndex(0), LinkIndex(1), LinkIndex(2)]
        );

        let d = NodeIndex(3);
        assert!(index.neighborhood(d).is_empty());
        assert!(index.links_touching(d).is_empty());
    }
}
