use crate::style::{CategoryPalette, Color};
use flowmap_core::{GraphModel, Node, NodeId, NodeIndex};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    /// The focused node is the source of the link.
    Outgoing,
    /// The focused node is the target of the link.
    Incoming,
}

/// One row of the detail panel: a neighbor reached through one link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborRecord {
    pub neighbor: NodeId,
    pub neighbor_name: String,
    pub direction: FlowDirection,
    /// Value of the connecting link.
    pub flow_value: f64,
    /// Value of the neighbor node itself.
    pub neighbor_total: f64,
    pub category_color: Color,
}

/// Records for every link touching `node`: targets of its outgoing links
/// first, then sources of its incoming links, each in link input order.
pub fn neighbor_records(
    model: &GraphModel,
    palette: &CategoryPalette,
    node: NodeIndex,
) -> Vec<NeighborRecord> {
    let focused = &model[node];
    let outgoing = focused
        .outgoing
        .iter()
        .map(|&l| (&model[l], model[l].target_idx, FlowDirection::Outgoing));
    let incoming = focused
        .incoming
        .iter()
        .map(|&l| (&model[l], model[l].source_idx, FlowDirection::Incoming));

    outgoing
        .chain(incoming)
        .map(|(link, neighbor_idx, direction)| {
            let neighbor = &model[neighbor_idx];
            NeighborRecord {
                neighbor: neighbor.id.clone(),
                neighbor_name: neighbor.name().to_string(),
                direction,
                flow_value: link.value,
                neighbor_total: neighbor.value,
                category_color: palette.node_color(model, neighbor_idx),
            }
        })
        .collect()
}

/// Receives the detail view of a locked node.
pub trait DetailPanelBinder {
    fn render(&mut self, focused: &Node, records: &[NeighborRecord]);
}

/// Keeps every render call in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingBinder {
    pub renders: Vec<(NodeId, Vec<NeighborRecord>)>,
}

impl RecordingBinder {
    pub fn last(&self) -> Option<&(NodeId, Vec<NeighborRecord>)> {
        self.renders.last()
    }
}

impl DetailPanelBinder for RecordingBinder {
    fn render(&mut self, focused: &Node, records: &[NeighborRecord]) {
        self.renders.push((focused.id.clone(), records.to_vec()));
    }
}
