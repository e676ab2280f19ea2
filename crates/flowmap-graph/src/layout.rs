use crate::link_path::{LinkPath, Point};
use flowmap_core::{GraphModel, LinkIndex, NodeIndex};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Layout extent must have positive size, got {width}x{height}")]
    InvalidExtent { width: f64, height: f64 },
    #[error("Cannot lay out a graph without nodes")]
    EmptyGraph,
}

/// Space reserved around the drawing area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 5.0,
            right: 1.0,
            bottom: 5.0,
            left: 1.0,
        }
    }
}

/// Rectangle the layout must fit in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Extent {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Inner drawing area of a `width` x `height` canvas.
    pub fn with_margins(width: f64, height: f64, margins: Margins) -> Self {
        Self {
            x0: margins.left,
            y0: margins.top,
            x1: width - margins.right,
            y1: height - margins.bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    fn validate(&self) -> Result<(), LayoutError> {
        let (width, height) = (self.width(), self.height());
        if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
            Ok(())
        } else {
            Err(LayoutError::InvalidExtent { width, height })
        }
    }
}

/// How nodes are assigned to horizontal layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeAlignment {
    /// Longest path from a source; nodes without outgoing links go to the last layer.
    #[default]
    Justify,
    /// Earliest feasible layer.
    Left,
    /// Latest feasible layer.
    Right,
    /// Sources are pulled next to their shallowest target.
    Center,
}

impl fmt::Display for NodeAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Justify => "justify",
            Self::Left => "left",
            Self::Right => "right",
            Self::Center => "center",
        };
        f.write_str(name)
    }
}

impl FromStr for NodeAlignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "justify" => Ok(Self::Justify),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "center" => Ok(Self::Center),
            other => Err(format!(
                "unknown alignment `{other}` (expected justify, left, right or center)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeLayout {
    pub layer: usize,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl NodeLayout {
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center_y(&self) -> f64 {
        (self.y0 + self.y1) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkLayout {
    pub source: NodeIndex,
    pub target: NodeIndex,
    /// Stroke width, never below the configured minimum.
    pub width: f64,
    /// Share of the endpoints' height taken by this link (`value * ky`).
    pub band: f64,
    /// Attachment center on the source node.
    pub y0: f64,
    /// Attachment center on the target node.
    pub y1: f64,
    /// The link closes a cycle and did not take part in layering.
    pub back_edge: bool,
}

/// Geometry for one graph at one extent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub extent: Extent,
    pub nodes: Vec<NodeLayout>,
    pub links: Vec<LinkLayout>,
    /// Node order inside each layer, top to bottom.
    pub layers: Vec<Vec<NodeIndex>>,
    /// Pixels per unit of flow.
    pub ky: f64,
    /// Vertical gap between nodes after fitting to the extent.
    pub node_padding: f64,
}

impl LayoutResult {
    pub fn node(&self, index: NodeIndex) -> &NodeLayout {
        &self.nodes[index.0]
    }

    pub fn link(&self, index: LinkIndex) -> &LinkLayout {
        &self.links[index.0]
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn nodes_in_layer(&self, layer: usize) -> &[NodeIndex] {
        self.layers.get(layer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Horizontal connector from the right edge of the source to the left
    /// edge of the target.
    pub fn link_path(&self, index: LinkIndex) -> LinkPath {
        let link = &self.links[index.0];
        let source = &self.nodes[link.source.0];
        let target = &self.nodes[link.target.0];
        LinkPath::horizontal(Point::new(source.x1, link.y0), Point::new(target.x0, link.y1))
    }
}

pub trait Layouter {
    fn layout(&self, model: &GraphModel, extent: Extent) -> Result<LayoutResult, LayoutError>;
}

/// Layered flow layout: longest-path layering, iterative relaxation toward
/// weighted barycenters, then link stacking at both endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SankeyLayouter {
    /// Horizontal size of every node rectangle
    pub node_width: f64,
    /// Vertical gap between nodes of the same layer
    pub node_padding: f64,
    pub alignment: NodeAlignment,
    /// Relaxation passes
    pub iterations: usize,
    pub min_link_width: f64,
    /// Height of nodes without flow, lowered when a layer is too crowded
    pub min_node_height: f64,
}

impl Default for SankeyLayouter {
    fn default() -> Self {
        Self {
            node_width: Self::DEFAULT_NODE_WIDTH,
            node_padding: Self::DEFAULT_NODE_PADDING,
            alignment: NodeAlignment::default(),
            iterations: Self::DEFAULT_ITERATIONS,
            min_link_width: Self::DEFAULT_MIN_LINK_WIDTH,
            min_node_height: Self::DEFAULT_MIN_NODE_HEIGHT,
        }
    }
}

impl SankeyLayouter {
    pub const DEFAULT_NODE_WIDTH: f64 = 15.0;
    pub const DEFAULT_NODE_PADDING: f64 = 10.0;
    pub const DEFAULT_ITERATIONS: usize = 6;
    pub const DEFAULT_MIN_LINK_WIDTH: f64 = 1.0;
    pub const DEFAULT_MIN_NODE_HEIGHT: f64 = 1.0;

    /// Shifts at or below this are ignored while resolving collisions.
    const COLLISION_EPSILON: f64 = 1e-6;
    const MIN_NODE_HEIGHT_FLOOR: f64 = 1e-3;

    pub fn with_alignment(alignment: NodeAlignment) -> Self {
        Self {
            alignment,
            ..Self::default()
        }
    }
}

/// Lay out `model` with default parameters and the given alignment.
pub fn layout(
    model: &GraphModel,
    extent: Extent,
    alignment: NodeAlignment,
) -> Result<LayoutResult, LayoutError> {
    SankeyLayouter::with_alignment(alignment).layout(model, extent)
}

impl Layouter for SankeyLayouter {
    fn layout(&self, model: &GraphModel, extent: Extent) -> Result<LayoutResult, LayoutError> {
        extent.validate()?;
        if model.is_empty() {
            return Err(LayoutError::EmptyGraph);
        }

        let back_edges = find_back_edges(model);
        let layers = assign_layers(model, &back_edges, self.alignment);
        let layer_count = layers.iter().copied().max().unwrap_or(0) + 1;

        let mut columns: Vec<Vec<NodeIndex>> = vec![Vec::new(); layer_count];
        for node in model.node_indices() {
            columns[layers[node.0]].push(node);
        }

        let mut work = Breadths::new(model, extent, layers, self);
        work.initialize(&columns);
        for i in 0..self.iterations {
            let alpha = 0.99f64.powi(i as i32);
            let beta = (1.0 - alpha).max((i + 1) as f64 / self.iterations as f64);
            work.relax_right_to_left(&mut columns, alpha, beta);
            work.relax_left_to_right(&mut columns, alpha, beta);
        }
        work.reorder_all_links();

        tracing::debug!(
            nodes = model.node_count(),
            links = model.link_count(),
            layers = layer_count,
            back_edges = back_edges.iter().filter(|b| **b).count(),
            ky = work.ky,
            "Computed sankey layout"
        );

        Ok(work.finish(columns, &back_edges, self.min_link_width))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Links that close a cycle during a depth-first walk started from each
/// node in input order.
fn find_back_edges(model: &GraphModel) -> Vec<bool> {
    let mut marks = vec![Mark::Unvisited; model.node_count()];
    let mut back_edges = vec![false; model.link_count()];
    let mut stack: Vec<(NodeIndex, usize)> = Vec::new();

    for start in model.node_indices() {
        if marks[start.0] != Mark::Unvisited {
            continue;
        }
        marks[start.0] = Mark::OnStack;
        stack.push((start, 0));

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            let outgoing = &model[node].outgoing;
            if top.1 < outgoing.len() {
                let link = outgoing[top.1];
                top.1 += 1;
                let target = model[link].target_idx;
                match marks[target.0] {
                    Mark::Unvisited => {
                        marks[target.0] = Mark::OnStack;
                        stack.push((target, 0));
                    }
                    Mark::OnStack => back_edges[link.0] = true,
                    Mark::Done => {}
                }
            } else {
                marks[node.0] = Mark::Done;
                stack.pop();
            }
        }
    }

    back_edges
}

fn assign_layers(model: &GraphModel, back_edges: &[bool], alignment: NodeAlignment) -> Vec<usize> {
    let n = model.node_count();
    let forward_out: Vec<Vec<NodeIndex>> = model
        .nodes()
        .iter()
        .map(|node| {
            node.outgoing
                .iter()
                .filter(|l| !back_edges[l.0])
                .map(|&l| model[l].target_idx)
                .collect()
        })
        .collect();

    let mut in_degree = vec![0usize; n];
    for targets in &forward_out {
        for t in targets {
            in_degree[t.0] += 1;
        }
    }
    let has_forward_in: Vec<bool> = in_degree.iter().map(|&d| d > 0).collect();

    // Kahn's algorithm seeded in input order keeps the topological order stable.
    let mut queue: VecDeque<NodeIndex> = model
        .node_indices()
        .filter(|idx| in_degree[idx.0] == 0)
        .collect();
    let mut order = Vec::with_capacity(n);
    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &t in &forward_out[node.0] {
            in_degree[t.0] -= 1;
            if in_degree[t.0] == 0 {
                queue.push_back(t);
            }
        }
    }

    let mut depth = vec![0usize; n];
    for &node in &order {
        for &t in &forward_out[node.0] {
            depth[t.0] = depth[t.0].max(depth[node.0] + 1);
        }
    }
    let mut height = vec![0usize; n];
    for &node in order.iter().rev() {
        for &t in &forward_out[node.0] {
            height[node.0] = height[node.0].max(height[t.0] + 1);
        }
    }

    let layer_count = depth.iter().copied().max().unwrap_or(0) + 1;
    let last = layer_count - 1;

    (0..n)
        .map(|i| {
            let layer = match alignment {
                NodeAlignment::Left => depth[i],
                NodeAlignment::Right => last.saturating_sub(height[i]),
                NodeAlignment::Justify => {
                    if forward_out[i].is_empty() {
                        last
                    } else {
                        depth[i]
                    }
                }
                NodeAlignment::Center => {
                    if has_forward_in[i] {
                        depth[i]
                    } else {
                        forward_out[i]
                            .iter()
                            .map(|t| depth[t.0])
                            .min()
                            .map_or(0, |d| d.saturating_sub(1))
                    }
                }
            };
            layer.min(last)
        })
        .collect()
}

/// Mutable working copy of the vertical geometry. The model itself is never touched.
struct Breadths<'a> {
    model: &'a GraphModel,
    extent: Extent,
    node_width: f64,
    min_node_height: f64,
    layer: Vec<usize>,
    y0: Vec<f64>,
    y1: Vec<f64>,
    outgoing: Vec<Vec<LinkIndex>>,
    incoming: Vec<Vec<LinkIndex>>,
    band: Vec<f64>,
    py: f64,
    ky: f64,
}

impl<'a> Breadths<'a> {
    fn new(
        model: &'a GraphModel,
        extent: Extent,
        layer: Vec<usize>,
        config: &SankeyLayouter,
    ) -> Self {
        let n = model.node_count();
        Self {
            model,
            extent,
            node_width: config.node_width.max(1.0).min(extent.width()),
            min_node_height: config
                .min_node_height
                .max(SankeyLayouter::MIN_NODE_HEIGHT_FLOOR),
            layer,
            y0: vec![0.0; n],
            y1: vec![0.0; n],
            outgoing: model.nodes().iter().map(|n| n.outgoing.clone()).collect(),
            incoming: model.nodes().iter().map(|n| n.incoming.clone()).collect(),
            band: vec![0.0; model.link_count()],
            py: config.node_padding.max(0.0),
            ky: 0.0,
        }
    }

    /// Proportional to value; only nodes without flow use the minimum height.
    fn node_height(&self, node: NodeIndex) -> f64 {
        let value = self.model[node].value;
        if value > 0.0 {
            value * self.ky
        } else {
            self.min_node_height
        }
    }

    fn initialize(&mut self, columns: &[Vec<NodeIndex>]) {
        let span = self.extent.height();
        let fullest = columns.iter().map(Vec::len).max().unwrap_or(1).max(1);
        // Minimum-height nodes never fill more than half of the fullest layer,
        // and padding only takes what they leave, so `ky` stays positive.
        self.min_node_height = self.min_node_height.min(span / (2 * fullest) as f64);
        if fullest > 1 {
            let room = span - fullest as f64 * self.min_node_height;
            self.py = self.py.min(room / (fullest - 1) as f64);
        }

        let ky = columns
            .iter()
            .filter_map(|column| {
                let total: f64 = column.iter().map(|&n| self.model[n].value).sum();
                if total <= 0.0 {
                    return None;
                }
                let zero_nodes = column
                    .iter()
                    .filter(|&&n| self.model[n].value <= 0.0)
                    .count();
                let free = span
                    - (column.len() - 1) as f64 * self.py
                    - zero_nodes as f64 * self.min_node_height;
                Some(free / total)
            })
            .fold(f64::INFINITY, f64::min);
        self.ky = if ky.is_finite() { ky } else { 0.0 };

        for (i, link) in self.model.links().iter().enumerate() {
            self.band[i] = link.value * self.ky;
        }

        for column in columns {
            let mut y = self.extent.y0;
            for &node in column {
                self.y0[node.0] = y;
                self.y1[node.0] = y + self.node_height(node);
                y = self.y1[node.0] + self.py;
            }
            let spread = ((self.extent.y1 - y + self.py) / (column.len() + 1) as f64).max(0.0);
            for (i, &node) in column.iter().enumerate() {
                let shift = spread * (i + 1) as f64;
                self.y0[node.0] += shift;
                self.y1[node.0] += shift;
            }
        }

        self.reorder_all_links();
    }

    fn by_source_breadth(&self, a: LinkIndex, b: LinkIndex) -> Ordering {
        let (sa, sb) = (self.model[a].source_idx, self.model[b].source_idx);
        self.y0[sa.0].total_cmp(&self.y0[sb.0]).then(a.cmp(&b))
    }

    fn by_target_breadth(&self, a: LinkIndex, b: LinkIndex) -> Ordering {
        let (ta, tb) = (self.model[a].target_idx, self.model[b].target_idx);
        self.y0[ta.0].total_cmp(&self.y0[tb.0]).then(a.cmp(&b))
    }

    fn sort_outgoing(&mut self, node: NodeIndex) {
        let mut links = std::mem::take(&mut self.outgoing[node.0]);
        links.sort_by(|&a, &b| self.by_target_breadth(a, b));
        self.outgoing[node.0] = links;
    }

    fn sort_incoming(&mut self, node: NodeIndex) {
        let mut links = std::mem::take(&mut self.incoming[node.0]);
        links.sort_by(|&a, &b| self.by_source_breadth(a, b));
        self.incoming[node.0] = links;
    }

    fn reorder_all_links(&mut self) {
        for node in self.model.node_indices() {
            self.sort_outgoing(node);
            self.sort_incoming(node);
        }
    }

    /// After `node` moved, its neighbors' attachment orders may be stale.
    fn reorder_node_links(&mut self, node: NodeIndex) {
        let targets: Vec<NodeIndex> = self.outgoing[node.0]
            .iter()
            .map(|&l| self.model[l].target_idx)
            .collect();
        for target in targets {
            self.sort_incoming(target);
        }
        let sources: Vec<NodeIndex> = self.incoming[node.0]
            .iter()
            .map(|&l| self.model[l].source_idx)
            .collect();
        for source in sources {
            self.sort_outgoing(source);
        }
    }

    /// `y0` the target would need for the link from `source` to run straight.
    fn target_top(&self, source: NodeIndex, target: NodeIndex) -> f64 {
        let out = &self.outgoing[source.0];
        let mut y = self.y0[source.0] - (out.len() as f64 - 1.0) * self.py / 2.0;
        for &l in out {
            if self.model[l].target_idx == target {
                break;
            }
            y += self.band[l.0] + self.py;
        }
        for &l in &self.incoming[target.0] {
            if self.model[l].source_idx == source {
                break;
            }
            y -= self.band[l.0];
        }
        y
    }

    /// `y0` the source would need for the link to `target` to run straight.
    fn source_top(&self, source: NodeIndex, target: NodeIndex) -> f64 {
        let inc = &self.incoming[target.0];
        let mut y = self.y0[target.0] - (inc.len() as f64 - 1.0) * self.py / 2.0;
        for &l in inc {
            if self.model[l].source_idx == source {
                break;
            }
            y += self.band[l.0] + self.py;
        }
        for &l in &self.outgoing[source.0] {
            if self.model[l].target_idx == target {
                break;
            }
            y -= self.band[l.0];
        }
        y
    }

    fn shift(&mut self, node: NodeIndex, dy: f64) {
        self.y0[node.0] += dy;
        self.y1[node.0] += dy;
    }

    fn layer_span(&self, source: NodeIndex, target: NodeIndex) -> f64 {
        self.layer[target.0] as f64 - self.layer[source.0] as f64
    }

    fn relax_left_to_right(&mut self, columns: &mut [Vec<NodeIndex>], alpha: f64, beta: f64) {
        for column in columns.iter_mut().skip(1) {
            for &target in column.iter() {
                let (mut y, mut w) = (0.0, 0.0);
                for &l in &self.incoming[target.0] {
                    let source = self.model[l].source_idx;
                    let span = self.layer_span(source, target);
                    if span <= 0.0 {
                        continue;
                    }
                    let v = self.model[l].value * span;
                    y += self.target_top(source, target) * v;
                    w += v;
                }
                if !(w > 0.0) {
                    continue;
                }
                let dy = (y / w - self.y0[target.0]) * alpha;
                self.shift(target, dy);
                self.reorder_node_links(target);
            }
            self.sort_column(column);
            self.resolve_collisions(column, beta);
        }
    }

    fn relax_right_to_left(&mut self, columns: &mut [Vec<NodeIndex>], alpha: f64, beta: f64) {
        let count = columns.len();
        for column in columns.iter_mut().take(count.saturating_sub(1)).rev() {
            for &source in column.iter() {
                let (mut y, mut w) = (0.0, 0.0);
                for &l in &self.outgoing[source.0] {
                    let target = self.model[l].target_idx;
                    let span = self.layer_span(source, target);
                    if span <= 0.0 {
                        continue;
                    }
                    let v = self.model[l].value * span;
                    y += self.source_top(source, target) * v;
                    w += v;
                }
                if !(w > 0.0) {
                    continue;
                }
                let dy = (y / w - self.y0[source.0]) * alpha;
                self.shift(source, dy);
                self.reorder_node_links(source);
            }
            self.sort_column(column);
            self.resolve_collisions(column, beta);
        }
    }

    /// Ties keep input order.
    fn sort_column(&self, column: &mut [NodeIndex]) {
        column.sort_by(|a, b| self.y0[a.0].total_cmp(&self.y0[b.0]).then(a.cmp(b)));
    }

    fn resolve_collisions(&mut self, column: &[NodeIndex], alpha: f64) {
        if column.is_empty() {
            return;
        }
        let mid = column.len() >> 1;
        let subject = column[mid];
        self.push_up(&column[..mid], self.y0[subject.0] - self.py, alpha);
        self.push_down(&column[mid + 1..], self.y1[subject.0] + self.py, alpha);
        self.push_up(column, self.extent.y1, alpha);
        self.push_down(column, self.extent.y0, alpha);
    }

    fn push_down(&mut self, nodes: &[NodeIndex], mut y: f64, alpha: f64) {
        for &node in nodes {
            let dy = (y - self.y0[node.0]) * alpha;
            if dy > SankeyLayouter::COLLISION_EPSILON {
                self.shift(node, dy);
            }
            y = self.y1[node.0] + self.py;
        }
    }

    fn push_up(&mut self, nodes: &[NodeIndex], mut y: f64, alpha: f64) {
        for &node in nodes.iter().rev() {
            let dy = (self.y1[node.0] - y) * alpha;
            if dy > SankeyLayouter::COLLISION_EPSILON {
                self.shift(node, -dy);
            }
            y = self.y0[node.0] - self.py;
        }
    }

    fn finish(
        self,
        columns: Vec<Vec<NodeIndex>>,
        back_edges: &[bool],
        min_link_width: f64,
    ) -> LayoutResult {
        let layer_count = columns.len();
        let kx = if layer_count > 1 {
            (self.extent.width() - self.node_width) / (layer_count - 1) as f64
        } else {
            0.0
        };

        let nodes: Vec<NodeLayout> = self
            .model
            .node_indices()
            .map(|node| {
                let layer = self.layer[node.0];
                let x0 = self.extent.x0 + layer as f64 * kx;
                NodeLayout {
                    layer,
                    x0,
                    x1: x0 + self.node_width,
                    y0: self.y0[node.0],
                    y1: self.y1[node.0],
                }
            })
            .collect();

        let mut source_offset = vec![0.0; self.model.link_count()];
        let mut target_offset = vec![0.0; self.model.link_count()];
        for node in self.model.node_indices() {
            let mut y = self.y0[node.0];
            for &l in &self.outgoing[node.0] {
                source_offset[l.0] = y + self.band[l.0] / 2.0;
                y += self.band[l.0];
            }
            let mut y = self.y0[node.0];
            for &l in &self.incoming[node.0] {
                target_offset[l.0] = y + self.band[l.0] / 2.0;
                y += self.band[l.0];
            }
        }

        let links = self
            .model
            .links()
            .iter()
            .enumerate()
            .map(|(i, link)| LinkLayout {
                source: link.source_idx,
                target: link.target_idx,
                width: self.band[i].max(min_link_width),
                band: self.band[i],
                y0: source_offset[i],
                y1: target_offset[i],
                back_edge: back_edges[i],
            })
            .collect();

        LayoutResult {
            extent: self.extent,
            nodes,
            links,
            layers: columns,
            ky: self.ky,
            node_padding: self.py,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowmap_core::{LinkSpec, NodeId, NodeSpec};
    use proptest::prelude::*;

    fn model(nodes: &[&str], links: &[(&str, &str, f64)]) -> GraphModel {
        GraphModel::build(
            nodes.iter().map(|n| NodeSpec::new(*n)).collect(),
            links
                .iter()
                .map(|(s, t, v)| LinkSpec::new(*s, *t, *v))
                .collect(),
        )
        .unwrap()
    }

    fn node<'r>(model: &GraphModel, result: &'r LayoutResult, id: &str) -> &'r NodeLayout {
        result.node(model.index_of(&NodeId::from(id)).unwrap())
    }

    fn square() -> Extent {
        Extent::new(0.0, 0.0, 100.0, 100.0)
    }

    #[test]
    fn test_chain_layers_and_heights() {
        let m = model(&["A", "B", "C"], &[("A", "B", 10.0), ("B", "C", 10.0)]);
        let result = layout(&m, square(), NodeAlignment::Justify).unwrap();

        assert_eq!(node(&m, &result, "A").layer, 0);
        assert_eq!(node(&m, &result, "B").layer, 1);
        assert_eq!(node(&m, &result, "C").layer, 2);
        assert_eq!(result.layer_count(), 3);

        let heights: Vec<f64> = result.nodes.iter().map(NodeLayout::height).collect();
        assert!(heights.iter().all(|h| (h - heights[0]).abs() < 1e-9));
        assert!((result.ky * 10.0 - heights[0]).abs() < 1e-9);

        let a = node(&m, &result, "A");
        let c = node(&m, &result, "C");
        assert_eq!(a.x0, 0.0);
        assert_eq!(c.x1, 100.0);
    }

    #[test]
    fn test_justify_moves_sinks_to_last_layer() {
        let m = model(
            &["a", "b", "c", "short"],
            &[("a", "b", 5.0), ("b", "c", 5.0), ("a", "short", 2.0)],
        );

        let justify = layout(&m, square(), NodeAlignment::Justify).unwrap();
        assert_eq!(node(&m, &justify, "short").layer, 2);

        let left = layout(&m, square(), NodeAlignment::Left).unwrap();
        assert_eq!(node(&m, &left, "short").layer, 1);
    }

    #[test]
    fn test_right_alignment_pushes_sources_late() {
        let m = model(
            &["a", "b", "c", "late"],
            &[("a", "b", 5.0), ("b", "c", 5.0), ("late", "c", 2.0)],
        );
        let right = layout(&m, square(), NodeAlignment::Right).unwrap();
        assert_eq!(node(&m, &right, "late").layer, 1);
        assert_eq!(node(&m, &right, "a").layer, 0);

        let center = layout(&m, square(), NodeAlignment::Center).unwrap();
        assert_eq!(node(&m, &center, "late").layer, 1);

        let left = layout(&m, square(), NodeAlignment::Left).unwrap();
        assert_eq!(node(&m, &left, "late").layer, 0);
    }

    #[test]
    fn test_cycle_is_broken_deterministically() {
        let m = model(
            &["a", "b", "c"],
            &[("a", "b", 4.0), ("b", "c", 4.0), ("c", "a", 1.0)],
        );
        let result = layout(&m, square(), NodeAlignment::Left).unwrap();

        assert_eq!(node(&m, &result, "a").layer, 0);
        assert_eq!(node(&m, &result, "b").layer, 1);
        assert_eq!(node(&m, &result, "c").layer, 2);
        assert!(result.links[2].back_edge);
        assert!(!result.links[0].back_edge);
        assert_eq!(result, layout(&m, square(), NodeAlignment::Left).unwrap());
    }

    #[test]
    fn test_isolated_node_gets_visible_rect() {
        let m = model(&["A", "B", "D"], &[("A", "B", 10.0)]);
        let result = layout(&m, square(), NodeAlignment::Justify).unwrap();
        let d = node(&m, &result, "D");
        assert!(d.y0 < d.y1);
        assert!(d.x0 < d.x1);
    }

    fn fan_in(sources: usize) -> GraphModel {
        let mut nodes: Vec<NodeSpec> = (1..=sources)
            .map(|i| NodeSpec::new(format!("s{i}")))
            .collect();
        nodes.push(NodeSpec::new("sink"));
        let links = (1..=sources)
            .map(|i| LinkSpec::new(format!("s{i}"), "sink", i as f64))
            .collect();
        GraphModel::build(nodes, links).unwrap()
    }

    fn assert_inside(result: &LayoutResult) {
        let extent = result.extent;
        for n in &result.nodes {
            assert!(n.y0 >= extent.y0 - 1e-6, "{n:?} above {extent:?}");
            assert!(n.y1 <= extent.y1 + 1e-6, "{n:?} below {extent:?}");
            assert!(n.y0 < n.y1);
        }
    }

    #[test]
    fn test_crowded_layer_keeps_heights_proportional() {
        let m = fan_in(12);
        let result = layout(&m, square(), NodeAlignment::Justify).unwrap();

        assert!(result.ky > 0.0);
        assert!(result.node_padding < SankeyLayouter::DEFAULT_NODE_PADDING);
        assert_inside(&result);
        for i in 0..12 {
            let height = result.node(NodeIndex(i)).height();
            assert!((height - (i + 1) as f64 * result.ky).abs() < 1e-9);
        }
        let bands: Vec<f64> = result.links.iter().map(|l| l.band).collect();
        assert!(bands.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_many_isolated_nodes_fit() {
        let names: Vec<String> = (0..60).map(|i| format!("n{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let m = model(&refs, &[]);
        let result = layout(&m, Extent::new(0.0, 0.0, 100.0, 50.0), NodeAlignment::Justify)
            .unwrap();

        assert_inside(&result);
        let column = result.nodes_in_layer(0);
        assert_eq!(column.len(), 60);
        for pair in column.windows(2) {
            assert!(result.node(pair[0]).y1 <= result.node(pair[1]).y0 + 1e-6);
        }
    }

    #[test]
    fn test_link_attachments_stack_inside_nodes() {
        let m = model(
            &["src", "x", "y"],
            &[("src", "x", 6.0), ("src", "y", 4.0)],
        );
        let result = layout(&m, square(), NodeAlignment::Justify).unwrap();
        let src = node(&m, &result, "src");

        let mut offsets: Vec<(f64, f64)> = result
            .links
            .iter()
            .map(|l| (l.y0 - l.band / 2.0, l.y0 + l.band / 2.0))
            .collect();
        offsets.sort_by(|a, b| a.0.total_cmp(&b.0));

        assert!((offsets[0].0 - src.y0).abs() < 1e-9);
        assert!((offsets[0].1 - offsets[1].0).abs() < 1e-9);
        assert!((offsets[1].1 - src.y1).abs() < 1e-9);
    }

    #[test]
    fn test_link_path_runs_between_node_edges() {
        let m = model(&["A", "B"], &[("A", "B", 3.0)]);
        let result = layout(&m, square(), NodeAlignment::Justify).unwrap();
        let path = result.link_path(LinkIndex(0));
        assert_eq!(path.start.x, node(&m, &result, "A").x1);
        assert_eq!(path.end.x, node(&m, &result, "B").x0);
    }

    #[test]
    fn test_errors() {
        let m = model(&["A"], &[]);
        assert!(matches!(
            layout(&m, Extent::new(0.0, 0.0, 0.0, 10.0), NodeAlignment::Justify),
            Err(LayoutError::InvalidExtent { .. })
        ));
        assert!(matches!(
            layout(&m, Extent::new(0.0, 10.0, 10.0, 0.0), NodeAlignment::Justify),
            Err(LayoutError::InvalidExtent { .. })
        ));

        let empty = GraphModel::build(vec![], vec![]).unwrap();
        assert_eq!(
            layout(&empty, square(), NodeAlignment::Justify),
            Err(LayoutError::EmptyGraph)
        );
    }

    #[test]
    fn test_alignment_parses_from_str() {
        assert_eq!("Center".parse::<NodeAlignment>(), Ok(NodeAlignment::Center));
        assert!("diagonal".parse::<NodeAlignment>().is_err());
    }

    #[test]
    fn test_extent_with_margins() {
        let extent = Extent::with_margins(800.0, 600.0, Margins::default());
        assert_eq!(extent, Extent::new(1.0, 5.0, 799.0, 595.0));
    }

    /// Random DAG-ish graphs: node `i` only links to higher indices, plus an
    /// optional back link to exercise cycle breaking.
    fn graph_strategy() -> impl Strategy<Value = GraphModel> {
        (2usize..12)
            .prop_flat_map(|n| {
                let links = proptest::collection::vec((0..n, 0..n, 1u32..100), 0..(n * 2));
                (Just(n), links, any::<bool>())
            })
            .prop_map(|(n, raw_links, with_cycle)| {
                let nodes: Vec<NodeSpec> =
                    (0..n).map(|i| NodeSpec::new(format!("n{i}"))).collect();
                let mut links: Vec<LinkSpec> = raw_links
                    .into_iter()
                    .filter(|(s, t, _)| s < t)
                    .map(|(s, t, v)| LinkSpec::new(format!("n{s}"), format!("n{t}"), v as f64))
                    .collect();
                if with_cycle && n > 2 {
                    links.push(LinkSpec::new(format!("n{}", n - 1), "n0", 1.0));
                }
                GraphModel::build(nodes, links).unwrap()
            })
    }

    /// Wide fan-ins into a few sinks, plus isolated nodes, so that layers
    /// hold far more nodes than the padding allows for.
    fn crowded_strategy() -> impl Strategy<Value = GraphModel> {
        (
            proptest::collection::vec(1u32..500, 4..60),
            1usize..4,
            0usize..20,
        )
            .prop_map(|(values, sinks, isolated)| {
                let mut nodes: Vec<NodeSpec> = (0..values.len())
                    .map(|i| NodeSpec::new(format!("s{i}")))
                    .collect();
                nodes.extend((0..sinks).map(|j| NodeSpec::new(format!("t{j}"))));
                nodes.extend((0..isolated).map(|k| NodeSpec::new(format!("i{k}"))));
                let links = values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        LinkSpec::new(format!("s{i}"), format!("t{}", i % sinks), *v as f64)
                    })
                    .collect();
                GraphModel::build(nodes, links).unwrap()
            })
    }

    fn alignment_strategy() -> impl Strategy<Value = NodeAlignment> {
        prop_oneof![
            Just(NodeAlignment::Justify),
            Just(NodeAlignment::Left),
            Just(NodeAlignment::Right),
            Just(NodeAlignment::Center),
        ]
    }

    proptest! {
        #[test]
        fn prop_layout_is_deterministic(m in graph_strategy(), align in alignment_strategy()) {
            let extent = Extent::new(1.0, 5.0, 640.0, 480.0);
            let first = layout(&m, extent, align).unwrap();
            let second = layout(&m, extent, align).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_nodes_are_proper_and_disjoint(m in graph_strategy(), align in alignment_strategy()) {
            let result = layout(&m, Extent::new(0.0, 0.0, 500.0, 400.0), align).unwrap();
            for n in &result.nodes {
                prop_assert!(n.x0 < n.x1, "x0 {} >= x1 {}", n.x0, n.x1);
                prop_assert!(n.y0 < n.y1, "y0 {} >= y1 {}", n.y0, n.y1);
            }
            for layer in &result.layers {
                for pair in layer.windows(2) {
                    let upper = result.node(pair[0]);
                    let lower = result.node(pair[1]);
                    prop_assert!(
                        upper.y1 <= lower.y0 + 1e-6,
                        "overlap in layer {}: {:?} / {:?}", upper.layer, upper, lower
                    );
                }
            }
        }

        #[test]
        fn prop_crowded_layers_fit_and_stay_proportional(
            m in prop_oneof![graph_strategy(), crowded_strategy()],
            align in alignment_strategy(),
            height in 20.0f64..400.0,
        ) {
            let extent = Extent::new(0.0, 0.0, 300.0, height);
            let result = layout(&m, extent, align).unwrap();
            prop_assert!(result.ky > 0.0 || m.links().is_empty());
            for n in &result.nodes {
                prop_assert!(n.y0 >= extent.y0 - 1e-6, "{:?} above {:?}", n, extent);
                prop_assert!(n.y1 <= extent.y1 + 1e-6, "{:?} below {:?}", n, extent);
                prop_assert!(n.y0 < n.y1);
            }
            for layer in &result.layers {
                let mut flows: Vec<(f64, f64)> = layer
                    .iter()
                    .filter(|&&idx| m[idx].value > 0.0)
                    .map(|&idx| (m[idx].value, result.node(idx).height()))
                    .collect();
                flows.sort_by(|a, b| a.0.total_cmp(&b.0));
                for pair in flows.windows(2) {
                    if pair[0].0 < pair[1].0 {
                        prop_assert!(pair[0].1 < pair[1].1, "{:?}", pair);
                    }
                }
            }
        }

        #[test]
        fn prop_link_width_is_bounded_and_monotone(m in graph_strategy()) {
            let layouter = SankeyLayouter::default();
            let result = layouter.layout(&m, Extent::new(0.0, 0.0, 500.0, 400.0)).unwrap();
            let mut by_value: Vec<(f64, f64)> = m
                .links()
                .iter()
                .zip(&result.links)
                .map(|(link, geom)| (link.value, geom.width))
                .collect();
            by_value.sort_by(|a, b| a.0.total_cmp(&b.0));
            for (_, width) in &by_value {
                prop_assert!(*width >= layouter.min_link_width);
            }
            for pair in by_value.windows(2) {
                prop_assert!(pair[0].1 <= pair[1].1);
            }
        }
    }
}
