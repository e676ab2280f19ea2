use crate::layout::LayoutResult;
use crate::link_path::{LinkPath, Point};
use flowmap_core::{LinkIndex, NodeIndex};

/// Result of a hit test at a given position.
///
/// Nodes win over links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitResult {
    None,
    Node(NodeIndex),
    Link(LinkIndex),
}

#[derive(Debug, Clone)]
struct LinkRegion {
    path: LinkPath,
    half_width: f64,
}

/// Maps pointer positions to the node or link drawn there.
#[derive(Debug, Clone)]
pub struct HitTester {
    node_rects: Vec<(f64, f64, f64, f64)>,
    links: Vec<LinkRegion>,
    /// Extra slack (in pixels) around thin links.
    link_tolerance: f64,
    bezier_samples: usize,
}

impl Default for HitTester {
    fn default() -> Self {
        Self::new()
    }
}

impl HitTester {
    pub fn new() -> Self {
        Self {
            node_rects: Vec::new(),
            links: Vec::new(),
            link_tolerance: 2.0,
            bezier_samples: 48,
        }
    }

    /// Build a tester for `layout`.
    pub fn from_layout(layout: &LayoutResult) -> Self {
        let mut tester = Self::new();
        tester.update(layout);
        tester
    }

    /// Refresh hit regions; call after every re-layout.
    pub fn update(&mut self, layout: &LayoutResult) {
        self.node_rects = layout
            .nodes
            .iter()
            .map(|n| (n.x0, n.y0, n.x1, n.y1))
            .collect();
        self.links = layout
            .links
            .iter()
            .enumerate()
            .map(|(i, link)| LinkRegion {
                path: layout.link_path(LinkIndex(i)),
                half_width: link.width / 2.0,
            })
            .collect();
    }

    pub fn hit_test(&self, pos: Point) -> HitResult {
        if let Some(node) = self.hit_test_node(pos) {
            return HitResult::Node(node);
        }
        if let Some(link) = self.hit_test_link(pos) {
            return HitResult::Link(link);
        }
        HitResult::None
    }

    pub fn hit_test_node(&self, pos: Point) -> Option<NodeIndex> {
        self.node_rects
            .iter()
            .position(|&(x0, y0, x1, y1)| pos.x >= x0 && pos.x <= x1 && pos.y >= y0 && pos.y <= y1)
            .map(NodeIndex)
    }

    /// Closest link whose stroke (plus tolerance) covers `pos`.
    pub fn hit_test_link(&self, pos: Point) -> Option<LinkIndex> {
        let mut best: Option<(LinkIndex, f64)> = None;
        for (i, region) in self.links.iter().enumerate() {
            let (start, end) = (region.path.start.x, region.path.end.x);
            if pos.x < start.min(end) - self.link_tolerance
                || pos.x > start.max(end) + self.link_tolerance
            {
                continue;
            }
            let distance = region.path.point_distance(pos, self.bezier_samples);
            if distance <= region.half_width + self.link_tolerance
                && best.is_none_or(|(_, d)| distance < d)
            {
                best = Some((LinkIndex(i), distance));
            }
        }
        best.map(|(idx, _)| idx)
    }
}
