use crate::neighborhood::NeighborhoodIndex;
use flowmap_core::{GraphModel, LinkIndex, NodeId, NodeIndex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HighlightError {
    #[error("Unknown node `{0}`")]
    UnknownNode(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Full,
    Dimmed,
}

impl Visibility {
    pub fn opacity(self, dimmed_opacity: f64) -> f64 {
        match self {
            Visibility::Full => 1.0,
            Visibility::Dimmed => dimmed_opacity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelVisibility {
    Visible,
    Hidden,
}

impl LabelVisibility {
    pub fn opacity(self) -> f64 {
        match self {
            LabelVisibility::Visible => 1.0,
            LabelVisibility::Hidden => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HighlightState {
    #[default]
    Idle,
    Focused(NodeIndex),
    Locked(NodeIndex),
}

impl HighlightState {
    /// Node whose neighborhood is highlighted, if any.
    pub fn focus(&self) -> Option<NodeIndex> {
        match self {
            HighlightState::Idle => None,
            HighlightState::Focused(n) | HighlightState::Locked(n) => Some(*n),
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, HighlightState::Locked(_))
    }
}

/// Visibility of every node, link and label for one highlight state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityMap {
    nodes: Vec<Visibility>,
    links: Vec<Visibility>,
    labels: Vec<LabelVisibility>,
}

impl VisibilityMap {
    /// Everything drawn at full opacity, no labels.
    pub fn idle(model: &GraphModel) -> Self {
        Self {
            nodes: vec![Visibility::Full; model.node_count()],
            links: vec![Visibility::Full; model.link_count()],
            labels: vec![LabelVisibility::Hidden; model.node_count()],
        }
    }

    /// `node`, its neighbors and the links touching it stand out; the rest is dimmed.
    pub fn focused(model: &GraphModel, index: &NeighborhoodIndex, node: NodeIndex) -> Self {
        let mut nodes = vec![Visibility::Dimmed; model.node_count()];
        let mut labels = vec![LabelVisibility::Hidden; model.node_count()];
        let mut links = vec![Visibility::Dimmed; model.link_count()];

        for n in index.neighborhood(node).into_iter().chain([node]) {
            nodes[n.0] = Visibility::Full;
            labels[n.0] = LabelVisibility::Visible;
        }
        for l in index.links_touching(node) {
            links[l.0] = Visibility::Full;
        }

        Self {
            nodes,
            links,
            labels,
        }
    }

    pub fn node(&self, index: NodeIndex) -> Visibility {
        self.nodes[index.0]
    }

    pub fn link(&self, index: LinkIndex) -> Visibility {
        self.links[index.0]
    }

    pub fn label(&self, index: NodeIndex) -> LabelVisibility {
        self.labels[index.0]
    }

    /// Entries of `next` that differ from `self`.
    pub fn diff(&self, next: &VisibilityMap) -> VisibilityDiff {
        fn changed<T: Copy + PartialEq, I>(
            old: &[T],
            new: &[T],
            wrap: impl Fn(usize) -> I,
        ) -> Vec<(I, T)> {
            old.iter()
                .zip(new)
                .enumerate()
                .filter(|(_, (a, b))| a != b)
                .map(|(i, (_, b))| (wrap(i), *b))
                .collect()
        }

        VisibilityDiff {
            nodes: changed(&self.nodes, &next.nodes, NodeIndex),
            links: changed(&self.links, &next.links, LinkIndex),
            labels: changed(&self.labels, &next.labels, NodeIndex),
        }
    }
}

/// Only the entries whose visibility changed in a transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityDiff {
    pub nodes: Vec<(NodeIndex, Visibility)>,
    pub links: Vec<(LinkIndex, Visibility)>,
    pub labels: Vec<(NodeIndex, LabelVisibility)>,
}

impl VisibilityDiff {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty() && self.labels.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightUpdate {
    pub state: HighlightState,
    pub diff: VisibilityDiff,
    /// Set when a click locked onto a different node; the detail panel
    /// should be re-rendered for it.
    pub newly_locked: Option<NodeIndex>,
}

/// Hover/click state machine over one graph.
///
/// The current [`VisibilityMap`] is an immutable snapshot that is replaced,
/// never edited, on every transition.
#[derive(Debug, Clone)]
pub struct HighlightController {
    model: Arc<GraphModel>,
    index: Arc<NeighborhoodIndex>,
    state: HighlightState,
    visibility: Arc<VisibilityMap>,
}

impl HighlightController {
    pub fn new(model: Arc<GraphModel>, index: Arc<NeighborhoodIndex>) -> Self {
        let visibility = Arc::new(VisibilityMap::idle(&model));
        Self {
            model,
            index,
            state: HighlightState::Idle,
            visibility,
        }
    }

    pub fn state(&self) -> HighlightState {
        self.state
    }

    pub fn visibility(&self) -> Arc<VisibilityMap> {
        Arc::clone(&self.visibility)
    }

    fn resolve(&self, id: &NodeId) -> Result<NodeIndex, HighlightError> {
        self.model
            .index_of(id)
            .ok_or_else(|| HighlightError::UnknownNode(id.clone()))
    }

    fn unchanged(&self) -> HighlightUpdate {
        HighlightUpdate {
            state: self.state,
            diff: VisibilityDiff::default(),
            newly_locked: None,
        }
    }

    fn transition(&mut self, state: HighlightState) -> HighlightUpdate {
        let next = match state.focus() {
            Some(node) => VisibilityMap::focused(&self.model, &self.index, node),
            None => VisibilityMap::idle(&self.model),
        };
        let diff = self.visibility.diff(&next);
        let newly_locked = match (self.state, state) {
            (HighlightState::Locked(old), HighlightState::Locked(new)) if old == new => None,
            (_, HighlightState::Locked(new)) => Some(new),
            _ => None,
        };
        tracing::trace!(from = ?self.state, to = ?state, changed = !diff.is_empty(), "Highlight transition");

        self.state = state;
        self.visibility = Arc::new(next);
        HighlightUpdate {
            state,
            diff,
            newly_locked,
        }
    }

    pub fn hover(&mut self, id: &NodeId) -> Result<HighlightUpdate, HighlightError> {
        let node = self.resolve(id)?;
        Ok(match self.state {
            HighlightState::Locked(_) => self.unchanged(),
            HighlightState::Focused(current) if current == node => self.unchanged(),
            HighlightState::Idle | HighlightState::Focused(_) => {
                self.transition(HighlightState::Focused(node))
            }
        })
    }

    pub fn unhover(&mut self) -> HighlightUpdate {
        match self.state {
            HighlightState::Focused(_) => self.transition(HighlightState::Idle),
            HighlightState::Idle | HighlightState::Locked(_) => self.unchanged(),
        }
    }

    pub fn click(&mut self, id: &NodeId) -> Result<HighlightUpdate, HighlightError> {
        let node = self.resolve(id)?;
        Ok(match self.state {
            HighlightState::Locked(current) if current == node => self.unchanged(),
            _ => self.transition(HighlightState::Locked(node)),
        })
    }

    pub fn unlock(&mut self) -> HighlightUpdate {
        match self.state {
            HighlightState::Locked(_) => self.transition(HighlightState::Idle),
            HighlightState::Idle | HighlightState::Focused(_) => self.unchanged(),
        }
    }
}
