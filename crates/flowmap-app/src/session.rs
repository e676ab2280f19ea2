use crate::loader::{GraphSource, LoadError};
use crate::settings::FlowmapSettings;
use crossbeam_channel::Receiver;
use flowmap_core::{GraphModel, NodeId, ValidationError};
use flowmap_events::{Event, EventBus, EventListener};
use flowmap_graph::{
    CategoryPalette, DetailPanelBinder, HighlightController, HighlightError, HighlightState,
    HighlightUpdate, HitResult, HitTester, LayoutError, LayoutResult, Layouter, NeighborRecord,
    NeighborhoodIndex, Point, Scene, neighbor_records,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Invalid graph: {0}")]
    Validation(#[from] ValidationError),
    #[error("Layout failed: {0}")]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Highlight(#[from] HighlightError),
    #[error("No graph loaded")]
    NoGraph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { nodes: usize, links: usize },
    /// A newer load started while this one was fetching; its result was dropped.
    Superseded,
}

/// Everything derived from one successfully loaded graph.
struct LoadedGraph {
    model: Arc<GraphModel>,
    palette: Arc<CategoryPalette>,
    layout: Arc<LayoutResult>,
    highlight: HighlightController,
    hit_tester: HitTester,
}

struct SessionState {
    settings: FlowmapSettings,
    graph: Option<LoadedGraph>,
    binder: Option<Box<dyn DetailPanelBinder + Send>>,
}

/// Headless driver of one flow diagram: loads a graph, keeps its layout in
/// sync with the canvas size and routes pointer events to the highlight
/// state machine.
#[derive(Clone)]
pub struct FlowmapSession {
    state: Arc<Mutex<SessionState>>,
    generation: Arc<AtomicU64>,
    bus: EventBus,
}

impl Default for FlowmapSession {
    fn default() -> Self {
        Self::new(FlowmapSettings::default())
    }
}

impl FlowmapSession {
    pub fn new(settings: FlowmapSettings) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                settings,
                graph: None,
                binder: None,
            })),
            generation: Arc::new(AtomicU64::new(0)),
            bus: EventBus::new(),
        }
    }

    pub fn with_binder(self, binder: impl DetailPanelBinder + Send + 'static) -> Self {
        self.set_binder(binder);
        self
    }

    pub fn set_binder(&self, binder: impl DetailPanelBinder + Send + 'static) {
        self.state.lock().binder = Some(Box::new(binder));
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Subscribe to the events the session publishes from now on.
    pub fn events(&self) -> Receiver<Event> {
        self.bus.subscribe()
    }

    pub fn settings(&self) -> FlowmapSettings {
        self.state.lock().settings.clone()
    }

    /// Fetch, validate and lay out a graph, replacing the current one.
    ///
    /// If another load starts before this one finishes fetching, the result
    /// is dropped and [`LoadOutcome::Superseded`] returned. On any error the
    /// previously loaded graph stays in place.
    pub async fn load<S: GraphSource>(&self, source: &S) -> Result<LoadOutcome, SessionError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let origin = source.describe();
        tracing::info!(generation, "Loading graph from {origin}");
        self.bus.publish(Event::LoadStarted { generation });

        let fetched = source.fetch().await;
        if self.is_stale(generation) {
            return Ok(self.superseded(generation));
        }
        let raw = fetched.map_err(|e| self.load_failed(e.into()))?;
        let model = GraphModel::from_raw(raw).map_err(|e| self.load_failed(e.into()))?;

        let mut state = self.state.lock();
        // Re-checked under the lock so two loads can never both apply.
        if self.is_stale(generation) {
            drop(state);
            return Ok(self.superseded(generation));
        }
        let graph = build_graph(&state.settings, model).map_err(|e| self.load_failed(e))?;
        let (nodes, links) = (graph.model.node_count(), graph.model.link_count());
        let (layers, ky) = (graph.layout.layer_count(), graph.layout.ky);
        state.graph = Some(graph);
        drop(state);

        tracing::info!(generation, nodes, links, "Graph loaded from {origin}");
        self.bus.publish(Event::GraphLoaded {
            generation,
            nodes,
            links,
        });
        self.bus.publish(Event::LayoutComputed { layers, ky });
        Ok(LoadOutcome::Applied { nodes, links })
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    fn superseded(&self, generation: u64) -> LoadOutcome {
        tracing::info!(generation, "Discarding superseded graph load");
        self.bus.publish(Event::LoadSuperseded { generation });
        LoadOutcome::Superseded
    }

    fn load_failed(&self, error: SessionError) -> SessionError {
        tracing::error!("Failed to load graph: {error}");
        self.bus.publish(Event::LoadFailed {
            message: error.to_string(),
        });
        error
    }

    /// Re-run the layout for a new canvas size. A failed layout keeps the
    /// previous geometry and canvas size.
    pub fn resize(&self, width: f64, height: f64) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        let mut settings = state.settings.clone();
        settings.canvas_width = width;
        settings.canvas_height = height;

        let Some(graph) = state.graph.as_mut() else {
            state.settings = settings;
            return Ok(());
        };

        match settings.layout.layout(&graph.model, settings.extent()) {
            Ok(layout) => {
                graph.hit_tester.update(&layout);
                let (layers, ky) = (layout.layer_count(), layout.ky);
                graph.layout = Arc::new(layout);
                state.settings = settings;
                drop(state);
                tracing::debug!(width, height, "Re-layout after resize");
                self.bus.publish(Event::LayoutComputed { layers, ky });
                Ok(())
            }
            Err(e) => {
                drop(state);
                tracing::warn!(width, height, "Keeping previous layout: {e}");
                self.bus.publish(Event::LayoutFailed {
                    message: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    pub fn hover(&self, id: &NodeId) -> Result<HighlightUpdate, SessionError> {
        self.transition(|h| h.hover(id))
    }

    pub fn unhover(&self) -> Result<HighlightUpdate, SessionError> {
        self.transition(|h| Ok(h.unhover()))
    }

    pub fn click(&self, id: &NodeId) -> Result<HighlightUpdate, SessionError> {
        self.transition(|h| h.click(id))
    }

    pub fn unlock(&self) -> Result<HighlightUpdate, SessionError> {
        self.transition(|h| Ok(h.unlock()))
    }

    fn transition(
        &self,
        apply: impl FnOnce(&mut HighlightController) -> Result<HighlightUpdate, HighlightError>,
    ) -> Result<HighlightUpdate, SessionError> {
        let mut state = self.state.lock();
        let SessionState { graph, binder, .. } = &mut *state;
        let graph = graph.as_mut().ok_or(SessionError::NoGraph)?;

        let before = graph.highlight.state();
        let update = apply(&mut graph.highlight).inspect_err(|e| tracing::warn!("{e}"))?;

        let focus = update.newly_locked.map(|node| {
            let records = neighbor_records(&graph.model, &graph.palette, node);
            let focused = &graph.model[node];
            if let Some(binder) = binder.as_mut() {
                binder.render(focused, &records);
            }
            (focused.id.clone(), records)
        });
        drop(state);

        if update.state != before || !update.diff.is_empty() {
            self.bus.publish(Event::HighlightChanged {
                state: update.state,
                diff: update.diff.clone(),
            });
        }
        if let Some((node, records)) = focus {
            self.bus.publish(Event::FocusChanged { node, records });
        }
        Ok(update)
    }

    pub fn highlight_state(&self) -> Option<HighlightState> {
        self.state
            .lock()
            .graph
            .as_ref()
            .map(|g| g.highlight.state())
    }

    pub fn model(&self) -> Option<Arc<GraphModel>> {
        self.state.lock().graph.as_ref().map(|g| Arc::clone(&g.model))
    }

    /// Current geometry; a snapshot that later re-layouts do not touch.
    pub fn layout(&self) -> Option<Arc<LayoutResult>> {
        self.state
            .lock()
            .graph
            .as_ref()
            .map(|g| Arc::clone(&g.layout))
    }

    pub fn scene(&self) -> Option<Scene> {
        let state = self.state.lock();
        let graph = state.graph.as_ref()?;
        Some(Scene::build(
            &graph.model,
            &graph.layout,
            &graph.highlight.visibility(),
            &graph.palette,
            &state.settings.scene,
        ))
    }

    /// Detail records for `id` without changing the highlight.
    pub fn detail_records(&self, id: &NodeId) -> Result<Vec<NeighborRecord>, SessionError> {
        let state = self.state.lock();
        let graph = state.graph.as_ref().ok_or(SessionError::NoGraph)?;
        let node = graph
            .model
            .index_of(id)
            .ok_or_else(|| HighlightError::UnknownNode(id.clone()))?;
        Ok(neighbor_records(&graph.model, &graph.palette, node))
    }

    pub fn hit_test(&self, pos: Point) -> HitResult {
        self.state
            .lock()
            .graph
            .as_ref()
            .map_or(HitResult::None, |g| g.hit_tester.hit_test(pos))
    }
}

fn build_graph(settings: &FlowmapSettings, model: GraphModel) -> Result<LoadedGraph, SessionError> {
    let layout = settings.layout.layout(&model, settings.extent())?;
    let model = Arc::new(model);
    let index = Arc::new(NeighborhoodIndex::build(&model));
    let palette = Arc::new(CategoryPalette::for_model(&model));
    Ok(LoadedGraph {
        highlight: HighlightController::new(Arc::clone(&model), index),
        hit_tester: HitTester::from_layout(&layout),
        layout: Arc::new(layout),
        palette,
        model,
    })
}

impl EventListener for FlowmapSession {
    fn handle_event(&mut self, event: &Event) {
        let result = match event {
            Event::Hover { id } => self.hover(id).map(drop),
            Event::Unhover => self.unhover().map(drop),
            Event::Click { id } => self.click(id).map(drop),
            Event::Unlock => self.unlock().map(drop),
            Event::Resize { width, height } => self.resize(*width, *height),
            _ => Ok(()),
        };
        if let Err(e) = result {
            tracing::debug!(?event, "Event not applied: {e}");
        }
    }
}
