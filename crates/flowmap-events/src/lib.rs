use crossbeam_channel::{Receiver, Sender, unbounded};
use flowmap_core::NodeId;
use flowmap_graph::{HighlightState, NeighborRecord, VisibilityDiff};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Pointer interaction
    Hover {
        id: NodeId,
    },
    Unhover,
    Click {
        id: NodeId,
    },
    /// Release a highlight frozen by a click.
    Unlock,
    Resize {
        width: f64,
        height: f64,
    },

    // Loading
    LoadStarted {
        generation: u64,
    },
    GraphLoaded {
        generation: u64,
        nodes: usize,
        links: usize,
    },
    /// A newer load started before this one finished.
    LoadSuperseded {
        generation: u64,
    },
    LoadFailed {
        message: String,
    },

    // Layout
    LayoutComputed {
        layers: usize,
        ky: f64,
    },
    LayoutFailed {
        message: String,
    },

    // Highlight
    HighlightChanged {
        state: HighlightState,
        diff: VisibilityDiff,
    },
    /// Detail panel content for a newly locked node.
    FocusChanged {
        node: NodeId,
        records: Vec<NeighborRecord>,
    },
}

/// Routes interaction input to a listener and fans session output out to
/// every subscriber.
///
/// Input sent through [`EventBus::sender`] is only seen by
/// [`EventBus::dispatch_to`]. Events passed to [`EventBus::publish`] go to
/// each receiver handed out by [`EventBus::subscribe`], never back to the
/// listener.
#[derive(Clone)]
pub struct EventBus {
    input_tx: Sender<Event>,
    input_rx: Receiver<Event>,
    subscribers: Arc<Mutex<Vec<Sender<Event>>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (input_tx, input_rx) = unbounded();
        Self {
            input_tx,
            input_rx,
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sender for pointer and window input.
    pub fn sender(&self) -> Sender<Event> {
        self.input_tx.clone()
    }

    /// Receiver of every event published from now on.
    pub fn subscribe(&self) -> Receiver<Event> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn publish(&self, event: Event) {
        tracing::trace!(?event, "Publishing event");
        // Subscribers whose receiver was dropped are forgotten.
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Dispatch the input queued so far to a listener. Input sent while the
    /// listener runs waits for the next call.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        let pending: Vec<Event> = self.input_rx.try_iter().collect();
        for event in &pending {
            listener.handle_event(event);
        }
    }
}

/// Trait for components that respond to events.
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}
