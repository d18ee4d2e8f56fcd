use std::collections::VecDeque;

use cg_core::Position;

use crate::graph::GraphId;

/// What kind of network event occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEventKind {
    // Registry
    /// A node was registered at an empty position.
    NodeInserted {
        /// Where the node was registered.
        pos: Position,
    },
    /// A node replaced an existing node at the same position.
    NodeReplaced {
        /// Where the replacement happened.
        pos: Position,
        /// The graph the new node inherited, if the old one was live.
        inherited: Option<GraphId>,
    },
    /// A node was deregistered.
    NodeRemoved {
        /// Where the node was.
        pos: Position,
    },

    // Graphs
    /// A graph was built or grown from a seed node.
    GraphConstructed {
        /// The resulting graph.
        graph: GraphId,
        /// The node the construction started from.
        seed: Position,
        /// Member count after construction.
        size: usize,
        /// Battery count after construction.
        batteries: usize,
    },
    /// A smaller graph was folded into a larger one.
    GraphMerged {
        /// The graph that absorbed the members.
        winner: GraphId,
        /// The graph that was emptied.
        loser: GraphId,
    },
    /// A graph was destroyed because one of its nodes was removed.
    GraphDestroyed {
        /// The destroyed graph.
        graph: GraphId,
        /// Member count at the time of destruction.
        size: usize,
    },
    /// A dead or empty graph was dropped from the live set.
    GraphPruned {
        /// The dropped graph.
        graph: GraphId,
    },
}

/// One entry in the [`EventLog`], stamped with the tick it happened in.
#[derive(Debug, Clone)]
pub struct NetworkEvent {
    /// Tick during which the event was recorded.
    pub tick: u64,
    /// What happened.
    pub kind: NetworkEventKind,
    /// Human-readable summary.
    pub description: String,
}

impl NetworkEvent {
    /// Stamp `kind` with `tick`.
    pub fn new(tick: u64, kind: NetworkEventKind, description: impl Into<String>) -> Self {
        Self {
            tick,
            kind,
            description: description.into(),
        }
    }
}

/// Ring of the most recent network events. A capacity of 0 keeps everything.
#[derive(Debug, Default)]
pub struct EventLog {
    ring: VecDeque<NetworkEvent>,
    capacity: usize,
}

impl EventLog {
    /// Create a log holding at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: VecDeque::new(),
            capacity,
        }
    }

    /// Record an event, evicting the oldest once the log is full.
    pub fn push(&mut self, event: NetworkEvent) {
        if self.capacity > 0 && self.ring.len() == self.capacity {
            self.ring.pop_front();
        }
        self.ring.push_back(event);
    }

    /// Recorded events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &NetworkEvent> {
        self.ring.iter()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Return `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}
