/// How [`Network::component_at`](crate::Network::component_at) treats a
/// position the world reports as charge-capable but that has no node yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LazyCreation {
    /// Create the node and its component on the spot, bypassing the queue.
    #[default]
    Immediate,
    /// Queue a registration and report the Null component until the next tick.
    Queued,
}

/// Configuration for a charge network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Maximum event log size (oldest events dropped when exceeded). 0 = unlimited.
    pub max_events: usize,
    /// Lazy node creation policy for `component_at`.
    pub lazy_creation: LazyCreation,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_events: 1024,
            lazy_creation: LazyCreation::Immediate,
        }
    }
}

impl NetworkConfig {
    /// Set the maximum event log size (0 = unlimited).
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }

    /// Set the lazy node creation policy.
    pub fn with_lazy_creation(mut self, mode: LazyCreation) -> Self {
        self.lazy_creation = mode;
        self
    }
}
