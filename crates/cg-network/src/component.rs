use cg_core::Position;

use crate::graph::{ChargeGraph, GraphId};
use crate::node::NodeRegistry;

/// Consumer-facing handle to one component, borrowed from a
/// [`Network`](crate::Network).
///
/// A handle without a graph is the Null component: empty, chargeless, and
/// unable to supply anything.
#[derive(Debug)]
pub struct Component<'a> {
    graph: Option<&'a ChargeGraph>,
    nodes: &'a mut NodeRegistry,
}

impl<'a> Component<'a> {
    pub(crate) fn new(graph: Option<&'a ChargeGraph>, nodes: &'a mut NodeRegistry) -> Self {
        Self { graph, nodes }
    }

    /// The graph id, or `None` for the Null component.
    pub fn id(&self) -> Option<GraphId> {
        self.graph.map(ChargeGraph::id)
    }

    /// Return `true` for the Null component.
    pub fn is_null(&self) -> bool {
        self.graph.is_none()
    }

    /// Number of member nodes.
    pub fn size(&self) -> usize {
        self.graph.map_or(0, ChargeGraph::len)
    }

    /// Number of members carrying a battery.
    pub fn battery_count(&self) -> usize {
        self.graph.map_or(0, ChargeGraph::battery_count)
    }

    /// Return `true` if the node at `pos` is a member.
    pub fn contains(&self, pos: Position) -> bool {
        self.graph.is_some_and(|g| g.contains(pos))
    }

    /// Member positions in ascending order.
    pub fn members(&self) -> Vec<Position> {
        self.graph
            .map(|g| g.members().collect())
            .unwrap_or_default()
    }

    /// Total charge stored across the component.
    pub fn total_charge(&self) -> f64 {
        self.graph.map_or(0.0, |g| g.total_charge(&*self.nodes))
    }

    /// Withdraw exactly `amount`, or nothing. See
    /// [`ChargeGraph::try_use_charge`].
    pub fn try_use_charge(&mut self, amount: f64) -> bool {
        match self.graph {
            Some(graph) => graph.try_use_charge(self.nodes, amount),
            None => amount <= 0.0,
        }
    }

    /// Withdraw up to `amount` and return how much was taken.
    pub fn remove_charge(&mut self, amount: f64) -> f64 {
        match self.graph {
            Some(graph) => graph.remove_charge(self.nodes, amount),
            None => 0.0,
        }
    }
}
