use std::collections::HashMap;
use std::fmt;

use cg_core::{ChargeBattery, ChargeDef, Position};

use crate::graph::GraphId;

/// Which component a node currently belongs to.
///
/// `Unassigned` is the Null component: every node starts there, and returns
/// there when its component is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GraphRef {
    /// Not yet part of any component.
    #[default]
    Unassigned,
    /// Member of the live component with this id.
    Member(GraphId),
}

impl GraphRef {
    /// The component id, if assigned.
    pub fn id(self) -> Option<GraphId> {
        match self {
            Self::Unassigned => None,
            Self::Member(id) => Some(id),
        }
    }

    /// Return `true` for the Null component.
    pub fn is_unassigned(self) -> bool {
        matches!(self, Self::Unassigned)
    }
}

impl fmt::Display for GraphRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unassigned => write!(f, "null"),
            Self::Member(id) => write!(f, "{id}"),
        }
    }
}

/// One charge-capable block registered with a network.
#[derive(Debug)]
pub struct ChargeNode {
    pos: Position,
    def: ChargeDef,
    battery: Option<Box<dyn ChargeBattery>>,
    graph: GraphRef,
    invalid: bool,
}

impl ChargeNode {
    pub(crate) fn new(pos: Position, def: ChargeDef, battery: Option<Box<dyn ChargeBattery>>) -> Self {
        Self {
            pos,
            def,
            battery,
            graph: GraphRef::Unassigned,
            invalid: false,
        }
    }

    /// Where this node sits.
    pub fn position(&self) -> Position {
        self.pos
    }

    /// The descriptor this node was registered with.
    pub fn def(&self) -> &ChargeDef {
        &self.def
    }

    /// The node's battery, if its block stores energy.
    pub fn battery(&self) -> Option<&dyn ChargeBattery> {
        self.battery.as_deref()
    }

    pub(crate) fn battery_mut(&mut self) -> Option<&mut (dyn ChargeBattery + 'static)> {
        self.battery.as_deref_mut()
    }

    /// Return `true` if the node carries a battery.
    pub fn has_battery(&self) -> bool {
        self.battery.is_some()
    }

    /// The component this node currently points at.
    ///
    /// This does not build anything; use
    /// [`Network::component_at`](crate::Network::component_at) to resolve an
    /// unassigned node lazily.
    pub fn graph(&self) -> GraphRef {
        self.graph
    }

    /// Return `true` while the node points at the Null component.
    pub fn is_unassigned(&self) -> bool {
        self.graph.is_unassigned()
    }

    /// Return `true` once the node has been deregistered or replaced.
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub(crate) fn set_graph(&mut self, graph: GraphRef) {
        self.graph = graph;
    }

    pub(crate) fn invalidate(&mut self) {
        self.invalid = true;
    }

    /// Positions of registered nodes this node is linked to.
    ///
    /// A candidate counts only if the link is accepted from both ends: this
    /// node lists the candidate's position and accepts its link type, and the
    /// candidate lists this position and accepts this node's link type.
    pub fn neighbors(&self, nodes: &NodeRegistry) -> Vec<Position> {
        let own_type = self.def.connect_type;
        self.def
            .possible_connections(self.pos)
            .into_iter()
            .filter_map(|(pos, accepted)| {
                let other = nodes.get(pos)?;
                if !accepted.contains(other.def.connect_type) {
                    return None;
                }
                let accepts_back = other
                    .def
                    .possible_connections(pos)
                    .get(&self.pos)
                    .is_some_and(|set| set.contains(own_type));
                accepts_back.then_some(pos)
            })
            .collect()
    }
}

impl fmt::Display for ChargeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.def.connect_type, self.pos)
    }
}

/// Position-keyed store of registered nodes. Owned by the network.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: HashMap<Position, ChargeNode>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The node at `pos`, if any.
    pub fn get(&self, pos: Position) -> Option<&ChargeNode> {
        self.nodes.get(&pos)
    }

    pub(crate) fn get_mut(&mut self, pos: Position) -> Option<&mut ChargeNode> {
        self.nodes.get_mut(&pos)
    }

    /// Return `true` if a node is registered at `pos`.
    pub fn contains(&self, pos: Position) -> bool {
        self.nodes.contains_key(&pos)
    }

    pub(crate) fn insert(&mut self, node: ChargeNode) -> Option<ChargeNode> {
        self.nodes.insert(node.pos, node)
    }

    pub(crate) fn remove(&mut self, pos: Position) -> Option<ChargeNode> {
        self.nodes.remove(&pos)
    }

    /// Charge of the battery at `pos`, if that node has one.
    pub fn charge_at(&self, pos: Position) -> Option<f64> {
        self.get(pos)?.battery().map(|battery| battery.charge())
    }

    pub(crate) fn battery_mut(&mut self, pos: Position) -> Option<&mut (dyn ChargeBattery + 'static)> {
        self.nodes.get_mut(&pos)?.battery_mut()
    }

    /// Iterate over all registered nodes in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &ChargeNode> {
        self.nodes.values()
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Return `true` if no nodes are registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
