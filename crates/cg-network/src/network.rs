use std::collections::{BTreeMap, BTreeSet, HashSet};

use cg_core::{BlockGrid, ChargeDef, ChargeWorld, Position};

use crate::component::Component;
use crate::config::{LazyCreation, NetworkConfig};
use crate::event::{EventLog, NetworkEvent, NetworkEventKind};
use crate::graph::{ChargeGraph, GraphId};
use crate::node::{ChargeNode, GraphRef, NodeRegistry};

/// A registration change waiting for the next tick.
#[derive(Debug)]
enum PendingChange {
    Insert(ChargeNode),
    Remove,
}

/// What a single [`Network::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickSummary {
    /// The tick number that just ran.
    pub tick: u64,
    /// Nodes placed into the registry.
    pub inserted: usize,
    /// Nodes removed from the registry.
    pub removed: usize,
    /// Graphs built or grown for newly inserted nodes.
    pub constructed: usize,
    /// Dead or empty graphs dropped from the live set.
    pub pruned: usize,
    /// Graphs alive after pruning.
    pub live_graphs: usize,
}

/// The per-world charge network controller.
///
/// Owns the node registry, the pending registration queue, and every charge
/// graph. Outside callers submit changes with
/// [`request_register`](Self::request_register) and
/// [`request_deregister`](Self::request_deregister); nothing structural
/// happens until [`tick`](Self::tick) drains the queue.
pub struct Network<W: ChargeWorld> {
    world: W,
    config: NetworkConfig,
    nodes: NodeRegistry,
    pending: BTreeMap<Position, PendingChange>,
    graphs: BTreeMap<GraphId, ChargeGraph>,
    next_graph: u64,
    tick: u64,
    events: EventLog,
}

impl<W: ChargeWorld> std::fmt::Debug for Network<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("tick", &self.tick)
            .field("nodes", &self.nodes.len())
            .field("graphs", &self.graphs.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<W: ChargeWorld> Network<W> {
    /// Create an empty network over a world.
    pub fn new(world: W, config: NetworkConfig) -> Self {
        let events = EventLog::new(config.max_events);
        Self {
            world,
            config,
            nodes: NodeRegistry::new(),
            pending: BTreeMap::new(),
            graphs: BTreeMap::new(),
            next_graph: 1,
            tick: 0,
            events,
        }
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Queue a node for `pos` unless a live node with the same descriptor is
    /// already registered there. The node's battery is obtained from the
    /// world now. Returns `true` if a change was queued.
    pub fn request_register(&mut self, pos: Position, def: ChargeDef) -> bool {
        if self.node_matches(pos, &def) {
            return false;
        }
        let battery = self.world.battery_for(pos, &def);
        tracing::debug!(%pos, ty = %def.connect_type, "queued charge node registration");
        self.pending
            .insert(pos, PendingChange::Insert(ChargeNode::new(pos, def, battery)));
        true
    }

    /// Queue removal of the node at `pos`. Replaces any registration queued
    /// for the same position this tick.
    pub fn request_deregister(&mut self, pos: Position) {
        tracing::debug!(%pos, "queued charge node removal");
        self.pending.insert(pos, PendingChange::Remove);
    }

    /// Number of queued changes.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the network by one tick: apply queued changes, build graphs
    /// for newly inserted nodes, prune dead graphs, then equalize every live
    /// graph.
    pub fn tick(&mut self) -> TickSummary {
        self.tick += 1;
        let mut summary = TickSummary {
            tick: self.tick,
            ..TickSummary::default()
        };

        let mut added = Vec::new();
        for (pos, change) in std::mem::take(&mut self.pending) {
            match change {
                PendingChange::Remove => {
                    if self.delete_node(pos) {
                        summary.removed += 1;
                    } else {
                        tracing::debug!(%pos, "removal of unregistered position ignored");
                    }
                }
                PendingChange::Insert(node) => {
                    self.insert_node(node);
                    added.push(pos);
                    summary.inserted += 1;
                }
            }
        }

        for pos in added {
            if self.nodes.get(pos).is_some_and(ChargeNode::is_unassigned)
                && self.construct_graph(pos).is_some()
            {
                summary.constructed += 1;
            }
        }

        summary.pruned = self.prune_graphs();

        for graph in self.graphs.values() {
            graph.tick(&mut self.nodes);
        }
        summary.live_graphs = self.graphs.len();

        tracing::trace!(
            tick = self.tick,
            nodes = self.nodes.len(),
            graphs = self.graphs.len(),
            "charge network ticked"
        );
        summary
    }

    /// Advance the network by `n` ticks.
    pub fn run(&mut self, n: u64) {
        for _ in 0..n {
            self.tick();
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The live node at `pos`. A node found already marked invalid is dropped
    /// (destroying its graph) and reported as absent.
    pub fn query(&mut self, pos: Position) -> Option<&ChargeNode> {
        if self.nodes.get(pos).is_some_and(ChargeNode::is_invalid) {
            self.delete_node(pos);
            return None;
        }
        self.nodes.get(pos)
    }

    /// Return `true` if a live node at `pos` was registered with `def`.
    pub fn node_matches(&mut self, pos: Position, def: &ChargeDef) -> bool {
        self.query(pos).is_some_and(|node| node.def() == def)
    }

    /// Return `true` if no node is registered at `pos` or it has no
    /// component yet.
    pub fn is_undefined(&self, pos: Position) -> bool {
        self.nodes.get(pos).is_none_or(ChargeNode::is_unassigned)
    }

    /// The component of the node at `pos`, building it if the node is
    /// unassigned.
    ///
    /// If no node is registered but the world reports a charge block there,
    /// the node is created according to [`NetworkConfig::lazy_creation`]:
    /// immediately (bypassing the queue), or queued for the next tick with
    /// the Null component returned for now. Positions without a charge block
    /// yield the Null component.
    pub fn component_at(&mut self, pos: Position) -> Component<'_> {
        if self.query(pos).is_none()
            && let Some(def) = self.world.charge_def_at(pos)
        {
            match self.config.lazy_creation {
                LazyCreation::Immediate => {
                    let battery = self.world.battery_for(pos, &def);
                    self.insert_node(ChargeNode::new(pos, def, battery));
                }
                LazyCreation::Queued => {
                    self.request_register(pos, def);
                }
            }
        }

        let graph = match self.nodes.get(pos).map(ChargeNode::graph) {
            Some(GraphRef::Unassigned) => self.construct_graph(pos),
            Some(GraphRef::Member(id)) => Some(id),
            None => None,
        };
        self.component(graph)
    }

    /// Handle to a graph by id. Unknown, pruned, or destroyed graphs yield
    /// the Null component.
    pub fn component(&mut self, id: Option<GraphId>) -> Component<'_> {
        let graph = id
            .and_then(|id| self.graphs.get(&id))
            .filter(|graph| !graph.is_invalid());
        Component::new(graph, &mut self.nodes)
    }

    /// Live graphs in creation order.
    pub fn graphs(&self) -> impl Iterator<Item = &ChargeGraph> {
        self.graphs
            .values()
            .filter(|graph| !graph.is_invalid() && !graph.is_empty())
    }

    /// A live graph by id.
    pub fn graph(&self, id: GraphId) -> Option<&ChargeGraph> {
        self.graphs.get(&id).filter(|graph| !graph.is_invalid())
    }

    /// Number of live graphs.
    pub fn graph_count(&self) -> usize {
        self.graphs().count()
    }

    /// The node registry.
    pub fn nodes(&self) -> &NodeRegistry {
        &self.nodes
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The number of ticks run so far.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// The recorded network events.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// The active configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// The world this network reads blocks from.
    pub fn world(&self) -> &W {
        &self.world
    }

    /// Mutable access to the world.
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    /// Extract the world, consuming the network.
    pub fn into_world(self) -> W {
        self.world
    }

    // -----------------------------------------------------------------------
    // Registry mutation
    // -----------------------------------------------------------------------

    fn insert_node(&mut self, mut node: ChargeNode) {
        let pos = node.position();
        let Some(old) = self.nodes.remove(pos) else {
            self.nodes.insert(node);
            self.emit(
                NetworkEventKind::NodeInserted { pos },
                format!("registered {pos}"),
            );
            return;
        };

        let inherited = old
            .graph()
            .id()
            .and_then(|id| self.graphs.get_mut(&id))
            .filter(|graph| !graph.is_invalid())
            .map(|graph| {
                graph.adopt(&mut node);
                graph.id()
            });
        self.nodes.insert(node);

        tracing::debug!(%pos, ?inherited, "replaced charge node");
        self.emit(
            NetworkEventKind::NodeReplaced { pos, inherited },
            match inherited {
                Some(id) => format!("replaced {pos}, kept {id}"),
                None => format!("replaced {pos}"),
            },
        );
    }

    fn delete_node(&mut self, pos: Position) -> bool {
        let Some(mut node) = self.nodes.remove(pos) else {
            return false;
        };
        node.invalidate();
        self.emit(
            NetworkEventKind::NodeRemoved { pos },
            format!("deregistered {pos}"),
        );
        if let Some(id) = node.graph().id() {
            self.destroy_graph(id);
        }
        true
    }

    fn destroy_graph(&mut self, id: GraphId) {
        let Some(graph) = self.graphs.get_mut(&id) else {
            return;
        };
        // The removed node is already gone from the registry but still listed.
        let size = graph.len().saturating_sub(1);
        if !graph.invalidate(&mut self.nodes) {
            return;
        }
        tracing::info!(graph = %id, size, "destroying charge graph");
        self.emit(
            NetworkEventKind::GraphDestroyed { graph: id, size },
            format!("destroyed {id} ({size} nodes released)"),
        );
    }

    fn prune_graphs(&mut self) -> usize {
        let dead: Vec<GraphId> = self
            .graphs
            .values()
            .filter(|graph| graph.is_invalid() || graph.is_empty())
            .map(ChargeGraph::id)
            .collect();
        for id in &dead {
            self.graphs.remove(id);
            tracing::debug!(graph = %id, "pruned charge graph");
            self.emit(
                NetworkEventKind::GraphPruned { graph: *id },
                format!("pruned {id}"),
            );
        }
        dead.len()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Build or grow the component of the unassigned node at `seed`.
    ///
    /// Breadth-first from the seed, absorbing unassigned neighbors and the
    /// first node met of each distinct existing graph. The largest graph met
    /// wins (oldest on ties) and takes in every unassigned node found plus
    /// the members of every other graph met, which are left empty. With no
    /// existing graph met, a new one is created if more than one node was
    /// found or any of them carries a battery; otherwise the seed stays on
    /// the Null component.
    fn construct_graph(&mut self, seed: Position) -> Option<GraphId> {
        match self.nodes.get(seed)?.graph() {
            GraphRef::Member(id) => return Some(id),
            GraphRef::Unassigned => {}
        }

        let mut visited: HashSet<Position> = HashSet::from([seed]);
        let mut unassigned: Vec<Position> = vec![seed];
        let mut encountered: BTreeSet<GraphId> = BTreeSet::new();
        let mut frontier = vec![seed];

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for current in &frontier {
                let Some(node) = self.nodes.get(*current) else {
                    continue;
                };
                for neighbor in node.neighbors(&self.nodes) {
                    if visited.contains(&neighbor) {
                        continue;
                    }
                    let Some(graph) = self.nodes.get(neighbor).map(ChargeNode::graph) else {
                        continue;
                    };
                    match graph {
                        GraphRef::Unassigned => unassigned.push(neighbor),
                        GraphRef::Member(id) => {
                            if !encountered.insert(id) {
                                continue;
                            }
                        }
                    }
                    visited.insert(neighbor);
                    next.push(neighbor);
                }
            }
            frontier = next;
        }

        let winner = match self.largest_graph(&encountered) {
            Some(id) => id,
            None if unassigned.len() > 1
                || unassigned
                    .iter()
                    .any(|pos| self.nodes.get(*pos).is_some_and(ChargeNode::has_battery)) =>
            {
                let id = GraphId(self.next_graph);
                self.next_graph += 1;
                self.graphs.insert(id, ChargeGraph::new(id));
                id
            }
            None => return None,
        };

        let mut target = self.graphs.remove(&winner)?;
        for pos in &unassigned {
            if let Some(node) = self.nodes.get_mut(*pos) {
                target.add(node);
            }
        }
        for loser in encountered.iter().copied().filter(|id| *id != winner) {
            let Some(graph) = self.graphs.get_mut(&loser) else {
                continue;
            };
            let members: Vec<Position> = graph.members().collect();
            graph.clear();
            for pos in members {
                if let Some(node) = self.nodes.get_mut(pos) {
                    target.add(node);
                }
            }
            tracing::debug!(%winner, %loser, "merged charge graphs");
            self.emit(
                NetworkEventKind::GraphMerged { winner, loser },
                format!("merged {loser} into {winner}"),
            );
        }

        let (size, batteries) = (target.len(), target.battery_count());
        self.graphs.insert(winner, target);
        tracing::info!(%seed, graph = %winner, size, batteries, "constructed charge graph");
        self.emit(
            NetworkEventKind::GraphConstructed {
                graph: winner,
                seed,
                size,
                batteries,
            },
            format!("constructed {winner} from {seed}: {size} nodes, {batteries} batteries"),
        );
        Some(winner)
    }

    /// Largest of the given graphs by member count; the oldest wins ties.
    fn largest_graph(&self, ids: &BTreeSet<GraphId>) -> Option<GraphId> {
        ids.iter()
            .filter_map(|id| self.graphs.get(id).map(|graph| (*id, graph.len())))
            .max_by(|(a_id, a_len), (b_id, b_len)| a_len.cmp(b_len).then(b_id.cmp(a_id)))
            .map(|(id, _)| id)
    }

    fn emit(&mut self, kind: NetworkEventKind, description: impl Into<String>) {
        self.events
            .push(NetworkEvent::new(self.tick, kind, description));
    }
}

impl Network<BlockGrid> {
    /// Write every node's battery charge back into the grid so a later
    /// network over the same grid starts from the current state.
    pub fn save_charges(&mut self) -> usize {
        let mut saved = 0;
        for node in self.nodes.iter() {
            if let Some(battery) = node.battery()
                && self.world.save_charge(node.position(), battery.charge())
            {
                saved += 1;
            }
        }
        saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_core::{BatterySpec, ConnectType, Direction};

    fn wire() -> ChargeDef {
        ChargeDef::new(ConnectType::Wire)
    }

    fn cell() -> ChargeDef {
        ChargeDef::new(ConnectType::Block).with_battery(BatterySpec::new(1000.0))
    }

    fn at(x: i32) -> Position {
        Position::new(x, 0, 0)
    }

    fn network() -> Network<BlockGrid> {
        Network::new(BlockGrid::new("Test"), NetworkConfig::default())
    }

    /// Place and register `def` at each x along the x axis, with `charge`.
    fn place(net: &mut Network<BlockGrid>, xs: &[i32], def: ChargeDef, charge: f64) {
        for x in xs {
            net.world_mut().place_charged(at(*x), def, charge);
            assert!(net.request_register(at(*x), def));
        }
    }

    fn graph_id(net: &mut Network<BlockGrid>, pos: Position) -> Option<GraphId> {
        net.component_at(pos).id()
    }

    #[test]
    fn registration_waits_for_tick() {
        let mut net = network();
        place(&mut net, &[0, 1], wire(), 0.0);
        assert_eq!(net.pending_count(), 2);
        assert_eq!(net.node_count(), 0);

        let summary = net.tick();
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.constructed, 1);
        assert_eq!(summary.live_graphs, 1);
        assert_eq!(net.pending_count(), 0);
        assert_eq!(net.node_count(), 2);
    }

    #[test]
    fn matching_registration_is_not_requeued() {
        let mut net = network();
        place(&mut net, &[0], wire(), 0.0);
        net.tick();
        assert!(!net.request_register(at(0), wire()));
        assert!(net.request_register(at(0), cell()));
    }

    #[test]
    fn chain_forms_one_graph() {
        let mut net = network();
        place(&mut net, &[0, 1, 2, 3, 4], wire(), 0.0);
        net.tick();
        assert_eq!(net.graph_count(), 1);
        let component = net.component_at(at(2));
        assert_eq!(component.size(), 5);
        assert_eq!(component.members(), (0..5).map(at).collect::<Vec<_>>());
    }

    #[test]
    fn chain_grown_one_tick_at_a_time() {
        let mut net = network();
        for x in [4, 0, 2, 1, 3] {
            place(&mut net, &[x], cell(), 10.0);
            net.tick();
        }
        assert_eq!(net.graph_count(), 1);
        assert_eq!(net.component_at(at(0)).size(), 5);
        assert!(!net.is_undefined(at(4)));
    }

    #[test]
    fn isolated_wire_stays_null() {
        let mut net = network();
        place(&mut net, &[0], wire(), 0.0);
        let summary = net.tick();
        assert_eq!(summary.constructed, 0);
        assert!(net.is_undefined(at(0)));
        assert!(net.component_at(at(0)).is_null());
    }

    #[test]
    fn isolated_battery_forms_singleton() {
        let mut net = network();
        place(&mut net, &[0], cell(), 5.0);
        net.tick();
        let component = net.component_at(at(0));
        assert_eq!(component.size(), 1);
        assert!((component.total_charge() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tick_equalizes_batteries() {
        let mut net = network();
        net.world_mut().place_charged(at(0), cell(), 10.0);
        net.world_mut().place_charged(at(1), cell(), 20.0);
        net.world_mut().place_charged(at(2), cell(), 60.0);
        for x in 0..3 {
            net.request_register(at(x), cell());
        }
        net.tick();
        for x in 0..3 {
            let charge = net.nodes().charge_at(at(x)).unwrap();
            assert!((charge - 30.0).abs() < 1e-9);
        }
    }

    #[test]
    fn one_sided_neighbors_stay_apart() {
        let mut net = network();
        let slab = ChargeDef::new(ConnectType::Slab).with_battery(BatterySpec::new(10.0));
        net.world_mut().place(at(0), slab);
        net.world_mut().place(at(1), cell());
        net.request_register(at(0), slab);
        net.request_register(at(1), cell());
        net.tick();
        let a = graph_id(&mut net, at(0));
        let b = graph_id(&mut net, at(1));
        assert!(a.is_some() && b.is_some());
        assert_ne!(a, b);
    }

    #[test]
    fn larger_graph_absorbs_smaller() {
        let mut net = network();
        // [0 1 2] and [4 5] with a gap at 3.
        place(&mut net, &[0, 1, 2, 4, 5], wire(), 0.0);
        net.tick();
        let big = graph_id(&mut net, at(0)).unwrap();
        let small = graph_id(&mut net, at(5)).unwrap();
        assert_ne!(big, small);

        place(&mut net, &[3], wire(), 0.0);
        let summary = net.tick();
        assert_eq!(summary.pruned, 1);
        assert_eq!(graph_id(&mut net, at(5)), Some(big));
        assert_eq!(net.graph(big).unwrap().len(), 6);
        assert!(net.graph(small).is_none());
        let kinds: Vec<&NetworkEventKind> = net.events().iter().map(|e| &e.kind).collect();
        assert!(kinds.contains(&&NetworkEventKind::GraphMerged {
            winner: big,
            loser: small
        }));
        assert!(kinds.contains(&&NetworkEventKind::GraphPruned { graph: small }));
    }

    #[test]
    fn equal_graphs_merge_into_oldest() {
        let mut net = network();
        place(&mut net, &[0, 1], wire(), 0.0);
        net.tick();
        place(&mut net, &[3, 4], wire(), 0.0);
        net.tick();
        let older = graph_id(&mut net, at(0)).unwrap();
        let newer = graph_id(&mut net, at(4)).unwrap();
        assert!(older < newer);

        place(&mut net, &[2], wire(), 0.0);
        net.tick();
        assert_eq!(graph_id(&mut net, at(4)), Some(older));
    }

    #[test]
    fn removal_destroys_whole_graph() {
        let mut net = network();
        place(&mut net, &[0, 1, 2, 3, 4], wire(), 0.0);
        net.tick();
        let original = graph_id(&mut net, at(0)).unwrap();

        net.request_deregister(at(2));
        let summary = net.tick();
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.pruned, 1);
        assert!(net.graph(original).is_none());
        for x in [0, 1, 3, 4] {
            assert!(net.is_undefined(at(x)));
        }

        let left = net.component_at(at(0)).members();
        let right = net.component_at(at(4)).members();
        assert_eq!(left, vec![at(0), at(1)]);
        assert_eq!(right, vec![at(3), at(4)]);
    }

    #[test]
    fn removing_chain_end_keeps_rest_together() {
        let mut net = network();
        place(&mut net, &[0, 1, 2, 3, 4], wire(), 0.0);
        net.tick();
        net.request_deregister(at(4));
        net.tick();
        assert_eq!(
            net.component_at(at(0)).members(),
            vec![at(0), at(1), at(2), at(3)]
        );
        assert!(net.query(at(4)).is_none());
    }

    #[test]
    fn deregister_overrides_pending_register() {
        let mut net = network();
        place(&mut net, &[0], wire(), 0.0);
        net.request_deregister(at(0));
        assert_eq!(net.pending_count(), 1);
        let summary = net.tick();
        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.removed, 0);
        assert_eq!(net.node_count(), 0);
    }

    #[test]
    fn replacement_inherits_live_graph() {
        let mut net = network();
        place(&mut net, &[0, 1, 2], cell(), 10.0);
        net.tick();
        let id = graph_id(&mut net, at(1)).unwrap();

        assert!(net.request_register(at(1), wire()));
        let summary = net.tick();
        assert_eq!(summary.constructed, 0);
        let node = net.query(at(1)).unwrap();
        assert_eq!(node.graph(), GraphRef::Member(id));
        assert!(!node.has_battery());
        let graph = net.graph(id).unwrap();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.battery_count(), 2);
    }

    #[test]
    fn replacement_without_graph_constructs() {
        let mut net = network();
        place(&mut net, &[0], wire(), 0.0);
        net.tick();
        assert!(net.is_undefined(at(0)));
        assert!(net.request_register(at(0), cell()));
        let summary = net.tick();
        assert_eq!(summary.constructed, 1);
        assert!(!net.is_undefined(at(0)));
    }

    #[test]
    fn component_at_creates_from_world() {
        let mut net = network();
        net.world_mut().place_charged(at(0), cell(), 8.0);
        let first = net.component_at(at(0)).id();
        assert!(first.is_some());
        assert_eq!(net.node_count(), 1);

        let second = net.component_at(at(0)).id();
        assert_eq!(first, second);
        assert_eq!(net.node_count(), 1);
        assert_eq!(net.graph_count(), 1);
    }

    #[test]
    fn component_at_empty_position_is_null() {
        let mut net = network();
        let mut component = net.component_at(at(9));
        assert!(component.is_null());
        assert_eq!(component.size(), 0);
        assert_eq!(component.total_charge(), 0.0);
        assert!(!component.try_use_charge(1.0));
        assert_eq!(component.remove_charge(1.0), 0.0);
        assert_eq!(net.node_count(), 0);
    }

    #[test]
    fn queued_lazy_creation_defers_to_tick() {
        let config = NetworkConfig::default().with_lazy_creation(LazyCreation::Queued);
        let mut net = Network::new(BlockGrid::new("Test"), config);
        net.world_mut().place_charged(at(0), cell(), 8.0);
        assert!(net.component_at(at(0)).is_null());
        assert_eq!(net.node_count(), 0);
        assert_eq!(net.pending_count(), 1);

        net.tick();
        assert_eq!(net.component_at(at(0)).size(), 1);
    }

    #[test]
    fn component_withdrawals() {
        let mut net = network();
        place(&mut net, &[0, 1], cell(), 50.0);
        net.tick();

        let mut component = net.component_at(at(0));
        assert!(!component.try_use_charge(101.0));
        assert!((component.total_charge() - 100.0).abs() < f64::EPSILON);
        assert!(component.try_use_charge(70.0));
        assert!((component.total_charge() - 30.0).abs() < f64::EPSILON);
        assert!((component.remove_charge(45.0) - 30.0).abs() < f64::EPSILON);
        assert_eq!(component.total_charge(), 0.0);
    }

    #[test]
    fn vertical_links_follow_rules() {
        let mut net = network();
        let base = Position::new(0, 0, 0);
        let track = ChargeDef::new(ConnectType::Track);
        let rail = base.up().unwrap();
        let next_rail = rail.step(Direction::East).unwrap();
        net.world_mut().place(base, cell());
        net.world_mut().place(rail, track);
        net.world_mut().place(next_rail, track);
        for pos in [base, rail, next_rail] {
            let def = net.world().charge_def_at(pos).unwrap();
            net.request_register(pos, def);
        }
        net.tick();
        assert_eq!(net.component_at(next_rail).size(), 3);
    }

    #[test]
    fn query_drops_invalid_node() {
        let mut net = network();
        place(&mut net, &[0, 1], wire(), 0.0);
        net.tick();
        let id = graph_id(&mut net, at(0)).unwrap();
        net.nodes.get_mut(at(0)).unwrap().invalidate();

        assert!(net.query(at(0)).is_none());
        assert_eq!(net.node_count(), 1);
        assert!(net.graph(id).is_none());
        assert!(net.is_undefined(at(1)));
    }

    #[test]
    fn save_charges_writes_back_to_grid() {
        let mut net = network();
        net.world_mut().place_charged(at(0), cell(), 10.0);
        net.world_mut().place_charged(at(1), cell(), 30.0);
        place(&mut net, &[2], wire(), 0.0);
        net.request_register(at(0), cell());
        net.request_register(at(1), cell());
        net.tick();
        assert_eq!(net.save_charges(), 2);
        let grid = net.into_world();
        assert!((grid.get(at(0)).unwrap().charge - 20.0).abs() < 1e-9);
        assert!((grid.get(at(1)).unwrap().charge - 20.0).abs() < 1e-9);
    }

    #[test]
    fn events_record_construction_and_destruction() {
        let mut net = network();
        place(&mut net, &[0, 1], wire(), 0.0);
        net.tick();
        net.request_deregister(at(0));
        net.tick();

        let mut first = net.events().iter().filter(|e| e.tick == 1);
        assert!(first.any(|e| matches!(e.kind, NetworkEventKind::GraphConstructed { size: 2, .. })));
        let mut second = net.events().iter().filter(|e| e.tick == 2);
        assert!(second.any(|e| matches!(e.kind, NetworkEventKind::GraphDestroyed { size: 1, .. })));
    }

    #[test]
    fn block_at_coordinate_edge_stays_in_range() {
        let mut net = network();
        let edge = Position::new(i32::MAX, 0, 0);
        let inside = Position::new(i32::MAX - 1, 0, 0);
        let wrapped = Position::new(i32::MIN, 0, 0);
        for pos in [edge, inside, wrapped] {
            net.world_mut().place_charged(pos, cell(), 10.0);
            net.request_register(pos, cell());
        }
        net.tick();

        assert_eq!(net.graph_count(), 2);
        let members = net.component_at(edge).members();
        assert_eq!(members, vec![inside, edge]);
        assert!(!net.component_at(wrapped).contains(edge));
    }
}
