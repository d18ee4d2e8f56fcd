use std::collections::BTreeSet;
use std::fmt;

use cg_core::Position;

use crate::node::{ChargeNode, GraphRef, NodeRegistry};

/// Relative shortfall of [`ChargeGraph::try_use_charge`] still counted as
/// satisfied.
const DRAW_TOLERANCE: f64 = 1e-9;

/// Identifier of a charge graph. Ids are handed out in creation order and
/// never reused, so a lower id always means an older graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(pub(crate) u64);

impl GraphId {
    /// The creation sequence number.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}", self.0)
    }
}

/// A connected component of charge nodes sharing one pooled energy store.
///
/// The graph records positions only; batteries stay with their nodes in the
/// [`NodeRegistry`], which is why the energy operations borrow it. Batteries
/// are always visited in position order, so the scan and removal passes of
/// [`try_use_charge`](Self::try_use_charge) walk them identically.
#[derive(Debug)]
pub struct ChargeGraph {
    id: GraphId,
    members: BTreeSet<Position>,
    cells: BTreeSet<Position>,
    invalid: bool,
}

impl ChargeGraph {
    pub(crate) fn new(id: GraphId) -> Self {
        Self {
            id,
            members: BTreeSet::new(),
            cells: BTreeSet::new(),
            invalid: false,
        }
    }

    /// This graph's id.
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Number of member nodes.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Return `true` if the graph has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Return `true` once the graph has been destroyed. Permanent.
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Return `true` if the node at `pos` is a member.
    pub fn contains(&self, pos: Position) -> bool {
        self.members.contains(&pos)
    }

    /// Member positions in ascending order.
    pub fn members(&self) -> impl Iterator<Item = Position> + '_ {
        self.members.iter().copied()
    }

    /// Number of members carrying a battery.
    pub fn battery_count(&self) -> usize {
        self.cells.len()
    }

    /// Positions of battery-carrying members in ascending order.
    pub fn battery_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells.iter().copied()
    }

    /// Add `node` as a member and point it at this graph. Returns `false` if
    /// the node's position was already a member, in which case nothing
    /// changes.
    ///
    /// # Panics
    ///
    /// Panics if the graph has been invalidated.
    pub(crate) fn add(&mut self, node: &mut ChargeNode) -> bool {
        assert!(!self.invalid, "{} used after invalidation", self.id);
        if !self.members.insert(node.position()) {
            return false;
        }
        node.set_graph(GraphRef::Member(self.id));
        self.record_battery(node);
        true
    }

    /// Take over an existing membership slot for a node replacing the
    /// previous occupant of the same position.
    pub(crate) fn adopt(&mut self, node: &mut ChargeNode) {
        assert!(!self.invalid, "{} used after invalidation", self.id);
        self.members.insert(node.position());
        node.set_graph(GraphRef::Member(self.id));
        self.record_battery(node);
    }

    fn record_battery(&mut self, node: &ChargeNode) {
        if node.has_battery() {
            self.cells.insert(node.position());
        } else {
            self.cells.remove(&node.position());
        }
    }

    /// Drop every member without invalidating the graph. Used on the losing
    /// side of a merge, after its nodes have been re-pointed.
    pub(crate) fn clear(&mut self) {
        self.members.clear();
        self.cells.clear();
    }

    /// Destroy the graph: every member still pointing here reverts to the
    /// Null component and membership is emptied. Returns `false` if the graph
    /// was already invalid.
    pub(crate) fn invalidate(&mut self, nodes: &mut NodeRegistry) -> bool {
        if self.invalid {
            return false;
        }
        self.invalid = true;
        for pos in &self.members {
            if let Some(node) = nodes.get_mut(*pos)
                && node.graph() == GraphRef::Member(self.id)
            {
                node.set_graph(GraphRef::Unassigned);
            }
        }
        self.clear();
        true
    }

    /// Sum of the charge held by every member battery.
    pub fn total_charge(&self, nodes: &NodeRegistry) -> f64 {
        self.cells.iter().filter_map(|pos| nodes.charge_at(*pos)).sum()
    }

    /// Equalize: set every member battery to the mean charge of the graph.
    ///
    /// No transmission loss is applied.
    pub fn tick(&self, nodes: &mut NodeRegistry) {
        let charges: Vec<f64> = self
            .cells
            .iter()
            .filter_map(|pos| nodes.charge_at(*pos))
            .collect();
        if charges.is_empty() {
            return;
        }
        let average = charges.iter().sum::<f64>() / charges.len() as f64;
        for pos in &self.cells {
            if let Some(battery) = nodes.battery_mut(*pos) {
                battery.set_charge(average);
            }
        }
    }

    /// Remove exactly `amount` charge, or nothing at all.
    ///
    /// The first pass only reads charges and stops as soon as the running
    /// total covers `amount`. If it never does, no battery is touched. The
    /// second pass removes from the same batteries in the same order; should
    /// a battery's own draw limit make it come up short, every removal made
    /// in this call is put back before returning `false`. A shortfall within
    /// [`DRAW_TOLERANCE`] of `amount` is rounding, not a draw limit.
    pub fn try_use_charge(&self, nodes: &mut NodeRegistry, amount: f64) -> bool {
        if amount.is_nan() {
            return false;
        }
        let mut available = 0.0;
        for pos in &self.cells {
            available += nodes.charge_at(*pos).unwrap_or(0.0);
            if available >= amount {
                break;
            }
        }
        if available < amount {
            return false;
        }

        let mut removed = 0.0;
        let mut drawn: Vec<(Position, f64)> = Vec::new();
        for pos in &self.cells {
            if removed >= amount {
                break;
            }
            if let Some(battery) = nodes.battery_mut(*pos) {
                let before = battery.charge();
                removed += battery.remove_charge(amount - removed);
                drawn.push((*pos, before));
            }
        }
        if amount - removed <= amount.abs() * DRAW_TOLERANCE {
            return true;
        }

        for (pos, before) in drawn {
            if let Some(battery) = nodes.battery_mut(pos) {
                battery.set_charge(before);
            }
        }
        false
    }

    /// Remove up to `amount` charge and return how much was removed.
    /// Non-positive and NaN requests remove nothing.
    pub fn remove_charge(&self, nodes: &mut NodeRegistry, amount: f64) -> f64 {
        let mut removed = 0.0;
        if amount.is_nan() {
            return removed;
        }
        for pos in &self.cells {
            if removed >= amount {
                break;
            }
            if let Some(battery) = nodes.battery_mut(*pos) {
                removed += battery.remove_charge(amount - removed);
            }
        }
        removed
    }
}

impl fmt::Display for ChargeGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{{size={}, batteries={}}}",
            self.id,
            self.members.len(),
            self.cells.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_core::{BatterySpec, ChargeBattery, ChargeDef, ConnectType};

    fn charged(pos: Position, charge: f64) -> ChargeNode {
        charged_with(pos, BatterySpec::new(1000.0), charge)
    }

    fn charged_with(pos: Position, spec: BatterySpec, charge: f64) -> ChargeNode {
        let def = ChargeDef::new(ConnectType::Block).with_battery(spec);
        let battery = def
            .make_battery(charge)
            .map(|b| Box::new(b) as Box<dyn ChargeBattery>);
        ChargeNode::new(pos, def, battery)
    }

    fn plain(pos: Position) -> ChargeNode {
        ChargeNode::new(pos, ChargeDef::new(ConnectType::Wire), None)
    }

    /// A graph over nodes at x = 0, 1, 2, ... with the given optional charges.
    fn graph_of(charges: &[Option<f64>]) -> (ChargeGraph, NodeRegistry) {
        let mut graph = ChargeGraph::new(GraphId(1));
        let mut nodes = NodeRegistry::new();
        for (x, charge) in charges.iter().enumerate() {
            let pos = Position::new(x as i32, 0, 0);
            let mut node = match charge {
                Some(c) => charged(pos, *c),
                None => plain(pos),
            };
            assert!(graph.add(&mut node));
            nodes.insert(node);
        }
        (graph, nodes)
    }

    fn charges(graph: &ChargeGraph, nodes: &NodeRegistry) -> Vec<f64> {
        graph
            .battery_positions()
            .filter_map(|pos| nodes.charge_at(pos))
            .collect()
    }

    #[test]
    fn add_points_node_at_graph_and_records_battery() {
        let mut graph = ChargeGraph::new(GraphId(7));
        let mut node = charged(Position::new(0, 0, 0), 5.0);
        assert!(graph.add(&mut node));
        assert_eq!(node.graph(), GraphRef::Member(GraphId(7)));
        assert_eq!(graph.battery_count(), 1);

        let mut again = charged(Position::new(0, 0, 0), 5.0);
        assert!(!graph.add(&mut again));
        assert!(again.is_unassigned());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn plain_nodes_are_members_without_cells() {
        let (graph, _) = graph_of(&[None, Some(3.0), None]);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.battery_count(), 1);
    }

    #[test]
    fn adopt_refreshes_battery_record() {
        let (mut graph, mut nodes) = graph_of(&[Some(3.0), None]);
        let pos = Position::new(0, 0, 0);
        nodes.remove(pos);
        let mut replacement = plain(pos);
        graph.adopt(&mut replacement);
        nodes.insert(replacement);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.battery_count(), 0);
        assert_eq!(nodes.get(pos).unwrap().graph(), GraphRef::Member(GraphId(1)));
    }

    #[test]
    fn invalidate_resets_members_and_is_permanent() {
        let (mut graph, mut nodes) = graph_of(&[Some(1.0), None, Some(2.0)]);
        assert!(graph.invalidate(&mut nodes));
        assert!(graph.is_invalid());
        assert!(graph.is_empty());
        assert!(nodes.iter().all(|n| n.is_unassigned()));
        assert!(!graph.invalidate(&mut nodes));
    }

    #[test]
    #[should_panic(expected = "used after invalidation")]
    fn add_after_invalidate_panics() {
        let (mut graph, mut nodes) = graph_of(&[None]);
        graph.invalidate(&mut nodes);
        let mut node = plain(Position::new(5, 0, 0));
        graph.add(&mut node);
    }

    #[test]
    fn clear_keeps_graph_valid() {
        let (mut graph, _) = graph_of(&[Some(1.0), None]);
        graph.clear();
        assert!(graph.is_empty());
        assert!(!graph.is_invalid());
        assert_eq!(graph.battery_count(), 0);
    }

    #[test]
    fn total_charge_sums_cells() {
        let (graph, nodes) = graph_of(&[Some(10.0), None, Some(30.0), Some(5.0)]);
        assert!((graph.total_charge(&nodes) - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tick_equalizes_to_mean() {
        let (graph, mut nodes) = graph_of(&[Some(10.0), None, Some(30.0), Some(50.0)]);
        graph.tick(&mut nodes);
        for charge in charges(&graph, &nodes) {
            assert!((charge - 30.0).abs() < 1e-9);
        }
        assert!((graph.total_charge(&nodes) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn tick_without_batteries_is_noop() {
        let (graph, mut nodes) = graph_of(&[None, None]);
        graph.tick(&mut nodes);
        assert_eq!(graph.total_charge(&nodes), 0.0);
    }

    #[test]
    fn try_use_charge_insufficient_touches_nothing() {
        let (graph, mut nodes) = graph_of(&[Some(10.0), Some(20.0)]);
        assert!(!graph.try_use_charge(&mut nodes, 31.0));
        assert_eq!(charges(&graph, &nodes), vec![10.0, 20.0]);
    }

    #[test]
    fn try_use_charge_spans_batteries() {
        let (graph, mut nodes) = graph_of(&[Some(10.0), Some(20.0), Some(5.0)]);
        assert!(graph.try_use_charge(&mut nodes, 25.0));
        assert_eq!(charges(&graph, &nodes), vec![0.0, 5.0, 5.0]);
        assert!((graph.total_charge(&nodes) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn try_use_charge_rolls_back_on_draw_limit() {
        let mut graph = ChargeGraph::new(GraphId(1));
        let mut nodes = NodeRegistry::new();
        for x in 0..2 {
            let mut node = charged_with(
                Position::new(x, 0, 0),
                BatterySpec::new(100.0).with_max_draw(4.0),
                10.0,
            );
            graph.add(&mut node);
            nodes.insert(node);
        }
        // 20 stored, but at most 8 can be drawn in one call.
        assert!(!graph.try_use_charge(&mut nodes, 15.0));
        assert_eq!(charges(&graph, &nodes), vec![10.0, 10.0]);
        assert!(graph.try_use_charge(&mut nodes, 8.0));
        assert_eq!(charges(&graph, &nodes), vec![6.0, 6.0]);
    }

    #[test]
    fn try_use_charge_of_zero_succeeds_on_empty_graph() {
        let (graph, mut nodes) = graph_of(&[None]);
        assert!(graph.try_use_charge(&mut nodes, 0.0));
        assert!(!graph.try_use_charge(&mut nodes, 1.0));
    }

    #[test]
    fn remove_charge_is_best_effort() {
        let (graph, mut nodes) = graph_of(&[Some(10.0), Some(20.0)]);
        assert!((graph.remove_charge(&mut nodes, 12.0) - 12.0).abs() < f64::EPSILON);
        assert_eq!(charges(&graph, &nodes), vec![0.0, 18.0]);
        assert!((graph.remove_charge(&mut nodes, 50.0) - 18.0).abs() < f64::EPSILON);
        assert_eq!(charges(&graph, &nodes), vec![0.0, 0.0]);
        assert_eq!(graph.remove_charge(&mut nodes, 5.0), 0.0);
        assert_eq!(graph.remove_charge(&mut nodes, -5.0), 0.0);
    }

    #[test]
    fn display_shows_counts() {
        let (graph, _) = graph_of(&[Some(1.0), None]);
        assert_eq!(graph.to_string(), "G1{size=2, batteries=1}");
    }

    #[test]
    fn try_use_charge_of_whole_total_after_equalizing() {
        let (graph, mut nodes) = graph_of(&[Some(10.0), Some(10.0), Some(10.5)]);
        graph.tick(&mut nodes);
        let total = graph.total_charge(&nodes);
        assert!(graph.try_use_charge(&mut nodes, total));
        assert!(graph.total_charge(&nodes) < 1e-9);
    }

    #[test]
    fn try_use_charge_rejects_nan_and_infinity() {
        let (graph, mut nodes) = graph_of(&[Some(10.0), Some(20.0)]);
        assert!(!graph.try_use_charge(&mut nodes, f64::NAN));
        assert!(!graph.try_use_charge(&mut nodes, f64::INFINITY));
        assert_eq!(charges(&graph, &nodes), vec![10.0, 20.0]);
    }

    #[test]
    fn remove_charge_of_infinity_drains_and_reports_total() {
        let (graph, mut nodes) = graph_of(&[Some(40.0)]);
        assert_eq!(graph.remove_charge(&mut nodes, f64::INFINITY), 40.0);
        assert_eq!(charges(&graph, &nodes), vec![0.0]);
    }

    #[test]
    fn remove_charge_of_nan_takes_nothing() {
        let (graph, mut nodes) = graph_of(&[Some(40.0), Some(5.0)]);
        assert_eq!(graph.remove_charge(&mut nodes, f64::NAN), 0.0);
        assert_eq!(charges(&graph, &nodes), vec![40.0, 5.0]);
    }
}
