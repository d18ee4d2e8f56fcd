//! Dynamic connectivity engine for Chargegrid.
//!
//! A [`Network`] tracks which charge blocks are linked into connected
//! components and lets consumers draw energy pooled across each component.
//! Registrations and removals are queued and applied once per
//! [`tick`](Network::tick); components are built lazily by breadth-first
//! search and torn down whole when a member leaves, to be rebuilt on the next
//! query.

/// Consumer-facing component handle.
pub mod component;
/// Configuration types for networks.
pub mod config;
/// Network event types and the event log.
pub mod event;
/// Connected components and their pooled energy operations.
pub mod graph;
/// The network controller: pending queue, construction, and ticking.
pub mod network;
/// Registered nodes and the node registry.
pub mod node;

/// Re-export of [`component::Component`].
pub use component::Component;
/// Re-exports of [`config::NetworkConfig`] and [`config::LazyCreation`].
pub use config::{LazyCreation, NetworkConfig};
/// Re-exports of [`event::EventLog`], [`event::NetworkEvent`], and [`event::NetworkEventKind`].
pub use event::{EventLog, NetworkEvent, NetworkEventKind};
/// Re-exports of [`graph::ChargeGraph`] and [`graph::GraphId`].
pub use graph::{ChargeGraph, GraphId};
/// Re-exports of [`network::Network`] and [`network::TickSummary`].
pub use network::{Network, TickSummary};
/// Re-exports of [`node::ChargeNode`], [`node::GraphRef`], and [`node::NodeRegistry`].
pub use node::{ChargeNode, GraphRef, NodeRegistry};
