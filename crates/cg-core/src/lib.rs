//! Core types for Chargegrid: the grid data model shared by the network
//! engine and its front-ends.
//!
//! This crate knows nothing about connected components. It describes what a
//! charge block *is* (its [`ChargeDef`]), where it sits ([`Position`]), which
//! neighbors it is willing to link with ([`ConnectType`]), and how its energy is
//! stored ([`ChargeBattery`]). The [`ChargeWorld`] trait is the seam through
//! which the engine asks the host world about blocks; [`BlockGrid`] is a
//! ready-made in-memory implementation that can be loaded from a JSON layout.

/// Battery contract and the standard battery implementation.
pub mod battery;
/// Link types and per-type connection rules.
pub mod connect;
/// Charge block descriptors.
pub mod def;
/// Error types used throughout the crate.
pub mod error;
/// Grid positions and face directions.
pub mod position;
/// The world collaborator trait and the in-memory block grid.
pub mod world;

/// Re-export battery types.
pub use battery::{Battery, ChargeBattery};
/// Re-export connection rule types.
pub use connect::{ConnectSet, ConnectType, ConnectionMap};
/// Re-export descriptor types.
pub use def::{BatterySpec, ChargeDef};
/// Re-export error types.
pub use error::{GridError, GridResult};
/// Re-export position types.
pub use position::{Direction, Position};
/// Re-export world types.
pub use world::{BlockEntry, BlockGrid, ChargeWorld, GridLayout, PlacedBlock};
