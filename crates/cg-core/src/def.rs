use serde::{Deserialize, Serialize};

use crate::battery::Battery;
use crate::connect::{ConnectType, ConnectionMap};
use crate::position::Position;

/// Capacity and draw limits of a battery-carrying block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatterySpec {
    /// Maximum charge the battery can be filled to.
    pub capacity: f64,
    /// Maximum charge a single removal may take, if limited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_draw: Option<f64>,
}

impl BatterySpec {
    /// A battery spec with the given capacity and no draw limit.
    pub fn new(capacity: f64) -> Self {
        Self {
            capacity,
            max_draw: None,
        }
    }

    /// Limit how much a single removal may take.
    pub fn with_max_draw(mut self, max_draw: f64) -> Self {
        self.max_draw = Some(max_draw);
        self
    }
}

/// Descriptor of a charge-capable block: how it links and whether it stores
/// energy.
///
/// Two descriptors are the same block definition when they compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargeDef {
    /// The link type this block exposes.
    pub connect_type: ConnectType,
    /// Battery carried by this block, if any.
    pub battery: Option<BatterySpec>,
}

impl ChargeDef {
    /// A battery-less descriptor of the given link type.
    pub fn new(connect_type: ConnectType) -> Self {
        Self {
            connect_type,
            battery: None,
        }
    }

    /// Attach a battery spec.
    pub fn with_battery(mut self, spec: BatterySpec) -> Self {
        self.battery = Some(spec);
        self
    }

    /// Candidate neighbors of a block with this descriptor at `pos`.
    pub fn possible_connections(&self, pos: Position) -> ConnectionMap {
        self.connect_type.possible_connections(pos)
    }

    /// Build this block's battery holding `initial_charge`, if it has one.
    pub fn make_battery(&self, initial_charge: f64) -> Option<Battery> {
        self.battery
            .map(|spec| Battery::with_charge(spec, initial_charge))
    }
}
