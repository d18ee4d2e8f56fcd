use std::fmt;

use serde::{Deserialize, Serialize};

use crate::def::BatterySpec;

/// A bounded energy store attached to a charge node.
///
/// The network treats batteries as opaque cells: it reads and writes charge
/// through these three calls and never looks at capacity directly.
pub trait ChargeBattery: fmt::Debug {
    /// Current stored charge.
    fn charge(&self) -> f64;

    /// Overwrite the stored charge.
    fn set_charge(&mut self, amount: f64);

    /// Remove up to `requested` charge and return how much was actually
    /// removed. Never removes more than requested and never leaves the
    /// battery negative.
    fn remove_charge(&mut self, requested: f64) -> f64;
}

/// The standard battery used by [`ChargeDef`](crate::def::ChargeDef).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    charge: f64,
    capacity: f64,
    max_draw: Option<f64>,
}

impl Battery {
    /// Create an empty battery from a spec.
    pub fn new(spec: BatterySpec) -> Self {
        Self::with_charge(spec, 0.0)
    }

    /// Create a battery from a spec holding `charge` (floored at zero).
    pub fn with_charge(spec: BatterySpec, charge: f64) -> Self {
        Self {
            charge: charge.max(0.0),
            capacity: spec.capacity,
            max_draw: spec.max_draw,
        }
    }

    /// Maximum charge [`add_charge`](Self::add_charge) will fill up to.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Per-call removal limit, if any.
    pub fn max_draw(&self) -> Option<f64> {
        self.max_draw
    }

    /// Add up to `amount` charge without exceeding capacity. Returns the
    /// amount accepted.
    pub fn add_charge(&mut self, amount: f64) -> f64 {
        if amount <= 0.0 {
            return 0.0;
        }
        let room = (self.capacity - self.charge).max(0.0);
        let accepted = amount.min(room);
        self.charge += accepted;
        accepted
    }
}

impl ChargeBattery for Battery {
    fn charge(&self) -> f64 {
        self.charge
    }

    // Not clamped to capacity: equalization across mixed capacities must
    // conserve the component total.
    fn set_charge(&mut self, amount: f64) {
        self.charge = amount.max(0.0);
    }

    fn remove_charge(&mut self, requested: f64) -> f64 {
        if requested.is_nan() || requested <= 0.0 {
            return 0.0;
        }
        let mut removed = requested.min(self.charge);
        if let Some(limit) = self.max_draw {
            removed = removed.min(limit.max(0.0));
        }
        self.charge -= removed;
        removed
    }
}
