use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::battery::ChargeBattery;
use crate::connect::ConnectType;
use crate::def::{BatterySpec, ChargeDef};
use crate::error::{GridError, GridResult};
use crate::position::Position;

/// The host world as seen by the charge network.
///
/// The network never stores blocks itself; it asks the world what is at a
/// position when it needs to create a node lazily, and asks it for the
/// battery of every node it creates.
pub trait ChargeWorld {
    /// Descriptor of the charge-capable block at `pos`, if there is one.
    fn charge_def_at(&self, pos: Position) -> Option<ChargeDef>;

    /// Battery for a node being created at `pos` with `def`.
    ///
    /// Worlds that persist charge override this to restore the saved value.
    fn battery_for(&self, pos: Position, def: &ChargeDef) -> Option<Box<dyn ChargeBattery>> {
        let _ = pos;
        def.make_battery(0.0)
            .map(|battery| Box::new(battery) as Box<dyn ChargeBattery>)
    }
}

/// A charge block placed in a [`BlockGrid`], with its last saved charge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedBlock {
    /// The block's descriptor.
    pub def: ChargeDef,
    /// Charge restored into the block's battery when a node is created.
    pub charge: f64,
}

/// In-memory world: an ordered map of charge blocks.
#[derive(Debug, Clone, Default)]
pub struct BlockGrid {
    name: String,
    blocks: BTreeMap<Position, PlacedBlock>,
}

impl BlockGrid {
    /// Create an empty grid.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: BTreeMap::new(),
        }
    }

    /// Display name of the grid.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Place (or replace) a block with an empty battery. Returns the previous
    /// block at that position.
    pub fn place(&mut self, pos: Position, def: ChargeDef) -> Option<PlacedBlock> {
        self.place_charged(pos, def, 0.0)
    }

    /// Place (or replace) a block whose battery starts with `charge`.
    pub fn place_charged(&mut self, pos: Position, def: ChargeDef, charge: f64) -> Option<PlacedBlock> {
        self.blocks.insert(pos, PlacedBlock { def, charge })
    }

    /// Remove the block at `pos`.
    pub fn remove(&mut self, pos: Position) -> Option<PlacedBlock> {
        self.blocks.remove(&pos)
    }

    /// The block at `pos`, if any.
    pub fn get(&self, pos: Position) -> Option<&PlacedBlock> {
        self.blocks.get(&pos)
    }

    /// Record the current charge of the battery at `pos`. Returns `false` if
    /// no block is placed there.
    pub fn save_charge(&mut self, pos: Position, charge: f64) -> bool {
        match self.blocks.get_mut(&pos) {
            Some(block) => {
                block.charge = charge;
                true
            }
            None => false,
        }
    }

    /// Iterate over all blocks in position order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &PlacedBlock)> {
        self.blocks.iter().map(|(pos, block)| (*pos, block))
    }

    /// Number of placed blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Return `true` if no blocks are placed.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of placed blocks that carry a battery.
    pub fn battery_count(&self) -> usize {
        self.blocks
            .values()
            .filter(|block| block.def.battery.is_some())
            .count()
    }

    /// Build a grid from a parsed layout, rejecting duplicate positions and
    /// charge stored on battery-less blocks.
    pub fn from_layout(layout: GridLayout) -> GridResult<Self> {
        let mut grid = Self::new(layout.name);
        for entry in layout.blocks {
            let def = ChargeDef {
                connect_type: entry.connect_type,
                battery: entry.battery,
            };
            let charge = match (entry.charge, def.battery) {
                (Some(charge), None) if charge != 0.0 => {
                    return Err(GridError::ChargeWithoutBattery(entry.pos));
                }
                (charge, _) => charge.unwrap_or(0.0),
            };
            if grid.place_charged(entry.pos, def, charge).is_some() {
                return Err(GridError::DuplicatePosition(entry.pos));
            }
        }
        Ok(grid)
    }

    /// Snapshot the grid as a serializable layout.
    pub fn to_layout(&self) -> GridLayout {
        GridLayout {
            name: self.name.clone(),
            blocks: self
                .iter()
                .map(|(pos, block)| BlockEntry {
                    pos,
                    connect_type: block.def.connect_type,
                    battery: block.def.battery,
                    charge: block.def.battery.map(|_| block.charge),
                })
                .collect(),
        }
    }

    /// Read and validate a JSON layout file.
    pub fn load(path: &Path) -> GridResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_layout(GridLayout::from_json(&text)?)
    }
}

impl ChargeWorld for BlockGrid {
    fn charge_def_at(&self, pos: Position) -> Option<ChargeDef> {
        self.blocks.get(&pos).map(|block| block.def)
    }

    fn battery_for(&self, pos: Position, def: &ChargeDef) -> Option<Box<dyn ChargeBattery>> {
        let saved = self.blocks.get(&pos).map_or(0.0, |block| block.charge);
        def.make_battery(saved)
            .map(|battery| Box::new(battery) as Box<dyn ChargeBattery>)
    }
}

/// On-disk form of a [`BlockGrid`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    /// Display name of the grid.
    #[serde(default)]
    pub name: String,
    /// Placed blocks.
    #[serde(default)]
    pub blocks: Vec<BlockEntry>,
}

impl GridLayout {
    /// Parse a layout from JSON text.
    pub fn from_json(text: &str) -> GridResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Render the layout as pretty-printed JSON.
    pub fn to_json(&self) -> GridResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One block in a [`GridLayout`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockEntry {
    /// Where the block sits.
    pub pos: Position,
    /// The block's link type.
    #[serde(rename = "type")]
    pub connect_type: ConnectType,
    /// Battery spec, if the block stores energy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<BatterySpec>,
    /// Saved battery charge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge: Option<f64>,
}
