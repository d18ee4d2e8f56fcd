use std::fs;
use std::path::Path;

use cg_core::{BatterySpec, BlockGrid, ChargeDef, ConnectType, Position};

pub fn run(path: &Path) -> Result<(), String> {
    if path.exists() {
        return Err(format!("'{}' already exists", path.display()));
    }

    let json = sample_grid()
        .to_layout()
        .to_json()
        .map_err(|e| format!("cannot render layout: {e}"))?;
    fs::write(path, json).map_err(|e| format!("cannot write {}: {e}", path.display()))?;

    println!("Created layout '{}'", path.display());
    println!("  two batteries joined by wire, a short track, one lone battery");
    println!();
    println!("Get started:");
    println!("  cg check {}", path.display());
    println!("  cg simulate {} --ticks 3 --verbose", path.display());

    Ok(())
}

/// A small depot: two cells linked by wire with a track on top of one, and
/// an unconnected cell further along.
fn sample_grid() -> BlockGrid {
    let cell = ChargeDef::new(ConnectType::Block).with_battery(BatterySpec::new(100.0));
    let wire = ChargeDef::new(ConnectType::Wire);
    let track = ChargeDef::new(ConnectType::Track);

    let mut grid = BlockGrid::new("Depot");
    grid.place_charged(Position::new(0, 0, 0), cell, 80.0);
    grid.place(Position::new(1, 0, 0), wire);
    grid.place(Position::new(2, 0, 0), wire);
    grid.place_charged(Position::new(3, 0, 0), cell, 20.0);
    grid.place(Position::new(0, 1, 0), track);
    grid.place(Position::new(1, 1, 0), track);
    grid.place_charged(Position::new(6, 0, 0), cell, 50.0);
    grid
}
