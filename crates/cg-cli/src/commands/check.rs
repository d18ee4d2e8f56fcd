use std::path::Path;

pub fn run(layout: &Path) -> Result<(), String> {
    let grid = super::load_grid(layout)?;

    println!("  All checks passed for '{}'.", grid.name());
    println!("  {} blocks, {} batteries", grid.len(), grid.battery_count());

    Ok(())
}
