pub mod check;
pub mod init;
pub mod simulate;

use std::path::Path;

use cg_core::BlockGrid;

/// Load and validate a layout file, mapping failures to a printable message.
fn load_grid(path: &Path) -> Result<BlockGrid, String> {
    BlockGrid::load(path).map_err(|e| format!("cannot load '{}': {e}", path.display()))
}
