use crate::position::Position;

/// Alias for `Result<T, GridError>`.
pub type GridResult<T> = Result<T, GridError>;

/// Errors that can occur when building or loading a block grid.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// Two blocks in a layout claim the same position.
    #[error("duplicate block at {0}")]
    DuplicatePosition(Position),

    /// A layout block stores charge but its descriptor has no battery.
    #[error("block at {0} has a charge but no battery")]
    ChargeWithoutBattery(Position),

    /// A position string could not be parsed.
    #[error("invalid position \"{0}\": expected x,y,z")]
    InvalidPosition(String),

    /// The layout file is not valid JSON for the expected schema.
    #[error("layout parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The layout file could not be read or written.
    #[error("layout io error: {0}")]
    Io(#[from] std::io::Error),
}
