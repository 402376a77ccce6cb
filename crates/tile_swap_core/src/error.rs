//! Error type shared by every tile_swap crate

use thiserror::Error;

/// Errors raised while resolving tile references, touching grid storage, or
/// loading configuration
#[derive(Debug, Error)]
pub enum TileSwapError {
    /// A textual tile reference that is not `<A-E><1-based index>`
    #[error("Invalid tile reference: {0}")]
    InvalidTileReference(String),
    /// A cell reference that points outside the live map
    #[error("Cell ({x}, {y}) on layer {layer} is outside the map")]
    CellOutOfBounds { x: u32, y: u32, layer: usize },
    /// The grid handed to a compositor does not have the size it was built for
    #[error("Grid is {found:?} but the compositor was built for {expected:?}")]
    GridMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
    /// Map data whose cell count does not match its header
    #[error("Map data holds {found} values, expected {width}x{height}x{depth}")]
    MapDataLength {
        width: u32,
        height: u32,
        depth: usize,
        found: usize,
    },
    /// A lifecycle call that needs a loaded map arrived before `on_map_load`
    #[error("No map has been loaded")]
    NoActiveMap,
    /// An overlay index that was never attached
    #[error("No overlay at index {0}")]
    UnknownOverlay(usize),
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ConfigParse(String),
    #[error("Failed to parse map data: {0}")]
    MapData(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TileSwapError>;
