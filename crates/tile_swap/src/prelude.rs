pub use crate::config::{CompositorConfig, TileSwapConfig};
pub use crate::swapper::TileSwapper;

pub use tile_swap_core::{
    BitGridMask, MapData, TileGrid, TileId, TileLayout, TileRef, TileSwapError,
};
pub use tile_swap_rules::{CompositeReport, MapId, MaskId, RefreshState};

#[cfg(feature = "bevy")]
pub use crate::plugin::TileSwapPlugin;
