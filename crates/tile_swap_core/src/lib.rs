//! Core data structures for tile_swap
//!
//! This crate provides the fundamental types shared by the compositor and the
//! autotile resolver:
//! - `TileId` / `TileLayout` / `TileRef` - the flat tile id space and the
//!   conversion from `"A1"`-style references
//! - `BitGridMask` - a fixed-size bit grid with boolean algebra, growth and
//!   shrink, and cell iteration
//! - `TileGrid` - the storage interface of a live map, with `MapData` as the
//!   in-memory implementation
//! - `TileSwapError` - the error type used across the workspace

mod direction;
mod error;
mod grid;
mod mask;
mod tile_id;

pub use direction::Direction;
pub use error::{Result, TileSwapError};
pub use grid::{MapData, TileGrid, DEFAULT_DEPTH, REGION_CHANNEL, REGION_SHIFT};
pub use mask::{BitGridMask, Cells, MaskCell};
pub use tile_id::{TileId, TileLayout, TilePage, TileRef, AUTOTILE_FAMILIES, AUTOTILE_VARIANTS};
