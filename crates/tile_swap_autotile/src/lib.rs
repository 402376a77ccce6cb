//! Autotile resolution for tile_swap
//!
//! Given an autotile family and what surrounds a cell, pick which of the
//! family's 48 variants the cell should display so joined tile art (water
//! edges, walls, cliffs) stays seamless.
//!
//! # Example
//!
//! ```rust
//! use tile_swap_autotile::{resolve_index, Neighbor};
//!
//! // A lone grass cell surrounded by plain tiles shows the fully bordered variant
//! let index = resolve_index(0, |_| Neighbor::Inside(None));
//! assert_eq!(index, 46);
//! ```

pub mod resolve;

pub use resolve::{
    blob_index, edges, resolve_cell, resolve_index, AutotileShape, Neighbor, FALLBACK_INDEX,
};

// Re-export tile_swap_core
pub use tile_swap_core;
