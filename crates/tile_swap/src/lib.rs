//! Runtime tile swapping for 2D tile maps
//!
//! Register replacement rules by tile id, position, region or mask; the
//! compositor rewrites the live map and re-resolves autotile borders around
//! every rewritten cell.
//!
//! # Quick Start
//!
//! ```rust
//! use tile_swap::prelude::*;
//!
//! let mut map = MapData::new(8, 8);
//! map.commit_pristine();
//!
//! let mut swapper = TileSwapper::default();
//! swapper.on_map_load(1, &mut map).unwrap();
//!
//! let water: TileRef = "A3".parse().unwrap();
//! swapper.swap_by_position(1, &map, 0, 4, 4, &water).unwrap();
//! swapper.on_frame_update(&mut map).unwrap();
//!
//! // a lone water cell shows the fully bordered variant
//! assert_eq!(map.tile_id(4, 4, 0), 2048 + 2 * 48 + 46);
//! ```
//!
//! # Features
//!
//! - `bevy`: `TileSwapper` becomes a Bevy resource and [`plugin::TileSwapPlugin`]
//!   drives it every frame

pub mod config;
pub mod prelude;
pub mod swapper;

#[cfg(feature = "bevy")]
pub mod plugin;

pub use tile_swap_autotile;
pub use tile_swap_core;
pub use tile_swap_rules;

pub use config::{CompositorConfig, TileSwapConfig};
pub use swapper::TileSwapper;
