//! Swap rules and the compositor that applies them.
//!
//! [`SwapRuleStore`] holds the tile-id, position, region and mask rules of
//! every map. [`Compositor`] applies them to a [`TileGrid`](tile_swap_core::TileGrid)
//! and re-resolves the autotiles around every cell it rewrote.
//!
//! This crate has no Bevy dependency. It operates on any `TileGrid`.

mod compose;
mod store;
mod types;

pub use compose::{CompositeReport, Compositor, RefreshState, DEFAULT_LAYER_COUNT};
pub use store::SwapRuleStore;
pub use types::{LayerRules, MapId, MapLayerKey, MaskId, MaskRule};
