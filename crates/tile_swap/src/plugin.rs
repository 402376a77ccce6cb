//! Bevy integration
//!
//! Add [`TileSwapPlugin`] with the resource type that stores your live map:
//!
//! ```rust,ignore
//! use tile_swap::prelude::*;
//!
//! app.add_plugins(TileSwapPlugin::<MyMap>::default());
//! ```
//!
//! The host still calls [`TileSwapper::on_map_load`] when it switches maps.

use std::marker::PhantomData;

use bevy::log::error;
use bevy::prelude::*;
use tile_swap_core::TileGrid;

use crate::config::TileSwapConfig;
use crate::swapper::TileSwapper;

/// Inserts a [`TileSwapper`] and runs its pending pass on `G` every `PreUpdate`
pub struct TileSwapPlugin<G> {
    pub config: TileSwapConfig,
    _grid: PhantomData<fn() -> G>,
}

impl<G> TileSwapPlugin<G> {
    pub fn new(config: TileSwapConfig) -> Self {
        Self {
            config,
            _grid: PhantomData,
        }
    }
}

impl<G> Default for TileSwapPlugin<G> {
    fn default() -> Self {
        Self::new(TileSwapConfig::default())
    }
}

impl<G: TileGrid + Resource> Plugin for TileSwapPlugin<G> {
    fn build(&self, app: &mut App) {
        app.insert_resource(TileSwapper::new(&self.config))
            .add_systems(PreUpdate, refresh_swapped_tiles::<G>);
    }
}

/// Applies pending swaps to the live map resource
fn refresh_swapped_tiles<G: TileGrid + Resource>(
    mut swapper: ResMut<TileSwapper>,
    grid: Option<ResMut<G>>,
) {
    let Some(mut grid) = grid else {
        return;
    };
    // Only touch the grid when there is work, so change detection stays quiet
    if !swapper.needs_refresh() {
        return;
    }
    if let Err(err) = swapper.on_frame_update(&mut *grid) {
        error!("Tile swap pass failed: {err}");
    }
}
