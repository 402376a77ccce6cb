//! Data types for the swap rule tables.
//!
//! Rules are grouped per map and layer under a [`MapLayerKey`]. Each group is a
//! [`LayerRules`] holding the four independent rule sources.

use std::collections::HashMap;
use tile_swap_core::{BitGridMask, TileId};

/// Identifier of a map in the host game
pub type MapId = u32;

// ─── Keys ─────────────────────────────────────────────────────────────────────

/// A map and one of its tile layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapLayerKey {
    pub map_id: MapId,
    pub layer: usize,
}

impl MapLayerKey {
    pub fn new(map_id: MapId, layer: usize) -> Self {
        Self { map_id, layer }
    }
}

/// Handle of a registered mask rule, returned by
/// [`SwapRuleStore::add_mask`](crate::SwapRuleStore::add_mask)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaskId(pub(crate) u64);

// ─── Rules ────────────────────────────────────────────────────────────────────

/// A mask shape and the tile it paints
#[derive(Debug, Clone)]
pub struct MaskRule {
    pub id: MaskId,
    pub mask: BitGridMask,
    pub tile: TileId,
}

/// The rules of one map layer.
///
/// All tile ids are normalized: autotiles are stored as their family base id.
#[derive(Debug, Clone, Default)]
pub struct LayerRules {
    /// Normalized source tile -> replacement
    pub tiles: HashMap<TileId, TileId>,
    /// `(x, y)` -> replacement
    pub positions: HashMap<(u32, u32), TileId>,
    /// Region id -> replacement
    pub regions: HashMap<u32, TileId>,
    /// Mask rules in registration order
    pub masks: Vec<MaskRule>,
}

impl LayerRules {
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
            && self.positions.is_empty()
            && self.regions.is_empty()
            && self.masks.is_empty()
    }

    /// Tile of the highest-priority mask covering `(x, y)`.
    ///
    /// On equal priority the mask registered first wins.
    pub fn mask_tile(&self, x: u32, y: u32) -> Option<TileId> {
        let mut best: Option<&MaskRule> = None;
        for rule in &self.masks {
            if rule.mask.get(x as i32, y as i32)
                && best.map_or(true, |b| rule.mask.priority() > b.mask.priority())
            {
                best = Some(rule);
            }
        }
        best.map(|rule| rule.tile)
    }

    /// The replacement for a cell, by precedence:
    /// position > mask > region > tile id.
    ///
    /// `current` is the cell's normalized tile id. `region` is only called when
    /// region rules exist.
    pub fn select<R>(&self, x: u32, y: u32, current: TileId, region: R) -> Option<TileId>
    where
        R: FnOnce() -> u32,
    {
        self.positions
            .get(&(x, y))
            .copied()
            .or_else(|| self.mask_tile(x, y))
            .or_else(|| {
                if self.regions.is_empty() {
                    None
                } else {
                    self.regions.get(&region()).copied()
                }
            })
            .or_else(|| self.tiles.get(&current).copied())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
