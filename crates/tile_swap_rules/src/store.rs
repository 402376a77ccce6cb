//! The swap rule tables of every map.
//!
//! Registration converts tile references through the [`TileLayout`] and
//! normalizes the result, so rules always compare against the family base id
//! of autotiles. Nothing here touches map data; the owner of the store decides
//! when to recompute.

use std::collections::HashMap;

use tile_swap_core::{BitGridMask, Result, TileGrid, TileId, TileLayout, TileRef};
use tracing::trace;

use crate::{LayerRules, MapId, MapLayerKey, MaskId, MaskRule};

/// Tile-id, position, region and mask rules, keyed by map and layer
#[derive(Debug, Clone, Default)]
pub struct SwapRuleStore {
    layout: TileLayout,
    scopes: HashMap<MapLayerKey, LayerRules>,
    next_mask: u64,
}

impl SwapRuleStore {
    pub fn new(layout: TileLayout) -> Self {
        Self {
            layout,
            scopes: HashMap::new(),
            next_mask: 0,
        }
    }

    pub fn layout(&self) -> &TileLayout {
        &self.layout
    }

    /// `true` when no map has any rule
    pub fn is_empty(&self) -> bool {
        self.scopes.values().all(LayerRules::is_empty)
    }

    // ─── Registration ────────────────────────────────────────────────────────

    /// Replace every `from` tile of the layer with `to`
    pub fn add_tile<G>(&mut self, grid: &G, key: MapLayerKey, from: &TileRef, to: &TileRef) -> Result<()>
    where
        G: TileGrid + ?Sized,
    {
        let from = self.convert(grid, key, from)?;
        let to = self.convert(grid, key, to)?;
        trace!(?key, from, to, "tile swap registered");
        self.scope_mut(key).tiles.insert(from, to);
        Ok(())
    }

    /// Replace the tile at `(x, y)` with `to`
    pub fn add_position<G>(&mut self, grid: &G, key: MapLayerKey, x: u32, y: u32, to: &TileRef) -> Result<()>
    where
        G: TileGrid + ?Sized,
    {
        let to = self.convert(grid, key, to)?;
        trace!(?key, x, y, to, "position swap registered");
        self.scope_mut(key).positions.insert((x, y), to);
        Ok(())
    }

    /// Replace every tile of `region` with `to`
    pub fn add_region<G>(&mut self, grid: &G, key: MapLayerKey, region: u32, to: &TileRef) -> Result<()>
    where
        G: TileGrid + ?Sized,
    {
        let to = self.convert(grid, key, to)?;
        trace!(?key, region, to, "region swap registered");
        self.scope_mut(key).regions.insert(region, to);
        Ok(())
    }

    /// Replace every cell set in `mask` with `to`. The mask is moved into the
    /// store; use the returned id to reach or revert it.
    pub fn add_mask<G>(&mut self, grid: &G, key: MapLayerKey, mask: BitGridMask, to: &TileRef) -> Result<MaskId>
    where
        G: TileGrid + ?Sized,
    {
        let tile = self.convert(grid, key, to)?;
        let id = MaskId(self.next_mask);
        self.next_mask += 1;
        trace!(?key, ?id, tile, priority = mask.priority(), "mask swap registered");
        self.scope_mut(key).masks.push(MaskRule { id, mask, tile });
        Ok(id)
    }

    // ─── Reverts ─────────────────────────────────────────────────────────────

    /// Remove the tile rule for `from`. Returns whether a rule was removed.
    pub fn revert_tile<G>(&mut self, grid: &G, key: MapLayerKey, from: &TileRef) -> Result<bool>
    where
        G: TileGrid + ?Sized,
    {
        let from = self.convert(grid, key, from)?;
        Ok(self
            .scopes
            .get_mut(&key)
            .is_some_and(|scope| scope.tiles.remove(&from).is_some()))
    }

    pub fn revert_position(&mut self, key: MapLayerKey, x: u32, y: u32) -> bool {
        self.scopes
            .get_mut(&key)
            .is_some_and(|scope| scope.positions.remove(&(x, y)).is_some())
    }

    pub fn revert_region(&mut self, key: MapLayerKey, region: u32) -> bool {
        self.scopes
            .get_mut(&key)
            .is_some_and(|scope| scope.regions.remove(&region).is_some())
    }

    pub fn revert_mask(&mut self, key: MapLayerKey, id: MaskId) -> bool {
        let Some(scope) = self.scopes.get_mut(&key) else {
            return false;
        };
        let before = scope.masks.len();
        scope.masks.retain(|rule| rule.id != id);
        scope.masks.len() != before
    }

    /// Drop every rule of every layer of `map_id`. Returns whether anything
    /// was dropped.
    pub fn revert_all(&mut self, map_id: MapId) -> bool {
        let before = self.scopes.len();
        self.scopes.retain(|key, _| key.map_id != map_id);
        self.scopes.len() != before
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    pub fn has_swap_tiles(&self, map_id: MapId, layer: usize) -> bool {
        self.scope(map_id, layer).is_some_and(|s| !s.tiles.is_empty())
    }

    pub fn has_swap_positions(&self, map_id: MapId, layer: usize) -> bool {
        self.scope(map_id, layer).is_some_and(|s| !s.positions.is_empty())
    }

    pub fn has_swap_regions(&self, map_id: MapId, layer: usize) -> bool {
        self.scope(map_id, layer).is_some_and(|s| !s.regions.is_empty())
    }

    pub fn has_swap_masks(&self, map_id: MapId, layer: usize) -> bool {
        self.scope(map_id, layer).is_some_and(|s| !s.masks.is_empty())
    }

    /// The rules of a layer, `None` when it has none at all
    pub fn layer_rules(&self, map_id: MapId, layer: usize) -> Option<&LayerRules> {
        self.scope(map_id, layer).filter(|s| !s.is_empty())
    }

    /// A registered mask
    pub fn mask(&self, key: MapLayerKey, id: MaskId) -> Option<&BitGridMask> {
        self.scopes
            .get(&key)?
            .masks
            .iter()
            .find(|rule| rule.id == id)
            .map(|rule| &rule.mask)
    }

    /// A registered mask, for reshaping in place
    pub fn mask_mut(&mut self, key: MapLayerKey, id: MaskId) -> Option<&mut BitGridMask> {
        self.scopes
            .get_mut(&key)?
            .masks
            .iter_mut()
            .find(|rule| rule.id == id)
            .map(|rule| &mut rule.mask)
    }

    fn scope(&self, map_id: MapId, layer: usize) -> Option<&LayerRules> {
        self.scopes.get(&MapLayerKey::new(map_id, layer))
    }

    fn scope_mut(&mut self, key: MapLayerKey) -> &mut LayerRules {
        self.scopes.entry(key).or_default()
    }

    fn convert<G>(&self, grid: &G, key: MapLayerKey, tile: &TileRef) -> Result<TileId>
    where
        G: TileGrid + ?Sized,
    {
        let raw = self.layout.resolve(tile, key.layer, grid)?;
        Ok(self.layout.normalize(raw))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
