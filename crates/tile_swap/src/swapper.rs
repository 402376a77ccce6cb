//! The registration API and lifecycle hooks used by the host game.

use tile_swap_core::{BitGridMask, Result, TileGrid, TileRef, TileSwapError};
use tile_swap_rules::{CompositeReport, Compositor, MapId, MapLayerKey, MaskId, SwapRuleStore};
use tracing::{debug, info};

use crate::config::TileSwapConfig;

/// Owns every swap rule and the compositor of the active map.
///
/// Rules are registered per map and layer, for the active map or any other.
/// Adding a rule to the active map schedules a recompute; removing one
/// schedules a reload of the authored data first, so cells the rule had
/// rewritten get their original tiles back.
///
/// When the `bevy` feature is enabled, this type derives `bevy::prelude::Resource`
/// so it can be inserted directly into a Bevy app.
#[cfg_attr(feature = "bevy", derive(bevy::prelude::Resource))]
#[derive(Debug, Clone)]
pub struct TileSwapper {
    rules: SwapRuleStore,
    layer_count: usize,
    active: Option<Compositor>,
}

impl Default for TileSwapper {
    fn default() -> Self {
        Self::new(&TileSwapConfig::default())
    }
}

impl TileSwapper {
    pub fn new(config: &TileSwapConfig) -> Self {
        Self {
            rules: SwapRuleStore::new(config.layout),
            layer_count: config.compositor.layer_count,
            active: None,
        }
    }

    pub fn rules(&self) -> &SwapRuleStore {
        &self.rules
    }

    /// Id of the map passed to the last [`on_map_load`](Self::on_map_load)
    pub fn active_map(&self) -> Option<MapId> {
        self.active.as_ref().map(Compositor::map_id)
    }

    pub fn compositor(&self) -> Option<&Compositor> {
        self.active.as_ref()
    }

    // ─── Lifecycle hooks ─────────────────────────────────────────────────────

    /// A new map became active. Rebuilds the compositor for `grid` and applies
    /// the map's rules right away.
    pub fn on_map_load<G>(&mut self, map_id: MapId, grid: &mut G) -> Result<CompositeReport>
    where
        G: TileGrid + ?Sized,
    {
        info!(map = map_id, width = grid.width(), height = grid.height(), "map loaded");
        let mut compositor = Compositor::for_grid(map_id, grid).with_layer_count(self.layer_count);
        let report = compositor.recompute(&self.rules, grid)?;
        self.active = Some(compositor);
        Ok(report)
    }

    /// Discard every substitution and runtime edit on `grid` by restoring its
    /// authored data, then reapply the current rules.
    pub fn on_raw_data_reload<G>(&mut self, grid: &mut G) -> Result<CompositeReport>
    where
        G: TileGrid + ?Sized,
    {
        let compositor = self.active.as_mut().ok_or(TileSwapError::NoActiveMap)?;
        compositor.reload(&self.rules, grid)
    }

    /// Run the pending pass of the active map, if any.
    pub fn on_frame_update<G>(&mut self, grid: &mut G) -> Result<Option<CompositeReport>>
    where
        G: TileGrid + ?Sized,
    {
        match self.active.as_mut() {
            Some(compositor) => compositor.update(&self.rules, grid),
            None => Ok(None),
        }
    }

    pub fn needs_refresh(&self) -> bool {
        self.active.as_ref().is_some_and(Compositor::needs_refresh)
    }

    /// Schedule a recompute of the active map and its overlays.
    pub fn mark_dirty(&mut self) {
        if let Some(compositor) = self.active.as_mut() {
            compositor.mark_dirty();
        }
    }

    // ─── Registration ────────────────────────────────────────────────────────
    //
    // Rules may target any map. Only rules of the active map invalidate it;
    // rules of other maps are applied when that map is loaded. `grid` is only
    // read for cell references.

    /// Replace every `from` tile on `layer` of `map_id` with `to`.
    pub fn swap_tile<G>(&mut self, map_id: MapId, grid: &G, layer: usize, from: &TileRef, to: &TileRef) -> Result<()>
    where
        G: TileGrid + ?Sized,
    {
        self.rules.add_tile(grid, MapLayerKey::new(map_id, layer), from, to)?;
        self.dirty_if_active(map_id);
        Ok(())
    }

    /// Replace the tile at `(x, y)` on `layer` of `map_id` with `to`.
    pub fn swap_by_position<G>(
        &mut self,
        map_id: MapId,
        grid: &G,
        layer: usize,
        x: u32,
        y: u32,
        to: &TileRef,
    ) -> Result<()>
    where
        G: TileGrid + ?Sized,
    {
        self.rules
            .add_position(grid, MapLayerKey::new(map_id, layer), x, y, to)?;
        self.dirty_if_active(map_id);
        Ok(())
    }

    /// Replace every tile of `region` on `layer` of `map_id` with `to`.
    pub fn swap_by_region<G>(&mut self, map_id: MapId, grid: &G, layer: usize, region: u32, to: &TileRef) -> Result<()>
    where
        G: TileGrid + ?Sized,
    {
        self.rules
            .add_region(grid, MapLayerKey::new(map_id, layer), region, to)?;
        self.dirty_if_active(map_id);
        Ok(())
    }

    /// Paint every cell of `mask` on `layer` of `map_id` with `to`.
    pub fn swap_by_mask<G>(
        &mut self,
        map_id: MapId,
        grid: &G,
        layer: usize,
        mask: BitGridMask,
        to: &TileRef,
    ) -> Result<MaskId>
    where
        G: TileGrid + ?Sized,
    {
        let id = self
            .rules
            .add_mask(grid, MapLayerKey::new(map_id, layer), mask, to)?;
        self.dirty_if_active(map_id);
        Ok(id)
    }

    /// Edit a registered mask in place. The next pass starts from the authored
    /// data, so cells the mask no longer covers are restored.
    pub fn reshape_mask<F>(&mut self, map_id: MapId, layer: usize, id: MaskId, edit: F) -> bool
    where
        F: FnOnce(&mut BitGridMask),
    {
        let Some(mask) = self.rules.mask_mut(MapLayerKey::new(map_id, layer), id) else {
            return false;
        };
        edit(mask);
        self.reload_if(map_id, true)
    }

    // ─── Reverts ─────────────────────────────────────────────────────────────

    pub fn revert_tile<G>(&mut self, map_id: MapId, grid: &G, layer: usize, from: &TileRef) -> Result<bool>
    where
        G: TileGrid + ?Sized,
    {
        let removed = self
            .rules
            .revert_tile(grid, MapLayerKey::new(map_id, layer), from)?;
        Ok(self.reload_if(map_id, removed))
    }

    pub fn revert_position(&mut self, map_id: MapId, layer: usize, x: u32, y: u32) -> bool {
        let removed = self
            .rules
            .revert_position(MapLayerKey::new(map_id, layer), x, y);
        self.reload_if(map_id, removed)
    }

    pub fn revert_region(&mut self, map_id: MapId, layer: usize, region: u32) -> bool {
        let removed = self
            .rules
            .revert_region(MapLayerKey::new(map_id, layer), region);
        self.reload_if(map_id, removed)
    }

    pub fn revert_mask(&mut self, map_id: MapId, layer: usize, id: MaskId) -> bool {
        let removed = self.rules.revert_mask(MapLayerKey::new(map_id, layer), id);
        self.reload_if(map_id, removed)
    }

    /// Drop every rule of `map_id`
    pub fn revert_all(&mut self, map_id: MapId) -> bool {
        let removed = self.rules.revert_all(map_id);
        debug!(map = map_id, removed, "all swaps reverted");
        self.reload_if(map_id, removed)
    }

    // ─── Overlays ────────────────────────────────────────────────────────────

    /// Attach an overlay map drawn over the active one. It is refreshed
    /// whenever the active map is.
    pub fn attach_overlay<G>(&mut self, map_id: MapId, grid: &G) -> Result<usize>
    where
        G: TileGrid + ?Sized,
    {
        let layer_count = self.layer_count;
        let compositor = self.active.as_mut().ok_or(TileSwapError::NoActiveMap)?;
        Ok(compositor.attach_overlay(Compositor::for_grid(map_id, grid).with_layer_count(layer_count)))
    }

    /// Run the pending pass of overlay `index`, if any.
    pub fn update_overlay<G>(&mut self, index: usize, grid: &mut G) -> Result<Option<CompositeReport>>
    where
        G: TileGrid + ?Sized,
    {
        let compositor = self.active.as_mut().ok_or(TileSwapError::NoActiveMap)?;
        let overlay = compositor
            .overlay_mut(index)
            .ok_or(TileSwapError::UnknownOverlay(index))?;
        overlay.update(&self.rules, grid)
    }

    /// The active compositor when `map_id` is the active map or one of its
    /// overlays
    fn compositor_for(&mut self, map_id: MapId) -> Option<&mut Compositor> {
        self.active.as_mut().filter(|c| {
            c.map_id() == map_id || c.overlays().iter().any(|o| o.map_id() == map_id)
        })
    }

    fn dirty_if_active(&mut self, map_id: MapId) {
        if let Some(compositor) = self.compositor_for(map_id) {
            compositor.mark_dirty();
        }
    }

    fn reload_if(&mut self, map_id: MapId, removed: bool) -> bool {
        if removed {
            if let Some(compositor) = self.compositor_for(map_id) {
                compositor.mark_reload();
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_swap_core::MapData;
    use tile_swap_rules::RefreshState;

    const MAP: MapId = 1;

    fn tile(text: &str) -> TileRef {
        text.parse().unwrap()
    }

    fn loaded(width: u32, height: u32) -> (TileSwapper, MapData) {
        let mut grid = MapData::new(width, height);
        grid.commit_pristine();
        let mut swapper = TileSwapper::default();
        swapper.on_map_load(MAP, &mut grid).unwrap();
        (swapper, grid)
    }

    #[test]
    fn nothing_runs_before_a_map_is_loaded() {
        let mut grid = MapData::new(2, 2);
        let mut swapper = TileSwapper::default();
        swapper.swap_tile(MAP, &grid, 0, &tile("B1"), &tile("B2")).unwrap();
        assert!(!swapper.needs_refresh());
        assert!(swapper.on_frame_update(&mut grid).unwrap().is_none());
        assert!(matches!(
            swapper.on_raw_data_reload(&mut grid).unwrap_err(),
            TileSwapError::NoActiveMap
        ));
    }

    #[test]
    fn swap_applies_on_next_frame() {
        let (mut swapper, mut grid) = loaded(3, 3);
        assert!(!swapper.needs_refresh());

        swapper.swap_tile(MAP, &grid, 0, &tile("B1"), &tile("C1")).unwrap();
        assert!(swapper.needs_refresh());
        assert_eq!(grid.tile_id(0, 0, 0), 0);

        let report = swapper.on_frame_update(&mut grid).unwrap().unwrap();
        assert_eq!(report.substituted, 9);
        assert_eq!(grid.tile_id(2, 2, 0), 256);
        assert!(swapper.on_frame_update(&mut grid).unwrap().is_none());
    }

    #[test]
    fn rules_for_another_map_wait_for_its_load() {
        let (mut swapper, mut grid) = loaded(2, 2);
        swapper.swap_tile(2, &grid, 0, &tile("B1"), &tile("D3")).unwrap();
        assert!(!swapper.needs_refresh());
        assert!(swapper.rules().has_swap_tiles(2, 0));
        assert_eq!(grid.tile_id(0, 0, 0), 0);

        let mut other = MapData::new(3, 2);
        other.commit_pristine();
        let report = swapper.on_map_load(2, &mut other).unwrap();
        assert_eq!(report.substituted, 6);
        assert_eq!(other.tile_id(2, 1, 0), 514);

        // reverting rules of an inactive map leaves the active one alone
        swapper.on_frame_update(&mut other).unwrap();
        swapper.swap_tile(MAP, &grid, 0, &tile("B1"), &tile("B2")).unwrap();
        assert!(swapper.revert_tile(MAP, &grid, 0, &tile("B1")).unwrap());
        assert!(!swapper.needs_refresh());

        swapper.on_map_load(MAP, &mut grid).unwrap();
        assert_eq!(grid.tile_id(0, 0, 0), 0);
    }

    #[test]
    fn revert_restores_authored_tiles() {
        let (mut swapper, mut grid) = loaded(3, 3);
        swapper.swap_tile(MAP, &grid, 0, &tile("B1"), &tile("B4")).unwrap();
        swapper.swap_by_position(MAP, &grid, 0, 1, 1, &tile("B9")).unwrap();
        swapper.on_frame_update(&mut grid).unwrap();
        assert_eq!(grid.tile_id(1, 1, 0), 8);

        assert!(swapper.revert_position(MAP, 0, 1, 1));
        assert_eq!(swapper.compositor().unwrap().state(), RefreshState::NeedsReload);
        swapper.on_frame_update(&mut grid).unwrap();
        assert_eq!(grid.tile_id(1, 1, 0), 3);

        assert!(swapper.revert_tile(MAP, &grid, 0, &tile("B1")).unwrap());
        swapper.on_frame_update(&mut grid).unwrap();
        assert_eq!(grid.layer(0), vec![0; 9]);
    }

    #[test]
    fn revert_of_missing_rule_changes_nothing() {
        let (mut swapper, _grid) = loaded(2, 2);
        assert!(!swapper.revert_region(MAP, 0, 5));
        assert!(!swapper.needs_refresh());
    }

    #[test]
    fn raw_data_reload_restores_authored_cells() {
        let (mut swapper, mut grid) = loaded(3, 3);
        swapper.swap_by_position(MAP, &grid, 0, 1, 1, &tile("B9")).unwrap();
        swapper.on_frame_update(&mut grid).unwrap();
        grid.set_tile_id(0, 0, 0, 5);

        swapper.on_raw_data_reload(&mut grid).unwrap();
        assert_eq!(grid.tile_id(0, 0, 0), 0);
        assert_eq!(grid.tile_id(1, 1, 0), 8);
        assert!(!swapper.needs_refresh());
    }

    #[test]
    fn rules_survive_map_reload() {
        let (mut swapper, mut grid) = loaded(2, 2);
        swapper.swap_by_region(MAP, &grid, 0, 0, &tile("D1")).unwrap();
        swapper.on_frame_update(&mut grid).unwrap();

        swapper.on_raw_data_reload(&mut grid).unwrap();
        assert_eq!(grid.tile_id(0, 0, 0), 512);

        let report = swapper.on_map_load(MAP, &mut grid).unwrap();
        assert!(report.is_noop());
        assert_eq!(swapper.active_map(), Some(MAP));
    }

    #[test]
    fn reshaped_mask_restores_uncovered_cells() {
        let (mut swapper, mut grid) = loaded(4, 4);
        let mut mask = BitGridMask::new(4, 4);
        mask.rectangle(4, 4, 0, 0);
        let id = swapper.swap_by_mask(MAP, &grid, 0, mask, &tile("E1")).unwrap();
        swapper.on_frame_update(&mut grid).unwrap();
        assert_eq!(grid.tile_id(3, 3, 0), 768);

        assert!(swapper.reshape_mask(MAP, 0, id, |mask| mask.set(3, 3, false)));
        swapper.on_frame_update(&mut grid).unwrap();
        assert_eq!(grid.tile_id(3, 3, 0), 0);
        assert_eq!(grid.tile_id(2, 2, 0), 768);

        assert!(swapper.revert_mask(MAP, 0, id));
        assert!(!swapper.reshape_mask(MAP, 0, id, |mask| mask.clear()));
    }

    #[test]
    fn revert_all_only_reloads_the_active_map() {
        let (mut swapper, grid) = loaded(2, 2);
        swapper.swap_tile(MAP, &grid, 0, &tile("B1"), &tile("B2")).unwrap();
        swapper.swap_tile(MAP, &grid, 1, &tile("B1"), &tile("B2")).unwrap();

        assert!(!swapper.revert_all(9));
        assert!(swapper.revert_all(MAP));
        assert!(!swapper.rules().has_swap_tiles(MAP, 1));
        assert_eq!(swapper.compositor().unwrap().state(), RefreshState::NeedsReload);
    }

    #[test]
    fn overlays_follow_the_active_map() {
        let (mut swapper, grid) = loaded(2, 2);
        let mut overlay_grid = MapData::new(3, 3);
        overlay_grid.commit_pristine();

        let index = swapper.attach_overlay(7, &overlay_grid).unwrap();
        assert!(swapper.update_overlay(index, &mut overlay_grid).unwrap().is_some());
        assert!(swapper.update_overlay(index, &mut overlay_grid).unwrap().is_none());

        swapper.swap_tile(MAP, &grid, 0, &tile("B1"), &tile("B2")).unwrap();
        assert!(swapper.update_overlay(index, &mut overlay_grid).unwrap().is_some());

        // a rule for the overlay map itself also refreshes it
        swapper.swap_tile(7, &overlay_grid, 0, &tile("B1"), &tile("B3")).unwrap();
        swapper.update_overlay(index, &mut overlay_grid).unwrap();
        assert_eq!(overlay_grid.tile_id(2, 2, 0), 2);

        let err = swapper.update_overlay(5, &mut overlay_grid).unwrap_err();
        assert!(matches!(err, TileSwapError::UnknownOverlay(5)));
    }

    #[test]
    fn configured_layer_count_limits_passes() {
        let mut config = TileSwapConfig::default();
        config.compositor.layer_count = 1;
        let mut swapper = TileSwapper::new(&config);
        let mut grid = MapData::new(2, 2);
        swapper.on_map_load(MAP, &mut grid).unwrap();

        swapper.swap_tile(MAP, &grid, 1, &tile("B1"), &tile("B2")).unwrap();
        let report = swapper.on_frame_update(&mut grid).unwrap().unwrap();
        assert_eq!(report.layers_visited, 0);
        assert_eq!(grid.tile_id(0, 0, 1), 0);
    }
}
